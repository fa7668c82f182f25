//! structures related to processing parameters


use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::io::{BufReader, BufWriter};

use serde::{Deserialize, Serialize};
use serde_json::to_writer;

use crate::errors::{KaaiError, Result};

/// k-mer width used when nothing else is asked for
pub const DEFAULT_KMER_SIZE : usize = 4;

/// a kmer is packed 8 bits per residue in a u64
pub const MAX_KMER_SIZE : usize = 8;


/// The representation a run starts from. Exactly one kind is given per run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    /// raw genome sequences, all three stages run
    Genomes,
    /// predicted proteins, prediction is skipped
    Proteins,
    /// precomputed marker search tables, only k-mer extraction runs
    MarkerHits,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Genomes => write!(f, "genomes"),
            InputKind::Proteins => write!(f, "proteins"),
            InputKind::MarkerHits => write!(f, "marker hits"),
        }
    }
}

//===========================================================

/// The validated input of a run : one kind and its files.
#[derive(Clone, Debug)]
pub struct InputFiles {
    kind : InputKind,
    files : Vec<PathBuf>,
}


impl InputFiles {
    /// checks the three possible inputs are mutually exclusive and that one is given.
    /// An empty list counts as not given.
    pub fn new(genomes : Option<Vec<PathBuf>>, proteins : Option<Vec<PathBuf>>, hits : Option<Vec<PathBuf>>) -> Result<Self> {
        let candidates = [
            (InputKind::Genomes, genomes),
            (InputKind::Proteins, proteins),
            (InputKind::MarkerHits, hits),
        ];
        let mut given : Vec<(InputKind, Vec<PathBuf>)> = candidates.into_iter()
                .filter_map(|(kind, files)| files.filter(|f| !f.is_empty()).map(|f| (kind, f)))
                .collect();
        match given.len() {
            0 => Err(KaaiError::NoInput),
            1 => {
                let (kind, files) = given.remove(0);
                log::info!("starting from {}, nb files : {}", kind, files.len());
                Ok(InputFiles{kind, files})
            }
            _ => Err(KaaiError::ConflictingInputs(given.into_iter().map(|(k, _)| k).collect())),
        }
    } // end of new

    pub fn get_kind(&self) -> InputKind {
        self.kind
    }

    pub fn get_files(&self) -> &[PathBuf] {
        &self.files
    }

    /// true if marker search has to run for this input
    pub fn needs_marker_search(&self) -> bool {
        self.kind != InputKind::MarkerHits
    }
} // end of impl InputFiles

//======================================================================================

/// Paths and binaries of the external collaborators (gene predictor and marker search)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolParams {
    /// gene predictor executable
    pub predictor_bin : String,
    /// marker search executable
    pub searcher_bin : String,
    /// hmm database of single copy genes
    pub marker_model : Option<PathBuf>,
}

impl Default for ToolParams {
    fn default() -> Self {
        ToolParams{predictor_bin : String::from("prodigal"), searcher_bin : String::from("hmmsearch"), marker_model : None}
    }
}

//=========================================================================================

/// Gathers parameters of a run. Dumped in json beside the outputs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KaaiParams {
    /// size of thread pool of each stage
    nb_threads : usize,
    /// keep predicted proteins and hit tables created by the run
    keep_intermediates : bool,
    /// width of amino acid kmers
    kmer_size : usize,
    /// fail the run if any genome failed in a stage
    strict : bool,
    /// use all proteins instead of marker genes only
    all_proteins : bool,
    /// also compute the shared kmer fraction
    shared_fraction : bool,
    /// dump statistics on kmer frequencies
    freq_stats : bool,
}


impl Default for KaaiParams {
    fn default() -> Self {
        KaaiParams{nb_threads : 1, keep_intermediates : false, kmer_size : DEFAULT_KMER_SIZE, strict : false,
                all_proteins : false, shared_fraction : false, freq_stats : false}
    }
}


impl KaaiParams {

    pub fn new(nb_threads : usize, keep_intermediates : bool, kmer_size : usize) -> Result<Self> {
        let params = KaaiParams{nb_threads, keep_intermediates, kmer_size, ..Default::default()};
        params.validate()?;
        Ok(params)
    } // end of new

    // ranges every run relies on, whatever the origin of the parameters
    fn validate(&self) -> Result<()> {
        if self.nb_threads == 0 {
            return Err(KaaiError::InvalidParameter("thread count must be at least 1".to_string()));
        }
        if self.kmer_size == 0 || self.kmer_size > MAX_KMER_SIZE {
            return Err(KaaiError::InvalidParameter(format!("kmer size must be in 1..={}, got {}", MAX_KMER_SIZE, self.kmer_size)));
        }
        let nb_cpus = num_cpus::get();
        if self.nb_threads > nb_cpus {
            log::warn!("asked for {} threads, only {} cpus available", self.nb_threads, nb_cpus);
        }
        Ok(())
    }

    pub fn with_strict(mut self, strict : bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_all_proteins(mut self, all_proteins : bool) -> Self {
        self.all_proteins = all_proteins;
        self
    }

    pub fn with_shared_fraction(mut self, shared_fraction : bool) -> Self {
        self.shared_fraction = shared_fraction;
        self
    }

    pub fn with_freq_stats(mut self, freq_stats : bool) -> Self {
        self.freq_stats = freq_stats;
        self
    }

    pub fn get_nb_threads(&self) -> usize {
        self.nb_threads
    }

    pub fn keep_intermediates(&self) -> bool {
        self.keep_intermediates
    }

    pub fn get_kmer_size(&self) -> usize {
        self.kmer_size
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn all_proteins(&self) -> bool {
        self.all_proteins
    }

    pub fn shared_fraction(&self) -> bool {
        self.shared_fraction
    }

    pub fn freq_stats(&self) -> bool {
        self.freq_stats
    }


    pub fn dump_json(&self, filepath: &Path) -> Result<()> {
        //
        log::info!("dumping KaaiParams in json file : {:?}", filepath);
        //
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(filepath)
                .map_err(|e| KaaiError::Output{path : filepath.to_path_buf(), source : e})?;
        let mut writer = BufWriter::new(file);
        to_writer(&mut writer, &self).map_err(|e| KaaiError::Output{path : filepath.to_path_buf(), source : e.into()})?;
        //
        Ok(())
    } // end of dump_json



    /// reload from a json dump.
    pub fn reload_json(filepath : &Path) -> Result<Self> {
        log::info!("in reload_json");
        //
        let file = OpenOptions::new().read(true).open(filepath)
                .map_err(|e| KaaiError::InvalidParameter(format!("could not open {:?} : {}", filepath, e)))?;
        let reader = BufReader::new(file);
        let params : Self = serde_json::from_reader(reader)
                .map_err(|e| KaaiError::InvalidParameter(format!("could not decode {:?} : {}", filepath, e)))?;
        //
        params.validate()?;
        log::info!("KaaiParams reload, kmer size : {}", params.kmer_size);
        //
        Ok(params)
    } // end of reload_json


} // end of impl KaaiParams


//=====================================================================================

// end of mod tests
