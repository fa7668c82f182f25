//! This file contains genome records and the file names derived along the pipeline.
//!
//! Each stage output goes in the directory of its input:
//! - genome `dir/x.fna` gives predicted proteins `dir/x.faa`
//! - proteins `dir/x.faa` give the hit table `dir/x.hmm`
//! - hit table `dir/x.hmm` reads its proteins from `dir/x.faa`

use std::path::{Path, PathBuf};

use fxhash::FxHashSet;

use crate::errors::{KaaiError, Result};
use crate::utils::parameters::{InputFiles, InputKind};


/// The representation a genome currently has in the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenomeSource {
    /// raw nucleotide sequence
    Sequence(PathBuf),
    /// predicted protein sequences
    Proteins(PathBuf),
    /// marker search table together with the protein file searched
    MarkerHits { hits : PathBuf, proteins : PathBuf },
}


/// A genome going through the stages.
#[derive(Clone, Debug)]
pub struct Genome {
    id : String,
    source : GenomeSource,
    /// files created by this run for this genome, not inputs given by the user
    intermediates : Vec<PathBuf>,
}


impl Genome {
    pub fn new(id : String, source : GenomeSource) -> Self {
        Genome{id, source, intermediates : Vec::new()}
    }

    /// builds a genome from an input file, its id is the file stem
    pub fn from_input(kind : InputKind, path : &Path) -> Self {
        let id = genome_id(path);
        let source = match kind {
            InputKind::Genomes => GenomeSource::Sequence(path.to_path_buf()),
            InputKind::Proteins => GenomeSource::Proteins(path.to_path_buf()),
            InputKind::MarkerHits => GenomeSource::MarkerHits{hits : path.to_path_buf(), proteins : proteins_of_hits(path)},
        };
        Genome::new(id, source)
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_source(&self) -> &GenomeSource {
        &self.source
    }

    pub fn get_intermediates(&self) -> &[PathBuf] {
        &self.intermediates
    }

    /// promotes the genome to a new representation produced by this run.
    pub(crate) fn promote(mut self, source : GenomeSource, created : PathBuf) -> Self {
        self.source = source;
        self.intermediates.push(created);
        self
    }

    /// removes the files this run created for the genome.
    pub fn remove_intermediates(&self) {
        for path in &self.intermediates {
            remove_file_quiet(path);
        }
    }
} // end of impl Genome


/// genome identifier is the file name without its last extension
pub fn genome_id(path : &Path) -> String {
    match path.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

/// path of predicted proteins for a genome sequence file
pub fn proteins_path(genome : &Path) -> PathBuf {
    genome.with_extension("faa")
}

/// path of hit table for a protein file
pub fn hits_path(proteins : &Path) -> PathBuf {
    proteins.with_extension("hmm")
}

/// path of proteins matching a hit table
pub fn proteins_of_hits(hits : &Path) -> PathBuf {
    hits.with_extension("faa")
}

/// path of the scratch output a collaborator writes beside its real output
pub fn scratch_path(file : &Path) -> PathBuf {
    file.with_extension("temp")
}

/// add a suffix to an output prefix : `out` gives `out.table`
pub fn output_path(prefix : &Path, suffix : &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}


pub(crate) fn remove_file_quiet(path : &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        log::debug!("could not remove {:?} : {}", path, e);
    }
}


/// builds the genome records of a run, identifiers must be unique.
pub fn genomes_from_input(input : &InputFiles) -> Result<Vec<Genome>> {
    let mut seen = FxHashSet::<String>::default();
    let mut genomes = Vec::<Genome>::with_capacity(input.get_files().len());
    for path in input.get_files() {
        let genome = Genome::from_input(input.get_kind(), path);
        if !seen.insert(genome.get_id().to_string()) {
            return Err(KaaiError::DuplicateGenome(genome.get_id().to_string()));
        }
        log::trace!("genome {} from {:?}", genome.get_id(), path);
        genomes.push(genome);
    }
    Ok(genomes)
} // end of genomes_from_input



// end of mod tests
