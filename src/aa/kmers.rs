//! amino acid kmer extraction from marker gene proteins.
//!
//! Marker genes are the protein records whose fasta id (first token of header) appears
//! as first field of a line of the marker search table.
//! Kmers are generated record after record, in file order, and are not deduplicated.


use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use fxhash::FxHashSet;
use needletail::errors::ParseErrorKind;

use crate::errors::{KaaiError, Result};
use crate::utils::parameters::MAX_KMER_SIZE;

/// marker used by gene predictors for stop codons
pub const STOP_CODON : u8 = b'*';

/// lines of a hit table beginning with this are not hits
const COMMENT_MARKER : u8 = b'#';


/// An amino acid kmer, residues packed 8 bits each in a u64, first residue in high bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KmerAA {
    value : u64,
    nb_base : u8,
}


impl KmerAA {
    /// kmer from residues, length must be in 1..=8
    pub fn new(residues : &[u8]) -> Self {
        assert!(!residues.is_empty() && residues.len() <= MAX_KMER_SIZE);
        let value = residues.iter().fold(0u64, |acc, r| (acc << 8) | *r as u64);
        KmerAA{value, nb_base : residues.len() as u8}
    }

    pub fn get_nb_base(&self) -> usize {
        self.nb_base as usize
    }

    pub fn get_compressed_value(&self) -> u64 {
        self.value
    }

    /// get back residues
    pub fn residues(&self) -> Vec<u8> {
        (0..self.nb_base).rev().map(|i| ((self.value >> (8 * i as u32)) & 0xFF) as u8).collect()
    }
} // end of impl KmerAA


impl fmt::Display for KmerAA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.residues()))
    }
}

//================================================================================

/// The kmers of one genome, in generation order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenomeKmers {
    id : String,
    kmers : Vec<KmerAA>,
}

impl GenomeKmers {
    pub fn new(id : String, kmers : Vec<KmerAA>) -> Self {
        GenomeKmers{id, kmers}
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_kmers(&self) -> &[KmerAA] {
        &self.kmers
    }

    /// total number of kmers, with repetitions
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }
} // end of impl GenomeKmers

//================================================================================

/// fasta ids of proteins recognized as single copy marker genes
#[derive(Clone, Debug, Default)]
pub struct MarkerHitSet(FxHashSet<Vec<u8>>);

impl MarkerHitSet {
    pub fn new() -> Self {
        MarkerHitSet(FxHashSet::default())
    }

    pub fn insert(&mut self, id : &[u8]) -> bool {
        self.0.insert(id.to_vec())
    }

    pub fn contains(&self, id : &[u8]) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for MarkerHitSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = MarkerHitSet::new();
        for id in iter {
            set.insert(id.as_bytes());
        }
        set
    }
}


/// reads a marker search table (hmmsearch --tblout format), keeping the first field of each non comment line
pub fn read_marker_hits(genome : &str, path : &Path) -> Result<MarkerHitSet> {
    let file = File::open(path).map_err(|e| KaaiError::GenomeIo{genome : genome.to_string(), path : path.to_path_buf(), source : e})?;
    let mut hits = MarkerHitSet::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| KaaiError::GenomeIo{genome : genome.to_string(), path : path.to_path_buf(), source : e})?;
        if line.as_bytes().first() == Some(&COMMENT_MARKER) {
            continue;
        }
        if let Some(id) = line.split_whitespace().next() {
            hits.insert(id.as_bytes());
        }
    }
    log::debug!("genome {} : nb marker hits {}", genome, hits.len());
    Ok(hits)
} // end of read_marker_hits



/// fasta id is the header up to first whitespace
fn fasta_id(header : &[u8]) -> &[u8] {
    header.split(|c| c.is_ascii_whitespace()).next().unwrap_or(header)
}


/// overlapping kmers of a sequence, stop codon markers removed first.
/// A cleaned sequence of length L gives max(0, L - k + 1) kmers.
pub fn build_kmers(seq : &[u8], kmer_size : usize) -> Vec<KmerAA> {
    let cleaned : Vec<u8> = seq.iter().copied().filter(|c| *c != STOP_CODON).collect();
    if log::log_enabled!(log::Level::Trace) && cleaned.len() < seq.len() {
        log::trace!("removed {} stop markers", seq.len() - cleaned.len());
    }
    cleaned.windows(kmer_size).map(KmerAA::new).collect()
} // end of build_kmers



// applies kmer generation to each record accepted by filter
fn extract_kmers_filtered<F>(genome : &str, proteins : &Path, kmer_size : usize, accept : F) -> Result<GenomeKmers>
        where F : Fn(&[u8]) -> bool {
    //
    log::debug!("genome {} : extracting kmers from {:?}", genome, proteins);
    let file = File::open(proteins).map_err(|e| KaaiError::GenomeIo{genome : genome.to_string(), path : proteins.to_path_buf(), source : e})?;
    let mut kmers = Vec::<KmerAA>::new();
    let mut reader = match needletail::parse_fastx_reader(file) {
        Ok(reader) => reader,
        Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => {
            log::warn!("genome {} : protein file {:?} is empty", genome, proteins);
            return Ok(GenomeKmers::new(genome.to_string(), kmers));
        }
        Err(e) => {
            return Err(KaaiError::Parse{genome : genome.to_string(), path : proteins.to_path_buf(), msg : e.to_string()});
        }
    };
    let mut nb_record = 0;
    let mut nb_accepted = 0;
    while let Some(record) = reader.next() {
        let seqrec = record.map_err(|e| KaaiError::Parse{genome : genome.to_string(), path : proteins.to_path_buf(), msg : e.to_string()})?;
        nb_record += 1;
        if accept(fasta_id(seqrec.id())) {
            nb_accepted += 1;
            kmers.append(&mut build_kmers(&seqrec.seq(), kmer_size));
        }
    }
    log::debug!("genome {} : nb records {}, nb kept {}, nb kmers {}", genome, nb_record, nb_accepted, kmers.len());
    Ok(GenomeKmers::new(genome.to_string(), kmers))
} // end of extract_kmers_filtered


/// kmers of the proteins listed in hits
pub fn extract_marker_kmers(genome : &str, proteins : &Path, hits : &MarkerHitSet, kmer_size : usize) -> Result<GenomeKmers> {
    extract_kmers_filtered(genome, proteins, kmer_size, |id| hits.contains(id))
}

/// kmers of every protein of the file, marker or not
pub fn extract_all_kmers(genome : &str, proteins : &Path, kmer_size : usize) -> Result<GenomeKmers> {
    extract_kmers_filtered(genome, proteins, kmer_size, |_| true)
}


//================================================================================

// end of mod tests
