//! kaai estimates similarity between genomes from amino acid kmers of single copy marker genes.
//!
//! Genomes go through gene prediction, marker search and kmer extraction. Kmers of all genomes
//! are counted in a sparse genome x kmer matrix and genomes are compared by Bray-Curtis dissimilarity.
//!
//! - [pipeline] drives the stages, each run in parallel over genomes
//! - [aa] kmer extraction and counting
//! - [distance] Bray-Curtis matrix and shared kmer fraction
//! - [diagnostics] optional statistics on kmer frequencies

pub mod aa;
pub mod diagnostics;
pub mod distance;
pub mod errors;
pub mod pipeline;
pub mod tools;
pub mod utils;

pub use errors::{KaaiError, Result};
