//! amino acid kmers : extraction from marker proteins and counting

pub mod counts;
pub mod kmers;

pub use counts::*;
pub use kmers::*;
