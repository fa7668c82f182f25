//! genome x kmer count matrix over the vocabulary of a run.
//!
//! The vocabulary gives each distinct kmer a column, in order of first appearance scanning
//! genomes in input order. Rows are sparse : only observed (column, count) pairs are stored,
//! sorted by column.


use fxhash::FxHashMap;

use crate::aa::kmers::{GenomeKmers, KmerAA};


/// distinct kmers seen in a run, each with its column index
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    index : FxHashMap<KmerAA, u32>,
    kmers : Vec<KmerAA>,
}

impl Vocabulary {
    /// one pass over all kmers of all genomes
    pub fn from_multisets(genomes : &[GenomeKmers]) -> Self {
        let mut vocabulary = Vocabulary::default();
        for genome in genomes {
            for kmer in genome.get_kmers() {
                vocabulary.insert(*kmer);
            }
        }
        log::info!("vocabulary size : {}", vocabulary.len());
        vocabulary
    }

    fn insert(&mut self, kmer : KmerAA) -> u32 {
        let next = self.kmers.len() as u32;
        let column = *self.index.entry(kmer).or_insert(next);
        if column == next {
            self.kmers.push(kmer);
        }
        column
    }

    pub fn get_column(&self, kmer : &KmerAA) -> Option<u32> {
        self.index.get(kmer).copied()
    }

    pub fn get_kmer(&self, column : u32) -> Option<&KmerAA> {
        self.kmers.get(column as usize)
    }

    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }
} // end of impl Vocabulary

//==================================================================================

/// The counts of one genome.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountRow {
    /// (column, count), sorted by column, counts > 0
    entries : Vec<(u32, u32)>,
    /// sum of counts, i.e number of kmers of the genome
    total : u64,
}

impl CountRow {
    pub fn from_kmers(kmers : &[KmerAA], vocabulary : &Vocabulary) -> Self {
        let mut counts = FxHashMap::<u32, u32>::default();
        for kmer in kmers {
            // vocabulary was built from these kmers
            if let Some(column) = vocabulary.get_column(kmer) {
                *counts.entry(column).or_insert(0) += 1;
            }
        }
        let mut entries : Vec<(u32, u32)> = counts.into_iter().collect();
        entries.sort_unstable_by_key(|e| e.0);
        let total = entries.iter().map(|e| e.1 as u64).sum();
        CountRow{entries, total}
    }

    /// count of the kmer in given column, 0 if not observed
    pub fn get(&self, column : u32) -> u32 {
        match self.entries.binary_search_by_key(&column, |e| e.0) {
            Ok(i) => self.entries[i].1,
            Err(_) => 0,
        }
    }

    pub fn get_entries(&self) -> &[(u32, u32)] {
        &self.entries
    }

    pub fn get_total(&self) -> u64 {
        self.total
    }

    /// number of distinct kmers
    pub fn nb_distinct(&self) -> usize {
        self.entries.len()
    }
} // end of impl CountRow

//==================================================================================

/// sparse genome x kmer count matrix
#[derive(Clone, Debug, Default)]
pub struct CountMatrix {
    ids : Vec<String>,
    rows : Vec<CountRow>,
    vocabulary : Vocabulary,
}


impl CountMatrix {
    /// all genomes must have been processed, rows follow the order of genomes.
    pub fn from_multisets(genomes : &[GenomeKmers]) -> Self {
        let vocabulary = Vocabulary::from_multisets(genomes);
        let rows : Vec<CountRow> = genomes.iter().map(|g| CountRow::from_kmers(g.get_kmers(), &vocabulary)).collect();
        let ids = genomes.iter().map(|g| g.get_id().to_string()).collect();
        if log::log_enabled!(log::Level::Debug) {
            let nb_stored : usize = rows.iter().map(|r| r.nb_distinct()).sum();
            log::debug!("count matrix : {} x {}, nb stored entries : {}", genomes.len(), vocabulary.len(), nb_stored);
        }
        CountMatrix{ids, rows, vocabulary}
    } // end of from_multisets

    pub fn nb_genomes(&self) -> usize {
        self.ids.len()
    }

    pub fn get_genome_ids(&self) -> &[String] {
        &self.ids
    }

    pub fn get_row(&self, genome : usize) -> &CountRow {
        &self.rows[genome]
    }

    pub fn get_rows(&self) -> &[CountRow] {
        &self.rows
    }

    pub fn get_vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn get_genome_rank(&self, id : &str) -> Option<usize> {
        self.ids.iter().position(|g| g == id)
    }

    /// occurrences of kmer in genome, 0 for an unknown genome or kmer
    pub fn count(&self, id : &str, kmer : &KmerAA) -> u32 {
        match (self.get_genome_rank(id), self.vocabulary.get_column(kmer)) {
            (Some(rank), Some(column)) => self.rows[rank].get(column),
            _ => 0,
        }
    }

    pub fn total(&self, id : &str) -> Option<u64> {
        self.get_genome_rank(id).map(|rank| self.rows[rank].get_total())
    }

    /// total count of each vocabulary kmer over all genomes, indexed by column
    pub fn kmer_frequencies(&self) -> Vec<u64> {
        let mut freqs = vec![0u64; self.vocabulary.len()];
        for row in &self.rows {
            for (column, count) in row.get_entries() {
                freqs[*column as usize] += *count as u64;
            }
        }
        freqs
    }
} // end of impl CountMatrix



// end of mod tests
