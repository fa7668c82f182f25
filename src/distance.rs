//! pairwise genome dissimilarities from kmer counts.
//!
//! Bray-Curtis between genomes A and B :
//!
//!    d(A,B) = 1 - 2 * sum_k min(count_A(k), count_B(k)) / (total_A + total_B)
//!
//! Two genomes without any kmer are at distance 0, an empty genome is at distance 1 from any other.
//!
//! The shared kmer fraction |A ∩ B| / min(|A|, |B|) on deduplicated kmer sets is available as
//! a secondary similarity.


use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use fxhash::FxHashSet;
use rayon::prelude::*;

use crate::aa::counts::{CountMatrix, CountRow};
use crate::aa::kmers::{GenomeKmers, KmerAA};
use crate::errors::{KaaiError, Result};


/// Bray-Curtis dissimilarity between 2 sparse rows.
pub fn bray_curtis(row_a : &CountRow, row_b : &CountRow) -> f64 {
    let sum_total = row_a.get_total() + row_b.get_total();
    if sum_total == 0 {
        return 0.;
    }
    // rows are sorted by column, merge them
    let (a, b) = (row_a.get_entries(), row_b.get_entries());
    let (mut i, mut j) = (0, 0);
    let mut shared : u64 = 0;
    while i < a.len() && j < b.len() {
        if a[i].0 == b[j].0 {
            shared += a[i].1.min(b[j].1) as u64;
            i += 1;
            j += 1;
        }
        else if a[i].0 < b[j].0 {
            i += 1;
        }
        else {
            j += 1;
        }
    }
    1. - (2 * shared) as f64 / sum_total as f64
} // end of bray_curtis



fn create_output(path : &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path).map_err(|e| KaaiError::Output{path : path.to_path_buf(), source : e})?;
    let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_writer(BufWriter::new(file));
    Ok(writer)
}

//==================================================================================

/// symmetric genome x genome dissimilarity matrix, rows in genome order of count matrix
pub struct DistanceMatrix {
    ids : Vec<String>,
    /// row major, nb_genomes * nb_genomes
    values : Vec<f64>,
}


impl DistanceMatrix {

    /// computes all pairs (self pairs included) with a pool of nb_threads
    pub fn bray_curtis(counts : &CountMatrix, nb_threads : usize) -> Result<Self> {
        let nb_genomes = counts.nb_genomes();
        log::info!("computing bray-curtis distances, nb genomes : {}", nb_genomes);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(nb_threads.max(1)).build()?;
        let rows = counts.get_rows();
        // upper triangle, diagonal included, one task per row
        let upper : Vec<Vec<f64>> = pool.install(|| {
            (0..nb_genomes).into_par_iter()
                .map(|i| (i..nb_genomes).map(|j| bray_curtis(&rows[i], &rows[j])).collect())
                .collect()
        });
        let mut values = vec![0f64; nb_genomes * nb_genomes];
        for (i, row) in upper.iter().enumerate() {
            for (offset, d) in row.iter().enumerate() {
                let j = i + offset;
                values[i * nb_genomes + j] = *d;
                values[j * nb_genomes + i] = *d;
            }
        }
        Ok(DistanceMatrix{ids : counts.get_genome_ids().to_vec(), values})
    } // end of bray_curtis

    pub fn get_genome_ids(&self) -> &[String] {
        &self.ids
    }

    pub fn nb_genomes(&self) -> usize {
        self.ids.len()
    }

    pub fn get(&self, i : usize, j : usize) -> f64 {
        self.values[i * self.ids.len() + j]
    }

    pub fn get_by_id(&self, a : &str, b : &str) -> Option<f64> {
        let i = self.ids.iter().position(|g| g == a)?;
        let j = self.ids.iter().position(|g| g == b)?;
        Some(self.get(i, j))
    }

    /// tab separated table, genome ids as header row and first column
    pub fn write_table(&self, path : &Path) -> Result<()> {
        log::info!("writing distance table in {:?}", path);
        let mut writer = create_output(path)?;
        // no genome, no header : a lone empty cell would be quoted
        if !self.ids.is_empty() {
            let header = std::iter::once("").chain(self.ids.iter().map(|s| s.as_str()));
            writer.write_record(header).map_err(|e| KaaiError::from_csv(path, e))?;
        }
        for (i, id) in self.ids.iter().enumerate() {
            let mut record = Vec::<String>::with_capacity(self.ids.len() + 1);
            record.push(id.clone());
            record.extend((0..self.ids.len()).map(|j| format!("{:.6}", self.get(i, j))));
            writer.write_record(&record).map_err(|e| KaaiError::from_csv(path, e))?;
        }
        writer.flush().map_err(|e| KaaiError::Output{path : path.to_path_buf(), source : e})?;
        Ok(())
    } // end of write_table

    /// one line per ordered pair : genome_a genome_b distance
    pub fn write_pairs(&self, path : &Path) -> Result<()> {
        log::info!("writing distance pairs in {:?}", path);
        let mut writer = create_output(path)?;
        for (i, a) in self.ids.iter().enumerate() {
            for (j, b) in self.ids.iter().enumerate() {
                let d = format!("{:.6}", self.get(i, j));
                writer.write_record([a.as_str(), b.as_str(), d.as_str()]).map_err(|e| KaaiError::from_csv(path, e))?;
            }
        }
        writer.flush().map_err(|e| KaaiError::Output{path : path.to_path_buf(), source : e})?;
        Ok(())
    } // end of write_pairs
} // end of impl DistanceMatrix

//==================================================================================

/// deduplicated kmer sets of all genomes, shared read only by the workers
pub struct SharedKmerSets {
    ids : Vec<String>,
    sets : Vec<FxHashSet<KmerAA>>,
}

impl SharedKmerSets {
    pub fn new(genomes : &[GenomeKmers]) -> Self {
        let ids = genomes.iter().map(|g| g.get_id().to_string()).collect();
        let sets = genomes.iter().map(|g| g.get_kmers().iter().copied().collect()).collect();
        SharedKmerSets{ids, sets}
    }

    pub fn nb_genomes(&self) -> usize {
        self.ids.len()
    }
}


/// shared kmer fraction of a pair of genomes
#[derive(Clone, Debug, PartialEq)]
pub struct SharedFraction {
    pub query : String,
    pub target : String,
    /// number of distinct kmers in both genomes
    pub intersection : usize,
    /// size of smaller kmer set
    pub shorter : usize,
    /// intersection / shorter, 0 if shorter is 0
    pub fraction : f64,
}


/// all ordered pairs, query genomes dispatched to a pool of nb_threads
pub fn shared_fractions(sets : Arc<SharedKmerSets>, nb_threads : usize) -> Result<Vec<SharedFraction>> {
    let nb_genomes = sets.nb_genomes();
    log::info!("computing shared kmer fractions, nb genomes : {}", nb_genomes);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(nb_threads.max(1)).build()?;
    let by_query : Vec<Vec<SharedFraction>> = pool.install(|| {
        (0..nb_genomes).into_par_iter().map(|i| {
            let sets = Arc::clone(&sets);
            let query = &sets.sets[i];
            (0..nb_genomes).map(|j| {
                let target = &sets.sets[j];
                let (small, large) = if query.len() <= target.len() { (query, target) } else { (target, query) };
                let intersection = small.iter().filter(|k| large.contains(k)).count();
                let shorter = small.len();
                let fraction = if shorter > 0 { intersection as f64 / shorter as f64 } else { 0. };
                SharedFraction{query : sets.ids[i].clone(), target : sets.ids[j].clone(), intersection, shorter, fraction}
            }).collect()
        }).collect()
    });
    Ok(by_query.into_iter().flatten().collect())
} // end of shared_fractions


pub fn write_shared_fractions(fractions : &[SharedFraction], path : &Path) -> Result<()> {
    log::info!("writing shared kmer fractions in {:?}", path);
    let mut writer = create_output(path)?;
    for f in fractions {
        let record = [f.query.clone(), f.target.clone(), f.intersection.to_string(), f.shorter.to_string(), format!("{:.3}", f.fraction)];
        writer.write_record(&record).map_err(|e| KaaiError::from_csv(path, e))?;
    }
    writer.flush().map_err(|e| KaaiError::Output{path : path.to_path_buf(), source : e})?;
    Ok(())
}



// end of mod tests
