//! Optional statistics on kmer frequencies of a run.
//!
//! For each vocabulary kmer we take its total count over all genomes, build an histogram
//! and fit an inverse gaussian law by maximum likelihood :
//!
//!  mu = mean(x),  1/lambda = mean(1/x - 1/mu),  variance = mu^3 / lambda
//!
//! Cut-off reported is 2 * standard deviation.
//! This does not enter distance computations.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::aa::counts::CountMatrix;
use crate::errors::{KaaiError, Result};

pub const NB_BINS : usize = 100;


#[derive(Clone, Debug, PartialEq)]
pub struct InverseGaussianFit {
    pub mean : f64,
    /// shape parameter, infinite when all frequencies are equal
    pub shape : f64,
}

impl InverseGaussianFit {
    /// None if no frequency is given
    pub fn from_frequencies(freqs : &[u64]) -> Option<Self> {
        if freqs.is_empty() {
            return None;
        }
        let n = freqs.len() as f64;
        let mean = freqs.iter().map(|f| *f as f64).sum::<f64>() / n;
        let inv_shape = freqs.iter().map(|f| 1. / *f as f64 - 1. / mean).sum::<f64>() / n;
        let shape = if inv_shape > 0. { 1. / inv_shape } else { f64::INFINITY };
        Some(InverseGaussianFit{mean, shape})
    }

    pub fn variance(&self) -> f64 {
        self.mean.powi(3) / self.shape
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
} // end of impl InverseGaussianFit


#[derive(Clone, Debug, PartialEq)]
pub struct HistogramBin {
    pub lower : f64,
    pub upper : f64,
    pub count : usize,
}


/// NB_BINS regular bins between min and max frequency, last bin closed
pub fn histogram(freqs : &[u64], nb_bins : usize) -> Vec<HistogramBin> {
    let (min, max) = match (freqs.iter().min(), freqs.iter().max()) {
        (Some(min), Some(max)) => (*min as f64, *max as f64),
        _ => return Vec::new(),
    };
    if min == max {
        return vec![HistogramBin{lower : min, upper : max, count : freqs.len()}];
    }
    let width = (max - min) / nb_bins as f64;
    let mut bins : Vec<HistogramBin> = (0..nb_bins)
            .map(|i| HistogramBin{lower : min + i as f64 * width, upper : min + (i + 1) as f64 * width, count : 0})
            .collect();
    for f in freqs {
        let slot = (((*f as f64 - min) / width) as usize).min(nb_bins - 1);
        bins[slot].count += 1;
    }
    bins
} // end of histogram


/// kmer frequency statistics of a run
pub struct FrequencyStats {
    pub nb_kmers : usize,
    pub fit : Option<InverseGaussianFit>,
    pub bins : Vec<HistogramBin>,
}


impl FrequencyStats {
    pub fn from_counts(counts : &CountMatrix) -> Self {
        let freqs = counts.kmer_frequencies();
        let fit = InverseGaussianFit::from_frequencies(&freqs);
        if let Some(fit) = &fit {
            log::info!("kmer frequencies : nb kmers {}, inverse gaussian mean {:.3e}, shape {:.3e}, variance {:.3e}, cut-off {:.3e}",
                    freqs.len(), fit.mean, fit.shape, fit.variance(), 2. * fit.std_dev());
        }
        FrequencyStats{nb_kmers : freqs.len(), fit, bins : histogram(&freqs, NB_BINS)}
    }

    pub fn dump(&self, path : &Path) -> Result<()> {
        log::info!("dumping kmer frequency statistics in {:?}", path);
        let file = File::create(path).map_err(|e| KaaiError::Output{path : path.to_path_buf(), source : e})?;
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').has_headers(false).flexible(true)
                .from_writer(BufWriter::new(file));
        let mut lines = vec![vec!["#nb_kmers".to_string(), self.nb_kmers.to_string()]];
        if let Some(fit) = &self.fit {
            lines.push(vec!["#mean".to_string(), format!("{:.6e}", fit.mean)]);
            lines.push(vec!["#shape".to_string(), format!("{:.6e}", fit.shape)]);
            lines.push(vec!["#variance".to_string(), format!("{:.6e}", fit.variance())]);
            lines.push(vec!["#cutoff".to_string(), format!("{:.6e}", 2. * fit.std_dev())]);
        }
        lines.push(vec!["lower".to_string(), "upper".to_string(), "count".to_string()]);
        for bin in &self.bins {
            lines.push(vec![format!("{:.3}", bin.lower), format!("{:.3}", bin.upper), bin.count.to_string()]);
        }
        for line in &lines {
            writer.write_record(line).map_err(|e| KaaiError::from_csv(path, e))?;
        }
        writer.flush().map_err(|e| KaaiError::Output{path : path.to_path_buf(), source : e})?;
        Ok(())
    } // end of dump
} // end of impl FrequencyStats



#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit() {
        let fit = InverseGaussianFit::from_frequencies(&[1, 1, 2, 4]).unwrap();
        assert!((fit.mean - 2.).abs() < 1.0e-12);
        // mean(1/x) = (1 + 1 + 0.5 + 0.25)/4 = 0.6875, minus 0.5
        assert!((fit.shape - 1. / 0.1875).abs() < 1.0e-9);
        assert!(fit.variance() > 0.);
        let flat = InverseGaussianFit::from_frequencies(&[3, 3, 3]).unwrap();
        assert_eq!(flat.variance(), 0.);
        assert!(InverseGaussianFit::from_frequencies(&[]).is_none());
    }

    #[test]
    fn test_histogram() {
        let freqs : Vec<u64> = (1..=200).collect();
        let bins = histogram(&freqs, 100);
        assert_eq!(bins.len(), 100);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 200);
        assert_eq!(bins[99].count, 2);
        let single = histogram(&[5, 5], 100);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].count, 2);
        assert!(histogram(&[], 100).is_empty());
    }

    #[test]
    fn test_dump() {
        use crate::aa::kmers::{GenomeKmers, KmerAA};
        let kmers = |ks : &[&str]| ks.iter().map(|k| KmerAA::new(k.as_bytes())).collect::<Vec<KmerAA>>();
        // totals : AAAA 3, CCCC 1
        let genomes = vec![GenomeKmers::new("a".to_string(), kmers(&["AAAA", "AAAA", "CCCC"])),
                GenomeKmers::new("b".to_string(), kmers(&["AAAA"]))];
        let stats = FrequencyStats::from_counts(&CountMatrix::from_multisets(&genomes));
        assert_eq!(stats.nb_kmers, 2);
        //
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("res.freqstats");
        stats.dump(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines : Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "#nb_kmers\t2");
        assert_eq!(lines[1], format!("#mean\t{:.6e}", 2.));
        assert!(lines.contains(&"lower\tupper\tcount"));
        // 4 fit lines, header, 100 bins
        assert_eq!(lines.len(), 1 + 4 + 1 + NB_BINS);
        assert_eq!(lines.last(), Some(&"2.980\t3.000\t1"));
        //
        assert!(matches!(stats.dump(Path::new("/nonexistent/dir/res.freqstats")), Err(KaaiError::Output{..})));
    }
} // end of mod tests
