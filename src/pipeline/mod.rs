//! The kaai pipeline : genomes are promoted through protein prediction, marker search and
//! kmer extraction, then their kmers are merged in a count matrix.
//!
//! Stages are run one after the other, each on all genomes still in the run.

use std::path::{Path, PathBuf};

pub mod stage;

pub use stage::*;

use crate::aa::counts::CountMatrix;
use crate::aa::kmers::{extract_all_kmers, extract_marker_kmers, read_marker_hits, GenomeKmers};
use crate::errors::{KaaiError, Result};
use crate::tools::{GenePredictor, MarkerSearcher};
use crate::utils::files::{genomes_from_input, hits_path, proteins_path, remove_file_quiet, Genome, GenomeSource};
use crate::utils::parameters::{InputFiles, InputKind, KaaiParams};


pub const STAGE_PREDICT : &str = "predict proteins";
pub const STAGE_SEARCH : &str = "search markers";
pub const STAGE_EXTRACT : &str = "extract kmers";


/// a genome left out of the final matrix
#[derive(Clone, Debug)]
pub struct Exclusion {
    pub genome : String,
    pub stage : String,
    pub reason : String,
}


/// What a run produces before distances are computed
pub struct RunResult {
    /// kmers of retained genomes, in input order
    pub kmers : Vec<GenomeKmers>,
    pub counts : CountMatrix,
    pub excluded : Vec<Exclusion>,
}


pub struct Pipeline<'a> {
    params : &'a KaaiParams,
    predictor : Option<&'a dyn GenePredictor>,
    searcher : Option<&'a dyn MarkerSearcher>,
}


impl <'a> Pipeline<'a> {

    pub fn new(params : &'a KaaiParams, predictor : Option<&'a dyn GenePredictor>, searcher : Option<&'a dyn MarkerSearcher>) -> Self {
        Pipeline{params, predictor, searcher}
    }

    /// every collaborator the input needs must be there before anything runs
    pub fn check_tools(&self, input : &InputFiles) -> Result<()> {
        if input.get_kind() == InputKind::Genomes && self.predictor.is_none() {
            return Err(KaaiError::InvalidParameter("a gene predictor is needed to start from genomes".to_string()));
        }
        if input.needs_marker_search() && !self.params.all_proteins() && self.searcher.is_none() {
            return Err(KaaiError::MissingModel);
        }
        Ok(())
    }

    // Closes a stage. A strict run stops at the first stage with a failure, after removing
    // what the run created for every genome. promoted gives the genome carried by a stage output.
    fn close_stage<O, P>(&self, report : StageReport<O>, promoted : P, excluded : &mut Vec<Exclusion>) -> Result<Vec<O>>
            where P : Fn(&O) -> Option<&Genome> {
        let strict = self.params.is_strict();
        if strict && !report.get_failed().is_empty() && !self.params.keep_intermediates() {
            for (genome, output) in report.get_succeeded() {
                genome.remove_intermediates();
                if let Some(created) = promoted(output) {
                    created.remove_intermediates();
                }
            }
            for failure in report.get_failed() {
                failure.genome.remove_intermediates();
            }
        }
        let stage = report.get_stage().to_string();
        let (ok, failed) = report.into_result(strict)?;
        self.exclude(failed, &stage, excluded);
        Ok(ok.into_iter().map(|(_, output)| output).collect())
    } // end of close_stage

    // collects exclusions, removing what the run created for failed genomes
    fn exclude(&self, failures : Vec<StageFailure>, stage : &str, excluded : &mut Vec<Exclusion>) {
        for failure in failures {
            if !self.params.keep_intermediates() {
                failure.genome.remove_intermediates();
            }
            excluded.push(Exclusion{genome : failure.genome.get_id().to_string(), stage : stage.to_string(), reason : failure.error.to_string()});
        }
    }

    // a collaborator failing may leave a partial output, removed if it was not there before
    fn run_collaborator<F>(&self, expected : &Path, task : F) -> Result<PathBuf>
            where F : FnOnce() -> Result<PathBuf> {
        let existed = expected.exists();
        let res = task();
        if res.is_err() && !existed && !self.params.keep_intermediates() {
            remove_file_quiet(expected);
        }
        res
    }

    fn predict(&self, genome : &Genome) -> Result<Genome> {
        match (genome.get_source(), self.predictor) {
            (GenomeSource::Sequence(sequence), Some(predictor)) => {
                let proteins = self.run_collaborator(&proteins_path(sequence), || predictor.predict(genome.get_id(), sequence))?;
                Ok(genome.clone().promote(GenomeSource::Proteins(proteins.clone()), proteins))
            }
            _ => Ok(genome.clone()),
        }
    }

    fn search(&self, genome : &Genome) -> Result<Genome> {
        match (genome.get_source(), self.searcher) {
            (GenomeSource::Proteins(proteins), Some(searcher)) => {
                let hits = self.run_collaborator(&hits_path(proteins), || searcher.search(genome.get_id(), proteins))?;
                let source = GenomeSource::MarkerHits{hits : hits.clone(), proteins : proteins.clone()};
                Ok(genome.clone().promote(source, hits))
            }
            _ => Ok(genome.clone()),
        }
    }

    fn extract(&self, genome : &Genome) -> Result<GenomeKmers> {
        let kmer_size = self.params.get_kmer_size();
        let id = genome.get_id();
        let res = match genome.get_source() {
            GenomeSource::MarkerHits{proteins, ..} if self.params.all_proteins() => extract_all_kmers(id, proteins, kmer_size),
            GenomeSource::Proteins(proteins) if self.params.all_proteins() => extract_all_kmers(id, proteins, kmer_size),
            GenomeSource::MarkerHits{hits, proteins} => {
                read_marker_hits(id, hits).and_then(|markers| extract_marker_kmers(id, proteins, &markers, kmer_size))
            }
            GenomeSource::Proteins(proteins) | GenomeSource::Sequence(proteins) => {
                Err(KaaiError::Parse{genome : id.to_string(), path : proteins.clone(), msg : "no marker search result for genome".to_string()})
            }
        };
        if !self.params.keep_intermediates() {
            genome.remove_intermediates();
        }
        res
    } // end of extract


    /// runs stages needed by input kind, then merges kmers of all retained genomes
    pub fn run(&self, input : &InputFiles) -> Result<RunResult> {
        self.check_tools(input)?;
        let genomes = genomes_from_input(input)?;
        let nb_threads = self.params.get_nb_threads();
        let mut excluded = Vec::<Exclusion>::new();
        //
        let genomes = if input.get_kind() == InputKind::Genomes {
            let report = run_stage(STAGE_PREDICT, nb_threads, genomes, |g| self.predict(g))?;
            self.close_stage(report, |g| Some(g), &mut excluded)?
        }
        else {
            genomes
        };
        //
        let genomes = if input.needs_marker_search() && !self.params.all_proteins() {
            let report = run_stage(STAGE_SEARCH, nb_threads, genomes, |g| self.search(g))?;
            self.close_stage(report, |g| Some(g), &mut excluded)?
        }
        else {
            genomes
        };
        //
        let report = run_stage(STAGE_EXTRACT, nb_threads, genomes, |g| self.extract(g))?;
        // extraction already removed what it could
        let kmers : Vec<GenomeKmers> = self.close_stage(report, |_| None, &mut excluded)?;
        //
        for genome in kmers.iter().filter(|g| g.is_empty()) {
            log::warn!("genome {} has no marker kmer", genome.get_id());
        }
        let counts = CountMatrix::from_multisets(&kmers);
        log::info!("nb genomes retained : {}, nb excluded : {}", kmers.len(), excluded.len());
        Ok(RunResult{kmers, counts, excluded})
    } // end of run

} // end of impl Pipeline



#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// writes a fixed protein file beside the genome, except for genomes named bad* (nothing written)
    /// and partial* (truncated file written, then failure)
    struct MockPredictor;

    impl GenePredictor for MockPredictor {
        fn name(&self) -> &str {
            "mock-predictor"
        }

        fn predict(&self, genome : &str, sequence : &Path) -> Result<PathBuf> {
            let output = crate::utils::files::proteins_path(sequence);
            if genome.starts_with("bad") {
                return Err(KaaiError::MissingToolOutput{genome : genome.to_string(), tool : self.name().to_string(), path : output});
            }
            if genome.starts_with("partial") {
                std::fs::write(&output, ">m1 marker\nMKV").unwrap();
                return Err(KaaiError::Parse{genome : genome.to_string(), path : output, msg : "truncated".to_string()});
            }
            std::fs::write(&output, ">m1 marker\nMKVLAAAA*\n>o1 other\nWWWWWWW\n").unwrap();
            Ok(output)
        }
    }

    /// declares the first protein a marker
    struct MockSearcher;

    impl MarkerSearcher for MockSearcher {
        fn name(&self) -> &str {
            "mock-searcher"
        }

        fn search(&self, _genome : &str, proteins : &Path) -> Result<PathBuf> {
            let output = crate::utils::files::hits_path(proteins);
            std::fs::write(&output, "# header\nm1 - model1 - 1e-10\n").unwrap();
            Ok(output)
        }
    }

    fn write_genomes(dir : &Path, names : &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| {
            let path = dir.join(format!("{}.fna", n));
            std::fs::write(&path, ">c1\nACGT\n").unwrap();
            path
        }).collect()
    }

    #[test]
    fn test_from_genomes() {
        log_init_test();
        let dir = tempfile::tempdir().unwrap();
        let files = write_genomes(dir.path(), &["g1", "g2"]);
        let input = InputFiles::new(Some(files), None, None).unwrap();
        let params = KaaiParams::new(2, false, 4).unwrap();
        let pipeline = Pipeline::new(&params, Some(&MockPredictor), Some(&MockSearcher));
        let result = pipeline.run(&input).unwrap();
        assert!(result.excluded.is_empty());
        assert_eq!(result.counts.get_genome_ids(), &["g1".to_string(), "g2".to_string()]);
        // MKVLAAAA : 5 kmers, other protein not used
        assert_eq!(result.counts.total("g1"), Some(5));
        // intermediates removed
        assert!(!dir.path().join("g1.faa").exists());
        assert!(!dir.path().join("g1.hmm").exists());
        // inputs stay
        assert!(dir.path().join("g1.fna").exists());
    }

    #[test]
    fn test_failed_genome_excluded() {
        log_init_test();
        let dir = tempfile::tempdir().unwrap();
        let files = write_genomes(dir.path(), &["g1", "bad1", "g2"]);
        let input = InputFiles::new(Some(files), None, None).unwrap();
        let params = KaaiParams::new(1, true, 4).unwrap();
        let pipeline = Pipeline::new(&params, Some(&MockPredictor), Some(&MockSearcher));
        let result = pipeline.run(&input).unwrap();
        assert_eq!(result.counts.nb_genomes(), 2);
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(result.excluded[0].genome, "bad1");
        assert_eq!(result.excluded[0].stage, STAGE_PREDICT);
        // kept on request
        assert!(dir.path().join("g1.faa").exists());
        assert!(dir.path().join("g1.hmm").exists());
        // strict mode stops after the stage, naming the genome
        let params = KaaiParams::new(1, true, 4).unwrap().with_strict(true);
        let pipeline = Pipeline::new(&params, Some(&MockPredictor), Some(&MockSearcher));
        match pipeline.run(&input) {
            Err(KaaiError::StageFailed{genomes, ..}) => assert_eq!(genomes, vec!["bad1"]),
            _ => panic!("expected a stage failure"),
        }
    }

    #[test]
    fn test_partial_output_removed_on_failure() {
        log_init_test();
        let dir = tempfile::tempdir().unwrap();
        let files = write_genomes(dir.path(), &["g1", "partial1"]);
        let input = InputFiles::new(Some(files), None, None).unwrap();
        let params = KaaiParams::new(2, false, 4).unwrap();
        let pipeline = Pipeline::new(&params, Some(&MockPredictor), Some(&MockSearcher));
        let result = pipeline.run(&input).unwrap();
        assert_eq!(result.counts.get_genome_ids(), &["g1".to_string()]);
        assert_eq!(result.excluded[0].genome, "partial1");
        assert!(!dir.path().join("partial1.faa").exists());
        // kept on request, even truncated
        let params = KaaiParams::new(2, true, 4).unwrap();
        let pipeline = Pipeline::new(&params, Some(&MockPredictor), Some(&MockSearcher));
        let _ = pipeline.run(&input).unwrap();
        assert!(dir.path().join("partial1.faa").exists());
    }

    #[test]
    fn test_strict_failure_removes_created_files() {
        log_init_test();
        let dir = tempfile::tempdir().unwrap();
        let files = write_genomes(dir.path(), &["g1", "g2", "partial1"]);
        let input = InputFiles::new(Some(files), None, None).unwrap();
        let params = KaaiParams::new(2, false, 4).unwrap().with_strict(true);
        let pipeline = Pipeline::new(&params, Some(&MockPredictor), Some(&MockSearcher));
        assert!(matches!(pipeline.run(&input), Err(KaaiError::StageFailed{..})));
        for name in ["g1.faa", "g2.faa", "partial1.faa"] {
            assert!(!dir.path().join(name).exists(), "{} left behind", name);
        }
        assert!(dir.path().join("g1.fna").exists());
    }

    #[test]
    fn test_missing_model() {
        let input = InputFiles::new(None, Some(vec![PathBuf::from("p.faa")]), None).unwrap();
        let params = KaaiParams::default();
        let pipeline = Pipeline::new(&params, None, None);
        assert!(matches!(pipeline.run(&input), Err(KaaiError::MissingModel)));
    }

    #[test]
    fn test_all_proteins_skips_search() {
        let dir = tempfile::tempdir().unwrap();
        let faa = dir.path().join("p1.faa");
        std::fs::write(&faa, ">m1\nMKVLAAAA\n>o1\nWWWWWWW\n").unwrap();
        let input = InputFiles::new(None, Some(vec![faa.clone()]), None).unwrap();
        let params = KaaiParams::default().with_all_proteins(true);
        let pipeline = Pipeline::new(&params, None, None);
        let result = pipeline.run(&input).unwrap();
        assert_eq!(result.counts.total("p1"), Some(5 + 4));
        // user input is never removed
        assert!(faa.exists());
    }
} // end of mod tests
