//! runs one stage of work over all genomes with a dedicated thread pool.
//!
//! The call returns only when every genome is done. Outputs keep the input order,
//! failures are all collected, a failing genome never stops the others.

use std::time::SystemTime;

use cpu_time::ProcessTime;
use rayon::prelude::*;

use crate::errors::{KaaiError, Result};
use crate::utils::files::Genome;


/// a genome that failed in a stage, with the reason
#[derive(Debug)]
pub struct StageFailure {
    pub genome : Genome,
    pub error : KaaiError,
}


/// what came out of a stage
pub struct StageReport<O> {
    stage : String,
    /// in input order
    succeeded : Vec<(Genome, O)>,
    /// in input order
    failed : Vec<StageFailure>,
}


impl <O> StageReport<O> {

    pub fn get_stage(&self) -> &str {
        &self.stage
    }

    pub fn get_succeeded(&self) -> &[(Genome, O)] {
        &self.succeeded
    }

    pub fn get_failed(&self) -> &[StageFailure] {
        &self.failed
    }

    /// ids of failed genomes
    pub fn failed_ids(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.genome.get_id().to_string()).collect()
    }

    /// In strict mode any failure makes the stage fail, listing every failed genome.
    /// Otherwise failed genomes are logged as excluded and returned with the successes.
    pub fn into_result(self, strict : bool) -> Result<(Vec<(Genome, O)>, Vec<StageFailure>)> {
        if !self.failed.is_empty() {
            if strict {
                return Err(KaaiError::StageFailed{stage : self.stage.clone(), genomes : self.failed_ids()});
            }
            for failure in &self.failed {
                log::warn!("stage {} : genome {} excluded : {}", self.stage, failure.genome.get_id(), failure.error);
            }
        }
        Ok((self.succeeded, self.failed))
    }
} // end of impl StageReport



/// applies task to each genome with a pool of nb_threads threads (at least 1).
pub fn run_stage<O, F>(stage : &str, nb_threads : usize, genomes : Vec<Genome>, task : F) -> Result<StageReport<O>>
        where O : Send,
              F : Fn(&Genome) -> Result<O> + Sync {
    //
    let nb_threads = nb_threads.max(1);
    log::info!("stage {} : nb genomes {}, nb threads {}", stage, genomes.len(), nb_threads);
    let start_t = SystemTime::now();
    let cpu_start = ProcessTime::now();
    //
    let pool = rayon::ThreadPoolBuilder::new().num_threads(nb_threads)
            .thread_name(|i| format!("kaai-worker-{}", i))
            .build()?;
    // collect on an indexed parallel iterator keeps input order whatever the completion order
    let outcomes : Vec<(Genome, Result<O>)> = pool.install(|| {
        genomes.into_par_iter().map(|genome| {
            let res = task(&genome);
            (genome, res)
        }).collect()
    });
    //
    let mut succeeded = Vec::with_capacity(outcomes.len());
    let mut failed = Vec::new();
    for (genome, res) in outcomes {
        match res {
            Ok(output) => succeeded.push((genome, output)),
            Err(error) => {
                log::error!("stage {} : genome {} failed : {}", stage, genome.get_id(), error);
                failed.push(StageFailure{genome, error});
            }
        }
    }
    //
    let cpu_time = cpu_start.elapsed().as_secs_f32();
    let elapsed_t = start_t.elapsed().map(|d| d.as_secs_f32()).unwrap_or(0.);
    log::info!("stage {} done, nb ok : {}, nb failed : {}, cpu time(s) {:.2}, elapsed time(s) {:.2}",
            stage, succeeded.len(), failed.len(), cpu_time, elapsed_t);
    //
    Ok(StageReport{stage : stage.to_string(), succeeded, failed})
} // end of run_stage



#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use crate::utils::files::GenomeSource;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn genomes(n : usize) -> Vec<Genome> {
        (0..n).map(|i| Genome::new(format!("g{}", i), GenomeSource::Proteins(PathBuf::from(format!("g{}.faa", i))))).collect()
    }

    fn rank(genome : &Genome) -> usize {
        genome.get_id()[1..].parse::<usize>().unwrap()
    }

    #[test]
    fn test_order_is_kept() {
        log_init_test();
        // early items sleep longer so they complete last
        let report = run_stage("sleep", 4, genomes(8), |g| {
            std::thread::sleep(Duration::from_millis(10 * (8 - rank(g)) as u64));
            Ok(rank(g) * 10)
        }).unwrap();
        let outputs : Vec<usize> = report.get_succeeded().iter().map(|(_, o)| *o).collect();
        assert_eq!(outputs, vec![0, 10, 20, 30, 40, 50, 60, 70]);
        assert!(report.get_failed().is_empty());
    }

    #[test]
    fn test_all_failures_reported() {
        log_init_test();
        let task = |g : &Genome| {
            if rank(g) % 3 == 0 {
                Err(KaaiError::Parse{genome : g.get_id().to_string(), path : PathBuf::from("x"), msg : "bad".to_string()})
            }
            else {
                Ok(rank(g))
            }
        };
        let report = run_stage("fail", 0, genomes(7), task).unwrap();
        assert_eq!(report.failed_ids(), vec!["g0", "g3", "g6"]);
        assert_eq!(report.get_succeeded().len(), 4);
        match report.into_result(true) {
            Err(KaaiError::StageFailed{stage, genomes}) => {
                assert_eq!(stage, "fail");
                assert_eq!(genomes, vec!["g0", "g3", "g6"]);
            }
            _ => panic!("strict mode must fail"),
        }
        let report = run_stage("fail", 2, genomes(7), task).unwrap();
        let (ok, failed) = report.into_result(false).unwrap();
        assert_eq!(ok.len(), 4);
        assert_eq!(failed.len(), 3);
    }
} // end of mod tests
