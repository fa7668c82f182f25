//! error types returned by the kaai pipeline.
//!
//! Errors tagged with a genome are recovered at stage level (the genome is excluded),
//! the others are fatal for the run and end up in the single handler of the binary.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::utils::parameters::InputKind;


#[derive(Error, Debug)]
pub enum KaaiError {
    #[error("no input provided, please provide genomes \"-g\", proteins \"-p\" or scg hmm searches \"-s\"")]
    NoInput,

    #[error("please provide only one input kind, got : {}", kinds_to_string(.0))]
    ConflictingInputs(Vec<InputKind>),

    #[error("invalid parameter : {0}")]
    InvalidParameter(String),

    #[error("genome identifier {0} appears more than once in input")]
    DuplicateGenome(String),

    #[error("a marker gene model database (--hmm) is required to search proteins")]
    MissingModel,

    #[error("genome {genome} : could not launch {tool} : {source}")]
    ToolLaunch{genome : String, tool : String, #[source] source : std::io::Error},

    #[error("genome {genome} : {tool} exited abnormally ({status})")]
    ToolFailed{genome : String, tool : String, status : ExitStatus},

    #[error("genome {genome} : {tool} produced no output file {path:?}")]
    MissingToolOutput{genome : String, tool : String, path : PathBuf},

    #[error("genome {genome} : cannot read {path:?} : {source}")]
    GenomeIo{genome : String, path : PathBuf, #[source] source : std::io::Error},

    #[error("genome {genome} : bad record in {path:?} : {msg}")]
    Parse{genome : String, path : PathBuf, msg : String},

    #[error("stage {stage} failed for genomes : {}", .genomes.join(", "))]
    StageFailed{stage : String, genomes : Vec<String>},

    #[error("cannot write output {path:?} : {source}")]
    Output{path : PathBuf, #[source] source : std::io::Error},

    #[error("could not build thread pool : {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
} // end of enum KaaiError


fn kinds_to_string(kinds : &[InputKind]) -> String {
    kinds.iter().map(|k| k.to_string()).collect::<Vec<String>>().join(" and ")
}


impl KaaiError {
    /// returns the genome the error is attached to, if it is a per genome error
    pub fn genome(&self) -> Option<&str> {
        match self {
            KaaiError::ToolLaunch{genome, ..} | KaaiError::ToolFailed{genome, ..} | KaaiError::MissingToolOutput{genome, ..}
                | KaaiError::GenomeIo{genome, ..} | KaaiError::Parse{genome, ..} => Some(genome.as_str()),
            _ => None,
        }
    }

    // csv writer errors end up as output errors
    pub(crate) fn from_csv(path : &std::path::Path, err : csv::Error) -> Self {
        let source = match err.into_kind() {
            csv::ErrorKind::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", other)),
        };
        KaaiError::Output{path : path.to_path_buf(), source}
    }
} // end of impl KaaiError


pub type Result<T> = std::result::Result<T, KaaiError>;



// end of mod tests
