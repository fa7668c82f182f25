//! external collaborators : gene prediction and marker gene search.
//!
//! Both tools are run as child processes, one per genome, each writing a named output file.
//! Only process failure and missing output are checked, the output content is read by next stage.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::errors::{KaaiError, Result};
use crate::utils::files::{hits_path, proteins_path, remove_file_quiet, scratch_path};


/// predicts proteins from a genome sequence file
pub trait GenePredictor : Send + Sync {
    fn name(&self) -> &str;
    /// returns the path of the protein file produced
    fn predict(&self, genome : &str, sequence : &Path) -> Result<PathBuf>;
}

/// searches proteins against the marker gene models
pub trait MarkerSearcher : Send + Sync {
    fn name(&self) -> &str;
    /// returns the path of the hit table produced
    fn search(&self, genome : &str, proteins : &Path) -> Result<PathBuf>;
}


// runs a command to completion, checks exit status and presence of output
fn run_tool(genome : &str, tool : &str, mut cmd : Command, output : &Path) -> Result<()> {
    log::debug!("genome {} : running {:?}", genome, cmd);
    let status = cmd.stdin(Stdio::null()).status()
            .map_err(|e| KaaiError::ToolLaunch{genome : genome.to_string(), tool : tool.to_string(), source : e})?;
    if !status.success() {
        return Err(KaaiError::ToolFailed{genome : genome.to_string(), tool : tool.to_string(), status});
    }
    if !output.exists() {
        return Err(KaaiError::MissingToolOutput{genome : genome.to_string(), tool : tool.to_string(), path : output.to_path_buf()});
    }
    Ok(())
} // end of run_tool

//==================================================================================

/// prodigal in metagenomic mode
pub struct Prodigal {
    bin : String,
}

impl Prodigal {
    pub fn new(bin : &str) -> Self {
        Prodigal{bin : bin.to_string()}
    }
}

impl GenePredictor for Prodigal {
    fn name(&self) -> &str {
        &self.bin
    }

    fn predict(&self, genome : &str, sequence : &Path) -> Result<PathBuf> {
        let output = proteins_path(sequence);
        let scratch = scratch_path(sequence);
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-i").arg(sequence)
            .arg("-a").arg(&output)
            .args(["-p", "meta", "-q"])
            .arg("-o").arg(&scratch);
        let res = run_tool(genome, &self.bin, cmd, &output);
        remove_file_quiet(&scratch);
        res.map(|_| output)
    }
} // end of impl GenePredictor for Prodigal

//==================================================================================

/// hmmsearch with gathering thresholds, one cpu per genome as genomes are run in parallel
pub struct HmmSearch {
    bin : String,
    model : PathBuf,
}

impl HmmSearch {
    pub fn new(bin : &str, model : &Path) -> Self {
        HmmSearch{bin : bin.to_string(), model : model.to_path_buf()}
    }
}

impl MarkerSearcher for HmmSearch {
    fn name(&self) -> &str {
        &self.bin
    }

    fn search(&self, genome : &str, proteins : &Path) -> Result<PathBuf> {
        let output = hits_path(proteins);
        let scratch = scratch_path(proteins);
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--tblout").arg(&output)
            .arg("-o").arg(&scratch)
            .args(["--cut_ga", "--cpu", "1"])
            .arg(&self.model)
            .arg(proteins);
        let res = run_tool(genome, &self.bin, cmd, &output);
        remove_file_quiet(&scratch);
        res.map(|_| output)
    }
} // end of impl MarkerSearcher for HmmSearch



// end of mod tests
