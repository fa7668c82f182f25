// KAAI v0.1.0
// Licensed under the MIT license (http://opensource.org/licenses/MIT).
// This file may not be copied, modified, or distributed except according to those terms.


//! kaai -g [genome files] | -p [protein files] | -s [hit tables] -o output [-t threads] [-k]
//!
//! -g : genome files, proteins are predicted (prodigal) then searched for marker genes (hmmsearch)
//!
//! -p : protein files, searched for marker genes
//!
//! -s : marker search tables (hmmsearch --tblout). Proteins are read from the file of same name with extension .faa
//!
//! Exactly one of -g, -p, -s must be given.
//!
//! --hmm : hmm database of single copy genes, mandatory with -g and -p
//!
//! -o : output prefix. Results are written in *output*.table (genome x genome Bray-Curtis dissimilarities)
//!      and *output*.out (one line per ordered pair of genomes)
//!
//! -t : number of threads of each stage, default to 1
//!
//! -k : keep predicted proteins and hit tables created by the run
//!
//! --kmer : kmer size, default to 4
//!
//! --strict : stop if any genome fails in a stage. By default failing genomes are excluded and reported.
//!
//! --fraction : also dump the fraction of shared kmers in *output*.fraction
//!
//! --freqstats : dump statistics on kmer frequencies in *output*.freqstats
//!
//! --allproteins : use kmers of all proteins, not only of marker genes (no marker search)


use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

// for logging (debug mostly, switched at compile time in cargo.toml)
use env_logger::Builder;

use kaai::diagnostics::FrequencyStats;
use kaai::distance::{shared_fractions, write_shared_fractions, DistanceMatrix, SharedKmerSets};
use kaai::pipeline::Pipeline;
use kaai::tools::{GenePredictor, HmmSearch, MarkerSearcher, Prodigal};
use kaai::utils::*;


// install a logger facility
pub fn init_log() -> u64 {
    Builder::from_default_env().init();
    println!("\n ************** initializing logger *****************\n");
    1
}


fn get_paths(matches : &ArgMatches, name : &str) -> Option<Vec<PathBuf>> {
    matches.get_many::<PathBuf>(name).map(|values| values.cloned().collect())
}


fn run(matches : &ArgMatches) -> anyhow::Result<()> {
    // all preconditions are checked before any stage runs
    let input = InputFiles::new(
        get_paths(matches, "genomes"),
        get_paths(matches, "proteins"),
        get_paths(matches, "scg_hmm"),
    )?;
    let nb_threads = *matches.get_one::<usize>("threads").unwrap_or(&1);
    let kmer_size = *matches.get_one::<usize>("kmer").unwrap_or(&DEFAULT_KMER_SIZE);
    let params = KaaiParams::new(nb_threads, matches.get_flag("keep"), kmer_size)?
            .with_strict(matches.get_flag("strict"))
            .with_all_proteins(matches.get_flag("allproteins"))
            .with_shared_fraction(matches.get_flag("fraction"))
            .with_freq_stats(matches.get_flag("freqstats"));
    //
    let output = matches.get_one::<PathBuf>("output").context("output prefix is mandatory")?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            anyhow::bail!("output directory {:?} does not exist", parent);
        }
    }
    //
    let tool_params = ToolParams {
        predictor_bin : matches.get_one::<String>("prodigal").cloned().unwrap_or_else(|| ToolParams::default().predictor_bin),
        searcher_bin : matches.get_one::<String>("hmmsearch").cloned().unwrap_or_else(|| ToolParams::default().searcher_bin),
        marker_model : matches.get_one::<PathBuf>("hmm").cloned(),
    };
    if let Some(model) = &tool_params.marker_model {
        if !model.is_file() {
            anyhow::bail!("marker gene model database {:?} not found", model);
        }
    }
    let prodigal = Prodigal::new(&tool_params.predictor_bin);
    let hmmsearch = tool_params.marker_model.as_ref().map(|m| HmmSearch::new(&tool_params.searcher_bin, m));
    let predictor : Option<&dyn GenePredictor> = Some(&prodigal);
    let searcher : Option<&dyn MarkerSearcher> = hmmsearch.as_ref().map(|h| h as &dyn MarkerSearcher);
    //
    let pipeline = Pipeline::new(&params, predictor, searcher);
    pipeline.check_tools(&input)?;
    params.dump_json(&output_path(output, "parameters.json"))?;
    //
    let result = pipeline.run(&input)?;
    for exclusion in &result.excluded {
        println!("genome {} excluded at stage {} : {}", exclusion.genome, exclusion.stage, exclusion.reason);
    }
    //
    if result.counts.nb_genomes() == 0 {
        log::warn!("no genome retained, outputs will be empty");
        println!("no genome retained");
    }
    let distances = DistanceMatrix::bray_curtis(&result.counts, params.get_nb_threads())?;
    distances.write_table(&output_path(output, "table"))?;
    distances.write_pairs(&output_path(output, "out"))?;
    //
    if params.shared_fraction() {
        let sets = Arc::new(SharedKmerSets::new(&result.kmers));
        let fractions = shared_fractions(sets, params.get_nb_threads())?;
        write_shared_fractions(&fractions, &output_path(output, "fraction"))?;
    }
    if params.freq_stats() {
        FrequencyStats::from_counts(&result.counts).dump(&output_path(output, "freqstats"))?;
    }
    println!("nb genomes compared : {}, nb excluded : {}", result.counts.nb_genomes(), result.excluded.len());
    Ok(())
} // end of run



fn build_cli() -> Command {
    Command::new("kaai")
        .version("0.1.0")
        .about("Average amino acid identity from kmers of single copy marker genes, Bray-Curtis dissimilarity between genomes")
        .arg_required_else_help(true)
        .arg(Arg::new("genomes")
            .short('g')
            .long("genomes")
            .help("List of input genomes. Implies protein prediction and marker search")
            .num_args(1..)
            .value_parser(value_parser!(PathBuf)))
        .arg(Arg::new("proteins")
            .short('p')
            .long("proteins")
            .help("List of input protein files. Implies marker search")
            .num_args(1..)
            .value_parser(value_parser!(PathBuf)))
        .arg(Arg::new("scg_hmm")
            .short('s')
            .long("scg_hmm")
            .help("List of marker search results (hmmsearch --tblout)")
            .num_args(1..)
            .value_parser(value_parser!(PathBuf)))
        .arg(Arg::new("output")
            .short('o')
            .long("output")
            .value_name("OUTPUT")
            .help("Output prefix")
            .required(true)
            .value_parser(value_parser!(PathBuf)))
        .arg(Arg::new("threads")
            .short('t')
            .long("threads")
            .help("Number of threads to use, by default 1")
            .default_value("1")
            .value_parser(value_parser!(usize)))
        .arg(Arg::new("keep")
            .short('k')
            .long("keep")
            .help("Keep intermediate files")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("hmm")
            .long("hmm")
            .value_name("MODEL")
            .help("hmm database of single copy genes")
            .value_parser(value_parser!(PathBuf)))
        .arg(Arg::new("kmer")
            .long("kmer")
            .help("kmer size, at most 8")
            .default_value("4")
            .value_parser(value_parser!(usize)))
        .arg(Arg::new("strict")
            .long("strict")
            .help("Fail if any genome fails in a stage")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("fraction")
            .long("fraction")
            .help("Also compute the fraction of shared kmers")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("freqstats")
            .long("freqstats")
            .help("Dump statistics on kmer frequencies")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("allproteins")
            .long("allproteins")
            .help("Use kmers of all proteins instead of marker genes")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("prodigal")
            .long("prodigal")
            .value_name("BIN")
            .help("gene predictor executable, default prodigal"))
        .arg(Arg::new("hmmsearch")
            .long("hmmsearch")
            .value_name("BIN")
            .help("marker search executable, default hmmsearch"))
}


fn main() {
    let _ = init_log();
    let start_t = chrono::Local::now();
    log::info!("\n kaai begins at time:{:#?} \n ", start_t);
    //
    let matches = build_cli().get_matches();
    //
    let status = match run(&matches) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("kaai failed : {:#}", e);
            eprintln!("kaai : {:#}", e);
            1
        }
    };
    //
    let end_t = chrono::Local::now();
    log::info!("\n kaai ends at time:{:#?}, elapsed : {} s \n ", end_t, (end_t - start_t).num_seconds());
    std::process::exit(status);
} // end of main



// end of mod tests
