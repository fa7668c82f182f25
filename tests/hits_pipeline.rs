//! runs the pipeline from marker search tables already on disk, then distances and outputs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kaai::diagnostics::FrequencyStats;
use kaai::distance::{shared_fractions, DistanceMatrix, SharedKmerSets};
use kaai::pipeline::Pipeline;
use kaai::utils::*;
use kaai::KaaiError;


fn log_init_test() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// writes dir/name.faa and dir/name.hmm, returns the hit table path
fn write_genome(dir : &Path, name : &str, proteins : &[(&str, &str)], hits : &[&str]) -> PathBuf {
    let mut faa = String::new();
    for (id, seq) in proteins {
        faa.push_str(&format!(">{} # 1 # 300 # 1 # ID=1\n{}\n", id, seq));
    }
    std::fs::write(dir.join(format!("{}.faa", name)), faa).unwrap();
    let mut table = String::from("# target name        accession  query name\n#------\n");
    for id in hits {
        table.push_str(&format!("{}  -  Ribosomal_L2  PF00181.18  1.2e-30  100.2\n", id));
    }
    let hits_path = dir.join(format!("{}.hmm", name));
    std::fs::write(&hits_path, table).unwrap();
    hits_path
}


#[test]
fn test_distances_from_hit_tables() {
    log_init_test();
    let dir = tempfile::tempdir().unwrap();
    // A : AAAA x2, BBBB x1 ; B : AAAA, CCCC ; C : disjoint ; N : no marker hit
    let a = write_genome(dir.path(), "A", &[("a1", "AAAA*"), ("a2", "AAAA"), ("a3", "BBBB"), ("a4", "CCCCCC")], &["a1", "a2", "a3"]);
    let b = write_genome(dir.path(), "B", &[("b1", "AAAA"), ("b2", "CCCC")], &["b1", "b2"]);
    let c = write_genome(dir.path(), "C", &[("c1", "WWWWY")], &["c1"]);
    let n = write_genome(dir.path(), "N", &[("n1", "AAAAAAAA")], &[]);
    //
    let input = InputFiles::new(None, None, Some(vec![a, b, c, n])).unwrap();
    let params = KaaiParams::new(2, false, 4).unwrap();
    let pipeline = Pipeline::new(&params, None, None);
    let result = pipeline.run(&input).unwrap();
    assert!(result.excluded.is_empty());
    assert_eq!(result.counts.get_genome_ids(), &["A", "B", "C", "N"].map(String::from));
    assert_eq!(result.counts.total("A"), Some(3));
    assert_eq!(result.counts.total("N"), Some(0));
    //
    let distances = DistanceMatrix::bray_curtis(&result.counts, 2).unwrap();
    assert!((distances.get_by_id("A", "B").unwrap() - 0.6).abs() < 1.0e-12);
    assert_eq!(distances.get_by_id("A", "C"), Some(1.));
    assert_eq!(distances.get_by_id("N", "A"), Some(1.));
    assert_eq!(distances.get_by_id("N", "N"), Some(0.));
    //
    let prefix = dir.path().join("kaai_res");
    distances.write_table(&output_path(&prefix, "table")).unwrap();
    distances.write_pairs(&output_path(&prefix, "out")).unwrap();
    let table = std::fs::read_to_string(output_path(&prefix, "table")).unwrap();
    let mut lines = table.lines();
    assert_eq!(lines.next(), Some("\tA\tB\tC\tN"));
    assert_eq!(lines.next(), Some("A\t0.000000\t0.600000\t1.000000\t1.000000"));
    let pairs = std::fs::read_to_string(output_path(&prefix, "out")).unwrap();
    assert_eq!(pairs.lines().count(), 16);
    assert!(pairs.lines().any(|l| l == "B\tA\t0.600000"));
    // user given hit tables are still there
    assert!(dir.path().join("A.hmm").exists());
    //
    let fractions = shared_fractions(Arc::new(SharedKmerSets::new(&result.kmers)), 2).unwrap();
    let ab = fractions.iter().find(|f| f.query == "A" && f.target == "B").unwrap();
    assert_eq!((ab.intersection, ab.shorter), (1, 2));
}


#[test]
fn test_missing_proteins_excludes_genome() {
    log_init_test();
    let dir = tempfile::tempdir().unwrap();
    let a = write_genome(dir.path(), "A", &[("a1", "MKVLAA")], &["a1"]);
    let lost = dir.path().join("lost.hmm");
    std::fs::write(&lost, "x1 - m - 1e-5\n").unwrap();
    let input = InputFiles::new(None, None, Some(vec![a, lost])).unwrap();
    let params = KaaiParams::default();
    let result = Pipeline::new(&params, None, None).run(&input).unwrap();
    assert_eq!(result.counts.get_genome_ids(), &["A".to_string()]);
    assert_eq!(result.excluded.len(), 1);
    assert_eq!(result.excluded[0].genome, "lost");
}


#[test]
fn test_conflicting_inputs_run_nothing() {
    let res = InputFiles::new(None, Some(vec![PathBuf::from("A.faa")]), Some(vec![PathBuf::from("A.hmm")]));
    assert!(matches!(res, Err(KaaiError::ConflictingInputs(_))));
}


#[test]
fn test_run_side_outputs() {
    log_init_test();
    let dir = tempfile::tempdir().unwrap();
    let a = write_genome(dir.path(), "A", &[("a1", "AAAAC"), ("a2", "CCCC")], &["a1", "a2"]);
    let b = write_genome(dir.path(), "B", &[("b1", "AAAA")], &["b1"]);
    let input = InputFiles::new(None, None, Some(vec![a, b])).unwrap();
    let params = KaaiParams::new(1, false, 4).unwrap().with_freq_stats(true);
    let prefix = dir.path().join("kaai_res");
    // parameters are dumped beside the outputs and reload to the same run
    params.dump_json(&output_path(&prefix, "parameters.json")).unwrap();
    let reloaded = KaaiParams::reload_json(&output_path(&prefix, "parameters.json")).unwrap();
    assert!(reloaded.freq_stats());
    //
    let result = Pipeline::new(&reloaded, None, None).run(&input).unwrap();
    FrequencyStats::from_counts(&result.counts).dump(&output_path(&prefix, "freqstats")).unwrap();
    let stats = std::fs::read_to_string(output_path(&prefix, "freqstats")).unwrap();
    // AAAA, AAAC, CCCC
    assert_eq!(stats.lines().next(), Some("#nb_kmers\t3"));
}
