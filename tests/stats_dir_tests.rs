//! Stats directory loading, end to end
//!
//! Builds small stats directories in a temp dir, the way a compiler run with
//! a stats output directory would leave them, and loads them through the
//! public entry points.

use jobstats::{
    decode_stats, list_stats_dir_profiles, load_stats_dir, load_stats_dir_report,
    merge_all_jobstats, DecodeOptions, EntryError, JobKind, LoadError, LoadOptions, LoaderConfig,
    NamingScheme, ScanOptions, StatValue,
};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

const FRONTEND_STATS: &str =
    "stats-1500000000000000-swift-frontend-Foo-main.swift-x86_64_apple_macosx10.9-o-Onone-5432.json";
const DRIVER_STATS: &str =
    "stats-1499999999000000-swift-driver-Foo-x86_64_apple_macosx10.9-Onone-5431.json";

#[test]
fn test_last_write_wins_example() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "t0.pid1.typecheck.Foo.swift",
        "AST.NumDecls 12\nAST.NumDecls 15\n",
    );

    let jobs = load_stats_dir(tmp.path(), &LoadOptions::default()).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind(), &JobKind::Typecheck);
    assert_eq!(jobs[0].module(), "Foo.swift");
    assert_eq!(jobs[0].counter("AST.NumDecls"), 15);
}

#[test]
fn test_one_good_file_one_unrecognized_name() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "t0.pid1.parse.Foo", "Parse.NumTokens 100\n");
    write(tmp.path(), "core.1234", "garbage\n");

    let report = load_stats_dir_report(tmp.path(), &LoadOptions::default()).unwrap();
    assert_eq!(report.stats.len(), 1);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        report.errors[0],
        EntryError::UnrecognizedFilename(_)
    ));
}

#[test]
fn test_unparseable_line_keeps_the_rest() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "t0.pid1.irgen.Foo",
        "IRGen.Functions 7\nIRGen.Globals oops\nIRGen.Types 3\ntime.irgen.wall 1.5ms\n",
    );

    let report = load_stats_dir_report(tmp.path(), &LoadOptions::default()).unwrap();
    assert!(report.errors.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].1.line_no, 2);

    let job = &report.stats[0];
    assert_eq!(job.counter("IRGen.Functions"), 7);
    assert_eq!(job.counter("IRGen.Types"), 3);
    assert_eq!(job.get("IRGen.Globals"), None);
    assert_eq!(job.timer("time.irgen.wall"), Duration::from_micros(1500));
    assert_eq!(job.duration(), Duration::from_micros(1500));
}

#[test]
fn test_truncated_json_from_crashed_job() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        FRONTEND_STATS,
        "{\n  \"AST.NumSourceLines\": 120,\n  \"Sema.NumTypesDeserialized\": 4",
    );

    let jobs = load_stats_dir(tmp.path(), &LoadOptions::default()).unwrap();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.kind(), &JobKind::Frontend);
    assert_eq!(job.input(), Some("main.swift"));
    assert_eq!(job.pid(), 5432);
    assert_eq!(job.counter("AST.NumSourceLines"), 120);
    assert_eq!(job.counter("Sema.NumTypesDeserialized"), 4);
}

#[test]
fn test_driver_incrementality() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        DRIVER_STATS,
        r#"{"Driver.NumDriverJobsRun": 3, "Driver.NumDriverJobsSkipped": 1}"#,
    );
    write(tmp.path(), FRONTEND_STATS, r#"{"AST.NumSourceLines": 10}"#);

    let jobs = load_stats_dir(tmp.path(), &LoadOptions::default()).unwrap();
    assert_eq!(jobs.len(), 2);
    // Sorted by start time: the driver started first
    assert!(jobs[0].is_driver_job());
    assert_eq!(jobs[0].incrementality_pct(), Some(75.0));
    assert_eq!(jobs[1].incrementality_pct(), None);
}

#[test]
fn test_decoding_is_idempotent() {
    let contents = b"A 1\nB 2\ntime.x 3ms\nbroken\n";
    let path = Path::new("t0.pid1.optimize.M");
    let opts = DecodeOptions::default();
    let first = decode_stats(path, contents, &opts).unwrap();
    let second = decode_stats(path, contents, &opts).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.value.get("time.x"),
        Some(StatValue::Timer(Duration::from_millis(3)))
    );
}

#[test]
fn test_merge_example_through_directory() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "t0.pid1.parse.A", "A 3\n");
    write(tmp.path(), "t1.pid2.parse.B", "A 4\nB 2\n");

    let jobs = load_stats_dir(tmp.path(), &LoadOptions::default()).unwrap();
    let merged = merge_all_jobstats(&jobs);
    assert_eq!(merged.jobs(), 2);
    assert_eq!(merged.counter("A"), 7);
    assert_eq!(merged.counter_presence("A"), 2);
    assert_eq!(merged.counter("B"), 2);
    assert_eq!(merged.counter_presence("B"), 1);
}

#[test]
fn test_empty_directory() {
    let tmp = TempDir::new().unwrap();
    let jobs = load_stats_dir(tmp.path(), &LoadOptions::default()).unwrap();
    assert!(jobs.is_empty());
    let merged = merge_all_jobstats(&jobs);
    assert_eq!(merged.jobs(), 0);
    assert!(merged.is_empty());
}

#[test]
fn test_fatal_root_conditions() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("t0.pid1.parse.A");
    fs::write(&file, "A 1\n").unwrap();

    assert!(matches!(
        load_stats_dir(&tmp.path().join("missing"), &LoadOptions::default()),
        Err(LoadError::NotFound(_))
    ));
    assert!(matches!(
        load_stats_dir(&file, &LoadOptions::default()),
        Err(LoadError::NotADirectory(_))
    ));
}

#[test]
fn test_profiles_listed_lazily_and_decoded_on_demand() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "t0.pid1.typecheck.Foo", "A 1\n");
    write(
        tmp.path(),
        "profile.t0.pid1.typecheck.Foo",
        "swift::TypeChecker::check 5 20\nmain 1 40\n",
    );
    write(tmp.path(), "profile.t3.pid4.irgen.Foo", "bad line\n");

    let listed = list_stats_dir_profiles(tmp.path(), &LoadOptions::default()).unwrap();
    assert_eq!(listed.len(), 2);

    let scan = ScanOptions::default();
    let good = listed.iter().find(|p| p.id().pid == 1).unwrap();
    let profs = good.load_profile(&scan).unwrap().value;
    assert_eq!(profs.entries().len(), 2);
    assert_eq!(profs.entries()[0].symbol, "swift::TypeChecker::check");

    let bad = listed.iter().find(|p| p.id().pid == 4).unwrap();
    assert!(matches!(
        bad.load_profile(&scan),
        Err(EntryError::MalformedProfileFile { .. })
    ));
}

#[test]
fn test_recursive_build_tree_config() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("target-a");
    fs::create_dir(&nested).unwrap();
    write(tmp.path(), "t0.pid1.parse.A", "A 1\ntime.parse 2ms\n");
    write(&nested, "t1.pid2.parse.B", "A 2\n");

    let flat = load_stats_dir(tmp.path(), &LoadOptions::default()).unwrap();
    assert_eq!(flat.len(), 1);

    let config = LoaderConfig::build_tree();
    let jobs = load_stats_dir(tmp.path(), &config.load_options()).unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(merge_all_jobstats(&jobs).counter("A"), 3);
    assert!(jobs.iter().all(|j| j.timers().next().is_none()));
}

#[test]
fn test_strict_scheme_ignores_other_grammar() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "t0.pid1.parse.A", "A 1\n");
    write(tmp.path(), FRONTEND_STATS, r#"{"A": 2}"#);

    let mut opts = LoadOptions::default();
    opts.scan.decode.scheme = NamingScheme::SwiftV1;
    let report = load_stats_dir_report(tmp.path(), &opts).unwrap();
    assert_eq!(report.stats.len(), 1);
    assert_eq!(report.stats[0].counter("A"), 2);
    assert_eq!(report.errors.len(), 1);
}

#[test]
fn test_oversized_file_is_an_entry_error() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "t0.pid1.parse.A", &"A 1\n".repeat(100));
    write(tmp.path(), "t1.pid2.parse.B", "A 1\n");

    let mut opts = LoadOptions::default();
    opts.scan.max_file_bytes = 64;
    let report = load_stats_dir_report(tmp.path(), &opts).unwrap();
    assert_eq!(report.stats.len(), 1);
    assert_eq!(report.stats[0].pid(), 2);
    assert!(matches!(
        report.errors[0],
        EntryError::MalformedStatsFile { .. }
    ));
}

#[test]
#[cfg(unix)]
fn test_special_files_fail_fast() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "t0.pid1.parse.A", "A 1\n");
    let status = std::process::Command::new("mkfifo")
        .arg(tmp.path().join("t1.pid2.parse.B"))
        .status()
        .unwrap();
    assert!(status.success());
    let linked = tmp.path().join("linked");
    fs::create_dir(&linked).unwrap();
    std::os::unix::fs::symlink(&linked, tmp.path().join("t2.pid3.parse.C")).unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let root = tmp.path().to_path_buf();
    std::thread::spawn(move || {
        let _ = tx.send(load_stats_dir_report(&root, &LoadOptions::default()));
    });
    let report = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("load blocked on a special file")
        .unwrap();

    assert_eq!(report.stats.len(), 1);
    assert_eq!(report.errors.len(), 2);
    assert!(report
        .errors
        .iter()
        .all(|e| matches!(e, EntryError::MalformedStatsFile { .. })));
}
