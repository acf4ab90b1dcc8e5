//! CLI subcommand smoke tests.

use std::fs::{read_to_string, write};

use pretty_assertions::assert_eq as pretty_assert_eq;

use crate::{flask_pr, run_harness};

#[test]
fn test_list() {
    let (exit_code, stdout, stderr) = run_harness(&["list"]);

    pretty_assert_eq!(exit_code, 0, "list should exit 0: {stderr}");
    assert!(stdout.contains("pallets/flask"), "got: {stdout}");
    assert!(stdout.contains("redis/redis"), "got: {stdout}");
}

#[test]
fn test_list_filters_language() {
    let (exit_code, stdout, _stderr) = run_harness(&["list", "--language", "go", "--verbose"]);

    pretty_assert_eq!(exit_code, 0);
    assert!(stdout.contains("spf13/cobra"), "got: {stdout}");
    assert!(stdout.contains("go test -v"), "verbose should show commands, got: {stdout}");
    assert!(!stdout.contains("pallets/flask"), "got: {stdout}");
}

#[test]
fn test_parse_with_format() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("run.log");
    write(
        &log,
        "--- PASS: TestAdd (0.00s)\n--- FAIL: TestSub (0.01s)\n--- SKIP: TestMul (0.00s)\n",
    )
    .unwrap();
    let log = log.to_string_lossy().to_string();

    let (exit_code, stdout, stderr) = run_harness(&["parse", "--log", &log, "--format", "go"]);
    pretty_assert_eq!(exit_code, 0, "parse should exit 0: {stderr}");

    let json = serde_json::from_str::<serde_json::Value>(&stdout).unwrap();
    pretty_assert_eq!(
        json,
        serde_json::json!({
            "passed_count": 1,
            "failed_count": 1,
            "skipped_count": 1,
            "passed_tests": ["TestAdd"],
            "failed_tests": ["TestSub"],
            "skipped_tests": ["TestMul"],
        })
    );
}

#[test]
fn test_parse_patterns_format_points_to_instance() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("run.log");
    write(&log, "[ok]: SET and GET an item (1 ms)\n").unwrap();
    let log = log.to_string_lossy().to_string();

    let (exit_code, _, stderr) = run_harness(&["parse", "--log", &log, "--format", "patterns"]);
    pretty_assert_eq!(exit_code, 2, "clap rejects the value: {stderr}");
    assert!(stderr.contains("--instance"), "got: {stderr}");
}

#[test]
fn test_parse_with_instance() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("fix.log");
    let dataset = dir.path().join("dataset.jsonl");
    write(&log, "tests/test_json.py::test_provider PASSED [100%]\n").unwrap();
    write(&dataset, format!("{}\n", flask_pr(5012))).unwrap();
    let log = log.to_string_lossy().to_string();
    let dataset = dataset.to_string_lossy().to_string();

    let (exit_code, stdout, stderr) = run_harness(&[
        "parse",
        "--log",
        &log,
        "--instance",
        "pallets/flask:pr-5012",
        "--dataset",
        &dataset,
    ]);
    pretty_assert_eq!(exit_code, 0, "parse should exit 0: {stderr}");
    assert!(stdout.contains("tests/test_json.py::test_provider"), "got: {stdout}");
}

#[test]
fn test_parse_requires_format_or_instance() {
    let (exit_code, _stdout, _stderr) = run_harness(&["parse", "--log", "whatever.log"]);
    assert_ne!(exit_code, 0);
}

#[test]
fn test_build_writes_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("dataset.jsonl");
    let output = dir.path().join("build");
    write(&dataset, format!("{}\n{}\n", flask_pr(5012), flask_pr(5013))).unwrap();
    let dataset_arg = dataset.to_string_lossy().to_string();
    let output_arg = output.to_string_lossy().to_string();

    let (exit_code, stdout, stderr) = run_harness(&[
        "build",
        "--dataset",
        &dataset_arg,
        "--output",
        &output_arg,
    ]);
    pretty_assert_eq!(exit_code, 0, "build should exit 0: {stderr}");
    assert!(stdout.contains("3 build contexts for 2 instances"), "got: {stdout}");

    let image = output.join("harness/pallets_m_flask");
    let base = read_to_string(image.join("base/Dockerfile")).unwrap();
    assert!(base.starts_with("FROM python:3.11-slim\n"), "got: {base}");

    let instance = read_to_string(image.join("pr-5012/Dockerfile")).unwrap();
    assert!(instance.starts_with("FROM harness/pallets_m_flask:base\n"), "got: {instance}");
    let prepare = read_to_string(image.join("pr-5012/prepare.sh")).unwrap();
    assert!(prepare.contains("git checkout 4a5c7b3"), "got: {prepare}");
}

#[test]
fn test_build_unknown_pr() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("dataset.jsonl");
    write(&dataset, format!("{}\n", flask_pr(5012))).unwrap();
    let dataset = dataset.to_string_lossy().to_string();

    let (exit_code, _stdout, stderr) = run_harness(&[
        "build",
        "--dataset",
        &dataset,
        "--pr",
        "pallets/flask:pr-1",
    ]);
    assert_ne!(exit_code, 0);
    assert!(stderr.contains("pallets/flask:pr-1"), "got: {stderr}");
}

#[test]
fn test_run_dry_run() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("dataset.jsonl");
    write(&dataset, format!("{}\n", flask_pr(5012))).unwrap();
    let dataset = dataset.to_string_lossy().to_string();
    let output = dir.path().join("out").to_string_lossy().to_string();

    let (exit_code, stdout, stderr) = run_harness(&[
        "run",
        "--dataset",
        &dataset,
        "--output",
        &output,
        "--dry-run",
    ]);
    pretty_assert_eq!(exit_code, 0, "dry run should exit 0: {stderr}");
    assert!(stdout.contains("build -t harness/pallets_m_flask:base"), "got: {stdout}");
    assert!(stdout.contains("bash /home/fix-run.sh"), "got: {stdout}");
}
