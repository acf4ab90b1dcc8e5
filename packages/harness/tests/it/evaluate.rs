//! Evaluating collected logs end to end.

use std::fs::{create_dir_all, read_to_string, write};

use harness::report::load_reports;
use pretty_assertions::assert_eq as pretty_assert_eq;

use crate::{flask_pr, run_harness};

#[test]
fn test_evaluate_and_summarize() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("dataset.jsonl");
    write(&dataset, format!("{}\n{}\n", flask_pr(5012), flask_pr(5013))).unwrap();

    let logs = dir.path().join("logs");
    let good = logs.join("pallets__flask-5012");
    create_dir_all(&good).unwrap();
    write(
        good.join("run.log"),
        "tests/test_json.py::test_dumps PASSED [100%]\n",
    )
    .unwrap();
    write(
        good.join("test.log"),
        "tests/test_json.py::test_dumps PASSED [ 50%]\ntests/test_json.py::test_provider FAILED [100%]\n",
    )
    .unwrap();
    write(
        good.join("fix.log"),
        "tests/test_json.py::test_dumps PASSED [ 50%]\ntests/test_json.py::test_provider PASSED [100%]\n",
    )
    .unwrap();
    // pr-5013 has no logs at all and must come out invalid.

    let reports = dir.path().join("reports.json");
    let dataset_arg = dataset.to_string_lossy().to_string();
    let logs_arg = logs.to_string_lossy().to_string();
    let reports_arg = reports.to_string_lossy().to_string();

    let (exit_code, stdout, stderr) = run_harness(&[
        "evaluate",
        "--dataset",
        &dataset_arg,
        "--logs",
        &logs_arg,
        "--output",
        &reports_arg,
    ]);
    pretty_assert_eq!(exit_code, 0, "evaluate should exit 0: {stderr}");
    assert!(stdout.contains("2 instances: 1 valid, 1 invalid, 1 resolved"), "got: {stdout}");

    let saved = load_reports(&reports).unwrap();
    pretty_assert_eq!(saved.len(), 2);
    assert!(saved[0].valid);
    assert!(saved[0].resolved);
    pretty_assert_eq!(
        saved[0].f2p_tests.keys().collect::<Vec<_>>(),
        ["tests/test_json.py::test_provider"]
    );
    pretty_assert_eq!(saved[0].p2p_tests.len(), 1);
    assert!(!saved[1].valid);

    let (exit_code, stdout, _stderr) =
        run_harness(&["summary", "--input", &reports_arg, "--format", "csv"]);
    pretty_assert_eq!(exit_code, 0);
    pretty_assert_eq!(
        stdout,
        "org,repo,total,valid,invalid,resolved,fixed_tests\npallets,flask,2,1,1,1,1\n"
    );

    let (exit_code, stdout, _stderr) =
        run_harness(&["summary", "--input", &reports_arg, "--format", "json"]);
    pretty_assert_eq!(exit_code, 0);
    let json = serde_json::from_str::<serde_json::Value>(&stdout).unwrap();
    pretty_assert_eq!(json["total"], 2);
    assert!(read_to_string(&reports).unwrap().contains("\"error_msg\""));
}
