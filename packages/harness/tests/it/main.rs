//! Integration tests for the `harness` binary and the shipped catalog.

mod catalog;
mod cli;
mod evaluate;

use std::path::{Path, PathBuf};

use xshell::{Shell, cmd};

/// The catalog shipped with the crate.
pub fn catalog_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("catalog")
}

/// Run the harness binary with the shipped catalog and return
/// (exit_code, stdout, stderr).
pub fn run_harness(args: &[&str]) -> (i32, String, String) {
    let sh = Shell::new().expect("create shell");
    let dir = tempfile::tempdir().expect("create temporary directory");
    sh.change_dir(dir.path());

    let bin = env!("CARGO_BIN_EXE_harness");
    let catalog = catalog_dir();
    let output = cmd!(sh, "{bin} {args...}")
        .env("HARNESS_CATALOG", &catalog)
        .env("HARNESS_LOG", "error")
        .ignore_status()
        .output()
        .expect("run harness");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (exit_code, stdout, stderr)
}

/// One dataset line for `pallets/flask`.
pub fn flask_pr(number: u64) -> String {
    serde_json::json!({
        "org": "pallets",
        "repo": "flask",
        "number": number,
        "title": "Fix JSON provider",
        "base": { "label": "pallets:main", "ref": "main", "sha": "4a5c7b3" },
        "fix_patch": "diff --git a/src/flask/json/provider.py b/src/flask/json/provider.py\n",
        "test_patch": "diff --git a/tests/test_json.py b/tests/test_json.py\n",
        "fail_to_pass": ["tests/test_json.py::test_provider"],
    })
    .to_string()
}
