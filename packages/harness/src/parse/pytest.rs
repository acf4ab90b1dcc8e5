//! pytest output, both the verbose listing and the `-rA` short summary.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::lines;
use crate::result::{Tally, TestStatus};

/// `tests/test_app.py::test_index PASSED    [ 20%]`
static VERBOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?<name>\S+::.*?)\s+(?<status>PASSED|FAILED|SKIPPED|ERROR|XFAIL|XPASS)(?:\s+\(.*?\))?(?:\s+\[\s*\d+%\])?\s*$",
    )
    .expect("compile pytest verbose regex")
});

/// `FAILED tests/test_app.py::test_login - AssertionError`, optionally
/// prefixed by an xdist worker and progress marker.
static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\[gw\d+\]\s+\[\s*\d+%\]\s+)?(?<status>PASSED|FAILED|SKIPPED|ERROR|XFAIL|XPASS)\s+(?<name>\S+::[^\s\[]+(?:\[.*?\])?)(?:\s+-\s+.*)?\s*$",
    )
    .expect("compile pytest summary regex")
});

fn status(word: &str) -> TestStatus {
    match word {
        "PASSED" | "XPASS" => TestStatus::Pass,
        "SKIPPED" | "XFAIL" => TestStatus::Skip,
        _ => TestStatus::Fail,
    }
}

pub fn parse(log: &str, tally: &mut Tally) {
    for line in lines(log) {
        let line = line.trim();
        let captures = SUMMARY.captures(line).or_else(|| VERBOSE.captures(line));
        if let Some(captures) = captures {
            tally.record(&captures["name"], status(&captures["status"]));
        }
    }
}
