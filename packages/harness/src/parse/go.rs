//! `go test -v` output.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::lines;
use crate::result::{Tally, TestStatus};

/// `--- PASS: TestAdd (0.00s)`, indented for subtests.
static RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*--- (?<status>PASS|FAIL|SKIP): (?<name>\S+)(?:\s+\([\d.]+s\))?")
        .expect("compile go result regex")
});

/// A package whose tests never ran because it did not build.
static BUILD_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^FAIL\s+(?<package>\S+)\s+\[(?:build|setup) failed\]")
        .expect("compile go build failure regex")
});

pub fn parse(log: &str, tally: &mut Tally) {
    for line in lines(log) {
        if let Some(captures) = RESULT.captures(line) {
            let status = match &captures["status"] {
                "PASS" => TestStatus::Pass,
                "SKIP" => TestStatus::Skip,
                _ => TestStatus::Fail,
            };
            tally.record(&captures["name"], status);
        } else if let Some(captures) = BUILD_FAILED.captures(line) {
            tally.record(&captures["package"], TestStatus::Fail);
        }
    }
}
