//! Jest reporter output.
//!
//! Jest prints one block per test file, headed by `PASS path` or `FAIL path`.
//! With `--verbose` the block lists `describe` titles as an indented tree and
//! marks each test with a symbol. Failures are repeated afterwards under
//! `● describe › test` headers, which are also the only per-test signal in
//! non-verbose mode.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::{Outline, indent_of, lines};
use crate::result::{Tally, TestStatus};

const SEPARATOR: &str = " › ";

static SUITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:PASS|FAIL)\s+\S+").expect("compile jest suite regex")
});

static TEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?<mark>✓|✔|√|✕|✗|×|○|✎)\s+(?<title>.+?)(?:\s+\(\d+(?:\.\d+)?\s*m?s\))?\s*$")
        .expect("compile jest test regex")
});

static FAILURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*●\s+(?<name>.+?)\s*$").expect("compile jest failure regex"));

static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:Tests|Test Suites|Snapshots|Time|Ran all test suites)\b")
        .expect("compile jest summary regex")
});

/// Failure headers that do not name a test.
const NOT_TESTS: [&str; 2] = ["Console", "Test suite failed to run"];

pub fn parse(log: &str, tally: &mut Tally) {
    let mut outline = Outline::default();
    let mut in_suite = false;

    for line in lines(log) {
        if line.trim().is_empty() {
            continue;
        }

        if SUITE.is_match(line) {
            in_suite = true;
            outline.clear();
            continue;
        }

        if let Some(captures) = FAILURE.captures(line) {
            in_suite = false;
            let name = &captures["name"];
            if !NOT_TESTS.iter().any(|prefix| name.starts_with(prefix)) {
                tally.record(name, TestStatus::Fail);
            }
            continue;
        }

        if SUMMARY.is_match(line) {
            in_suite = false;
            continue;
        }

        if !in_suite {
            continue;
        }

        let indent = indent_of(line);
        if let Some(captures) = TEST.captures(line) {
            let (status, title) = match &captures["mark"] {
                "✓" | "✔" | "√" => (TestStatus::Pass, &captures["title"]),
                "○" | "✎" => {
                    let title = &captures["title"];
                    let title = title
                        .strip_prefix("skipped ")
                        .or_else(|| title.strip_prefix("todo "))
                        .unwrap_or(title);
                    (TestStatus::Skip, title)
                }
                _ => (TestStatus::Fail, &captures["title"]),
            };
            tally.record(outline.path(indent, title, SEPARATOR), status);
        } else if indent > 0 {
            outline.enter(indent, line);
        }
    }
}
