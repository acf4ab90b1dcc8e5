//! Python `unittest` verbose output, as printed by unittest itself, nose, and
//! Django's test runner.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::lines;
use crate::result::{Tally, TestStatus};

const STATUS: &str = r"ok|OK|FAIL|ERROR|skipped.*|expected failure|unexpected success";

/// `test_add (tests.test_math.MathTest.test_add) ... ok`
static RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?<name>.+?) \.\.\. (?<status>{STATUS})\s*$"))
        .expect("compile unittest result regex")
});

/// `FAIL: test_div (tests.test_math.MathTest.test_div)`
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<status>FAIL|ERROR): (?<name>.+?)\s*$").expect("compile unittest header regex")
});

/// A test whose output was interleaved before its status was printed.
static PENDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<name>.+?) \.\.\. ").expect("compile unittest pending regex")
});

/// The status of a pending test, alone on its own line.
static BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?<status>{STATUS})\s*$")).expect("compile unittest bare regex")
});

fn status(word: &str) -> TestStatus {
    match word {
        "ok" | "OK" => TestStatus::Pass,
        "expected failure" => TestStatus::Skip,
        word if word.starts_with("skipped") => TestStatus::Skip,
        _ => TestStatus::Fail,
    }
}

pub fn parse(log: &str, tally: &mut Tally) {
    let mut pending: Option<String> = None;

    for line in lines(log) {
        let line = line.trim_end();

        if let Some(captures) = RESULT.captures(line) {
            tally.record(&captures["name"], status(&captures["status"]));
            pending = None;
        } else if let Some(captures) = HEADER.captures(line) {
            tally.record(&captures["name"], status(&captures["status"]));
        } else if let Some(captures) = PENDING.captures(line) {
            pending = Some(captures["name"].to_string());
        } else if let Some(captures) = BARE.captures(line.trim_start())
            && let Some(name) = pending.take()
        {
            tally.record(name, status(&captures["status"]));
        }
    }
}
