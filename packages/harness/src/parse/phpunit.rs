//! PHPUnit output.
//!
//! With `--testdox`, PHPUnit prints a header per test class followed by one
//! marked line per test. Without it, the only per-test signal is the
//! numbered list of failures and errors, which is read as well.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::lines;
use crate::result::{Tally, TestStatus};

/// `Calculator (Tests\Unit\Calculator)`
static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<title>\S.*?)\s+\((?<class>[\w\\]+)\)\s*$").expect("compile phpunit class regex")
});

/// ` ✔ Adds numbers`, optionally followed by a duration.
static TEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(?<mark>✔|✘|↩|∅|☢)\s+(?<title>.+?)(?:\s+\d+(?:\.\d+)?\s*ms)?\s*$")
        .expect("compile phpunit test regex")
});

/// `1) Tests\Unit\CalculatorTest::testDivide`
static PROBLEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\)\s+(?<name>[\w\\]+::\w+)").expect("compile phpunit problem regex")
});

pub fn parse(log: &str, tally: &mut Tally) {
    let mut class: Option<String> = None;

    for line in lines(log) {
        if let Some(captures) = TEST.captures(line) {
            let Some(class) = &class else {
                continue;
            };
            let status = match &captures["mark"] {
                "✔" | "☢" => TestStatus::Pass,
                "✘" => TestStatus::Fail,
                _ => TestStatus::Skip,
            };
            tally.record(format!("{class}::{}", &captures["title"]), status);
        } else if let Some(captures) = PROBLEM.captures(line) {
            tally.record(&captures["name"], TestStatus::Fail);
        } else if let Some(captures) = CLASS.captures(line) {
            class = Some(captures["class"].to_string());
        }
    }
}
