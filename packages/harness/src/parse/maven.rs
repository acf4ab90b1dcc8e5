//! Maven surefire/failsafe per-class summaries.
//!
//! Surefire reports counts per test class rather than per method, so results
//! are keyed by fully qualified class name.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::lines;
use crate::result::{Tally, TestStatus};

/// `Tests run: 2, Failures: 1, Errors: 0, Skipped: 0, Time elapsed: 0.05 s <<< FAILURE! - in com.example.CalcTest`
///
/// Surefire 3 prints `-- in` instead of `- in`.
static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Tests run:\s*(?<run>\d+),\s*Failures:\s*(?<failures>\d+),\s*Errors:\s*(?<errors>\d+),\s*Skipped:\s*(?<skipped>\d+).*?\s-+\s*in\s+(?<name>[\w.$]+)",
    )
    .expect("compile maven class regex")
});

pub fn parse(log: &str, tally: &mut Tally) {
    for line in lines(log) {
        let Some(captures) = CLASS.captures(line) else {
            continue;
        };

        let counts = ["run", "failures", "errors", "skipped"]
            .map(|group| captures[group].parse::<u64>().ok());
        let [Some(run), Some(failures), Some(errors), Some(skipped)] = counts else {
            tracing::warn!(line, "unreadable surefire counts");
            continue;
        };

        let status = if failures + errors > 0 {
            TestStatus::Fail
        } else if run == 0 {
            continue;
        } else if skipped >= run {
            TestStatus::Skip
        } else {
            TestStatus::Pass
        };
        tally.record(&captures["name"], status);
    }
}
