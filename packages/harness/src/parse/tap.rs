//! Test Anything Protocol, as produced by node-tap, tape, `prove`, and
//! friends.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::lines;
use crate::result::{Tally, TestStatus};

/// `not ok 3 - handles errors # TODO not implemented`
static RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?<status>ok|not ok)\b(?:\s+(?<number>\d+))?(?:\s*-)?\s*(?<name>[^#]*?)\s*(?:#\s*(?<directive>\w+).*)?$")
        .expect("compile tap result regex")
});

pub fn parse(log: &str, tally: &mut Tally) {
    for line in lines(log) {
        let Some(captures) = RESULT.captures(line) else {
            continue;
        };

        let directive = captures.name("directive").map(|m| m.as_str());
        let skipped = directive.is_some_and(|d| {
            d.eq_ignore_ascii_case("skip") || d.eq_ignore_ascii_case("todo")
        });

        let status = if skipped {
            TestStatus::Skip
        } else if &captures["status"] == "ok" {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        };
        // The description is optional; fall back to the test number.
        let name = match &captures["name"] {
            "" => captures.name("number").map_or("", |m| m.as_str()),
            name => name,
        };
        tally.record(name, status);
    }
}
