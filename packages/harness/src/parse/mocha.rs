//! Mocha's `spec` reporter.
//!
//! Suites are printed as an indented tree; a test's full title is its suite
//! titles and its own title joined by spaces, the same way mocha's `grep`
//! sees it. Failures are listed as `N) title` in the tree and then again, in
//! a different shape, after the `N passing` summary; only the tree is read.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::{Outline, indent_of, lines};
use crate::result::{Tally, TestStatus};

const SEPARATOR: &str = " ";

static PASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:✓|✔|√)\s+(?<title>.+?)(?:\s+\(\d+(?:\.\d+)?\s*m?s\))?\s*$")
        .expect("compile mocha pass regex")
});

static FAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\)\s+(?<title>.+?)\s*$").expect("compile mocha fail regex")
});

static PENDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s+(?<title>.+?)\s*$").expect("compile mocha pending regex"));

static SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s+passing\b").expect("compile mocha summary regex"));

pub fn parse(log: &str, tally: &mut Tally) {
    let mut outline = Outline::default();
    let mut listing = true;

    for line in lines(log) {
        if line.trim().is_empty() {
            continue;
        }

        let indent = indent_of(line);

        if !listing {
            // Everything mocha prints after the summary is indented; an
            // unindented line means some other program ran, possibly
            // another mocha invocation.
            if indent == 0 {
                listing = true;
                outline.clear();
            }
            continue;
        }

        if SUMMARY.is_match(line) {
            listing = false;
            continue;
        }

        if let Some(captures) = PASS.captures(line) {
            tally.record(
                outline.path(indent, &captures["title"], SEPARATOR),
                TestStatus::Pass,
            );
        } else if let Some(captures) = FAIL.captures(line) {
            tally.record(
                outline.path(indent, &captures["title"], SEPARATOR),
                TestStatus::Fail,
            );
        } else if let Some(captures) = PENDING.captures(line) {
            tally.record(
                outline.path(indent, &captures["title"], SEPARATOR),
                TestStatus::Skip,
            );
        } else if indent > 0 {
            outline.enter(indent, line);
        } else {
            outline.clear();
        }
    }
}
