//! libtest output from `cargo test`.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::lines;
use crate::result::{Tally, TestStatus};

static RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^test (?<name>.+?) \.\.\. (?<status>ok|FAILED|ignored(?:,.*)?)\s*$")
        .expect("compile cargo result regex")
});

/// A test that printed to stdout before libtest printed its status.
static PENDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^test (?<name>.+?) \.\.\. (?<rest>.*)$").expect("compile cargo pending regex")
});

static BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(?<status>ok|FAILED|ignored)\s*$").expect("compile cargo bare regex")
});

fn status(word: &str) -> TestStatus {
    match word {
        "ok" => TestStatus::Pass,
        "FAILED" => TestStatus::Fail,
        _ => TestStatus::Skip,
    }
}

pub fn parse(log: &str, tally: &mut Tally) {
    let mut pending: Option<String> = None;

    for line in lines(log) {
        let line = line.trim_start();

        if let Some(captures) = RESULT.captures(line) {
            tally.record(&captures["name"], status(&captures["status"]));
            pending = None;
        } else if let Some(captures) = PENDING.captures(line) {
            pending = if captures["rest"].starts_with("bench:") {
                None
            } else {
                Some(captures["name"].to_string())
            };
        } else if pending.is_some()
            && let Some(captures) = BARE.captures(line)
            && let Some(name) = pending.take()
        {
            tally.record(name, status(&captures["status"]));
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq as pretty_assert_eq;

    use super::*;
    use crate::result::{Precedence, TestResult};

    fn run(log: &str) -> TestResult {
        let mut tally = Tally::new(Precedence::FailWins);
        parse(log, &mut tally);
        tally.finish()
    }

    #[test]
    fn test_libtest_output() {
        let log = indoc! {"
                 Running unittests src/lib.rs (target/debug/deps/calc-1234)

            running 6 tests
            test tests::it_works ... ok
            test tests::it_fails ... FAILED
            test tests::slow ... ignored
            test tests::needs_network ... ignored, requires network access
            test tests::chatty ... hello from the test
            ok
            test bench_add ... bench:          12 ns/iter (+/- 1)

            failures:

            ---- tests::it_fails stdout ----
            thread 'tests::it_fails' panicked at src/lib.rs:20:9

            failures:
                tests::it_fails

            test result: FAILED. 2 passed; 1 failed; 2 ignored; 0 measured; 0 filtered out

               Doc-tests calc

            running 1 test
            test src/lib.rs - add (line 5) ... ok
        "};

        let result = run(log);
        pretty_assert_eq!(
            result.passed().iter().collect::<Vec<_>>(),
            [
                "src/lib.rs - add (line 5)",
                "tests::chatty",
                "tests::it_works"
            ]
        );
        pretty_assert_eq!(
            result.failed().iter().collect::<Vec<_>>(),
            ["tests::it_fails"]
        );
        pretty_assert_eq!(
            result.skipped().iter().collect::<Vec<_>>(),
            ["tests::needs_network", "tests::slow"]
        );
    }

    #[test]
    fn test_same_name_in_two_binaries() {
        let log = indoc! {"
            test tests::shared ... ok
            test tests::shared ... FAILED
        "};

        let result = run(log);
        assert!(result.failed().contains("tests::shared"));
        pretty_assert_eq!(result.passed_count(), 0);
    }
}
