//! CTest console output.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::lines;
use crate::result::{Tally, TestStatus};

/// `2/3 Test #2: test_parse .......................***Failed    0.01 sec`
static RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*\d+/\d+\s+Test\s+#\d+:\s+(?<name>\S+)\s+\.*\s*\**(?<status>Passed|Failed|Skipped|Not Run|Exception|Timeout|SegFault)",
    )
    .expect("compile ctest result regex")
});

pub fn parse(log: &str, tally: &mut Tally) {
    for line in lines(log) {
        if let Some(captures) = RESULT.captures(line) {
            let status = match &captures["status"] {
                "Passed" => TestStatus::Pass,
                "Skipped" | "Not Run" => TestStatus::Skip,
                _ => TestStatus::Fail,
            };
            tally.record(&captures["name"], status);
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq as pretty_assert_eq;

    use super::*;
    use crate::result::{Precedence, TestResult};

    #[test]
    fn test_ctest_run() {
        let log = indoc! {"
            Test project /home/libfoo/build
                Start 1: test_basic
            1/5 Test #1: test_basic .......................   Passed    0.01 sec
                Start 2: test_parse
            2/5 Test #2: test_parse .......................***Failed    0.02 sec
            3/5 Test #3: test_gpu .........................***Not Run (Disabled)   0.00 sec
            4/5 Test #4: test_crash .......................***Exception: SegFault  0.10 sec
            5/5 Test #5: test_slow ........................***Timeout  60.00 sec

            40% tests passed, 3 tests failed out of 5

            The following tests FAILED:
            \t  2 - test_parse (Failed)
        "};

        let mut tally = Tally::new(Precedence::FailWins);
        parse(log, &mut tally);
        let result: TestResult = tally.finish();

        pretty_assert_eq!(
            result.passed().iter().collect::<Vec<_>>(),
            ["test_basic"]
        );
        pretty_assert_eq!(
            result.failed().iter().collect::<Vec<_>>(),
            ["test_crash", "test_parse", "test_slow"]
        );
        pretty_assert_eq!(
            result.skipped().iter().collect::<Vec<_>>(),
            ["test_gpu"]
        );
    }
}
