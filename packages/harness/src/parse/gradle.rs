//! Gradle test logging.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::lines;
use crate::result::{Tally, TestStatus};

/// `com.example.AppTest > testAdd() PASSED`
static RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?<name>[\w.$]+(?:\s+>\s+.+?)+)\s+(?<status>PASSED|FAILED|SKIPPED)\s*$")
        .expect("compile gradle result regex")
});

pub fn parse(log: &str, tally: &mut Tally) {
    for line in lines(log) {
        if let Some(captures) = RESULT.captures(line) {
            let status = match &captures["status"] {
                "PASSED" => TestStatus::Pass,
                "SKIPPED" => TestStatus::Skip,
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
    fn test_test_events() {
        let log = indoc! {"
            > Task :app:test

            com.example.AppTest > testAdd() PASSED

            com.example.AppTest > testDivide() FAILED
                java.lang.ArithmeticException at AppTest.java:22

            com.example.AppTest > testIgnored() SKIPPED

            com.example.ParamTest > squares(int) > [1] 2 PASSED

            4 tests completed, 1 failed, 1 skipped

            > Task :app:test FAILED
        "};

        let mut tally = Tally::new(Precedence::FailWins);
        parse(log, &mut tally);
        let result: TestResult = tally.finish();

        pretty_assert_eq!(
            result.passed().iter().collect::<Vec<_>>(),
            [
                "com.example.AppTest > testAdd()",
                "com.example.ParamTest > squares(int) > [1] 2"
            ]
        );
        pretty_assert_eq!(
            result.failed().iter().collect::<Vec<_>>(),
            ["com.example.AppTest > testDivide()"]
        );
        pretty_assert_eq!(
            result.skipped().iter().collect::<Vec<_>>(),
            ["com.example.AppTest > testIgnored()"]
        );
    }
}
