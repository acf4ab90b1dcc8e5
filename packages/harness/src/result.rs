//! Canonical test results, and the accumulator that log parsers feed.
//!
//! Every parser reduces a console log to a [`TestResult`]: three disjoint sets
//! of test names (passed, failed, skipped) plus their counts. Parsers rarely
//! see each test exactly once; a test can be reported in a verbose listing and
//! again in a summary, or rerun after a flaky failure. [`Tally`] resolves
//! those repeated observations according to a [`Precedence`] policy.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

use color_eyre::eyre::{Report, bail};
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

/// The status of a single test in a single test run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// The test ran and passed.
    Pass,

    /// The test ran and failed, or errored.
    Fail,

    /// The test was skipped, ignored, or marked as an expected failure.
    Skip,
}

derive_display_from_serialize!(TestStatus);
derive_fromstr_from_deserialize!(TestStatus);

impl TestStatus {
    /// Rank used by [`Precedence::FailWins`]: fail > pass > skip.
    fn rank(self) -> u8 {
        match self {
            TestStatus::Fail => 2,
            TestStatus::Pass => 1,
            TestStatus::Skip => 0,
        }
    }
}

/// How to resolve a test that is observed more than once in the same log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// The most recent observation replaces earlier ones.
    LastWins,

    /// The first observation sticks; later ones are ignored.
    FirstWins,

    /// A failure overrides a pass, and a pass overrides a skip.
    #[default]
    FailWins,
}

derive_display_from_serialize!(Precedence);
derive_fromstr_from_deserialize!(Precedence);

/// Accumulates test observations while a log is parsed.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    precedence: Precedence,
    statuses: BTreeMap<String, TestStatus>,
}

impl Tally {
    /// Create an empty tally that resolves repeats with `precedence`.
    pub fn new(precedence: Precedence) -> Self {
        Self {
            precedence,
            statuses: BTreeMap::new(),
        }
    }

    /// Record that `name` was observed with `status`.
    ///
    /// Names are trimmed; blank names are ignored.
    pub fn record(&mut self, name: impl AsRef<str>, status: TestStatus) {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return;
        }

        match self.statuses.get_mut(name) {
            None => {
                self.statuses.insert(name.to_string(), status);
            }
            Some(existing) => match self.precedence {
                Precedence::LastWins => *existing = status,
                Precedence::FirstWins => {}
                Precedence::FailWins => {
                    if status.rank() > existing.rank() {
                        *existing = status;
                    }
                }
            },
        }
    }

    /// The status currently recorded for `name`, if any.
    pub fn get(&self, name: &str) -> Option<TestStatus> {
        self.statuses.get(name).copied()
    }

    /// Number of distinct tests observed so far.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Whether no test has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Finish accumulation and produce the result.
    pub fn finish(self) -> TestResult {
        TestResult::from_statuses(self.statuses)
    }
}

/// The canonical outcome of parsing one test-run log.
///
/// The three sets are always pairwise disjoint, and the serialized counts
/// always equal the sizes of the sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTestResult", into = "RawTestResult")]
pub struct TestResult {
    passed: BTreeSet<String>,
    failed: BTreeSet<String>,
    skipped: BTreeSet<String>,
}

impl TestResult {
    /// Build a result from a map of final statuses.
    pub fn from_statuses(statuses: impl IntoIterator<Item = (String, TestStatus)>) -> Self {
        let mut result = Self::default();
        for (name, status) in statuses {
            match status {
                TestStatus::Pass => result.passed.insert(name),
                TestStatus::Fail => result.failed.insert(name),
                TestStatus::Skip => result.skipped.insert(name),
            };
        }
        result
    }

    /// Build a result from possibly overlapping name sets.
    ///
    /// Overlaps resolve with [`Precedence::FailWins`].
    pub fn from_sets<S: AsRef<str>>(
        passed: impl IntoIterator<Item = S>,
        failed: impl IntoIterator<Item = S>,
        skipped: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut tally = Tally::new(Precedence::FailWins);
        for name in passed {
            tally.record(name, TestStatus::Pass);
        }
        for name in failed {
            tally.record(name, TestStatus::Fail);
        }
        for name in skipped {
            tally.record(name, TestStatus::Skip);
        }
        tally.finish()
    }

    pub fn passed(&self) -> &BTreeSet<String> {
        &self.passed
    }

    pub fn failed(&self) -> &BTreeSet<String> {
        &self.failed
    }

    pub fn skipped(&self) -> &BTreeSet<String> {
        &self.skipped
    }

    pub fn passed_count(&self) -> usize {
        self.passed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Total number of distinct tests in the result.
    pub fn all_count(&self) -> usize {
        self.passed.len() + self.failed.len() + self.skipped.len()
    }

    /// Whether the log contained no recognizable tests at all.
    pub fn is_empty(&self) -> bool {
        self.all_count() == 0
    }

    /// The status of `name` in this result, if it was observed.
    pub fn status_of(&self, name: &str) -> Option<TestStatus> {
        if self.failed.contains(name) {
            Some(TestStatus::Fail)
        } else if self.passed.contains(name) {
            Some(TestStatus::Pass)
        } else if self.skipped.contains(name) {
            Some(TestStatus::Skip)
        } else {
            None
        }
    }

    /// Every test name in the result, with its status.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TestStatus)> {
        let passed = self.passed.iter().map(|n| (n.as_str(), TestStatus::Pass));
        let failed = self.failed.iter().map(|n| (n.as_str(), TestStatus::Fail));
        let skipped = self.skipped.iter().map(|n| (n.as_str(), TestStatus::Skip));
        passed.chain(failed).chain(skipped)
    }

    /// Every test name in the result.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(name, _)| name)
    }
}

impl Display for TestResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "passed: {}, failed: {}, skipped: {}",
            self.passed_count(),
            self.failed_count(),
            self.skipped_count()
        )
    }
}

/// Wire shape of a [`TestResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTestResult {
    passed_count: usize,
    failed_count: usize,
    skipped_count: usize,
    passed_tests: BTreeSet<String>,
    failed_tests: BTreeSet<String>,
    skipped_tests: BTreeSet<String>,
}

impl From<TestResult> for RawTestResult {
    fn from(result: TestResult) -> Self {
        Self {
            passed_count: result.passed.len(),
            failed_count: result.failed.len(),
            skipped_count: result.skipped.len(),
            passed_tests: result.passed,
            failed_tests: result.failed,
            skipped_tests: result.skipped,
        }
    }
}

impl TryFrom<RawTestResult> for TestResult {
    type Error = Report;

    fn try_from(raw: RawTestResult) -> Result<Self, Self::Error> {
        let counts = [
            ("passed", raw.passed_count, raw.passed_tests.len()),
            ("failed", raw.failed_count, raw.failed_tests.len()),
            ("skipped", raw.skipped_count, raw.skipped_tests.len()),
        ];
        for (kind, count, len) in counts {
            if count != len {
                bail!("{kind}_count is {count} but {kind}_tests has {len} entries");
            }
        }

        if let Some(name) = raw
            .passed_tests
            .iter()
            .chain(raw.skipped_tests.iter())
            .find(|name| raw.failed_tests.contains(*name))
        {
            bail!("test {name:?} is listed as failed and as another status");
        }
        if let Some(name) = raw
            .passed_tests
            .intersection(&raw.skipped_tests)
            .next()
        {
            bail!("test {name:?} is listed as both passed and skipped");
        }

        Ok(Self {
            passed: raw.passed_tests,
            failed: raw.failed_tests,
            skipped: raw.skipped_tests,
        })
    }
}
