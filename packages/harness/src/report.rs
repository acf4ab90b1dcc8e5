//! Reports comparing the three test runs of an instance.
//!
//! Each instance runs its tests three times: on the base commit (`run`), with
//! the test patch applied (`test`), and with both the test and fix patches
//! applied (`fix`). A [`Report`] follows every test across those runs and
//! decides whether the pull request makes a usable benchmark instance: at
//! least one test must go from not passing to passing, and nothing that
//! passed before the fix may fail after it.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{read_to_string, write};
use std::io::Write;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

use crate::pr::{PrId, PullRequest};
use crate::result::{TestResult, TestStatus};

/// One of the three test runs of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Base commit, no patches.
    Run,

    /// Test patch applied.
    Test,

    /// Test and fix patches applied.
    Fix,
}

derive_display_from_serialize!(Stage);
derive_fromstr_from_deserialize!(Stage);

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Run, Stage::Test, Stage::Fix];

    /// Name of the log file a stage's output is stored in.
    pub fn log_file(self) -> String {
        format!("{self}.log")
    }
}

/// The status of one test in each stage; `None` means the test was not
/// observed in that stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub run: Option<TestStatus>,
    pub test: Option<TestStatus>,
    pub fix: Option<TestStatus>,
}

impl Transition {
    fn fixed(&self) -> bool {
        self.fix == Some(TestStatus::Pass) && self.test != Some(TestStatus::Pass)
    }
}

/// The evaluation of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub org: String,
    pub repo: String,
    pub number: u64,

    /// Whether the instance is usable as a benchmark instance.
    pub valid: bool,

    /// Why the instance is invalid; empty when valid.
    #[serde(default)]
    pub error_msg: String,

    /// Whether every expected transition the pull request lists holds.
    #[serde(default)]
    pub resolved: bool,

    pub run_result: TestResult,
    pub test_patch_result: TestResult,
    pub fix_patch_result: TestResult,

    /// Passing in all three stages.
    pub p2p_tests: BTreeMap<String, Transition>,

    /// Failing with the test patch, passing with the fix.
    pub f2p_tests: BTreeMap<String, Transition>,

    /// Skipped with the test patch, passing with the fix.
    pub s2p_tests: BTreeMap<String, Transition>,

    /// Absent with the test patch, passing with the fix.
    pub n2p_tests: BTreeMap<String, Transition>,
}

impl Report {
    /// Compare the three stage results of `pr`.
    #[tracing::instrument(skip_all, fields(instance = %pr.id()))]
    pub fn new(pr: &PullRequest, run: TestResult, test: TestResult, fix: TestResult) -> Self {
        let names = run
            .names()
            .chain(test.names())
            .chain(fix.names())
            .map(String::from)
            .collect::<BTreeSet<_>>();

        let mut report = Self {
            org: pr.org.clone(),
            repo: pr.repo.clone(),
            number: pr.number,
            valid: false,
            error_msg: String::new(),
            resolved: false,
            p2p_tests: BTreeMap::new(),
            f2p_tests: BTreeMap::new(),
            s2p_tests: BTreeMap::new(),
            n2p_tests: BTreeMap::new(),
            run_result: run,
            test_patch_result: test,
            fix_patch_result: fix,
        };

        for name in names {
            let transition = report.transition(&name);
            let bucket = match (transition.run, transition.test, transition.fix) {
                (Some(TestStatus::Pass), Some(TestStatus::Pass), Some(TestStatus::Pass)) => {
                    &mut report.p2p_tests
                }
                (_, Some(TestStatus::Fail), Some(TestStatus::Pass)) => &mut report.f2p_tests,
                (_, Some(TestStatus::Skip), Some(TestStatus::Pass)) => &mut report.s2p_tests,
                (_, None, Some(TestStatus::Pass)) => &mut report.n2p_tests,
                _ => continue,
            };
            bucket.insert(name, transition);
        }

        match report.check() {
            Ok(()) => report.valid = true,
            Err(msg) => {
                tracing::debug!(%msg, "instance is invalid");
                report.error_msg = msg;
            }
        }
        report.resolved = report.resolves(pr);
        report
    }

    pub fn id(&self) -> PrId {
        PrId {
            org: self.org.clone(),
            repo: self.repo.clone(),
            number: self.number,
        }
    }

    /// The status of `name` in each stage.
    pub fn transition(&self, name: &str) -> Transition {
        Transition {
            run: self.run_result.status_of(name),
            test: self.test_patch_result.status_of(name),
            fix: self.fix_patch_result.status_of(name),
        }
    }

    /// Tests the fix turned into passing: f2p, s2p, and n2p together.
    pub fn fixed_tests(&self) -> BTreeMap<&str, Transition> {
        self.f2p_tests
            .iter()
            .chain(&self.s2p_tests)
            .chain(&self.n2p_tests)
            .map(|(name, transition)| (name.as_str(), *transition))
            .collect()
    }

    /// The first validity rule this report breaks, if any.
    fn check(&self) -> Result<(), String> {
        if self.fix_patch_result.is_empty() {
            return Err(String::from(
                "After applying the fix patch, no test results were captured",
            ));
        }

        for (name, status) in self.fix_patch_result.iter() {
            if status != TestStatus::Fail {
                continue;
            }
            if self.test_patch_result.status_of(name) == Some(TestStatus::Pass) {
                return Err(format!(
                    "Test passed after applying the test patch but failed after the fix patch: {name}"
                ));
            }
            if self.run_result.status_of(name) == Some(TestStatus::Pass) {
                return Err(format!(
                    "Test passed on the base commit but failed after the fix patch: {name}"
                ));
            }
        }

        if self.fixed_tests().is_empty() {
            return Err(String::from("No fix for any failed test"));
        }
        Ok(())
    }

    /// Whether the report confirms `pr`'s expected transitions.
    ///
    /// Every test listed in `fail_to_pass` or `pass_to_pass` must pass after
    /// the fix, and `fail_to_pass` tests must not already pass with only the
    /// test patch. Pull requests without expectations resolve when valid.
    pub fn resolves(&self, pr: &PullRequest) -> bool {
        self.valid && self.unresolved(pr).is_empty()
    }

    /// Expected tests whose observed transitions contradict `pr`.
    pub fn unresolved<'a>(&self, pr: &'a PullRequest) -> Vec<&'a str> {
        let f2p = pr.fail_to_pass.iter().filter(|name| {
            let transition = self.transition(name);
            !transition.fixed()
        });
        let p2p = pr.pass_to_pass.iter().filter(|name| {
            self.fix_patch_result.status_of(name) != Some(TestStatus::Pass)
        });
        f2p.chain(p2p).map(String::as_str).collect()
    }
}

/// Load reports written by [`save_reports`].
#[tracing::instrument]
pub fn load_reports(path: &Path) -> Result<Vec<Report>> {
    let content = read_to_string(path).with_context(|| format!("read reports: {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("parse reports: {path:?}"))
}

/// Save reports as pretty-printed JSON.
#[tracing::instrument(skip(reports))]
pub fn save_reports(path: &Path, reports: &[Report]) -> Result<()> {
    let content = serde_json::to_string_pretty(reports).context("serialize reports")?;
    write(path, content).with_context(|| format!("write reports: {path:?}"))
}

/// Per-repository totals in a [`Summary`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    pub org: String,
    pub repo: String,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub resolved: usize,
    pub fixed_tests: usize,
}

/// An instance that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invalid {
    pub id: String,
    pub error_msg: String,
}

/// Aggregated statistics over many reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub resolved: usize,
    pub repos: Vec<RepoStats>,
    pub invalid_instances: Vec<Invalid>,
}

impl Summary {
    pub fn from_reports(reports: &[Report]) -> Self {
        let mut repos = BTreeMap::<(&str, &str), RepoStats>::new();
        let mut invalid_instances = Vec::new();

        for report in reports {
            let stats = repos
                .entry((report.org.as_str(), report.repo.as_str()))
                .or_insert_with(|| RepoStats {
                    org: report.org.clone(),
                    repo: report.repo.clone(),
                    ..RepoStats::default()
                });
            stats.total += 1;
            if report.valid {
                stats.valid += 1;
                stats.fixed_tests += report.fixed_tests().len();
            } else {
                stats.invalid += 1;
                invalid_instances.push(Invalid {
                    id: report.id().to_string(),
                    error_msg: report.error_msg.clone(),
                });
            }
            if report.resolved {
                stats.resolved += 1;
            }
        }

        let repos = repos.into_values().collect::<Vec<_>>();
        Self {
            total: reports.len(),
            valid: repos.iter().map(|r| r.valid).sum(),
            invalid: repos.iter().map(|r| r.invalid).sum(),
            resolved: repos.iter().map(|r| r.resolved).sum(),
            repos,
            invalid_instances,
        }
    }

    /// Print the summary as markdown tables.
    pub fn print_markdown<W: Write>(&self, mut w: W) -> Result<()> {
        writeln!(w, "# Harness Evaluation Summary")?;
        writeln!(w)?;
        writeln!(
            w,
            "{} instances: {} valid, {} invalid, {} resolved",
            self.total, self.valid, self.invalid, self.resolved
        )?;
        writeln!(w)?;

        writeln!(w, "| Repository | Total | Valid | Invalid | Resolved | Fixed tests |")?;
        writeln!(w, "|------------|-------|-------|---------|----------|-------------|")?;
        for stats in &self.repos {
            writeln!(
                w,
                "| {}/{} | {} | {} | {} | {} | {} |",
                stats.org,
                stats.repo,
                stats.total,
                stats.valid,
                stats.invalid,
                stats.resolved,
                stats.fixed_tests
            )?;
        }

        if !self.invalid_instances.is_empty() {
            writeln!(w)?;
            writeln!(w, "## Invalid instances")?;
            writeln!(w)?;
            writeln!(w, "| Instance | Reason |")?;
            writeln!(w, "|----------|--------|")?;
            for invalid in &self.invalid_instances {
                writeln!(w, "| {} | {} |", invalid.id, invalid.error_msg.replace('|', "\\|"))?;
            }
        }

        Ok(())
    }

    /// Print per-repository rows as CSV.
    pub fn print_csv<W: Write>(&self, mut w: W) -> Result<()> {
        writeln!(w, "org,repo,total,valid,invalid,resolved,fixed_tests")?;
        for stats in &self.repos {
            writeln!(
                w,
                "{},{},{},{},{},{},{}",
                stats.org,
                stats.repo,
                stats.total,
                stats.valid,
                stats.invalid,
                stats.resolved,
                stats.fixed_tests
            )?;
        }
        Ok(())
    }

    /// Print the summary as pretty-printed JSON.
    pub fn print_json<W: Write>(&self, mut w: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut w, self).context("serialize summary")?;
        writeln!(w)?;
        Ok(())
    }
}
