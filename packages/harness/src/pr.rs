//! Pull requests: the unit of work the harness builds images for.

use std::fmt::{self, Display, Formatter};
use std::fs::read_to_string;
use std::path::Path;
use std::str::FromStr;

use bon::Builder;
use color_eyre::{
    Result, Section, SectionExt,
    eyre::{Context, Report, eyre},
};
use serde::{Deserialize, Serialize};

/// A pull request against one of the catalog repositories.
///
/// Datasets store one of these per line of a JSONL file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[non_exhaustive]
pub struct PullRequest {
    /// Owner of the repository, e.g. `pallets`.
    #[builder(into)]
    pub org: String,

    /// Name of the repository, e.g. `flask`.
    #[builder(into)]
    pub repo: String,

    /// Pull request number.
    pub number: u64,

    #[builder(into, default)]
    #[serde(default)]
    pub title: String,

    #[builder(into, default)]
    #[serde(default)]
    pub body: String,

    /// The commit the pull request was opened against.
    pub base: Base,

    /// The non-test part of the pull request's diff.
    #[builder(into)]
    pub fix_patch: String,

    /// The test part of the pull request's diff.
    #[builder(into)]
    pub test_patch: String,

    /// Tests the fix is known to turn from failing to passing.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fail_to_pass: Vec<String>,

    /// Tests known to pass both before and after the fix.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pass_to_pass: Vec<String>,
}

impl PullRequest {
    /// The identifier of this pull request.
    pub fn id(&self) -> PrId {
        PrId {
            org: self.org.clone(),
            repo: self.repo.clone(),
            number: self.number,
        }
    }
}

/// The base commit of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[non_exhaustive]
pub struct Base {
    /// Display label, e.g. `pallets:main`.
    #[builder(into, default)]
    #[serde(default)]
    pub label: String,

    /// Branch name.
    #[builder(into, default)]
    #[serde(default, rename = "ref")]
    pub reference: String,

    /// Commit hash to check out before applying patches.
    #[builder(into)]
    pub sha: String,
}

/// Identifies a pull request as `org/repo:pr-N`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrId {
    pub org: String,
    pub repo: String,
    pub number: u64,
}

impl PrId {
    /// A filesystem-friendly form, `org__repo-N`.
    pub fn dir_name(&self) -> String {
        format!("{}__{}-{}", self.org, self.repo, self.number)
    }

    /// Whether `pr` is the pull request this identifies.
    pub fn matches(&self, pr: &PullRequest) -> bool {
        self.org == pr.org && self.repo == pr.repo && self.number == pr.number
    }
}

impl Display for PrId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:pr-{}", self.org, self.repo, self.number)
    }
}

impl FromStr for PrId {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        let parse = || -> Option<Self> {
            let (full_name, number) = s.split_once(":pr-")?;
            let (org, repo) = full_name.split_once('/')?;
            if org.is_empty() || repo.is_empty() || repo.contains('/') {
                return None;
            }
            Some(Self {
                org: org.to_string(),
                repo: repo.to_string(),
                number: number.parse().ok()?,
            })
        };
        parse().ok_or_else(|| eyre!("invalid pull request id {s:?}, expected `org/repo:pr-N`"))
    }
}

/// Load pull requests from a JSONL dataset, skipping blank lines.
#[tracing::instrument]
pub fn load_jsonl(path: &Path) -> Result<Vec<PullRequest>> {
    let content = read_to_string(path).with_context(|| format!("read dataset: {path:?}"))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<PullRequest>(line)
                .with_context(|| format!("parse pull request on line {} of {path:?}", index + 1))
                .with_section(|| line.to_string().header("Line:"))
        })
        .collect()
}
