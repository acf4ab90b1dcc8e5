//! Per-repository test harnesses for pull-request benchmarks.
//!
//! For every repository in the [`catalog`], the harness knows how to build a
//! Docker image ([`image`]), which scripts run the tests before and after a
//! pull request's patches ([`script`], [`instance`]), and how to turn the
//! console output of those runs into a [`result::TestResult`] ([`parse`]).
//! [`report`] compares the three runs of an instance and decides whether it
//! is a usable benchmark instance.

pub mod catalog;
pub mod config;
pub mod docker;
pub mod ext;
pub mod image;
pub mod instance;
pub mod parse;
pub mod pr;
pub mod report;
pub mod result;
pub mod script;
pub mod template;

pub use crate::catalog::{Catalog, RepoSpec};
pub use crate::instance::Instance;
pub use crate::parse::{Format, LogParser};
pub use crate::pr::{PrId, PullRequest};
pub use crate::report::{Report, Stage, Summary};
pub use crate::result::{Precedence, TestResult, TestStatus};
