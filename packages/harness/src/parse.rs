//! The log-parsing layer.
//!
//! Each supported test runner has its own submodule that walks a console log
//! line by line and records what it sees into a [`Tally`]. The parsers share
//! nothing beyond that contract: they are independent state machines tuned to
//! one runner's human-readable output.
//!
//! [`LogParser`] is the entry point. It strips ANSI escapes, picks the
//! precedence policy, dispatches to the right format, and returns the final
//! [`TestResult`].

use std::borrow::Cow;
use std::iter::once;
use std::sync::LazyLock;

use color_eyre::eyre::{Report, bail};
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

use crate::result::{Precedence, Tally, TestResult};

pub use patterns::{PatternSet, RegexMatcher};

pub mod cargo;
pub mod ctest;
pub mod go;
pub mod gradle;
pub mod jest;
pub mod maven;
pub mod mocha;
pub mod patterns;
pub mod phpunit;
pub mod pytest;
pub mod tap;
pub mod unittest;

/// A built-in test-runner output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// `pytest -rA` / `pytest -v` output.
    Pytest,

    /// Python `unittest` verbose output, which nose and Django also print.
    Unittest,

    /// Jest's default and `--verbose` reporters.
    Jest,

    /// Mocha's `spec` reporter.
    Mocha,

    /// libtest output from `cargo test`.
    Cargo,

    /// `go test -v`.
    Go,

    /// Maven surefire per-class summaries.
    Maven,

    /// Gradle test logging with `events "passed", "skipped", "failed"`.
    Gradle,

    /// PHPUnit `--testdox` output.
    Phpunit,

    /// Test Anything Protocol.
    Tap,

    /// CTest console output.
    Ctest,
}

derive_display_from_serialize!(Format);
derive_fromstr_from_deserialize!(Format);

impl Format {
    /// All built-in formats.
    pub const ALL: [Format; 11] = [
        Format::Pytest,
        Format::Unittest,
        Format::Jest,
        Format::Mocha,
        Format::Cargo,
        Format::Go,
        Format::Maven,
        Format::Gradle,
        Format::Phpunit,
        Format::Tap,
        Format::Ctest,
    ];

    /// The precedence used when a parser is not configured with one.
    pub fn default_precedence(self) -> Precedence {
        match self {
            Format::Maven => Precedence::LastWins,
            _ => Precedence::FailWins,
        }
    }

    fn parse_into(self, log: &str, tally: &mut Tally) {
        match self {
            Format::Pytest => pytest::parse(log, tally),
            Format::Unittest => unittest::parse(log, tally),
            Format::Jest => jest::parse(log, tally),
            Format::Mocha => mocha::parse(log, tally),
            Format::Cargo => cargo::parse(log, tally),
            Format::Go => go::parse(log, tally),
            Format::Maven => maven::parse(log, tally),
            Format::Gradle => gradle::parse(log, tally),
            Format::Phpunit => phpunit::parse(log, tally),
            Format::Tap => tap::parse(log, tally),
            Format::Ctest => ctest::parse(log, tally),
        }
    }
}

/// Turns a console log into a [`TestResult`].
///
/// In catalog files this is written as a table:
/// ```toml
/// [parser]
/// format = "pytest"
/// precedence = "last_wins" # optional
/// ```
///
/// Or, for output no built-in format understands:
/// ```toml
/// [parser]
/// format = "patterns"
/// passed = ['^PASS (?<name>\S+)$']
/// failed = ['^FAIL (?<name>\S+)$']
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawLogParser", into = "RawLogParser")]
pub enum LogParser {
    /// One of the built-in formats.
    Builtin {
        format: Format,
        precedence: Option<Precedence>,
    },

    /// Regex lists supplied by the catalog.
    Patterns(PatternSet),
}

impl LogParser {
    /// A built-in parser using the format's default precedence.
    pub fn builtin(format: Format) -> Self {
        Self::Builtin {
            format,
            precedence: None,
        }
    }

    /// Override the precedence policy.
    pub fn with_precedence(self, precedence: Precedence) -> Self {
        match self {
            Self::Builtin { format, .. } => Self::Builtin {
                format,
                precedence: Some(precedence),
            },
            Self::Patterns(set) => Self::Patterns(PatternSet { precedence, ..set }),
        }
    }

    /// The policy used to resolve repeated observations.
    pub fn precedence(&self) -> Precedence {
        match self {
            Self::Builtin { format, precedence } => {
                precedence.unwrap_or_else(|| format.default_precedence())
            }
            Self::Patterns(set) => set.precedence,
        }
    }

    /// Short label for the parser, e.g. `pytest` or `patterns`.
    pub fn label(&self) -> String {
        match self {
            Self::Builtin { format, .. } => format.to_string(),
            Self::Patterns(_) => String::from("patterns"),
        }
    }

    /// Parse a complete console log.
    #[tracing::instrument(skip(log), fields(parser = %self.label(), bytes = log.len()))]
    pub fn parse(&self, log: &str) -> TestResult {
        let log = strip_ansi(log);
        let mut tally = Tally::new(self.precedence());
        match self {
            Self::Builtin { format, .. } => format.parse_into(&log, &mut tally),
            Self::Patterns(set) => set.parse_into(&log, &mut tally),
        }
        tracing::debug!(tests = tally.len(), "parsed log");
        tally.finish()
    }
}

impl From<Format> for LogParser {
    fn from(format: Format) -> Self {
        Self::builtin(format)
    }
}

/// Wire shape of a [`LogParser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogParser {
    format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    precedence: Option<Precedence>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    passed: Vec<RegexMatcher>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    failed: Vec<RegexMatcher>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<RegexMatcher>,
}

impl TryFrom<RawLogParser> for LogParser {
    type Error = Report;

    fn try_from(raw: RawLogParser) -> Result<Self, Self::Error> {
        let has_patterns =
            !raw.passed.is_empty() || !raw.failed.is_empty() || !raw.skipped.is_empty();

        if raw.format == "patterns" {
            if !has_patterns {
                bail!("format \"patterns\" needs at least one of passed, failed, skipped");
            }
            return Ok(Self::Patterns(PatternSet {
                passed: raw.passed,
                failed: raw.failed,
                skipped: raw.skipped,
                precedence: raw.precedence.unwrap_or(Precedence::LastWins),
            }));
        }

        if has_patterns {
            bail!("passed/failed/skipped patterns require format = \"patterns\"");
        }

        let format = raw.format.parse::<Format>().map_err(|_| {
            let known = Format::ALL.iter().map(Format::to_string).join(", ");
            Report::msg(format!(
                "unknown log format {:?}; expected one of: {known}, patterns",
                raw.format
            ))
        })?;

        Ok(Self::Builtin {
            format,
            precedence: raw.precedence,
        })
    }
}

impl From<LogParser> for RawLogParser {
    fn from(parser: LogParser) -> Self {
        match parser {
            LogParser::Builtin { format, precedence } => Self {
                format: format.to_string(),
                precedence,
                passed: Vec::new(),
                failed: Vec::new(),
                skipped: Vec::new(),
            },
            LogParser::Patterns(set) => Self {
                format: String::from("patterns"),
                precedence: Some(set.precedence),
                passed: set.passed,
                failed: set.failed,
                skipped: set.skipped,
            },
        }
    }
}

/// Remove ANSI escape sequences (colors, cursor movement) from a log.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    static ANSI: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07]*\x07|\x1b[()][0-9A-Za-z]|\x1b[=>]")
            .expect("compile ANSI escape regex")
    });
    ANSI.replace_all(text, "")
}

/// Iterate the visible lines of a log.
///
/// Runners that redraw progress with carriage returns leave several versions
/// of a line separated by `\r`; only the last one was ever visible.
pub(crate) fn lines(log: &str) -> impl Iterator<Item = &str> {
    log.lines().map(|line| {
        let line = line.trim_end_matches('\r');
        line.rsplit('\r').next().unwrap_or(line)
    })
}

/// Width of the leading whitespace of a line.
pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Tracks nested suite titles by indentation, for reporters that print
/// `describe` blocks as an indented tree.
#[derive(Debug, Default)]
pub(crate) struct Outline {
    frames: Vec<(usize, String)>,
}

impl Outline {
    /// Open a suite titled `title` at `indent`, closing any suite at the same
    /// or deeper indentation.
    pub(crate) fn enter(&mut self, indent: usize, title: &str) {
        self.close(indent);
        self.frames.push((indent, title.trim().to_string()));
    }

    /// Close every suite at `indent` or deeper.
    pub(crate) fn close(&mut self, indent: usize) {
        while self.frames.last().is_some_and(|(i, _)| *i >= indent) {
            self.frames.pop();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
    }

    /// Full name of a test at `indent`: enclosing suite titles then `leaf`.
    pub(crate) fn path(&self, indent: usize, leaf: &str, separator: &str) -> String {
        self.frames
            .iter()
            .filter(|(i, _)| *i < indent)
            .map(|(_, title)| title.as_str())
            .chain(once(leaf.trim()))
            .join(separator)
    }
}
