//! Catalog-defined parsers built from regex lists.

use std::fmt::{Display, Formatter, Result as FormatterResult};

use color_eyre::{
    Result, Section, SectionExt,
    eyre::{Context, bail},
};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::parse::lines;
use crate::result::{Precedence, Tally, TestStatus};

/// A compiled regex that names a test through its `name` capture group.
#[derive(Debug, Clone)]
pub struct RegexMatcher(Regex);

impl RegexMatcher {
    /// Compile `pattern`, requiring a `name` capture group.
    pub fn new(pattern: impl AsRef<str>) -> Result<Self> {
        let pattern = pattern.as_ref();
        let regex = Regex::new(pattern)
            .with_context(|| format!("compile regex: {pattern:?}"))
            .with_section(|| pattern.to_string().header("Pattern:"))?;

        if !regex.capture_names().flatten().any(|name| name == "name") {
            bail!("pattern {pattern:?} has no `name` capture group");
        }

        Ok(Self(regex))
    }

    /// Get the pattern as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The test name captured from `line`, if the pattern matches it.
    pub fn capture<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.0
            .captures(line)
            .and_then(|captures| captures.name("name"))
            .map(|m| m.as_str())
    }
}

impl Display for RegexMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatterResult {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for RegexMatcher {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RegexMatcher {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pattern = String::deserialize(deserializer)?;
        RegexMatcher::new(pattern).map_err(serde::de::Error::custom)
    }
}

/// Regex lists for each status.
///
/// Every line is tried against `failed`, then `skipped`, then `passed`; the
/// first pattern that matches decides the status of the captured name.
#[derive(Debug, Clone)]
pub struct PatternSet {
    pub passed: Vec<RegexMatcher>,
    pub failed: Vec<RegexMatcher>,
    pub skipped: Vec<RegexMatcher>,
    pub precedence: Precedence,
}

impl PatternSet {
    pub(crate) fn parse_into(&self, log: &str, tally: &mut Tally) {
        let ordered = [
            (TestStatus::Fail, &self.failed),
            (TestStatus::Skip, &self.skipped),
            (TestStatus::Pass, &self.passed),
        ];

        for line in lines(log) {
            let hit = ordered.iter().find_map(|(status, patterns)| {
                patterns
                    .iter()
                    .find_map(|pattern| pattern.capture(line))
                    .map(|name| (name, *status))
            });
            if let Some((name, status)) = hit {
                tally.record(name, status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq as pretty_assert_eq;

    use super::*;

    #[test]
    fn test_requires_name_group() {
        let err = RegexMatcher::new(r"^PASS (\S+)$").unwrap_err();
        assert!(err.to_string().contains("`name`"), "got: {err}");
    }

    #[test]
    fn test_invalid_regex() {
        assert!(RegexMatcher::new(r"^PASS (?<name>\S+$").is_err());
    }

    #[test]
    fn test_failed_checked_before_passed() {
        let set = PatternSet {
            passed: vec![RegexMatcher::new(r"^(?<name>\w+): done").unwrap()],
            failed: vec![RegexMatcher::new(r"^(?<name>\w+): done with errors").unwrap()],
            skipped: vec![],
            precedence: Precedence::LastWins,
        };

        let mut tally = Tally::new(set.precedence);
        set.parse_into("alpha: done\nbeta: done with errors\n", &mut tally);
        let result = tally.finish();

        pretty_assert_eq!(result.passed().iter().collect::<Vec<_>>(), ["alpha"]);
        pretty_assert_eq!(result.failed().iter().collect::<Vec<_>>(), ["beta"]);
    }

    #[test]
    fn test_last_wins_by_default() {
        let set = PatternSet {
            passed: vec![RegexMatcher::new(r"^ok (?<name>\S+)").unwrap()],
            failed: vec![RegexMatcher::new(r"^not ok (?<name>\S+)").unwrap()],
            skipped: vec![],
            precedence: Precedence::LastWins,
        };

        let mut tally = Tally::new(set.precedence);
        set.parse_into("not ok retry\nok retry\n", &mut tally);
        pretty_assert_eq!(tally.get("retry"), Some(TestStatus::Pass));
    }
}
