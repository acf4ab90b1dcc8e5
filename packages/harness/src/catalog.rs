//! The catalog of repositories the harness knows how to build and test.
//!
//! Each repository is described by one TOML file:
//!
//! ```toml
//! org = "pallets"
//! repo = "flask"
//! language = "python"
//! base_image = "python:3.11-slim"
//! system = ["apt-get update && apt-get install -y git"]
//! setup = ["pip install -e . pytest"]
//! test = ["pytest --no-header -rA -p no:cacheprovider"]
//!
//! [[variants]]
//! name = "py38"
//! max = 4999
//! base_image = "python:3.8-slim"
//! ```
//!
//! Variants cover PR number ranges where the repository needed a different
//! toolchain or test command. The first matching variant wins.

use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::Path;

use color_eyre::{
    Section, SectionExt,
    eyre::{Context, Result, bail, eyre},
};
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};
use walkdir::WalkDir;

use crate::config::Config;
use crate::image::File;
use crate::instance::Instance;
use crate::parse::{Format, LogParser};
use crate::pr::PullRequest;

/// Primary language of a repository; picks the default log format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    Javascript,
    Typescript,
    Rust,
    Go,
    Java,
    Kotlin,
    Php,
    C,
    Cpp,
    Ruby,
    Other,
}

derive_display_from_serialize!(Language);
derive_fromstr_from_deserialize!(Language);

impl Language {
    /// The log format most projects in this language produce.
    pub fn default_format(self) -> Format {
        match self {
            Language::Python => Format::Pytest,
            Language::Javascript | Language::Typescript => Format::Jest,
            Language::Rust => Format::Cargo,
            Language::Go => Format::Go,
            Language::Java => Format::Maven,
            Language::Kotlin => Format::Gradle,
            Language::Php => Format::Phpunit,
            Language::C | Language::Cpp => Format::Ctest,
            Language::Ruby | Language::Other => Format::Tap,
        }
    }
}

/// How to build and test one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoSpec {
    pub org: String,
    pub repo: String,
    pub language: Language,

    /// Image the base image is built `FROM`.
    pub base_image: String,

    /// `RUN` steps in the base image before the repository is cloned, for
    /// system packages such as `git`.
    #[serde(default)]
    pub system: Vec<String>,

    /// `RUN` steps in the base image, executed inside the repository.
    #[serde(default)]
    pub setup: Vec<String>,

    /// Steps appended to `prepare.sh`, after the base commit is checked out.
    #[serde(default)]
    pub prepare: Vec<String>,

    /// The test command, one shell line per entry.
    pub test: Vec<String>,

    /// Environment variables set in the base image.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Extra files copied into every instance image.
    #[serde(default)]
    pub files: Vec<File>,

    /// How to parse test logs; defaults from `language`.
    #[serde(default)]
    pub parser: Option<LogParser>,

    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// Overrides for a range of pull request numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variant {
    /// Suffix for the base image tag, e.g. `py38` gives `base-py38`.
    pub name: String,

    /// Lowest matching PR number, inclusive.
    #[serde(default)]
    pub min: Option<u64>,

    /// Highest matching PR number, inclusive.
    #[serde(default)]
    pub max: Option<u64>,

    #[serde(default)]
    pub base_image: Option<String>,

    #[serde(default)]
    pub system: Option<Vec<String>>,

    #[serde(default)]
    pub setup: Option<Vec<String>>,

    #[serde(default)]
    pub prepare: Option<Vec<String>>,

    #[serde(default)]
    pub test: Option<Vec<String>>,

    /// Added to (and overriding keys of) the repository's `env`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub parser: Option<LogParser>,
}

impl Variant {
    /// Whether the PR number falls in this variant's range.
    pub fn matches(&self, number: u64) -> bool {
        self.min.is_none_or(|min| number >= min) && self.max.is_none_or(|max| number <= max)
    }
}

/// A [`RepoSpec`] with the variant for one pull request applied.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub org: String,
    pub repo: String,
    pub language: Language,
    pub variant: Option<String>,
    pub base_image: String,
    pub system: Vec<String>,
    pub setup: Vec<String>,
    pub prepare: Vec<String>,
    pub test: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub files: Vec<File>,
    pub parser: LogParser,
}

impl RepoSpec {
    /// `org/repo`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    /// The parser for logs of the default variant.
    pub fn parser(&self) -> LogParser {
        self.parser
            .clone()
            .unwrap_or_else(|| LogParser::builtin(self.language.default_format()))
    }

    /// The first variant whose range contains `number`.
    pub fn variant_for(&self, number: u64) -> Option<&Variant> {
        self.variants.iter().find(|variant| variant.matches(number))
    }

    /// Apply the variant matching `number`, if any.
    pub fn resolve(&self, number: u64) -> Resolved {
        let variant = self.variant_for(number);
        let pick = |own: &Vec<String>, over: Option<&Vec<String>>| over.unwrap_or(own).clone();

        let mut env = self.env.clone();
        if let Some(variant) = variant {
            env.extend(variant.env.clone());
        }

        Resolved {
            org: self.org.clone(),
            repo: self.repo.clone(),
            language: self.language,
            variant: variant.map(|v| v.name.clone()),
            base_image: variant
                .and_then(|v| v.base_image.clone())
                .unwrap_or_else(|| self.base_image.clone()),
            system: pick(&self.system, variant.and_then(|v| v.system.as_ref())),
            setup: pick(&self.setup, variant.and_then(|v| v.setup.as_ref())),
            prepare: pick(&self.prepare, variant.and_then(|v| v.prepare.as_ref())),
            test: pick(&self.test, variant.and_then(|v| v.test.as_ref())),
            env,
            files: self.files.clone(),
            parser: variant
                .and_then(|v| v.parser.clone())
                .unwrap_or_else(|| self.parser()),
        }
    }

    /// Check the constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("org", &self.org), ("repo", &self.repo)] {
            if value.trim().is_empty() || value.contains('/') || value.contains(char::is_whitespace)
            {
                bail!("{field} {value:?} must be a non-empty name without '/' or whitespace");
            }
        }
        if self.base_image.trim().is_empty() {
            bail!("base_image must not be empty");
        }
        if self.test.is_empty() {
            bail!("test must contain at least one command");
        }
        for file in &self.files {
            file.validate()?;
        }

        let mut names = Vec::new();
        for variant in &self.variants {
            if variant.name.trim().is_empty() || !variant.name.chars().all(is_tag_char) {
                bail!(
                    "variant name {:?} must be non-empty and use only [A-Za-z0-9_.-]",
                    variant.name
                );
            }
            if names.contains(&&variant.name) {
                bail!("duplicate variant {:?}", variant.name);
            }
            if let (Some(min), Some(max)) = (variant.min, variant.max)
                && min > max
            {
                bail!("variant {:?} has min {min} greater than max {max}", variant.name);
            }
            if variant.test.as_ref().is_some_and(Vec::is_empty) {
                bail!("variant {:?} overrides test with no commands", variant.name);
            }
            names.push(&variant.name);
        }
        Ok(())
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Load and validate a single repository file.
#[tracing::instrument]
pub fn load_spec(path: &Path) -> Result<RepoSpec> {
    let content = read_to_string(path).with_context(|| format!("read catalog file: {path:?}"))?;
    let spec = toml::from_str::<RepoSpec>(&content)
        .with_context(|| format!("parse catalog file: {path:?}"))
        .with_section(|| content.clone().header("File content:"))?;
    spec.validate()
        .with_context(|| format!("validate catalog file: {path:?}"))?;
    Ok(spec)
}

/// All known repositories, keyed by `(org, repo)`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    specs: BTreeMap<(String, String), RepoSpec>,
}

impl Catalog {
    /// Load every `*.toml` file under `dir`, recursively.
    #[tracing::instrument]
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("catalog directory does not exist: {dir:?}");
        }

        let mut catalog = Self::default();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walk catalog directory: {dir:?}"))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "toml") {
                continue;
            }
            let spec = load_spec(path)?;
            catalog
                .insert(spec)
                .with_context(|| format!("add catalog file: {path:?}"))?;
        }

        tracing::debug!(repos = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Build a catalog from specs already in memory.
    pub fn from_specs(specs: impl IntoIterator<Item = RepoSpec>) -> Result<Self> {
        let mut catalog = Self::default();
        for spec in specs {
            spec.validate()
                .with_context(|| format!("validate {}", spec.full_name()))?;
            catalog.insert(spec)?;
        }
        Ok(catalog)
    }

    fn insert(&mut self, spec: RepoSpec) -> Result<()> {
        let key = (spec.org.clone(), spec.repo.clone());
        if self.specs.contains_key(&key) {
            bail!("repository {} is defined more than once", spec.full_name());
        }
        self.specs.insert(key, spec);
        Ok(())
    }

    pub fn get(&self, org: &str, repo: &str) -> Option<&RepoSpec> {
        self.specs.get(&(org.to_string(), repo.to_string()))
    }

    /// Repositories ordered by `org/repo`.
    pub fn iter(&self) -> impl Iterator<Item = &RepoSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Bind a pull request to its repository.
    pub fn instance(&self, pr: &PullRequest, config: &Config) -> Result<Instance> {
        let spec = self
            .get(&pr.org, &pr.repo)
            .ok_or_else(|| eyre!("no catalog entry for {}/{}", pr.org, pr.repo))
            .with_suggestion(|| "add a TOML file for the repository to the catalog directory")?;
        Instance::new(pr.clone(), spec, config.clone())
    }
}
