//! Subcommands of the `harness` binary.

use std::path::{Path, PathBuf};

use clap::Args;
use color_eyre::{
    Section,
    eyre::{Context, Result, bail},
};
use harness::{
    Catalog, PrId, PullRequest,
    config::{self, Config},
    pr,
};

pub mod build;
pub mod evaluate;
pub mod list;
pub mod parse;
pub mod run;
pub mod summary;

/// Catalog directory used when neither the CLI nor a config file names one.
const DEFAULT_CATALOG: &str = "catalog";

/// Options shared by every command that reads the catalog.
#[derive(Args, Clone, Debug)]
pub struct Shared {
    /// Catalog directory; overrides `catalog_dir` from `harness.toml`.
    #[arg(long, env = "HARNESS_CATALOG")]
    catalog: Option<PathBuf>,

    /// Config file applied after the user and project configs.
    #[arg(long, env = "HARNESS_CONFIG")]
    config: Option<PathBuf>,

    /// Registry namespace for image names; overrides `namespace` from
    /// `harness.toml`.
    #[arg(long)]
    namespace: Option<String>,
}

impl Shared {
    /// The effective config, with CLI flags applied last.
    pub fn config(&self) -> Result<Config> {
        let mut config = config::load(self.config.as_deref()).context("load config")?;
        if let Some(catalog) = &self.catalog {
            config.catalog_dir = Some(catalog.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        Ok(config)
    }

    /// The effective config and the catalog it points at.
    pub fn load(&self) -> Result<(Config, Catalog)> {
        let config = self.config()?;
        let dir = config
            .catalog_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG));
        let catalog = Catalog::load(&dir)
            .context("load catalog")
            .with_suggestion(|| "pass --catalog or set HARNESS_CATALOG to the catalog directory")?;
        Ok((config, catalog))
    }
}

/// Load a dataset, keeping only the pull requests in `only` if it is not
/// empty.
pub fn load_dataset(path: &Path, only: &[PrId]) -> Result<Vec<PullRequest>> {
    let prs = pr::load_jsonl(path)?;
    if only.is_empty() {
        return Ok(prs);
    }

    for id in only {
        if !prs.iter().any(|pr| id.matches(pr)) {
            bail!("pull request {id} is not in dataset {path:?}");
        }
    }
    Ok(prs
        .into_iter()
        .filter(|pr| only.iter().any(|id| id.matches(pr)))
        .collect())
}
