//! Evaluate stage logs that were collected earlier.

use std::io::stdout;
use std::path::{Path, PathBuf};

use clap::Args;
use color_eyre::eyre::{Context, Result};
use harness::{Catalog, PrId, PullRequest, Report, Summary, config::Config as Settings, report};
use rayon::prelude::*;

use crate::cmd::{Shared, load_dataset};

#[derive(Args, Clone, Debug)]
pub struct Config {
    #[command(flatten)]
    shared: Shared,

    /// Pull request dataset (JSONL).
    #[arg(short, long)]
    dataset: PathBuf,

    /// Directory containing `<org>__<repo>-<number>/{run,test,fix}.log`.
    #[arg(long)]
    logs: PathBuf,

    /// Where to write the reports (JSON).
    #[arg(short, long, default_value = "reports.json")]
    output: PathBuf,

    /// Only evaluate these pull requests.
    #[arg(long = "pr")]
    prs: Vec<PrId>,
}

pub fn main(config: Config) -> Result<()> {
    let (settings, catalog) = config.shared.load()?;
    let prs = load_dataset(&config.dataset, &config.prs)?;

    let reports = evaluate_all(&catalog, &settings, &prs, &config.logs)?;
    report::save_reports(&config.output, &reports)?;

    Summary::from_reports(&reports).print_markdown(stdout())
}

/// Evaluate every pull request's logs in parallel, in dataset order.
#[tracing::instrument(skip(catalog, settings, prs), fields(instances = prs.len()))]
pub fn evaluate_all(
    catalog: &Catalog,
    settings: &Settings,
    prs: &[PullRequest],
    logs: &Path,
) -> Result<Vec<Report>> {
    prs.par_iter()
        .map(|pr| {
            catalog
                .instance(pr, settings)
                .and_then(|instance| instance.evaluate(logs))
                .with_context(|| format!("evaluate {}", pr.id()))
        })
        .collect()
}
