//! Summarize saved reports.

use std::io::stdout;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use color_eyre::eyre::Result;
use harness::{Summary, report};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Markdown,
    Csv,
    Json,
}

#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Reports written by `evaluate` or `run` (JSON).
    #[arg(short, long, default_value = "reports.json")]
    input: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "markdown")]
    format: Format,
}

pub fn main(config: Config) -> Result<()> {
    let reports = report::load_reports(&config.input)?;
    let summary = Summary::from_reports(&reports);

    match config.format {
        Format::Markdown => summary.print_markdown(stdout()),
        Format::Csv => summary.print_csv(stdout()),
        Format::Json => summary.print_json(stdout()),
    }
}
