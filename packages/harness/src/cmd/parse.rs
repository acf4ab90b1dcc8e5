//! Parse a single test log and print the result.

use std::fs::read_to_string;
use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{Context, Result, eyre};
use harness::{Format, LogParser, PrId, Precedence};

use crate::cmd::{Shared, load_dataset};

#[derive(Args, Clone, Debug)]
pub struct Config {
    #[command(flatten)]
    shared: Shared,

    /// The console log to parse.
    #[arg(short, long)]
    log: PathBuf,

    /// Parse with a built-in format.
    ///
    /// `patterns` parsers carry their regexes in a catalog entry; use
    /// `--instance` for those.
    #[arg(
        short,
        long,
        value_parser = parse_format,
        conflicts_with = "instance",
        required_unless_present = "instance"
    )]
    format: Option<Format>,

    /// Override the format's precedence policy.
    #[arg(long)]
    precedence: Option<Precedence>,

    /// Parse with the parser the catalog configures for this instance.
    #[arg(long, requires = "dataset")]
    instance: Option<PrId>,

    /// Dataset containing `--instance`.
    #[arg(short, long)]
    dataset: Option<PathBuf>,
}

fn parse_format(value: &str) -> Result<Format, String> {
    if value == "patterns" {
        return Err(String::from(
            "`patterns` parsers are defined by a catalog entry; pass `--instance <ID> --dataset <FILE>` instead",
        ));
    }
    value.parse::<Format>().map_err(|_| {
        let known = Format::ALL.iter().map(Format::to_string).collect::<Vec<_>>();
        format!("unknown format {value:?}; expected one of: {}", known.join(", "))
    })
}

pub fn main(config: Config) -> Result<()> {
    let log = read_to_string(&config.log).with_context(|| format!("read log: {:?}", config.log))?;

    let result = match (&config.format, &config.instance, &config.dataset) {
        (Some(format), _, _) => {
            let parser = LogParser::builtin(*format);
            let parser = match config.precedence {
                Some(precedence) => parser.with_precedence(precedence),
                None => parser,
            };
            parser.parse(&log)
        }
        (None, Some(id), Some(dataset)) => {
            let (settings, catalog) = config.shared.load()?;
            let prs = load_dataset(dataset, std::slice::from_ref(id))?;
            let pr = prs
                .first()
                .ok_or_else(|| eyre!("pull request {id} is not in dataset {dataset:?}"))?;
            let instance = catalog.instance(pr, &settings)?;
            match config.precedence {
                Some(precedence) => instance
                    .spec()
                    .parser
                    .clone()
                    .with_precedence(precedence)
                    .parse(&log),
                None => instance.parse_log(&log),
            }
        }
        _ => return Err(eyre!("pass either --format or --instance with --dataset")),
    };

    let json = serde_json::to_string_pretty(&result).context("serialize result")?;
    println!("{json}");
    Ok(())
}
