//! List catalog repositories.

use clap::Args;
use color_eyre::Result;
use color_print::cprintln;
use harness::catalog::Language;
use harness::ext::{counted, indent};
use itertools::Itertools;

use crate::cmd::Shared;

#[derive(Args, Clone, Debug)]
pub struct Config {
    #[command(flatten)]
    shared: Shared,

    /// Only list repositories in this language.
    #[arg(long)]
    language: Option<Language>,

    /// Show commands and variants.
    #[arg(short, long)]
    verbose: bool,
}

pub fn main(config: Config) -> Result<()> {
    let (_, catalog) = config.shared.load()?;

    let specs = catalog
        .iter()
        .filter(|spec| config.language.is_none_or(|language| spec.language == language))
        .collect_vec();

    if specs.is_empty() {
        println!("No repositories found");
        return Ok(());
    }

    for spec in &specs {
        cprintln!(
            "<bold>{}</> <dim>{} · {} · {}</>",
            spec.full_name(),
            spec.language,
            spec.parser().label(),
            spec.base_image
        );
        if !config.verbose {
            continue;
        }

        if !spec.system.is_empty() {
            println!("{}", "system:".indent(2));
            println!("{}", spec.system.join("\n").indent(4));
        }
        if !spec.setup.is_empty() {
            println!("{}", "setup:".indent(2));
            println!("{}", spec.setup.join("\n").indent(4));
        }
        println!("{}", "test:".indent(2));
        println!("{}", spec.test.join("\n").indent(4));
        for variant in &spec.variants {
            let range = match (variant.min, variant.max) {
                (Some(min), Some(max)) => format!("#{min}..=#{max}"),
                (Some(min), None) => format!("#{min}.."),
                (None, Some(max)) => format!("..=#{max}"),
                (None, None) => String::from("all"),
            };
            println!("{}", format!("variant {}: {range}", variant.name).indent(2));
        }
    }

    println!();
    println!("{}", specs.len().counted("repo"));
    Ok(())
}
