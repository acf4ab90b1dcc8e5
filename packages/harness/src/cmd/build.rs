//! Write Docker build contexts for dataset instances.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Args;
use color_eyre::{Result, eyre::Context};
use color_print::cprintln;
use harness::PrId;
use harness::ext::counted;

use crate::cmd::{Shared, load_dataset};

#[derive(Args, Clone, Debug)]
pub struct Config {
    #[command(flatten)]
    shared: Shared,

    /// Pull request dataset (JSONL).
    #[arg(short, long)]
    dataset: PathBuf,

    /// Directory to write build contexts to, as `<image name>/<tag>/`.
    #[arg(short, long, default_value = "build")]
    output: PathBuf,

    /// Only build these pull requests, e.g. `pallets/flask:pr-5012`.
    #[arg(long = "pr")]
    prs: Vec<PrId>,
}

pub fn main(config: Config) -> Result<()> {
    let (settings, catalog) = config.shared.load()?;
    let prs = load_dataset(&config.dataset, &config.prs)?;

    let mut written = HashSet::new();
    for pr in &prs {
        let instance = catalog
            .instance(pr, &settings)
            .with_context(|| format!("resolve {}", pr.id()))?;
        let image = instance.dependency();

        for image in image.chain() {
            let reference = image.reference();
            if !written.insert(reference.clone()) {
                continue;
            }
            let dir = image.context_dir(&config.output);
            image.write_context(&dir)?;
            cprintln!("<green>wrote</> {} <dim>{}</>", reference, dir.display());
        }
    }

    println!(
        "{} for {}",
        written.len().counted("build context"),
        prs.len().counted("instance")
    );
    Ok(())
}
