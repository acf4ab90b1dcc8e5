//! Build images, run every stage, and evaluate the logs.

use std::fs::{create_dir_all, write};
use std::io::stdout;
use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{Context, Result};
use color_print::cprintln;
use harness::docker::Docker;
use harness::{PrId, Stage, Summary, report};

use crate::cmd::evaluate::evaluate_all;
use crate::cmd::{Shared, load_dataset};

#[derive(Args, Clone, Debug)]
pub struct Config {
    #[command(flatten)]
    shared: Shared,

    /// Pull request dataset (JSONL).
    #[arg(short, long)]
    dataset: PathBuf,

    /// Working directory for build contexts, logs, and reports.
    #[arg(short, long, default_value = "harness-output")]
    output: PathBuf,

    /// Only run these pull requests.
    #[arg(long = "pr")]
    prs: Vec<PrId>,

    /// The docker binary to invoke.
    #[arg(long, env = "HARNESS_DOCKER", default_value = "docker")]
    docker: String,

    /// Print the docker commands instead of running them.
    #[arg(long)]
    dry_run: bool,
}

pub fn main(config: Config) -> Result<()> {
    let (settings, catalog) = config.shared.load()?;
    let prs = load_dataset(&config.dataset, &config.prs)?;
    let docker = Docker::new(&config.docker).dry_run(config.dry_run);

    let contexts = config.output.join("contexts");
    let logs = config.output.join("logs");

    for pr in &prs {
        let id = pr.id();
        let instance = catalog
            .instance(pr, &settings)
            .with_context(|| format!("resolve {id}"))?;
        let image = instance.dependency();

        cprintln!("<bold>{}</> <dim>{}</>", id, image.reference());
        docker
            .build_chain(&image, &contexts)
            .with_context(|| format!("build images for {id}"))?;

        let dir = instance.log_dir(&logs);
        create_dir_all(&dir).with_context(|| format!("create log directory: {dir:?}"))?;
        for stage in Stage::ALL {
            let log = docker
                .run(&image.reference(), &instance.command(stage))
                .with_context(|| format!("run {stage} stage of {id}"))?;
            if docker.is_dry_run() {
                continue;
            }
            let path = dir.join(stage.log_file());
            write(&path, &log).with_context(|| format!("write stage log: {path:?}"))?;
            cprintln!("  <green>{}</> {}", stage, instance.parse_log(&log));
        }
    }

    if docker.is_dry_run() {
        return Ok(());
    }

    let reports = evaluate_all(&catalog, &settings, &prs, &logs)?;
    report::save_reports(&config.output.join("reports.json"), &reports)?;
    Summary::from_reports(&reports).print_markdown(stdout())
}
