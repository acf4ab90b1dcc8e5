//! Build, run, and evaluate per-repository test harnesses.

use clap::{Parser, Subcommand};
use color_eyre::{Result, Section};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

/// Per-repository test harnesses for pull-request benchmarks.
#[derive(Parser)]
#[command(name = "harness", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog repositories.
    List(cmd::list::Config),

    /// Write Docker build contexts for dataset instances.
    Build(cmd::build::Config),

    /// Parse a test log and print the result as JSON.
    Parse(cmd::parse::Config),

    /// Evaluate previously collected stage logs.
    Evaluate(cmd::evaluate::Config),

    /// Build images, run every stage, and evaluate the logs.
    Run(cmd::run::Config),

    /// Summarize saved reports.
    Summary(cmd::summary::Config),
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Logs go to stderr so that stdout stays parseable (`parse` prints JSON).
    //
    // Examples:
    // - `HARNESS_LOG=debug` to see catalog loading and per-instance parsing
    // - `HARNESS_LOG=harness::docker=trace` to trace docker invocations
    // - `HARNESS_LOG=warn` for warnings and errors only (this is the default)
    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(
            fmt::layer()
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .pretty()
                .with_writer(std::io::stderr),
        )
        .with(
            EnvFilter::builder()
                .with_env_var("HARNESS_LOG")
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    match cli.command {
        Commands::List(config) => cmd::list::main(config),
        Commands::Build(config) => cmd::build::main(config),
        Commands::Parse(config) => cmd::parse::main(config),
        Commands::Evaluate(config) => cmd::evaluate::main(config),
        Commands::Run(config) => cmd::run::main(config),
        Commands::Summary(config) => cmd::summary::main(config),
    }
    .suggestion("Run with `HARNESS_LOG=debug` for more detail.")
}
