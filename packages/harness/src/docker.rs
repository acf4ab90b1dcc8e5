//! Thin wrapper over the `docker` CLI.

use std::path::Path;
use std::process::{Command, Output};

use color_eyre::{
    Section, SectionExt,
    eyre::{Context, Result, eyre},
};
use color_print::cprintln;
use itertools::Itertools;

use crate::image::Image;

/// Exit status `docker run` uses for its own failures, as opposed to the
/// container's.
const DOCKER_RUN_ERROR: i32 = 125;

/// Builds images and runs commands in containers.
#[derive(Debug, Clone)]
pub struct Docker {
    binary: String,
    dry_run: bool,
}

impl Docker {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            dry_run: false,
        }
    }

    /// Print commands instead of executing them.
    pub fn dry_run(self, dry_run: bool) -> Self {
        Self { dry_run, ..self }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// `docker build -t <reference> <context>`.
    #[tracing::instrument(skip(self))]
    pub fn build(&self, context: &Path, reference: &str) -> Result<()> {
        let context = context.to_string_lossy();
        self.invoke(&["build", "-t", reference, &*context]).map(drop)
    }

    /// Whether an image with this reference exists locally.
    #[tracing::instrument(skip(self))]
    pub fn image_exists(&self, reference: &str) -> Result<bool> {
        if self.dry_run {
            return Ok(false);
        }
        let output = self
            .command(&["image", "inspect", reference])
            .output()
            .with_context(|| format!("run {} image inspect", self.binary))?;
        Ok(output.status.success())
    }

    /// Run `command` with bash in a fresh container and return its combined
    /// output.
    ///
    /// The container exiting non-zero is not an error: failing tests do that.
    #[tracing::instrument(skip(self))]
    pub fn run(&self, reference: &str, command: &str) -> Result<String> {
        let args = ["run", "--rm", reference, "bash", "-c", command];
        if self.dry_run {
            self.print(&args);
            return Ok(String::new());
        }

        let output = self
            .command(&args)
            .output()
            .with_context(|| format!("run {} with args: {args:?}", self.binary))?;
        if output.status.code() == Some(DOCKER_RUN_ERROR) {
            return Err(failure(&self.binary, &args, &output));
        }

        let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&output.stderr));
        tracing::debug!(status = ?output.status.code(), bytes = log.len(), "container exited");
        Ok(log)
    }

    /// Write build contexts under `root` and build every image in the chain
    /// that does not exist yet, dependencies first.
    #[tracing::instrument(skip(self, image), fields(image = %image.reference()))]
    pub fn build_chain(&self, image: &Image, root: &Path) -> Result<()> {
        for image in image.chain() {
            let reference = image.reference();
            if self.image_exists(&reference)? {
                tracing::info!(%reference, "image exists, skipping build");
                continue;
            }
            let context = image.context_dir(root);
            image.write_context(&context)?;
            self.build(&context, &reference)
                .with_context(|| format!("build image {reference}"))?;
        }
        Ok(())
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(args);
        command
    }

    fn invoke(&self, args: &[&str]) -> Result<Output> {
        if self.dry_run {
            self.print(args);
            return Ok(Output {
                status: Default::default(),
                stdout: Vec::new(),
                stderr: Vec::new(),
            });
        }

        let output = self
            .command(args)
            .output()
            .with_context(|| format!("run {} with args: {args:?}", self.binary))?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(failure(&self.binary, args, &output))
        }
    }

    fn print(&self, args: &[&str]) {
        let args = args
            .iter()
            .map(|arg| {
                if arg.contains(char::is_whitespace) {
                    format!("{arg:?}")
                } else {
                    arg.to_string()
                }
            })
            .join(" ");
        cprintln!("<dim>$</> {} {}", self.binary, args);
    }
}

fn failure(binary: &str, args: &[&str], output: &Output) -> color_eyre::Report {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    eyre!("run {binary} with args: {args:?}")
        .section(stdout.to_string().header("Stdout:"))
        .section(stderr.to_string().header("Stderr:"))
}
