//! A pull request bound to the catalog entry for its repository.

use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};

use crate::catalog::{RepoSpec, Resolved};
use crate::config::Config;
use crate::image::{Dependency, Dockerfile, File, Image, Instruction};
use crate::pr::{PrId, PullRequest};
use crate::report::{Report, Stage};
use crate::result::TestResult;
use crate::script;
use crate::template::{interpolate, repo_variables, variables};

/// Everything needed to build, run, and evaluate one pull request.
#[derive(Debug, Clone)]
pub struct Instance {
    pr: PullRequest,
    spec: Resolved,
    config: Config,
    global_env: Vec<(String, String)>,
}

impl Instance {
    /// Fails when `config.global_env` holds an entry that is not `KEY=VALUE`.
    pub fn new(pr: PullRequest, spec: &RepoSpec, config: Config) -> Result<Self> {
        let global_env = config
            .env_pairs()
            .context("validate global_env")?
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let spec = spec.resolve(pr.number);
        Ok(Self {
            pr,
            spec,
            config,
            global_env,
        })
    }

    pub fn pr(&self) -> &PullRequest {
        &self.pr
    }

    pub fn id(&self) -> PrId {
        self.pr.id()
    }

    /// The catalog entry with this pull request's variant applied.
    pub fn spec(&self) -> &Resolved {
        &self.spec
    }

    /// Image name shared by the base and instance images.
    pub fn image_name(&self) -> String {
        format!(
            "{}/{}_m_{}",
            self.config.namespace, self.spec.org, self.spec.repo
        )
        .to_lowercase()
    }

    /// Tag of the base image: `base`, or `base-{variant}`.
    pub fn base_tag(&self) -> String {
        match &self.spec.variant {
            Some(variant) => format!("base-{variant}"),
            None => String::from("base"),
        }
    }

    /// The repository image: system packages, checkout, and setup steps.
    pub fn base_image(&self) -> Image {
        let repo = &self.spec.repo;
        let vars = repo_variables(&self.spec.org, repo);

        let mut dockerfile = Dockerfile::new();
        dockerfile
            .push(Instruction::From(self.spec.base_image.clone()))
            .extend(self.global_env())
            .extend(
                self.spec
                    .env
                    .iter()
                    .map(|(key, value)| Instruction::env(key, interpolate(value, &vars))),
            )
            .push(Instruction::Workdir(String::from("/home/")))
            .extend(
                self.spec
                    .system
                    .iter()
                    .map(|step| Instruction::Run(interpolate(step, &vars))),
            );

        if self.config.need_clone {
            dockerfile.push(Instruction::Run(format!(
                "git clone https://github.com/{}/{repo}.git /home/{repo}",
                self.spec.org
            )));
        } else {
            dockerfile.push(Instruction::copy(repo, format!("/home/{repo}")));
        }

        if !self.spec.setup.is_empty() {
            dockerfile
                .push(Instruction::Workdir(format!("/home/{repo}")))
                .extend(
                    self.spec
                        .setup
                        .iter()
                        .map(|step| Instruction::Run(interpolate(step, &vars))),
                )
                .push(Instruction::Workdir(String::from("/home/")));
        }
        dockerfile.extend(self.cleared_env());

        Image::builder()
            .name(self.image_name())
            .tag(self.base_tag())
            .dependency(Dependency::External(self.spec.base_image.clone()))
            .dockerfile(dockerfile)
            .build()
    }

    /// The instance image: patches and scripts on top of the base image,
    /// with the base commit checked out and prepared.
    pub fn dependency(&self) -> Image {
        let base = self.base_image();
        let files = self.files();

        let mut dockerfile = Dockerfile::new();
        dockerfile
            .push(Instruction::From(base.reference()))
            .extend(self.global_env())
            .extend(files.iter().map(|file| {
                let destination = match file.dir.trim_matches('/') {
                    "" => String::from("/home/"),
                    dir => format!("/home/{dir}/"),
                };
                Instruction::copy(file.context_path(), destination)
            }))
            .push(Instruction::Run(format!("bash /home/{}", script::PREPARE)))
            .extend(self.cleared_env());

        Image::builder()
            .name(self.image_name())
            .tag(format!("pr-{}", self.pr.number))
            .dependency(Dependency::Image(Box::new(base)))
            .files(files)
            .dockerfile(dockerfile)
            .build()
    }

    /// Files copied into the instance image: patches, scripts, and the
    /// catalog's extra files.
    pub fn files(&self) -> Vec<File> {
        let vars = variables(&self.pr);
        let repo = &self.spec.repo;
        let prepare = self
            .spec
            .prepare
            .iter()
            .map(|step| interpolate(step, &vars))
            .collect::<Vec<_>>();
        let test = self
            .spec
            .test
            .iter()
            .map(|line| interpolate(line, &vars))
            .collect::<Vec<_>>();

        let mut files = vec![
            File::builder()
                .name(script::FIX_PATCH)
                .content(self.pr.fix_patch.clone())
                .build(),
            File::builder()
                .name(script::TEST_PATCH)
                .content(self.pr.test_patch.clone())
                .build(),
            script::check_git_changes(),
            script::prepare(repo, &self.pr.base.sha, &prepare),
            script::run(repo, &test),
            script::test_run(repo, &test),
            script::fix_run(repo, &test),
        ];
        files.extend(self.spec.files.iter().cloned());
        files
    }

    /// Command that runs the tests on the base commit.
    pub fn run_cmd(&self) -> String {
        format!("bash /home/{}", script::RUN)
    }

    /// Command that applies the test patch and runs the tests.
    pub fn test_patch_run_cmd(&self) -> String {
        format!("bash /home/{}", script::TEST_RUN)
    }

    /// Command that applies both patches and runs the tests.
    pub fn fix_patch_run_cmd(&self) -> String {
        format!("bash /home/{}", script::FIX_RUN)
    }

    /// The command for a stage.
    pub fn command(&self, stage: Stage) -> String {
        match stage {
            Stage::Run => self.run_cmd(),
            Stage::Test => self.test_patch_run_cmd(),
            Stage::Fix => self.fix_patch_run_cmd(),
        }
    }

    /// Parse the console log of any stage.
    #[tracing::instrument(skip(self, log), fields(instance = %self.id()))]
    pub fn parse_log(&self, log: &str) -> TestResult {
        self.spec.parser.parse(log)
    }

    /// Directory holding this instance's stage logs under `root`:
    /// `root/<org>__<repo>-<number>`.
    pub fn log_dir(&self, root: &Path) -> PathBuf {
        root.join(self.id().dir_name())
    }

    /// Parse the stage logs stored under `root` and compare them.
    ///
    /// A missing log counts as a stage that produced no output.
    #[tracing::instrument(skip(self), fields(instance = %self.id()))]
    pub fn evaluate(&self, root: &Path) -> Result<Report> {
        let dir = self.log_dir(root);
        let [run, test, fix] = Stage::ALL.map(|stage| {
            let path = dir.join(stage.log_file());
            match read_to_string(&path) {
                Ok(log) => Ok(self.parse_log(&log)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::warn!(?path, "stage log not found");
                    Ok(TestResult::default())
                }
                Err(e) => Err(e).with_context(|| format!("read stage log: {path:?}")),
            }
        });
        Ok(Report::new(&self.pr, run?, test?, fix?))
    }

    fn global_env(&self) -> Vec<Instruction> {
        self.global_env
            .iter()
            .map(|(key, value)| Instruction::env(key, value))
            .collect()
    }

    fn cleared_env(&self) -> Vec<Instruction> {
        if !self.config.clear_env {
            return Vec::new();
        }
        self.global_env
            .iter()
            .map(|(key, _)| Instruction::env(key, ""))
            .collect()
    }
}
