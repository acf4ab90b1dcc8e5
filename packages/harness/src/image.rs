//! Docker build recipes.
//!
//! An [`Image`] is a Dockerfile plus the files its build context needs. Images
//! form chains: an instance image is built `FROM` its repository's base
//! image, which is in turn built `FROM` some external image. [`Image::chain`]
//! yields the images in the order they must be built.

use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};

use bon::Builder;
use color_eyre::eyre::{Context, Result, bail};
use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A file placed in an image's build context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct File {
    /// Directory relative to the build context; empty for the context root.
    #[builder(into, default)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,

    #[builder(into)]
    pub name: String,

    #[builder(into)]
    pub content: String,
}

impl File {
    /// Path of the file relative to the build context.
    pub fn path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.name)
    }

    /// Path of the file relative to the build context, with forward slashes
    /// as Dockerfiles expect.
    pub fn context_path(&self) -> String {
        let dir = self.dir.trim_matches('/');
        if dir.is_empty() {
            self.name.clone()
        } else {
            format!("{dir}/{}", self.name)
        }
    }

    /// Reject names that would escape the build context.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("file name must not be empty");
        }
        if self.name.contains('/') {
            bail!("file name {:?} must not contain '/'; use `dir` instead", self.name);
        }
        if Path::new(&self.dir).is_absolute() || self.dir.split('/').any(|part| part == "..") {
            bail!("file dir {:?} must be relative and stay inside the build context", self.dir);
        }
        Ok(())
    }
}

/// A single Dockerfile instruction.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Instruction {
    #[display("FROM {_0}")]
    From(String),

    #[display("ARG {_0}")]
    Arg(String),

    #[display("ENV {key}={}", quote(value))]
    Env { key: String, value: String },

    #[display("WORKDIR {_0}")]
    Workdir(String),

    #[display("RUN {_0}")]
    Run(String),

    #[display("COPY {source} {destination}")]
    Copy { source: String, destination: String },
}

impl Instruction {
    pub fn env(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Env {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn copy(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::Copy {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Double-quote a Dockerfile `ENV` value.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// An ordered list of instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dockerfile(Vec<Instruction>);

impl Dockerfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.0.push(instruction);
        self
    }

    pub fn extend(&mut self, instructions: impl IntoIterator<Item = Instruction>) -> &mut Self {
        self.0.extend(instructions);
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }

    /// The external image this Dockerfile starts from, if any.
    pub fn from_image(&self) -> Option<&str> {
        self.0.iter().find_map(|instruction| match instruction {
            Instruction::From(image) => Some(image.as_str()),
            _ => None,
        })
    }
}

impl std::fmt::Display for Dockerfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.0.iter().join("\n"))
    }
}

impl FromIterator<Instruction> for Dockerfile {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What an image is built on top of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// An image pulled from a registry, e.g. `python:3.11-slim`.
    External(String),

    /// Another image generated by the harness.
    Image(Box<Image>),
}

impl Dependency {
    /// The reference used in the `FROM` line.
    pub fn reference(&self) -> String {
        match self {
            Self::External(reference) => reference.clone(),
            Self::Image(image) => image.reference(),
        }
    }
}

/// A buildable image.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[non_exhaustive]
pub struct Image {
    /// Repository part of the reference, e.g. `harness/pallets_m_flask`.
    #[builder(into)]
    pub name: String,

    #[builder(into)]
    pub tag: String,

    pub dependency: Dependency,

    #[builder(default)]
    pub files: Vec<File>,

    pub dockerfile: Dockerfile,
}

impl Image {
    /// `name:tag`.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }

    /// This image and every generated image it depends on, in build order.
    pub fn chain(&self) -> Vec<&Image> {
        let mut chain = vec![self];
        let mut current = self;
        while let Dependency::Image(parent) = &current.dependency {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Write the `Dockerfile` and every file to a build context directory.
    #[tracing::instrument(skip(self), fields(image = %self.reference()))]
    pub fn write_context(&self, dir: &Path) -> Result<()> {
        create_dir_all(dir).with_context(|| format!("create build context: {dir:?}"))?;

        let dockerfile = dir.join("Dockerfile");
        write(&dockerfile, self.dockerfile.to_string())
            .with_context(|| format!("write dockerfile: {dockerfile:?}"))?;

        for file in &self.files {
            file.validate()
                .with_context(|| format!("validate file for {}", self.reference()))?;
            let path = dir.join(file.path());
            if let Some(parent) = path.parent() {
                create_dir_all(parent).with_context(|| format!("create directory: {parent:?}"))?;
            }
            write(&path, &file.content).with_context(|| format!("write file: {path:?}"))?;
        }

        tracing::debug!(files = self.files.len(), "wrote build context");
        Ok(())
    }

    /// Build context directory for this image under `root`:
    /// `root/<name>/<tag>`.
    pub fn context_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.name).join(&self.tag)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use indoc::indoc;
    use pretty_assertions::assert_eq as pretty_assert_eq;
    use simple_test_case::test_case;

    use super::*;

    fn base() -> Image {
        Image::builder()
            .name("harness/pallets_m_flask")
            .tag("base")
            .dependency(Dependency::External(String::from("python:3.11-slim")))
            .dockerfile(Dockerfile::from_iter([
                Instruction::From(String::from("python:3.11-slim")),
                Instruction::Workdir(String::from("/home/")),
            ]))
            .build()
    }

    fn instance() -> Image {
        let base = base();
        Image::builder()
            .name("harness/pallets_m_flask")
            .tag("pr-5012")
            .dockerfile(Dockerfile::from_iter([
                Instruction::From(base.reference()),
                Instruction::copy("run.sh", "/home/"),
                Instruction::Run(String::from("bash /home/prepare.sh")),
            ]))
            .dependency(Dependency::Image(Box::new(base)))
            .files(vec![
                File::builder().name("run.sh").content("pytest\n").build(),
                File::builder()
                    .dir("conf")
                    .name("pytest.ini")
                    .content("[pytest]\n")
                    .build(),
            ])
            .build()
    }

    #[test]
    fn test_render_dockerfile() {
        let dockerfile = Dockerfile::from_iter([
            Instruction::From(String::from("node:20")),
            Instruction::Arg(String::from("TARGETARCH")),
            Instruction::env("NODE_OPTIONS", "--max-old-space-size=4096"),
            Instruction::env("GREETING", r#"say "hi""#),
            Instruction::Workdir(String::from("/home/")),
            Instruction::Run(String::from("npm ci")),
            Instruction::copy("fix.patch", "/home/"),
        ]);

        pretty_assert_eq!(
            dockerfile.to_string(),
            indoc! {r#"
                FROM node:20
                ARG TARGETARCH
                ENV NODE_OPTIONS="--max-old-space-size=4096"
                ENV GREETING="say \"hi\""
                WORKDIR /home/
                RUN npm ci
                COPY fix.patch /home/
            "#}
        );
        pretty_assert_eq!(dockerfile.from_image(), Some("node:20"));
    }

    #[test]
    fn test_chain_is_build_order() {
        let image = instance();
        let chain = image.chain().into_iter().map(Image::reference).collect::<Vec<_>>();
        pretty_assert_eq!(
            chain,
            ["harness/pallets_m_flask:base", "harness/pallets_m_flask:pr-5012"]
        );
        pretty_assert_eq!(image.dependency.reference(), "harness/pallets_m_flask:base");
    }

    #[test]
    fn test_write_context() {
        let dir = tempfile::tempdir().unwrap();
        let image = instance();
        let context = image.context_dir(dir.path());
        image.write_context(&context).unwrap();

        let dockerfile = read_to_string(context.join("Dockerfile")).unwrap();
        assert!(dockerfile.starts_with("FROM harness/pallets_m_flask:base\n"));
        pretty_assert_eq!(read_to_string(context.join("run.sh")).unwrap(), "pytest\n");
        pretty_assert_eq!(
            read_to_string(context.join("conf/pytest.ini")).unwrap(),
            "[pytest]\n"
        );
        pretty_assert_eq!(image.files[1].context_path(), "conf/pytest.ini");
    }

    #[test_case("", "run.sh"; "root")]
    #[test_case("conf/nested", "a.ini"; "nested dir")]
    #[test]
    fn test_valid_files(dir: &str, name: &str) {
        let file = File::builder().dir(dir).name(name).content("").build();
        assert!(file.validate().is_ok());
    }

    #[test_case("", ""; "empty name")]
    #[test_case("", "a/b.sh"; "slash in name")]
    #[test_case("/etc", "passwd"; "absolute dir")]
    #[test_case("../outside", "x"; "parent dir")]
    #[test]
    fn test_invalid_files(dir: &str, name: &str) {
        let file = File::builder().dir(dir).name(name).content("").build();
        assert!(file.validate().is_err());
    }
}
