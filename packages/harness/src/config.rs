//! Harness configuration and config file discovery.

use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bon::Builder;
use color_eyre::{
    SectionExt,
    eyre::{Context, Result, bail},
};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tap::Tap;

/// Name of the project-level config file.
pub const CONFIG_FILE: &str = "harness.toml";

/// Settings shared by every image and instance the harness generates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Builder)]
#[non_exhaustive]
pub struct Config {
    /// Registry namespace prefixed to every image name.
    #[builder(into, default = String::from("harness"))]
    pub namespace: String,

    /// Directory containing the repository catalog.
    #[builder(into)]
    pub catalog_dir: Option<PathBuf>,

    /// Clone the repository from GitHub inside the base image; otherwise the
    /// build context must contain a checkout named after the repository.
    #[builder(default = true)]
    pub need_clone: bool,

    /// `KEY=VALUE` pairs set in every image.
    #[builder(default)]
    pub global_env: Vec<String>,

    /// Reset `global_env` at the end of each image, so the variables apply
    /// only while building.
    #[builder(default)]
    pub clear_env: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A config file as written on disk; every field is optional so that files
/// can be layered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub namespace: Option<String>,
    pub catalog_dir: Option<PathBuf>,
    pub need_clone: Option<bool>,
    pub global_env: Option<Vec<String>>,
    pub clear_env: Option<bool>,
}

impl Config {
    /// Overlay the fields set in `file` onto this config.
    pub fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(namespace) = file.namespace {
            self.namespace = namespace;
        }
        if let Some(catalog_dir) = file.catalog_dir {
            self.catalog_dir = Some(catalog_dir);
        }
        if let Some(need_clone) = file.need_clone {
            self.need_clone = need_clone;
        }
        if let Some(global_env) = file.global_env {
            self.global_env = global_env;
        }
        if let Some(clear_env) = file.clear_env {
            self.clear_env = clear_env;
        }
        self
    }

    /// `global_env` split into keys and values.
    pub fn env_pairs(&self) -> Result<Vec<(&str, &str)>> {
        self.global_env
            .iter()
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
                _ => bail!("global_env entry {entry:?} is not of the form KEY=VALUE"),
            })
            .collect()
    }
}

/// Get the project directories for the application.
#[tracing::instrument]
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "harness", "harness")
}

/// Load the effective config.
///
/// Loading order (later files override earlier ones field by field):
/// 1. User-level config from `ProjectDirs::config_dir()/harness.toml`
/// 2. `harness.toml` in the current directory
/// 3. `explicit`, if given; unlike the others it must exist
#[tracing::instrument]
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join(CONFIG_FILE);
        if let Some(file) = load_from(&user_config)
            .with_context(|| format!("load user config: {user_config:?}"))?
        {
            config = config.merge(file);
        }
    }

    let project_config = Path::new(CONFIG_FILE);
    if let Some(file) = load_from(project_config)
        .with_context(|| format!("load project config: {project_config:?}"))?
    {
        config = config.merge(file);
    }

    if let Some(path) = explicit {
        match load_from(path).with_context(|| format!("load config: {path:?}"))? {
            Some(file) => config = config.merge(file),
            None => bail!("config file not found: {path:?}"),
        }
    }

    config.env_pairs().context("validate global_env")?;
    Ok(config)
}

/// Load a single config file, returning `None` if it does not exist.
#[tracing::instrument]
pub fn load_from(path: &Path) -> Result<Option<ConfigFile>> {
    let content = match read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context(format!("read config file: {path:?}")),
    };

    toml::from_str::<ConfigFile>(&content)
        .with_context(|| format!("parse config file: {path:?}"))
        .with_context(|| content.header("File content:"))
        .tap(|config| tracing::debug!(?config, "parsed config file"))
        .map(Some)
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use pretty_assertions::assert_eq as pretty_assert_eq;

    use super::*;

    #[test]
    fn test_load_nonexistent_file() {
        let file = load_from(Path::new("nonexistent.toml")).unwrap();
        assert!(file.is_none());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        pretty_assert_eq!(config.namespace, "harness");
        assert!(config.need_clone);
        assert!(!config.clear_env);
    }

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        write(
            &path,
            "namespace = \"acme\"\nglobal_env = [\"HTTP_PROXY=http://proxy:3128\"]\n",
        )
        .unwrap();

        let file = load_from(&path).unwrap().unwrap();
        let config = Config::default().merge(file);

        pretty_assert_eq!(config.namespace, "acme");
        assert!(config.need_clone);
        pretty_assert_eq!(
            config.env_pairs().unwrap(),
            [("HTTP_PROXY", "http://proxy:3128")]
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        write(&path, "namspace = \"typo\"\n").unwrap();
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn test_malformed_env_rejected() {
        let config = Config::builder().global_env(vec![String::from("NOEQUALS")]).build();
        assert!(config.env_pairs().is_err());
    }
}
