use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ChangelogError;
use crate::github::LabelRules;
use crate::notes::{default_categories, Category, ReleaseCategories, DEFAULT_CATCH_ALL};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub head: String,
    /// Stable version whose backports are assumed released, e.g. `1.0`
    #[serde(default)]
    pub last_stable: String,
    #[serde(default)]
    pub state_file: PathBuf,
    /// Repository as `owner/name`
    #[serde(default)]
    pub repo: String,
    /// Let "pending" backports count as backported to their branch
    #[serde(default)]
    pub force_move_pending: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelConfig {
    #[serde(flatten)]
    pub rules: LabelRules,
    #[serde(default = "default_catch_all")]
    pub catch_all: String,
}

/// Configuration that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub base: String,
    pub head: String,
    pub last_stable: String,
    pub state_file: PathBuf,
    pub owner: String,
    pub repo: String,
    pub force_move_pending: bool,
    pub rules: LabelRules,
    pub categories: ReleaseCategories,
}

impl Config {
    /// Load configuration from the given path, or from the default location
    /// when it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = Self::default_config_path()?;
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?;

        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("gh-changelog").join("config.toml"))
    }

    /// Check every field needed for a run
    pub fn validate(&self) -> Result<ValidatedConfig, ChangelogError> {
        let run = &self.run;

        let (owner, repo) = split_repo(&run.repo)?;

        if run.base.is_empty() {
            return Err(ChangelogError::Config("--base can't be empty".to_string()));
        }
        if run.head.is_empty() {
            return Err(ChangelogError::Config("--head can't be empty".to_string()));
        }
        if run.state_file.as_os_str().is_empty() {
            return Err(ChangelogError::Config(
                "--state-file can't be empty".to_string(),
            ));
        }
        if run.last_stable.contains('v') {
            return Err(ChangelogError::Config(format!(
                "--last-stable can't contain letters, should be of the format 'x.y' (got {})",
                run.last_stable
            )));
        }

        let categories = ReleaseCategories::new(self.categories.clone(), &self.labels.catch_all)
            .map_err(|e| ChangelogError::Config(e.to_string()))?;

        let state_file =
            expand_tilde(&run.state_file).map_err(|e| ChangelogError::Config(e.to_string()))?;

        Ok(ValidatedConfig {
            base: run.base.clone(),
            head: run.head.clone(),
            last_stable: run.last_stable.clone(),
            state_file,
            owner,
            repo,
            force_move_pending: run.force_move_pending,
            rules: self.labels.rules.clone(),
            categories,
        })
    }
}

impl ValidatedConfig {
    pub fn repo_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            run: RunConfig::default(),
            labels: LabelConfig::default(),
            categories: default_categories(),
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            rules: LabelRules::default(),
            catch_all: default_catch_all(),
        }
    }
}

fn default_catch_all() -> String {
    DEFAULT_CATCH_ALL.to_string()
}

/// Split `owner/name` into its two parts
fn split_repo(name: &str) -> Result<(String, String), ChangelogError> {
    let parts: Vec<&str> = name.split('/').collect();
    match parts.as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(ChangelogError::Config(format!(
            "Invalid repo name: {:?}, expected owner/name",
            name
        ))),
    }
}

/// Expand tilde in paths to home directory
fn expand_tilde(path: &Path) -> Result<PathBuf> {
    if let Some(s) = path.to_str() {
        if let Some(rest) = s.strip_prefix("~/") {
            let home = dirs::home_dir().context("Could not determine home directory")?;
            return Ok(home.join(rest));
        }
    }
    Ok(path.to_path_buf())
}
