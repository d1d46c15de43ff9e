//! User configuration: which environments exist and how to reach them.
//!
//! # Storage layout
//!
//! ```text
//! ~/.apivcs/
//!   config.yaml
//! ```
//!
//! Every function has an `_at(home, …)` form; tests always use it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use apivcs_sync::DEFAULT_WORKERS;

const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workers: usize,
    /// `0` leaves remote calls unbounded.
    pub call_timeout_secs: u64,
    pub deletion_enabled: bool,
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            deletion_enabled: true,
            environments: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    Directory,
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub kind: EnvironmentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Repository id this environment expects to be pushed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    /// Deployment repository holding this environment's params.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_path: Option<PathBuf>,
}

/// Validated connection target of an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Directory(PathBuf),
    Http(String),
}

impl EnvironmentConfig {
    pub fn target(&self) -> Result<Target> {
        match self.kind {
            EnvironmentKind::Directory => match &self.path {
                Some(path) => Ok(Target::Directory(path.clone())),
                None => bail!("a directory environment needs a `path`"),
            },
            EnvironmentKind::Http => match &self.url {
                Some(url) => Ok(Target::Http(url.trim_end_matches('/').to_string())),
                None => bail!("an http environment needs a `url`"),
            },
        }
    }

    /// `path` or `url`, for listings.
    pub fn location(&self) -> String {
        match (&self.path, &self.url) {
            (Some(path), _) if self.kind == EnvironmentKind::Directory => {
                path.display().to_string()
            }
            (_, Some(url)) if self.kind == EnvironmentKind::Http => url.clone(),
            _ => "(missing)".to_string(),
        }
    }
}

impl Config {
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }

    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig> {
        self.environments.get(name).with_context(|| {
            format!("environment '{name}' is not configured; add it to ~/.apivcs/config.yaml")
        })
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.apivcs/config.yaml` (pure, no I/O).
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".apivcs").join("config.yaml")
}

/// Load the configuration; a missing file yields the defaults.
pub fn load_at(home: &Path) -> Result<Config> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).with_context(|| format!("invalid config at {}", path.display()))
}

/// Load from the current user's home directory.
pub fn load() -> Result<Config> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}
