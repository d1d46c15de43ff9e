pub mod deploy;
pub mod env;
pub mod init;
pub mod push;
pub mod report;
pub mod rollback;
pub mod status;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use apivcs_core::EnvironmentName;
use apivcs_sync::{ManagementApi, PushOptions, RepoOptions};

use crate::config::EnvironmentConfig;
use crate::{config, remote};

/// Flags shared by `push`, `deploy` and `rollback`.
#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Target environment, as named in ~/.apivcs/config.yaml.
    #[arg(long, short = 'e', value_name = "ENV")]
    pub environment: String,

    /// Repository root (defaults to the current directory).
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Maximum concurrent remote calls.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-call timeout in seconds (0 = unbounded).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Refuse to run unless the repository carries this id.
    #[arg(long, value_name = "ID")]
    pub repo_id: Option<String>,

    /// Deployment repository with environment-specific params.
    #[arg(long, value_name = "PATH")]
    pub deployment_repo: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

/// Everything a push-like command needs, resolved from flags and config.
pub struct Session {
    pub root: PathBuf,
    pub environment: EnvironmentName,
    pub api: Box<dyn ManagementApi>,
    pub options: PushOptions,
}

impl EngineArgs {
    pub fn session(&self) -> Result<Session> {
        let config = config::load()?;
        let env_config = config.environment(&self.environment)?;
        let api = remote::connect(env_config)
            .with_context(|| format!("environment '{}' is misconfigured", self.environment))?;

        let call_timeout = match self.timeout {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => config.call_timeout(),
        };
        let options = PushOptions {
            workers: self.workers.unwrap_or(config.workers).max(1),
            call_timeout,
            deletion_enabled: config.deletion_enabled,
            repo: repo_options(
                Some(env_config),
                self.repo_id.clone(),
                self.deployment_repo.as_deref(),
            )?,
            ..PushOptions::default()
        };

        Ok(Session {
            root: resolve_root(self.repo.as_deref())?,
            environment: EnvironmentName::from(self.environment.as_str()),
            api,
            options,
        })
    }
}

/// Repository id and deployment overlay: flags first, then the environment's
/// configuration.
pub fn repo_options(
    env_config: Option<&EnvironmentConfig>,
    repo_id: Option<String>,
    deployment_repo: Option<&Path>,
) -> Result<RepoOptions> {
    let deployment = deployment_repo
        .map(Path::to_path_buf)
        .or_else(|| env_config.and_then(|env| env.deployment_path.clone()));
    let deployment_root = match deployment {
        Some(path) => Some(
            path.canonicalize()
                .with_context(|| format!("cannot resolve deployment repository '{}'", path.display()))?,
        ),
        None => None,
    };
    Ok(RepoOptions {
        expected_repo_id: repo_id.or_else(|| env_config.and_then(|env| env.repo_id.clone())),
        deployment_root,
    })
}

/// Canonical repository root: `repo` or the current directory.
pub fn resolve_root(repo: Option<&Path>) -> Result<PathBuf> {
    let path = match repo {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("could not determine current directory")?,
    };
    let root = path
        .canonicalize()
        .with_context(|| format!("cannot resolve path '{}'", path.display()))?;
    tracing::debug!(root = %root.display(), "resolved repository root");
    Ok(root)
}
