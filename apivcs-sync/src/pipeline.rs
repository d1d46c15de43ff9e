//! Shared entrypoints used by the CLI: status and deploy.

use std::path::Path;

use serde::Serialize;

use apivcs_core::{EnvironmentName, RevType};

use crate::api::ManagementApi;
use crate::detect::{detect_with, ClassifiedProject, RepoOptions};
use crate::error::SyncError;
use crate::execute::PushResult;
use crate::push::{push, PushOptions};
use crate::rollback::rollback;

/// What happened after the push half of a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RollbackStatus {
    /// The push succeeded.
    NotNeeded,
    /// The push failed and the caller asked not to roll back.
    Skipped,
    /// The push failed and no successful revision exists to return to.
    Unavailable { reason: String },
    Completed { result: PushResult },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployResult {
    pub push: PushResult,
    pub rollback: RollbackStatus,
}

impl DeployResult {
    /// `true` when the push itself went through.
    pub fn success(&self) -> bool {
        self.push.success
    }
}

/// Classify the working tree against `rev_type`, after the repo id check.
pub fn status(
    root: &Path,
    environment: &EnvironmentName,
    rev_type: RevType,
    repo: &RepoOptions,
) -> Result<Vec<ClassifiedProject>, SyncError> {
    let classified = detect_with(root, environment, rev_type, repo)?;
    tracing::debug!(
        "{} of {} project(s) differ from {} of '{}'",
        classified.iter().filter(|c| c.is_change()).count(),
        classified.len(),
        rev_type,
        environment
    );
    Ok(classified)
}

/// Push, and on any project failure roll back unless `skip_rollback`.
pub fn deploy<A>(
    root: &Path,
    environment: &EnvironmentName,
    api: &A,
    options: &PushOptions,
    skip_rollback: bool,
) -> Result<DeployResult, SyncError>
where
    A: ManagementApi + ?Sized,
{
    let pushed = push(root, environment, api, options)?;
    if pushed.success {
        return Ok(DeployResult {
            push: pushed,
            rollback: RollbackStatus::NotNeeded,
        });
    }
    if skip_rollback {
        tracing::warn!("push to '{}' failed; rollback skipped", environment);
        return Ok(DeployResult {
            push: pushed,
            rollback: RollbackStatus::Skipped,
        });
    }

    tracing::warn!("push to '{}' failed; rolling back", environment);
    let rollback = match rollback(root, environment, api, options) {
        Ok(result) => RollbackStatus::Completed { result },
        Err(err @ SyncError::NoSuccessfulRevision { .. }) => {
            tracing::warn!("{}", err);
            RollbackStatus::Unavailable {
                reason: err.to_string(),
            }
        }
        Err(err) => return Err(err),
    };
    Ok(DeployResult {
        push: pushed,
        rollback,
    })
}
