//! Push: send the local changes since `last_attempted` to an environment.

use std::path::Path;
use std::time::Duration;

use apivcs_core::{EnvironmentName, RevType};

use crate::api::{CancelToken, ManagementApi, ProjectPayload};
use crate::detect::{classify, Action, ClassifiedProject, RepoOptions};
use crate::error::SyncError;
use crate::execute::{execute, Content, PlannedProject, PushResult};

/// Worker count used when the caller does not set one.
pub const DEFAULT_WORKERS: usize = 4;

/// Knobs shared by push, rollback and deploy.
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Upper bound on concurrent remote calls.
    pub workers: usize,
    /// Per-call deadline; `None` leaves calls unbounded.
    pub call_timeout: Option<Duration>,
    pub cancel: CancelToken,
    /// When `false`, a push that would delete anything fails before any call.
    pub deletion_enabled: bool,
    /// Repository id check and deployment overlay.
    pub repo: RepoOptions,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            call_timeout: None,
            cancel: CancelToken::new(),
            deletion_enabled: true,
            repo: RepoOptions::default(),
        }
    }
}

/// Push every change in `root` to `environment`.
///
/// Fatal errors (uninitialized repository, repo id mismatch, scan failure,
/// deletions while disabled, unreadable project content) abort before any
/// remote call and leave the ledger untouched. Remote failures are recorded
/// per project and reported through [`PushResult::success`]. Every other
/// push records a new revision, even when there was nothing to send.
pub fn push<A>(
    root: &Path,
    environment: &EnvironmentName,
    api: &A,
    options: &PushOptions,
) -> Result<PushResult, SyncError>
where
    A: ManagementApi + ?Sized,
{
    let (mut ledger, local) = options.repo.open(root)?;
    let classified = classify(&ledger, environment, RevType::LastAttempted, local);

    if !options.deletion_enabled {
        let removed: Vec<String> = classified
            .iter()
            .filter(|c| c.action == Action::Delete)
            .map(|c| c.key.to_string())
            .collect();
        if !removed.is_empty() {
            return Err(SyncError::DeletionDisabled { projects: removed });
        }
    }

    let plan = classified
        .into_iter()
        .map(plan_local)
        .collect::<Result<Vec<_>, _>>()?;

    let changes = plan.iter().filter(|p| p.action != Action::Unchanged).count();
    tracing::info!(
        "pushing {} change(s) to '{}' with {} worker(s)",
        changes,
        environment,
        options.workers.max(1)
    );
    execute(root, environment, api, options, &mut ledger, plan)
}

/// Read the content of a local `Save`.
fn plan_local(classified: ClassifiedProject) -> Result<PlannedProject, SyncError> {
    let content = match (&classified.action, &classified.project) {
        (Action::Save, Some(project)) => Content::Ready(ProjectPayload::read(project)?),
        _ => Content::None,
    };
    Ok(PlannedProject {
        key: classified.key,
        relative_path: classified.relative_path,
        fingerprint: classified.fingerprint,
        params_fingerprint: classified.params_fingerprint,
        action: classified.action,
        previously_failed: classified.previously_failed,
        content,
    })
}
