//! Rollback: converge an environment back to its `last_successful` revision.
//!
//! The target is `last_successful`; the presumed remote state is
//! `last_attempted`. A target project is re-sent when it is missing from the
//! current entry, recorded with other content or params, or recorded as
//! failed.
//! A current project absent from the target is deleted. Deletion is always
//! allowed here, whatever the push-time switch says.
//!
//! Content for a re-send comes from the working tree when the local project
//! and its deployment params still hash to the target fingerprints, otherwise
//! from the snapshot store. A project whose content is in neither fails on
//! its own.

use std::collections::HashMap;
use std::path::Path;

use apivcs_core::{EnvironmentName, LedgerEntry, ProjectKey, ProjectOutcome, RevType};
use apivcs_detector::TrackedProject;

use crate::api::{ManagementApi, ProjectPayload};
use crate::detect::Action;
use crate::error::SyncError;
use crate::execute::{execute, unchanged, Content, PlannedProject, PushResult};
use crate::push::PushOptions;
use crate::snapshot;

/// Restore `environment` to its last successful revision.
///
/// Fails with [`SyncError::NoSuccessfulRevision`] when none is recorded.
/// When the environment already matches the target, returns a successful
/// no-op result and leaves the ledger untouched.
pub fn rollback<A>(
    root: &Path,
    environment: &EnvironmentName,
    api: &A,
    options: &PushOptions,
) -> Result<PushResult, SyncError>
where
    A: ManagementApi + ?Sized,
{
    let (mut ledger, scanned) = options.repo.open(root)?;

    let target = ledger
        .entry(environment, RevType::LastSuccessful)
        .cloned()
        .ok_or_else(|| SyncError::NoSuccessfulRevision {
            environment: environment.clone(),
        })?;
    let current = ledger.baseline(environment, RevType::LastAttempted);

    let local: HashMap<ProjectKey, TrackedProject> = scanned
        .into_iter()
        .map(|p| (p.key.clone(), p))
        .collect();

    let mut plan = Vec::new();
    for (key, wanted) in target.iter() {
        let recorded = current.get(&key);
        let previously_failed = recorded.map_or(false, |o| o.failed);
        let action = match recorded {
            Some(o)
                if o.fingerprint == wanted.fingerprint
                    && o.params_fingerprint == wanted.params_fingerprint
                    && !o.failed =>
            {
                Action::Unchanged
            }
            _ => Action::Save,
        };
        let content = match action {
            Action::Save => restore_content(root, &key, wanted, local.get(&key))?,
            _ => Content::None,
        };
        plan.push(PlannedProject {
            key,
            relative_path: wanted.relative_path.clone(),
            fingerprint: wanted.fingerprint.clone(),
            params_fingerprint: wanted.params_fingerprint.clone(),
            action,
            previously_failed,
            content,
        });
    }
    plan.extend(deletions(&target, &current));
    plan.sort_by(|a, b| a.key.cmp(&b.key));

    if plan.iter().all(|p| p.action == Action::Unchanged) {
        tracing::info!(
            "'{}' already matches revision {}; nothing to roll back",
            environment,
            target.revision
        );
        return Ok(unchanged(environment, plan));
    }

    tracing::info!(
        "rolling '{}' back to revision {}",
        environment,
        target.revision
    );
    execute(root, environment, api, options, &mut ledger, plan)
}

/// Projects present in `current` but not in `target`.
fn deletions(target: &LedgerEntry, current: &LedgerEntry) -> Vec<PlannedProject> {
    current
        .iter()
        .filter(|(key, _)| !target.contains(key))
        .map(|(key, recorded)| PlannedProject {
            key,
            relative_path: recorded.relative_path.clone(),
            fingerprint: recorded.fingerprint.clone(),
            params_fingerprint: recorded.params_fingerprint.clone(),
            action: Action::Delete,
            previously_failed: recorded.failed,
            content: Content::None,
        })
        .collect()
}

/// Bytes of `key` at the target fingerprint: working tree first, then snapshot.
fn restore_content(
    root: &Path,
    key: &ProjectKey,
    wanted: &ProjectOutcome,
    local: Option<&TrackedProject>,
) -> Result<Content, SyncError> {
    let matches = |fingerprint: &str, params: Option<&str>| {
        fingerprint == wanted.fingerprint && params == wanted.params_fingerprint.as_deref()
    };
    if let Some(project) = local.filter(|p| matches(&p.fingerprint, p.params_fingerprint())) {
        let payload = ProjectPayload::read(project)?;
        if matches(&payload.fingerprint, payload.params_fingerprint.as_deref()) {
            return Ok(Content::Ready(payload));
        }
    }
    match snapshot::load(
        root,
        key,
        &wanted.relative_path,
        &wanted.fingerprint,
        wanted.params_fingerprint.as_deref(),
    )? {
        Some(payload) => Ok(Content::Ready(payload)),
        None => Ok(Content::Unavailable(format!(
            "no content available for fingerprint {}",
            short(&wanted.fingerprint)
        ))),
    }
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
