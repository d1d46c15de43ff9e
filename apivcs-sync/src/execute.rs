//! Plan execution shared by push and rollback.
//!
//! A plan is a list of classified projects. Execution sends every change to
//! the collaborator, collects one result per project, records the attempt in
//! the ledger and persists it. A plan without changes is still recorded, so
//! every push advances the revision. Remote failures stay per-project; only
//! ledger persistence can fail the whole call at this stage. Snapshots no
//! longer referenced by the ledger are pruned afterwards.
//!
//! Changes go out in dependency phases. Saves run in grouping order (APIs,
//! then API Products, then Applications) and deletes in the reverse order,
//! so a product is never imported before its APIs nor an API deleted while a
//! product still references it. Within a phase calls run concurrently.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use apivcs_core::{ledger, EnvironmentName, Ledger, ProjectKey, ProjectOutcome, ProjectType};

use crate::api::{CallContext, ManagementApi, ProjectPayload, RemoteError};
use crate::detect::Action;
use crate::error::SyncError;
use crate::pool::run_jobs;
use crate::push::PushOptions;
use crate::snapshot;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one project within a push or rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectResult {
    pub key: ProjectKey,
    pub relative_path: String,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params_fingerprint: Option<String>,
    pub action: Action,
    pub previously_failed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome of a whole push or rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushResult {
    pub environment: EnvironmentName,
    /// Revision recorded by this call; `None` for a rollback that found the
    /// environment already at its target.
    pub revision: Option<u64>,
    pub success: bool,
    pub projects: Vec<ProjectResult>,
}

impl PushResult {
    /// Projects with `action` that went through.
    pub fn count(&self, action: Action) -> usize {
        self.projects
            .iter()
            .filter(|p| p.action == action && !p.failed)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProjectResult> {
        self.projects.iter().filter(|p| p.failed)
    }

    /// `true` when nothing had to be sent.
    pub fn is_noop(&self) -> bool {
        self.projects.iter().all(|p| p.action == Action::Unchanged)
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Where the content of a `Save` comes from.
#[derive(Debug)]
pub(crate) enum Content {
    /// Unchanged or deleted; nothing to send.
    None,
    Ready(ProjectPayload),
    /// Content could not be obtained; the project fails without a remote call.
    Unavailable(String),
}

#[derive(Debug)]
pub(crate) struct PlannedProject {
    pub key: ProjectKey,
    pub relative_path: String,
    pub fingerprint: String,
    pub params_fingerprint: Option<String>,
    pub action: Action,
    pub previously_failed: bool,
    pub content: Content,
}

impl PlannedProject {
    fn result(self, failed: bool, reason: Option<String>) -> ProjectResult {
        ProjectResult {
            key: self.key,
            relative_path: self.relative_path,
            fingerprint: self.fingerprint,
            params_fingerprint: self.params_fingerprint,
            action: self.action,
            previously_failed: self.previously_failed,
            failed,
            reason,
        }
    }
}

enum Job {
    Import(ProjectPayload),
    Delete,
}

/// Per-project result of the remote phase.
struct Sent {
    fingerprint: String,
    params_fingerprint: Option<String>,
    error: Option<String>,
}

impl Sent {
    fn failed(planned: &PlannedProject, reason: String) -> Self {
        Self {
            fingerprint: planned.fingerprint.clone(),
            params_fingerprint: planned.params_fingerprint.clone(),
            error: Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Successful result for a plan with nothing to send. Records nothing.
pub(crate) fn unchanged(environment: &EnvironmentName, plan: Vec<PlannedProject>) -> PushResult {
    PushResult {
        environment: environment.clone(),
        revision: None,
        success: true,
        projects: plan.into_iter().map(|p| p.result(false, None)).collect(),
    }
}

/// Run `plan` against `environment`, then record and persist the attempt.
pub(crate) fn execute<A>(
    root: &Path,
    environment: &EnvironmentName,
    api: &A,
    options: &PushOptions,
    ledger: &mut Ledger,
    plan: Vec<PlannedProject>,
) -> Result<PushResult, SyncError>
where
    A: ManagementApi + ?Sized,
{
    let sent = if plan.iter().any(|p| p.action != Action::Unchanged) {
        send_changes(root, environment, api, options, &plan)
    } else {
        tracing::info!("'{}' is up to date; nothing to send", environment);
        BTreeMap::new()
    };

    let mut outcomes = BTreeMap::new();
    let mut projects = Vec::with_capacity(plan.len());
    for mut planned in plan {
        let error = match sent.get(&planned.key) {
            Some(s) => {
                planned.fingerprint = s.fingerprint.clone();
                planned.params_fingerprint = s.params_fingerprint.clone();
                s.error.clone()
            }
            None => None,
        };
        let failed = error.is_some();

        // A delete that went through leaves nothing to record.
        if !(planned.action == Action::Delete && !failed) {
            outcomes.insert(
                planned.key.clone(),
                ProjectOutcome {
                    relative_path: planned.relative_path.clone(),
                    fingerprint: planned.fingerprint.clone(),
                    params_fingerprint: planned.params_fingerprint.clone(),
                    pushed: planned.action == Action::Save && !failed,
                    failed,
                    reason: error.clone(),
                },
            );
        }
        projects.push(planned.result(failed, error));
    }

    let revision = ledger.record_attempt(environment, outcomes).revision;
    ledger::save(root, ledger)?;
    match snapshot::prune(root, ledger) {
        Ok(0) => {}
        Ok(removed) => tracing::debug!("pruned {} unreferenced snapshot(s)", removed),
        Err(err) => tracing::warn!("could not prune snapshots: {}", err),
    }

    let success = projects.iter().all(|p| !p.failed);
    Ok(PushResult {
        environment: environment.clone(),
        revision: Some(revision),
        success,
        projects,
    })
}

/// Send every change in dependency phases; one [`Sent`] per changed project.
fn send_changes<A>(
    root: &Path,
    environment: &EnvironmentName,
    api: &A,
    options: &PushOptions,
    plan: &[PlannedProject],
) -> BTreeMap<ProjectKey, Sent>
where
    A: ManagementApi + ?Sized,
{
    let mut sent = BTreeMap::new();
    let mut saves: BTreeMap<ProjectType, Vec<(ProjectKey, Job)>> = BTreeMap::new();
    let mut deletes: BTreeMap<ProjectType, Vec<(ProjectKey, Job)>> = BTreeMap::new();

    for planned in plan {
        match (&planned.action, &planned.content) {
            (Action::Unchanged, _) => {}
            (Action::Save, Content::Ready(payload)) => saves
                .entry(planned.key.project_type)
                .or_default()
                .push((planned.key.clone(), Job::Import(payload.clone()))),
            (Action::Save, Content::Unavailable(reason)) => {
                tracing::warn!("{}: {}", planned.key, reason);
                sent.insert(planned.key.clone(), Sent::failed(planned, reason.clone()));
            }
            (Action::Save, Content::None) => {
                sent.insert(
                    planned.key.clone(),
                    Sent::failed(planned, "no content to send".to_string()),
                );
            }
            (Action::Delete, _) => deletes
                .entry(planned.key.project_type)
                .or_default()
                .push((planned.key.clone(), Job::Delete)),
        }
    }

    let phases = ProjectType::all()
        .iter()
        .filter_map(|t| saves.remove(t))
        .chain(ProjectType::all().iter().rev().filter_map(|t| deletes.remove(t)));

    for jobs in phases {
        let results = run_jobs(jobs, options.workers, &options.cancel, |key, job| {
            let ctx = CallContext::new(options.call_timeout, options.cancel.clone());
            match job {
                Job::Import(payload) => api.import_project(&ctx, environment, payload),
                Job::Delete => {
                    match api.delete_project(&ctx, environment, key.project_type, &key.name) {
                        Err(RemoteError::NotFound) => {
                            tracing::debug!("{} was already absent from '{}'", key, environment);
                            Ok(())
                        }
                        other => other,
                    }
                }
            }
        });

        for (key, (job, result)) in results {
            let (fingerprint, params_fingerprint) = match &job {
                Job::Import(payload) => {
                    (payload.fingerprint.clone(), payload.params_fingerprint.clone())
                }
                Job::Delete => plan
                    .iter()
                    .find(|p| p.key == key)
                    .map(|p| (p.fingerprint.clone(), p.params_fingerprint.clone()))
                    .unwrap_or_default(),
            };
            let error = match (job, result) {
                (Job::Import(payload), Ok(())) => {
                    tracing::info!("saved {} to '{}'", key, environment);
                    if let Err(err) = snapshot::store(root, &payload) {
                        tracing::warn!("could not snapshot {}: {}", key, err);
                    }
                    None
                }
                (Job::Delete, Ok(())) => {
                    tracing::info!("deleted {} from '{}'", key, environment);
                    None
                }
                (_, Err(err)) => {
                    tracing::warn!("{} failed on '{}': {}", key, environment, err);
                    Some(err.to_string())
                }
            };
            sent.insert(
                key,
                Sent {
                    fingerprint,
                    params_fingerprint,
                    error,
                },
            );
        }
    }

    sent
}
