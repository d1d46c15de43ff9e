//! Change detection: compare the local repository with a recorded revision.
//!
//! For every local project the decision against the chosen baseline is:
//!
//! | baseline record                        | action      |
//! |----------------------------------------|-------------|
//! | absent                                 | `Save`      |
//! | different fingerprint or params        | `Save`      |
//! | identical, recorded as failed          | `Save`      |
//! | identical, recorded as succeeded       | `Unchanged` |
//!
//! Projects recorded in the baseline but missing locally are `Delete`. Only
//! `last_attempted` ever records failures, so a failed project is retried
//! when diffing against it and not otherwise. `previously_failed` reports the
//! `last_attempted` record whatever baseline was chosen.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use apivcs_core::{ledger, EnvironmentName, Ledger, LedgerEntry, ProjectKey, RevType};
use apivcs_detector::{apply_deployment, scan_repository, TrackedProject};

use crate::error::SyncError;

/// What the push engine will do with a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Unchanged,
    Save,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Unchanged => "unchanged",
            Action::Save => "save",
            Action::Delete => "delete",
        })
    }
}

/// One project with its classification against a baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedProject {
    pub key: ProjectKey,
    /// Local path for `Save`/`Unchanged`; the recorded path for `Delete`.
    pub relative_path: String,
    /// Local fingerprint for `Save`/`Unchanged`; the recorded one for `Delete`.
    pub fingerprint: String,
    /// Fingerprint of the deployment params, taken like `fingerprint`.
    pub params_fingerprint: Option<String>,
    pub action: Action,
    pub previously_failed: bool,
    /// The scanned project; `None` for deletions.
    pub project: Option<TrackedProject>,
}

impl ClassifiedProject {
    pub fn is_change(&self) -> bool {
        self.action != Action::Unchanged
    }
}

/// Repository-level settings shared by every engine entry point.
#[derive(Debug, Clone, Default)]
pub struct RepoOptions {
    /// Abort unless the ledger carries this repository id.
    pub expected_repo_id: Option<String>,
    /// Deployment repository whose params are overlaid on the scan.
    pub deployment_root: Option<PathBuf>,
}

impl RepoOptions {
    /// Load the ledger, check the repository id, then scan `root` and apply
    /// the deployment overlay.
    pub(crate) fn open(&self, root: &Path) -> Result<(Ledger, Vec<TrackedProject>), SyncError> {
        let ledger = ledger::load(root)?;
        ledger.verify_repo_id(self.expected_repo_id.as_deref())?;
        let mut local = scan_repository(root)?;
        if let Some(deployment_root) = &self.deployment_root {
            apply_deployment(deployment_root, &mut local)?;
        }
        Ok((ledger, local))
    }
}

/// Scan `root` and classify every project against the `rev_type` revision
/// recorded for `environment`. Read-only.
pub fn detect(
    root: &Path,
    environment: &EnvironmentName,
    rev_type: RevType,
) -> Result<Vec<ClassifiedProject>, SyncError> {
    detect_with(root, environment, rev_type, &RepoOptions::default())
}

/// [`detect`] with a repository id check and a deployment overlay.
pub fn detect_with(
    root: &Path,
    environment: &EnvironmentName,
    rev_type: RevType,
    repo: &RepoOptions,
) -> Result<Vec<ClassifiedProject>, SyncError> {
    let (ledger, local) = repo.open(root)?;
    Ok(classify(&ledger, environment, rev_type, local))
}

/// Pure classification of already-scanned projects. Sorted by `(type, name)`.
pub fn classify(
    ledger: &Ledger,
    environment: &EnvironmentName,
    rev_type: RevType,
    local: Vec<TrackedProject>,
) -> Vec<ClassifiedProject> {
    let empty = LedgerEntry::empty();
    let baseline = ledger.entry(environment, rev_type).unwrap_or(&empty);
    let attempted = ledger
        .entry(environment, RevType::LastAttempted)
        .unwrap_or(&empty);
    let failed_before =
        |key: &ProjectKey| attempted.get(key).map_or(false, |outcome| outcome.failed);

    let mut classified = Vec::with_capacity(local.len());
    let mut present = BTreeSet::new();

    for project in local {
        let action = match baseline.get(&project.key) {
            Some(recorded)
                if recorded.fingerprint == project.fingerprint
                    && recorded.params_fingerprint.as_deref() == project.params_fingerprint()
                    && !recorded.failed =>
            {
                Action::Unchanged
            }
            _ => Action::Save,
        };
        present.insert(project.key.clone());
        classified.push(ClassifiedProject {
            key: project.key.clone(),
            relative_path: project.relative_path.clone(),
            fingerprint: project.fingerprint.clone(),
            params_fingerprint: project.params_fingerprint().map(str::to_string),
            action,
            previously_failed: failed_before(&project.key),
            project: Some(project),
        });
    }

    for (key, recorded) in baseline.iter() {
        if present.contains(&key) {
            continue;
        }
        classified.push(ClassifiedProject {
            previously_failed: failed_before(&key),
            key,
            relative_path: recorded.relative_path.clone(),
            fingerprint: recorded.fingerprint.clone(),
            params_fingerprint: recorded.params_fingerprint.clone(),
            action: Action::Delete,
            project: None,
        });
    }

    classified.sort_by(|a, b| a.key.cmp(&b.key));
    classified
}
