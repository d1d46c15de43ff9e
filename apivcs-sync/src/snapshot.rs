//! Content-addressed copies of pushed projects.
//!
//! ```text
//! <repo>/.apivcs/snapshots/<fingerprint>/   (verbatim project or params files)
//! ```
//!
//! Every successful import stores the exact bytes it sent, its deployment
//! params under their own fingerprint, so a later rollback can re-send an
//! older revision after the working tree moved on. A snapshot directory is
//! written under a `.tmp` sibling and renamed into place; an existing
//! snapshot is never rewritten. After each recorded attempt, snapshots that
//! no environment entry refers to any more are removed.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use apivcs_core::{Ledger, ProjectKey};
use apivcs_detector::{fingerprint_files, read_deploy_override, read_files, read_meta, ProjectFiles};

use crate::api::ProjectPayload;
use crate::error::{io_err, SyncError};

/// Directory holding engine state inside the repository.
pub const STATE_DIR: &str = ".apivcs";

const STAGING_SUFFIX: &str = ".tmp";

/// `<root>/.apivcs/snapshots`
pub fn snapshot_root(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join("snapshots")
}

/// `<root>/.apivcs/snapshots/<fingerprint>`
pub fn snapshot_path(root: &Path, fingerprint: &str) -> PathBuf {
    snapshot_root(root).join(fingerprint)
}

/// Store `payload` and its params under their fingerprints. Snapshots
/// already present are left alone.
pub fn store(root: &Path, payload: &ProjectPayload) -> Result<(), SyncError> {
    store_files(root, &payload.fingerprint, &payload.files)?;
    if let Some(params_fingerprint) = &payload.params_fingerprint {
        store_files(root, params_fingerprint, &payload.params)?;
    }
    Ok(())
}

fn store_files(root: &Path, fingerprint: &str, files: &ProjectFiles) -> Result<(), SyncError> {
    let target = snapshot_path(root, fingerprint);
    if target.is_dir() {
        return Ok(());
    }

    let staging = snapshot_root(root).join(format!("{fingerprint}{STAGING_SUFFIX}"));
    if staging.exists() {
        std::fs::remove_dir_all(&staging).map_err(|e| io_err(&staging, e))?;
    }
    for (relative, content) in files {
        let path = staging.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::write(&path, content).map_err(|e| io_err(&path, e))?;
    }
    std::fs::create_dir_all(&staging).map_err(|e| io_err(&staging, e))?;

    if let Err(e) = std::fs::rename(&staging, &target) {
        let _ = std::fs::remove_dir_all(&staging);
        if target.is_dir() {
            return Ok(());
        }
        return Err(io_err(&target, e));
    }
    tracing::debug!("stored snapshot {}", fingerprint);
    Ok(())
}

/// Files of the snapshot at `fingerprint`; `None` when absent or when its
/// content no longer hashes to `fingerprint`.
fn load_files(root: &Path, fingerprint: &str) -> Result<Option<(PathBuf, ProjectFiles)>, SyncError> {
    let dir = snapshot_path(root, fingerprint);
    if !dir.is_dir() {
        return Ok(None);
    }
    let files = read_files(&dir)?;
    if fingerprint_files(&files) != fingerprint {
        tracing::warn!("snapshot {} is corrupt; ignoring it", dir.display());
        return Ok(None);
    }
    Ok(Some((dir, files)))
}

/// Rebuild the payload of `key` at `fingerprint`, with the params at
/// `params_fingerprint`, from the snapshot store.
///
/// `Ok(None)` when either snapshot is missing or corrupt.
pub fn load(
    root: &Path,
    key: &ProjectKey,
    relative_path: &str,
    fingerprint: &str,
    params_fingerprint: Option<&str>,
) -> Result<Option<ProjectPayload>, SyncError> {
    let (dir, files) = match load_files(root, fingerprint)? {
        Some(found) => found,
        None => return Ok(None),
    };
    let mut meta = read_meta(&dir, key.project_type)?;

    let params = match params_fingerprint {
        Some(params_fingerprint) => match load_files(root, params_fingerprint)? {
            Some((params_dir, params)) => {
                if let Some(deploy) = read_deploy_override(&params_dir, key.project_type)? {
                    meta.deploy = deploy;
                }
                params
            }
            None => return Ok(None),
        },
        None => ProjectFiles::new(),
    };

    Ok(Some(ProjectPayload {
        project_type: key.project_type,
        name: key.name.clone(),
        relative_path: relative_path.to_string(),
        fingerprint: fingerprint.to_string(),
        meta,
        files,
        params_fingerprint: params_fingerprint.map(str::to_string),
        params,
    }))
}

/// Every fingerprint recorded in any environment's entries.
fn referenced(ledger: &Ledger) -> BTreeSet<&str> {
    ledger
        .environments
        .values()
        .flat_map(|env| env.last_attempted.iter().chain(env.last_successful.iter()))
        .flat_map(|entry| entry.projects.values().flat_map(|named| named.values()))
        .flat_map(|outcome| {
            std::iter::once(outcome.fingerprint.as_str())
                .chain(outcome.params_fingerprint.as_deref())
        })
        .collect()
}

/// Remove every snapshot, staged or complete, that `ledger` does not refer
/// to. Returns how many were removed.
pub fn prune(root: &Path, ledger: &Ledger) -> Result<usize, SyncError> {
    let dir = snapshot_root(root);
    if !dir.is_dir() {
        return Ok(0);
    }
    let keep = referenced(ledger);

    let mut removed = 0;
    for entry in std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let staged = name.ends_with(STAGING_SUFFIX);
        if !staged && keep.contains(name.as_ref()) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
        } else {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
        }
        tracing::debug!("pruned snapshot {}", name);
        removed += 1;
    }
    Ok(removed)
}
