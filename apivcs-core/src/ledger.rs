//! Revision ledger persisted at the repository root.
//!
//! # Storage layout
//!
//! ```text
//! <repo>/
//!   vcs.yaml        (repo id + per-environment last_attempted / last_successful)
//!   vcs.yaml.tmp    (only while a save is in flight)
//! ```
//!
//! Writes are whole-file replacements: serialize → `vcs.yaml.tmp` sibling →
//! `rename`. A reader never observes a truncated ledger. Two processes saving
//! concurrently is unsupported; the last rename wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{io_err, LedgerError};
use crate::types::{
    EnvironmentName, Ledger, LedgerEntry, ProjectKey, ProjectOutcome, RepositoryIdentity, RevType,
};

/// File name of the ledger inside the repository root.
pub const LEDGER_FILE_NAME: &str = "vcs.yaml";

/// Schema version written by this build.
pub const LEDGER_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<root>/vcs.yaml`. Pure, no I/O.
pub fn ledger_path(root: &Path) -> PathBuf {
    root.join(LEDGER_FILE_NAME)
}

fn tmp_path(root: &Path) -> PathBuf {
    root.join(format!("{LEDGER_FILE_NAME}.tmp"))
}

/// Whether `<root>/vcs.yaml` exists.
pub fn is_initialized(root: &Path) -> bool {
    ledger_path(root).exists()
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the ledger from `<root>/vcs.yaml`.
///
/// Returns `LedgerError::NotInitialized` if absent,
/// `LedgerError::Parse` (with path) if malformed YAML.
pub fn load(root: &Path) -> Result<Ledger, LedgerError> {
    let path = ledger_path(root);
    if !path.exists() {
        return Err(LedgerError::NotInitialized {
            root: root.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let ledger: Ledger = serde_yaml::from_str(&contents)
        .map_err(|e| LedgerError::Parse { path: path.clone(), source: e })?;
    if ledger.version != LEDGER_VERSION {
        return Err(LedgerError::UnsupportedVersion {
            path,
            version: ledger.version,
        });
    }
    Ok(ledger)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically replace `<root>/vcs.yaml` with `ledger`.
pub fn save(root: &Path, ledger: &Ledger) -> Result<(), LedgerError> {
    let path = ledger_path(root);
    let tmp = tmp_path(root);

    let yaml = serde_yaml::to_string(ledger)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    tracing::debug!("ledger saved: {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Create `<root>/vcs.yaml` with a fresh repository id and no environments.
///
/// Fails with `LedgerError::AlreadyInitialized` when a ledger exists and
/// `force` is not set. With `force`, the existing ledger (and every recorded
/// environment in it) is discarded.
pub fn init(root: &Path, force: bool) -> Result<RepositoryIdentity, LedgerError> {
    if !root.is_dir() {
        return Err(io_err(
            root,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "repository root is not a directory",
            ),
        ));
    }

    let path = ledger_path(root);
    if path.exists() {
        if !force {
            return Err(LedgerError::AlreadyInitialized { path });
        }
        tracing::warn!(
            "reinitializing {}; recorded environments are discarded",
            path.display()
        );
    }

    let ledger = Ledger::new(Uuid::new_v4().to_string());
    save(root, &ledger)?;
    tracing::info!("initialized repository {} at {}", ledger.repo_id, root.display());
    Ok(ledger.identity())
}

// ---------------------------------------------------------------------------
// 5. In-memory operations
// ---------------------------------------------------------------------------

impl Ledger {
    /// An empty ledger with the given repository id.
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            version: LEDGER_VERSION,
            repo_id: repo_id.into(),
            created_at: Utc::now(),
            environments: BTreeMap::new(),
        }
    }

    pub fn identity(&self) -> RepositoryIdentity {
        RepositoryIdentity {
            repo_id: self.repo_id.clone(),
            created_at: self.created_at,
        }
    }

    /// Fail unless `expected` is absent or equal to this ledger's repo id.
    pub fn verify_repo_id(&self, expected: Option<&str>) -> Result<(), LedgerError> {
        match expected {
            Some(expected) if expected != self.repo_id => Err(LedgerError::RepoIdMismatch {
                expected: expected.to_string(),
                found: self.repo_id.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// The recorded entry for `(environment, rev_type)`, or an empty entry
    /// when the environment was never pushed to.
    pub fn baseline(&self, environment: &EnvironmentName, rev_type: RevType) -> LedgerEntry {
        self.entry(environment, rev_type)
            .cloned()
            .unwrap_or_else(LedgerEntry::empty)
    }

    /// Borrowing form of [`Ledger::baseline`]; `None` when nothing is recorded.
    pub fn entry(&self, environment: &EnvironmentName, rev_type: RevType) -> Option<&LedgerEntry> {
        let env = self.environments.get(environment)?;
        match rev_type {
            RevType::LastAttempted => env.last_attempted.as_ref(),
            RevType::LastSuccessful => env.last_successful.as_ref(),
        }
    }

    /// Overwrite `last_attempted` for `environment` with `outcomes`; when no
    /// outcome failed, overwrite `last_successful` with the same content.
    ///
    /// The caller persists the ledger with [`save`].
    pub fn record_attempt(
        &mut self,
        environment: &EnvironmentName,
        outcomes: BTreeMap<ProjectKey, ProjectOutcome>,
    ) -> &LedgerEntry {
        let env = self.environments.entry(environment.clone()).or_default();
        let previous = env
            .last_attempted
            .iter()
            .chain(env.last_successful.iter())
            .map(|entry| entry.revision)
            .max()
            .unwrap_or(0);

        let entry = LedgerEntry::from_outcomes(previous + 1, Utc::now(), outcomes);
        if entry.has_failures() {
            tracing::warn!(
                "revision {} for '{}' has failures; last successful stays at {}",
                entry.revision,
                environment,
                env.last_successful.as_ref().map_or(0, |e| e.revision)
            );
        } else {
            env.last_successful = Some(entry.clone());
        }
        tracing::info!("recorded revision {} for '{}'", entry.revision, environment);
        env.last_attempted.insert(entry)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
