//! Error types for apivcs-sync.
//!
//! Everything here is fatal: it aborts the operation before the ledger is
//! touched. Per-project remote failures are [`crate::RemoteError`] values
//! recorded in the outcome, never a `SyncError`.

use std::path::PathBuf;

use thiserror::Error;

use apivcs_core::{EnvironmentName, LedgerError};
use apivcs_detector::ScanError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The change set contains deletions while deletion is switched off.
    #[error(
        "deleting projects is disabled, but these were removed locally: {}",
        projects.join(", ")
    )]
    DeletionDisabled { projects: Vec<String> },

    #[error("no successful revision is recorded for environment '{environment}'; nothing to roll back to")]
    NoSuccessfulRevision { environment: EnvironmentName },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
