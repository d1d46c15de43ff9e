//! Error types for apivcs-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the ledger path for context.
    #[error("failed to parse ledger at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The ledger declares a schema version this build does not understand.
    #[error("unsupported ledger version {version} in {path}")]
    UnsupportedVersion { path: PathBuf, version: u32 },

    /// No ledger file at the repository root.
    #[error("repository is not initialized (no vcs.yaml at {root}); run `apivcs init`")]
    NotInitialized { root: PathBuf },

    /// `init` without `force` on a repository that already has a ledger.
    #[error("repository already initialized at {path} (use --force to reinitialize)")]
    AlreadyInitialized { path: PathBuf },

    /// The ledger belongs to a different repository than the caller expected.
    #[error("repository id mismatch: expected {expected}, ledger has {found}")]
    RepoIdMismatch { expected: String, found: String },
}

/// Convenience constructor for [`LedgerError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.into(),
        source,
    }
}
