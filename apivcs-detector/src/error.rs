//! Error types for apivcs-detector.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from scanning a repository or fingerprinting a project.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A file or directory under the repository could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A project meta file is not valid YAML for the expected shape.
    #[error("failed to parse meta file {path}: {source}")]
    Meta {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Two project directories resolve to the same `(type, name)`.
    #[error("duplicate project {key}: found at '{first}' and '{second}'")]
    DuplicateProject {
        key: String,
        first: String,
        second: String,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ScanError {
    ScanError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn walk_err(err: walkdir::Error) -> ScanError {
    let path = err.path().map(PathBuf::from).unwrap_or_default();
    io_err(path, std::io::Error::from(err))
}
