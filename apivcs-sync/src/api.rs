//! Boundary to the remote management API.
//!
//! The engine never talks to an environment directly; it hands each project
//! to a [`ManagementApi`] implementation supplied by the caller. Both calls are
//! expected to be idempotent per `(type, name)`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use apivcs_core::{EnvironmentName, ProjectType};
use apivcs_detector::{fingerprint_files, read_files, ProjectFiles, ProjectMeta, ScanError, TrackedProject};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Per-project failure reported by the collaborator. Never fatal to a push.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    /// The project does not exist remotely. Treated as success for deletes.
    #[error("not found")]
    NotFound,
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-call limits handed to the collaborator.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub deadline: Option<Instant>,
    pub cancel: CancelToken,
}

impl CallContext {
    pub fn new(timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self {
            deadline: timeout.map(|t| Instant::now() + t),
            cancel,
        }
    }

    /// Time left before the deadline; `None` when the call is unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// `Err(Cancelled)` or `Err(Timeout)` once the call should stop.
    pub fn check(&self) -> Result<(), RemoteError> {
        if self.cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(RemoteError::Timeout),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Everything the collaborator needs to import one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectPayload {
    pub project_type: ProjectType,
    pub name: String,
    pub relative_path: String,
    /// Fingerprint of exactly `files`.
    pub fingerprint: String,
    /// Source meta, with the deployment `deploy` section applied.
    pub meta: ProjectMeta,
    #[serde(skip)]
    pub files: ProjectFiles,
    /// Fingerprint of exactly `params`; `None` when the project has no
    /// deployment params.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params_fingerprint: Option<String>,
    #[serde(skip)]
    pub params: ProjectFiles,
}

impl ProjectPayload {
    /// Read the current content of a scanned project and its params.
    pub fn read(project: &TrackedProject) -> Result<Self, ScanError> {
        let files = read_files(&project.path)?;
        let (params_fingerprint, params) = match &project.params {
            Some(params) => {
                let files = read_files(&params.path)?;
                (Some(fingerprint_files(&files)), files)
            }
            None => (None, ProjectFiles::new()),
        };
        Ok(Self {
            project_type: project.project_type(),
            name: project.name().to_string(),
            relative_path: project.relative_path.clone(),
            fingerprint: fingerprint_files(&files),
            meta: project.meta.clone(),
            files,
            params_fingerprint,
            params,
        })
    }
}

// ---------------------------------------------------------------------------
// Collaborator
// ---------------------------------------------------------------------------

/// The remote management API, as consumed by the push engine.
///
/// Implementations are called from several worker threads at once.
pub trait ManagementApi: Sync {
    /// Create or update `payload` in `environment`.
    fn import_project(
        &self,
        ctx: &CallContext,
        environment: &EnvironmentName,
        payload: &ProjectPayload,
    ) -> Result<(), RemoteError>;

    /// Remove `(project_type, name)` from `environment`.
    fn delete_project(
        &self,
        ctx: &CallContext,
        environment: &EnvironmentName,
        project_type: ProjectType,
        name: &str,
    ) -> Result<(), RemoteError>;
}
