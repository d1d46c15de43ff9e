//! # apivcs-sync
//!
//! Change detection and the push engine.
//!
//! - [`detect`] classifies local projects against a recorded revision.
//! - [`push`] sends the changes since `last_attempted` through a
//!   [`ManagementApi`], concurrently, and records the attempt.
//! - [`rollback`] converges an environment back to `last_successful`.
//! - [`deploy`] is push followed by rollback on failure.

pub mod api;
pub mod detect;
pub mod error;
pub mod execute;
pub mod pipeline;
mod pool;
pub mod push;
pub mod rollback;
pub mod snapshot;

pub use api::{CallContext, CancelToken, ManagementApi, ProjectPayload, RemoteError};
pub use detect::{classify, detect, detect_with, Action, ClassifiedProject, RepoOptions};
pub use error::SyncError;
pub use execute::{ProjectResult, PushResult};
pub use pipeline::{deploy, status, DeployResult, RollbackStatus};
pub use push::{push, PushOptions, DEFAULT_WORKERS};
pub use rollback::rollback;
