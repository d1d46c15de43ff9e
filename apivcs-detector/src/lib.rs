//! Project discovery for `apivcs-detector`.
//!
//! `scan_repository(root)` walks a local repository and returns every API,
//! API Product and Application project it finds, each with a deterministic
//! content fingerprint and its parsed meta file. `apply_deployment` then
//! overlays environment-specific parameters from a deployment repository.

pub mod deployment;
pub mod error;
pub mod fingerprint;
pub mod meta;
pub mod scan;

pub use deployment::{apply_deployment, params_dir, read_deploy_override, DeploymentParams};
pub use error::ScanError;
pub use fingerprint::{compute_fingerprint, fingerprint_files, read_files, ProjectFiles};
pub use meta::{detect_project_type, read_meta, DeployConfig, ImportConfig, ProjectMeta};
pub use scan::{load_project, scan_repository, TrackedProject};
