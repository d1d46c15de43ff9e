//! Deployment repository overlay.
//!
//! A deployment repository keeps environment-specific parameters apart from
//! the project sources and mirrors their layout:
//!
//! ```text
//! <deployment root>/<project relative path>/   (params files)
//! ```
//!
//! When a project has such a directory, its files travel with the project,
//! its fingerprint takes part in change detection, and the `deploy` section of
//! a meta file found there replaces the one from the source meta file.
//! Params directories without a matching source project are ignored.

use std::path::{Path, PathBuf};

use apivcs_core::ProjectType;

use crate::error::ScanError;
use crate::fingerprint::{compute_fingerprint, ensure_dir};
use crate::meta::{read_meta, DeployConfig};
use crate::scan::TrackedProject;

/// Environment-specific parameters of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentParams {
    /// Absolute path of the params directory.
    pub path: PathBuf,
    pub fingerprint: String,
}

/// `<deployment_root>/<relative_path>`
pub fn params_dir(deployment_root: &Path, relative_path: &str) -> PathBuf {
    relative_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(deployment_root.to_path_buf(), |path, segment| path.join(segment))
}

/// Attach the params found under `deployment_root` to `projects`.
///
/// Fails when `deployment_root` is not a directory or a params directory
/// cannot be read.
pub fn apply_deployment(
    deployment_root: &Path,
    projects: &mut [TrackedProject],
) -> Result<(), ScanError> {
    ensure_dir(deployment_root)?;

    for project in projects.iter_mut() {
        let dir = params_dir(deployment_root, &project.relative_path);
        if !dir.is_dir() {
            continue;
        }
        if let Some(deploy) = read_deploy_override(&dir, project.project_type())? {
            project.meta.deploy = deploy;
        }
        let fingerprint = compute_fingerprint(&dir)?;
        tracing::debug!(
            "{} has deployment params at {} ({})",
            project.key,
            dir.display(),
            fingerprint.get(..12).unwrap_or(&fingerprint)
        );
        project.params = Some(DeploymentParams {
            path: dir,
            fingerprint,
        });
    }
    Ok(())
}

/// The `deploy` section of the meta file in params directory `dir`, if the
/// directory carries a meta file for `project_type`.
pub fn read_deploy_override(
    dir: &Path,
    project_type: ProjectType,
) -> Result<Option<DeployConfig>, ScanError> {
    if !dir.join(project_type.meta_file_name()).is_file() {
        return Ok(None);
    }
    Ok(Some(read_meta(dir, project_type)?.deploy))
}
