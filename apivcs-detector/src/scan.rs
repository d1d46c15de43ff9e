//! Repository scan: discover every tracked project under a repository root.
//!
//! A directory is a project when it directly contains a meta file (see
//! [`crate::meta::detect_project_type`]). Hidden entries are skipped, which
//! keeps `.git` and the engine's own `.apivcs/` state out of the scan, and the
//! walk never descends into a directory once it is identified as a project.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use apivcs_core::{ProjectKey, ProjectType};

use crate::deployment::DeploymentParams;
use crate::error::{walk_err, ScanError};
use crate::fingerprint::{compute_fingerprint, to_slash_path};
use crate::meta::{detect_project_type, read_meta, ProjectMeta};

/// A project discovered in the local repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedProject {
    pub key: ProjectKey,
    /// `/`-separated, relative to the repository root.
    pub relative_path: String,
    /// Absolute path of the project directory.
    pub path: PathBuf,
    pub fingerprint: String,
    pub meta: ProjectMeta,
    /// Environment-specific parameters, once a deployment overlay is applied.
    pub params: Option<DeploymentParams>,
}

impl TrackedProject {
    pub fn project_type(&self) -> ProjectType {
        self.key.project_type
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn params_fingerprint(&self) -> Option<&str> {
        self.params.as_ref().map(|p| p.fingerprint.as_str())
    }
}

/// Scan `root` and return every tracked project, sorted by `(type, name)`.
///
/// Fails with [`ScanError::DuplicateProject`] when two directories of the same
/// type share a base name.
pub fn scan_repository(root: &Path) -> Result<Vec<TrackedProject>, ScanError> {
    let mut projects = Vec::new();
    let mut seen: HashMap<ProjectKey, String> = HashMap::new();

    let mut walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(walk_err)?;
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }
        let Some(project_type) = detect_project_type(entry.path()) else {
            continue;
        };
        walker.skip_current_dir();

        let project = load_project(root, entry.path(), project_type)?;
        if let Some(first) = seen.insert(project.key.clone(), project.relative_path.clone()) {
            return Err(ScanError::DuplicateProject {
                key: project.key.to_string(),
                first,
                second: project.relative_path,
            });
        }
        tracing::debug!(
            "found {} at {} ({})",
            project.key,
            project.relative_path,
            &project.fingerprint[..12]
        );
        projects.push(project);
    }

    projects.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(projects)
}

/// Fingerprint and parse the project of `project_type` rooted at `dir`.
pub fn load_project(
    root: &Path,
    dir: &Path,
    project_type: ProjectType,
) -> Result<TrackedProject, ScanError> {
    let name = dir
        .file_name()
        .unwrap_or(dir.as_os_str())
        .to_string_lossy()
        .into_owned();
    let relative_path = to_slash_path(dir.strip_prefix(root).unwrap_or(dir));

    Ok(TrackedProject {
        key: ProjectKey::new(project_type, name),
        relative_path,
        path: dir.to_path_buf(),
        fingerprint: compute_fingerprint(dir)?,
        meta: read_meta(dir, project_type)?,
        params: None,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
