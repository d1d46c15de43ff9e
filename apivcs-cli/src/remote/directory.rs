//! Directory-backed environment: projects are mirrored into
//! `<root>/<type>/<name>/`, their deployment params into
//! `<root>/<type>/<name>/.deployment/`.

use std::io;
use std::path::{Path, PathBuf};

use apivcs_core::{EnvironmentName, ProjectType};
use apivcs_detector::ProjectFiles;
use apivcs_sync::{CallContext, ManagementApi, ProjectPayload, RemoteError};

/// Subdirectory of a mirrored project that holds its deployment params.
pub const PARAMS_DIR: &str = ".deployment";

#[derive(Debug, Clone)]
pub struct DirectoryApi {
    root: PathBuf,
}

impl DirectoryApi {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<type-slug>/<name>`
    pub fn project_dir(&self, project_type: ProjectType, name: &str) -> PathBuf {
        self.root.join(project_type.slug()).join(name)
    }
}

impl ManagementApi for DirectoryApi {
    fn import_project(
        &self,
        ctx: &CallContext,
        _environment: &EnvironmentName,
        payload: &ProjectPayload,
    ) -> Result<(), RemoteError> {
        ctx.check()?;
        let target = self.project_dir(payload.project_type, &payload.name);
        replace_dir(&target, &payload.files, &payload.params).map_err(transport)
    }

    fn delete_project(
        &self,
        ctx: &CallContext,
        _environment: &EnvironmentName,
        project_type: ProjectType,
        name: &str,
    ) -> Result<(), RemoteError> {
        ctx.check()?;
        let target = self.project_dir(project_type, name);
        if !target.exists() {
            return Err(RemoteError::NotFound);
        }
        std::fs::remove_dir_all(&target).map_err(transport)
    }
}

/// Write `files`, and `params` under [`PARAMS_DIR`], into a hidden sibling
/// of `target`, then swap it in.
fn replace_dir(target: &Path, files: &ProjectFiles, params: &ProjectFiles) -> io::Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no parent directory"))?;
    let name = target
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no project name"))?;
    let staging = parent.join(format!(".{}.tmp", name.to_string_lossy()));

    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    std::fs::create_dir_all(&staging)?;
    write_files(&staging, files)?;
    if !params.is_empty() {
        write_files(&staging.join(PARAMS_DIR), params)?;
    }

    if target.exists() {
        std::fs::remove_dir_all(target)?;
    }
    std::fs::rename(&staging, target)
}

fn write_files(dir: &Path, files: &ProjectFiles) -> io::Result<()> {
    for (relative, content) in files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
    }
    Ok(())
}

fn transport(err: io::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}
