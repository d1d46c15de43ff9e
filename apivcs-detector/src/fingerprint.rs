//! Fingerprint store: SHA-256 content digest of a project directory.
//!
//! ```text
//! fingerprint = hex(sha256( for each file, sorted by relative path:
//!                             relpath "\0" hex(sha256(content)) "\n" ))
//! ```
//!
//! Relative paths are `/`-separated, so the result is the same on every
//! platform and independent of the order the filesystem lists entries in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{io_err, walk_err, ScanError};

/// Project file contents keyed by `/`-separated relative path.
pub type ProjectFiles = BTreeMap<String, Vec<u8>>;

/// Fingerprint of every file under `dir`.
pub fn compute_fingerprint(dir: &Path) -> Result<String, ScanError> {
    Ok(fingerprint_files(&read_files(dir)?))
}

/// Fingerprint of an in-memory file set. Pure.
pub fn fingerprint_files(files: &ProjectFiles) -> String {
    let mut manifest = Sha256::new();
    for (relative, content) in files {
        manifest.update(relative.as_bytes());
        manifest.update(b"\0");
        manifest.update(hex::encode(Sha256::digest(content)).as_bytes());
        manifest.update(b"\n");
    }
    hex::encode(manifest.finalize())
}

/// Read every regular file under `dir` (following symlinks).
pub fn read_files(dir: &Path) -> Result<ProjectFiles, ScanError> {
    let mut files = ProjectFiles::new();
    for (relative, path) in list_files(dir)? {
        let content = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
        files.insert(relative, content);
    }
    Ok(files)
}

/// Sorted `(relative path, absolute path)` pairs for every file under `dir`.
pub fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, ScanError> {
    ensure_dir(dir)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(walk_err)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = to_slash_path(entry.path().strip_prefix(dir).unwrap_or(entry.path()));
        files.push((relative, entry.path().to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Fail with an I/O error unless `dir` is an existing directory.
pub(crate) fn ensure_dir(dir: &Path) -> Result<(), ScanError> {
    let metadata = std::fs::metadata(dir).map_err(|e| io_err(dir, e))?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(io_err(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ))
    }
}

/// Join the components of `path` with `/`.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
