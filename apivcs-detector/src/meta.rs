//! Project meta files (`api_meta.yaml`, `api_product_meta.yaml`,
//! `application_meta.yaml`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use apivcs_core::ProjectType;

use crate::error::{io_err, ScanError};

/// Parsed content of a project meta file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub deploy: DeployConfig,
}

/// `deploy:` section of a meta file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployConfig {
    pub import: ImportConfig,
}

/// Import flags forwarded to the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    pub update: bool,
    pub preserve_provider: bool,
    pub preserve_owner: bool,
    pub skip_subscriptions: bool,
    pub skip_keys: bool,
    #[serde(rename = "importAPIs")]
    pub import_apis: bool,
    #[serde(rename = "updateAPIs")]
    pub update_apis: bool,
}

/// Which project type `dir` is, judged by the meta file it directly contains.
///
/// When several meta files are present the first in grouping order wins.
pub fn detect_project_type(dir: &Path) -> Option<ProjectType> {
    ProjectType::all()
        .iter()
        .copied()
        .find(|t| dir.join(t.meta_file_name()).is_file())
}

/// Parse the meta file of a `project_type` project rooted at `dir`.
///
/// An empty meta file yields the default meta.
pub fn read_meta(dir: &Path, project_type: ProjectType) -> Result<ProjectMeta, ScanError> {
    let path = dir.join(project_type.meta_file_name());
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(ProjectMeta::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ScanError::Meta { path, source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn detects_type_from_meta_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("application_meta.yaml"), "owner: admin\n").unwrap();
        assert_eq!(
            detect_project_type(tmp.path()),
            Some(ProjectType::Application)
        );
    }

    #[test]
    fn api_meta_wins_over_other_meta_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("application_meta.yaml"), "").unwrap();
        fs::write(tmp.path().join("api_meta.yaml"), "").unwrap();
        assert_eq!(detect_project_type(tmp.path()), Some(ProjectType::Api));
    }

    #[test]
    fn plain_directory_is_not_a_project() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("README.md"), "hi").unwrap();
        assert_eq!(detect_project_type(tmp.path()), None);
    }

    #[test]
    fn parses_camel_case_deploy_flags() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("api_meta.yaml"),
            "name: PizzaShackAPI\nversion: 1.0.0\ndeploy:\n  import:\n    update: true\n    preserveProvider: true\n",
        )
        .unwrap();
        let meta = read_meta(tmp.path(), ProjectType::Api).unwrap();
        assert_eq!(meta.name.as_deref(), Some("PizzaShackAPI"));
        assert_eq!(meta.version.as_deref(), Some("1.0.0"));
        assert!(meta.deploy.import.update);
        assert!(meta.deploy.import.preserve_provider);
        assert!(!meta.deploy.import.skip_keys);
    }

    #[test]
    fn empty_meta_file_is_default() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("api_meta.yaml"), "\n").unwrap();
        assert_eq!(
            read_meta(tmp.path(), ProjectType::Api).unwrap(),
            ProjectMeta::default()
        );
    }

    #[test]
    fn malformed_meta_is_meta_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("api_meta.yaml"), "deploy: not-a-mapping\n").unwrap();
        let err = read_meta(tmp.path(), ProjectType::Api).unwrap_err();
        assert!(matches!(err, ScanError::Meta { .. }), "got: {err}");
    }
}
