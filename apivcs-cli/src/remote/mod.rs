//! Management API collaborators selectable per environment.

pub mod directory;
pub mod http;

use anyhow::Result;

use apivcs_sync::ManagementApi;

use crate::config::{EnvironmentConfig, Target};
use directory::DirectoryApi;
use http::HttpApi;

/// Build the collaborator configured for an environment.
pub fn connect(environment: &EnvironmentConfig) -> Result<Box<dyn ManagementApi>> {
    Ok(match environment.target()? {
        Target::Directory(path) => Box::new(DirectoryApi::new(path)),
        Target::Http(url) => Box::new(HttpApi::new(&url)?),
    })
}
