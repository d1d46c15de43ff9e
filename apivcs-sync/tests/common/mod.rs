//! Shared fixtures for apivcs-sync integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use apivcs_core::{ledger, EnvironmentName, ProjectType};
use apivcs_sync::{CallContext, CancelToken, ManagementApi, ProjectPayload, RemoteError};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Repository fixtures
// ---------------------------------------------------------------------------

pub fn env() -> EnvironmentName {
    EnvironmentName::from("dev")
}

/// An initialized, empty repository.
pub fn init_repo() -> TempDir {
    let root = TempDir::new().expect("tempdir");
    ledger::init(root.path(), false).expect("init");
    root
}

/// Write a project of `project_type` at `relative` with one definition file.
pub fn write_project(root: &Path, relative: &str, project_type: ProjectType, body: &str) {
    let dir = root.join(relative);
    fs::create_dir_all(dir.join("Definitions")).expect("mkdir");
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    fs::write(
        dir.join(project_type.meta_file_name()),
        format!("name: {name}\nversion: 1.0.0\n"),
    )
    .expect("write meta");
    fs::write(dir.join("Definitions").join("definition.yaml"), body).expect("write body");
}

/// Write deployment params for the project at `relative` under
/// `deployment_root`, with a meta file whose `deploy` section sets `update`.
pub fn write_params(deployment_root: &Path, relative: &str, project_type: ProjectType, body: &str) {
    let dir = deployment_root.join(relative);
    fs::create_dir_all(&dir).expect("mkdir params");
    fs::write(
        dir.join(project_type.meta_file_name()),
        "deploy:\n  import:\n    update: true\n",
    )
    .expect("write params meta");
    fs::write(dir.join("params.yaml"), body).expect("write params");
}

pub fn remove_project(root: &Path, relative: &str) {
    fs::remove_dir_all(root.join(relative)).expect("remove project");
}

pub fn ledger_bytes(root: &Path) -> Vec<u8> {
    fs::read(ledger::ledger_path(root)).expect("read ledger")
}

// ---------------------------------------------------------------------------
// Scripted collaborator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    Import(String),
    Delete(String),
}

/// In-memory management API. Keeps a remote `key -> fingerprint` map, logs
/// every call in order, and fails the projects it was told to fail.
#[derive(Default)]
pub struct ScriptedApi {
    failures: Mutex<HashMap<Call, RemoteError>>,
    calls: Mutex<Vec<Call>>,
    remote: Mutex<BTreeMap<String, String>>,
    imported: Mutex<BTreeMap<String, ProjectPayload>>,
    cancel_on_call: Mutex<Option<CancelToken>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call for `key` (e.g. `"API:Foo"`) fails with `err` until healed.
    pub fn fail(&self, key: &str, err: RemoteError) {
        let mut failures = self.failures.lock().unwrap();
        failures.insert(Call::Import(key.to_string()), err.clone());
        failures.insert(Call::Delete(key.to_string()), err);
    }

    /// Only imports of `key` fail; deletes go through.
    pub fn fail_import(&self, key: &str, err: RemoteError) {
        self.failures
            .lock()
            .unwrap()
            .insert(Call::Import(key.to_string()), err);
    }

    pub fn heal(&self, key: &str) {
        let mut failures = self.failures.lock().unwrap();
        failures.remove(&Call::Import(key.to_string()));
        failures.remove(&Call::Delete(key.to_string()));
    }

    /// Trip `token` from inside the first call made.
    pub fn cancel_on_first_call(&self, token: CancelToken) {
        *self.cancel_on_call.lock().unwrap() = Some(token);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Simulated remote state: `key -> fingerprint`.
    pub fn remote(&self) -> BTreeMap<String, String> {
        self.remote.lock().unwrap().clone()
    }

    /// The last payload successfully imported for `key`.
    pub fn payload(&self, key: &str) -> Option<ProjectPayload> {
        self.imported.lock().unwrap().get(key).cloned()
    }

    pub fn remote_keys(&self) -> Vec<String> {
        self.remote().into_keys().collect()
    }

    fn enter(&self, ctx: &CallContext, call: Call) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call.clone());
        if let Some(token) = self.cancel_on_call.lock().unwrap().take() {
            token.cancel();
        }
        ctx.check()?;
        match self.failures.lock().unwrap().get(&call) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl ManagementApi for ScriptedApi {
    fn import_project(
        &self,
        ctx: &CallContext,
        _environment: &EnvironmentName,
        payload: &ProjectPayload,
    ) -> Result<(), RemoteError> {
        let key = format!("{}:{}", payload.project_type, payload.name);
        self.enter(ctx, Call::Import(key.clone()))?;
        self.remote
            .lock()
            .unwrap()
            .insert(key.clone(), payload.fingerprint.clone());
        self.imported.lock().unwrap().insert(key, payload.clone());
        Ok(())
    }

    fn delete_project(
        &self,
        ctx: &CallContext,
        _environment: &EnvironmentName,
        project_type: ProjectType,
        name: &str,
    ) -> Result<(), RemoteError> {
        let key = format!("{project_type}:{name}");
        self.enter(ctx, Call::Delete(key.clone()))?;
        match self.remote.lock().unwrap().remove(&key) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound),
        }
    }
}
