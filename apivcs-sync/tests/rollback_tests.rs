//! Rollback, deploy and status integration tests.

mod common;

use std::collections::BTreeMap;

use apivcs_core::{
    ledger, EnvironmentLedger, LedgerEntry, ProjectKey, ProjectOutcome, ProjectType, RevType,
};
use apivcs_detector::compute_fingerprint;
use apivcs_sync::{
    deploy, push, rollback, status, Action, PushOptions, RemoteError, RepoOptions, RollbackStatus,
    SyncError,
};
use common::*;

fn options() -> PushOptions {
    PushOptions::default()
}

fn outcome(path: &str, fp: &str) -> ProjectOutcome {
    ProjectOutcome {
        relative_path: path.to_string(),
        fingerprint: fp.to_string(),
        params_fingerprint: None,
        pushed: true,
        failed: false,
        reason: None,
    }
}

fn entry(revision: u64, names: &[&str]) -> LedgerEntry {
    let outcomes: BTreeMap<ProjectKey, ProjectOutcome> = names
        .iter()
        .map(|n| {
            (
                ProjectKey::new(ProjectType::Api, *n),
                outcome(&format!("apis/{n}"), &format!("fp-{n}")),
            )
        })
        .collect();
    LedgerEntry::from_outcomes(revision, chrono::Utc::now(), outcomes)
}

// ---------------------------------------------------------------------------
// 1. Rollback
// ---------------------------------------------------------------------------

#[test]
fn rollback_deletes_projects_added_since_last_success() {
    let root = init_repo();
    let mut recorded = ledger::load(root.path()).expect("load");
    recorded.environments.insert(
        env(),
        EnvironmentLedger {
            last_attempted: Some(entry(2, &["A", "B", "C"])),
            last_successful: Some(entry(1, &["A", "B"])),
        },
    );
    ledger::save(root.path(), &recorded).expect("save");
    let api = ScriptedApi::new();

    let result = rollback(root.path(), &env(), &api, &options()).expect("rollback");

    assert!(result.success);
    assert_eq!(api.calls(), vec![Call::Delete("API:C".into())]);
    assert_eq!(result.count(Action::Unchanged), 2);

    let after = ledger::load(root.path()).expect("load");
    let successful = after.baseline(&env(), RevType::LastSuccessful);
    assert_eq!(successful.revision, 3);
    let names: Vec<String> = successful.iter().map(|(k, _)| k.name).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn rollback_after_partial_failure_removes_new_projects() {
    let root = init_repo();
    write_project(root.path(), "apis/A", ProjectType::Api, "a");
    write_project(root.path(), "apis/B", ProjectType::Api, "b");
    let api = ScriptedApi::new();
    push(root.path(), &env(), &api, &options()).expect("first push");

    write_project(root.path(), "apis/C", ProjectType::Api, "c");
    write_project(root.path(), "apis/D", ProjectType::Api, "d");
    api.fail_import("API:D", RemoteError::Transport("reset".into()));
    let failed = push(root.path(), &env(), &api, &options()).expect("second push");
    assert!(!failed.success);
    assert_eq!(api.remote_keys(), vec!["API:A", "API:B", "API:C"]);

    api.clear_calls();
    let result = rollback(root.path(), &env(), &api, &options()).expect("rollback");

    assert!(result.success);
    let mut calls = api.calls();
    calls.sort_by_key(|c| format!("{c:?}"));
    assert_eq!(
        calls,
        vec![Call::Delete("API:C".into()), Call::Delete("API:D".into())]
    );
    assert_eq!(api.remote_keys(), vec!["API:A", "API:B"]);
}

#[test]
fn rollback_resends_previous_content_from_snapshot() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "v1");
    let good = compute_fingerprint(&root.path().join("apis/Foo")).expect("fp");
    let api = ScriptedApi::new();
    push(root.path(), &env(), &api, &options()).expect("first push");

    write_project(root.path(), "apis/Foo", ProjectType::Api, "v2");
    api.fail_import("API:Foo", RemoteError::Rejected {
        status: 400,
        message: "bad definition".into(),
    });
    push(root.path(), &env(), &api, &options()).expect("failing push");

    api.heal("API:Foo");
    api.clear_calls();
    let result = rollback(root.path(), &env(), &api, &options()).expect("rollback");

    assert!(result.success);
    assert_eq!(api.calls(), vec![Call::Import("API:Foo".into())]);
    assert_eq!(api.remote().get("API:Foo"), Some(&good));
    let after = ledger::load(root.path()).expect("load");
    let foo = after
        .baseline(&env(), RevType::LastSuccessful)
        .get(&ProjectKey::new(ProjectType::Api, "Foo"))
        .cloned()
        .expect("Foo");
    assert_eq!(foo.fingerprint, good);
}

#[test]
fn rollback_without_content_fails_that_project_only() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "v1");
    write_project(root.path(), "apis/Bar", ProjectType::Api, "b");
    let api = ScriptedApi::new();
    push(root.path(), &env(), &api, &options()).expect("first push");

    write_project(root.path(), "apis/Foo", ProjectType::Api, "v2");
    write_project(root.path(), "apis/New", ProjectType::Api, "n");
    api.fail_import("API:Foo", RemoteError::Timeout);
    push(root.path(), &env(), &api, &options()).expect("failing push");
    std::fs::remove_dir_all(root.path().join(".apivcs")).expect("drop snapshots");

    api.clear_calls();
    let result = rollback(root.path(), &env(), &api, &options()).expect("rollback");

    assert!(!result.success);
    let failed: Vec<String> = result.failures().map(|p| p.key.to_string()).collect();
    assert_eq!(failed, vec!["API:Foo"]);
    assert_eq!(api.calls(), vec![Call::Delete("API:New".into())]);
}

#[test]
fn rollback_without_successful_revision_is_fatal() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "v1");
    let api = ScriptedApi::new();
    api.fail("API:Foo", RemoteError::Timeout);
    push(root.path(), &env(), &api, &options()).expect("push");
    let before = ledger_bytes(root.path());

    let err = rollback(root.path(), &env(), &api, &options()).unwrap_err();
    assert!(matches!(err, SyncError::NoSuccessfulRevision { .. }), "got: {err}");
    assert_eq!(ledger_bytes(root.path()), before);
}

#[test]
fn rollback_of_converged_environment_is_a_noop() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "v1");
    let api = ScriptedApi::new();
    push(root.path(), &env(), &api, &options()).expect("push");
    let before = ledger_bytes(root.path());
    api.clear_calls();

    let result = rollback(root.path(), &env(), &api, &options()).expect("rollback");
    assert!(result.success);
    assert!(result.is_noop());
    assert!(api.calls().is_empty());
    assert_eq!(ledger_bytes(root.path()), before);
}

#[test]
fn rollback_after_an_empty_push_is_a_noop() {
    let root = init_repo();
    let api = ScriptedApi::new();
    let pushed = push(root.path(), &env(), &api, &options()).expect("push");
    assert_eq!(pushed.revision, Some(1));

    let result = rollback(root.path(), &env(), &api, &options()).expect("rollback");
    assert!(result.success);
    assert!(result.is_noop());
    assert_eq!(result.revision, None);
    assert!(api.calls().is_empty());
}

#[test]
fn rollback_restores_previous_deployment_params() {
    let root = init_repo();
    let deployment = tempfile::TempDir::new().expect("deployment");
    write_project(root.path(), "apis/Foo", ProjectType::Api, "foo");
    write_params(deployment.path(), "apis/Foo", ProjectType::Api, "endpoint: qa");
    let opts = PushOptions {
        repo: RepoOptions {
            deployment_root: Some(deployment.path().to_path_buf()),
            ..RepoOptions::default()
        },
        ..options()
    };
    let api = ScriptedApi::new();
    push(root.path(), &env(), &api, &opts).expect("first push");
    let good = api.payload("API:Foo").expect("imported");

    write_params(deployment.path(), "apis/Foo", ProjectType::Api, "endpoint: broken");
    api.fail_import("API:Foo", RemoteError::Timeout);
    assert!(!push(root.path(), &env(), &api, &opts).expect("push").success);

    api.heal("API:Foo");
    api.clear_calls();
    let result = rollback(root.path(), &env(), &api, &opts).expect("rollback");

    assert!(result.success);
    assert_eq!(api.calls(), vec![Call::Import("API:Foo".into())]);
    let restored = api.payload("API:Foo").expect("re-imported");
    assert_eq!(restored.params, good.params);
    assert_eq!(restored.params_fingerprint, good.params_fingerprint);
    assert!(restored.meta.deploy.import.update);
}

#[test]
fn rollback_ignores_disabled_deletion() {
    let root = init_repo();
    let mut recorded = ledger::load(root.path()).expect("load");
    recorded.environments.insert(
        env(),
        EnvironmentLedger {
            last_attempted: Some(entry(2, &["A", "C"])),
            last_successful: Some(entry(1, &["A"])),
        },
    );
    ledger::save(root.path(), &recorded).expect("save");
    let opts = PushOptions {
        deletion_enabled: false,
        ..options()
    };

    let result = rollback(root.path(), &env(), &ScriptedApi::new(), &opts).expect("rollback");
    assert_eq!(result.count(Action::Delete), 1);
}

// ---------------------------------------------------------------------------
// 2. Deploy
// ---------------------------------------------------------------------------

#[test]
fn deploy_rolls_back_after_failure() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "v1");
    let good = compute_fingerprint(&root.path().join("apis/Foo")).expect("fp");
    let api = ScriptedApi::new();
    deploy(root.path(), &env(), &api, &options(), false).expect("first deploy");

    write_project(root.path(), "apis/Foo", ProjectType::Api, "v2");
    write_project(root.path(), "apis/New", ProjectType::Api, "n");
    api.fail_import("API:New", RemoteError::Transport("reset".into()));
    let result = deploy(root.path(), &env(), &api, &options(), false).expect("deploy");

    assert!(!result.success());
    match &result.rollback {
        RollbackStatus::Completed { result } => assert!(result.success),
        other => panic!("expected completed rollback, got {other:?}"),
    }
    assert_eq!(api.remote_keys(), vec!["API:Foo"]);
    assert_eq!(api.remote().get("API:Foo"), Some(&good));
}

#[test]
fn deploy_can_skip_rollback() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "v1");
    let api = ScriptedApi::new();
    deploy(root.path(), &env(), &api, &options(), false).expect("first deploy");

    write_project(root.path(), "apis/Foo", ProjectType::Api, "v2");
    api.fail_import("API:Foo", RemoteError::Timeout);
    api.clear_calls();
    let result = deploy(root.path(), &env(), &api, &options(), true).expect("deploy");

    assert_eq!(result.rollback, RollbackStatus::Skipped);
    assert_eq!(api.calls(), vec![Call::Import("API:Foo".into())]);
}

#[test]
fn first_deploy_failure_has_nothing_to_roll_back_to() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "v1");
    let api = ScriptedApi::new();
    api.fail_import("API:Foo", RemoteError::Timeout);

    let result = deploy(root.path(), &env(), &api, &options(), false).expect("deploy");
    assert!(matches!(result.rollback, RollbackStatus::Unavailable { .. }));
}

#[test]
fn successful_deploy_needs_no_rollback() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "v1");
    let result =
        deploy(root.path(), &env(), &ScriptedApi::new(), &options(), false).expect("deploy");
    assert!(result.success());
    assert_eq!(result.rollback, RollbackStatus::NotNeeded);
}

// ---------------------------------------------------------------------------
// 3. Status
// ---------------------------------------------------------------------------

#[test]
fn status_against_last_successful_groups_by_type() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "foo");
    write_project(root.path(), "apis/Bar", ProjectType::Api, "bar");
    write_project(root.path(), "apps/Baz", ProjectType::Application, "baz");
    push(root.path(), &env(), &ScriptedApi::new(), &options()).expect("push");

    write_project(root.path(), "apis/Bar", ProjectType::Api, "bar v2");
    remove_project(root.path(), "apps/Baz");
    let classified =
        status(root.path(), &env(), RevType::LastSuccessful, &RepoOptions::default()).expect("status");

    let actual: Vec<(String, Action)> = classified
        .iter()
        .map(|c| (c.key.to_string(), c.action))
        .collect();
    assert_eq!(
        actual,
        vec![
            ("API:Bar".to_string(), Action::Save),
            ("API:Foo".to_string(), Action::Unchanged),
            ("Application:Baz".to_string(), Action::Delete),
        ]
    );
}

#[test]
fn status_never_writes_the_ledger() {
    let root = init_repo();
    write_project(root.path(), "apis/Foo", ProjectType::Api, "foo");
    let before = ledger_bytes(root.path());
    let classified = status(root.path(), &env(), RevType::LastAttempted, &RepoOptions::default()).expect("status");
    assert_eq!(classified.len(), 1);
    assert_eq!(ledger_bytes(root.path()), before);
}
