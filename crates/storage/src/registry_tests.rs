// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tf_core::WorkspaceId;

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = registry_path(dir.path());
    let workspaces = vec![
        Workspace::new("ws-1", "/repos/alpha", "Alpha"),
        Workspace::new("ws-2", "/repos/beta", "Beta"),
    ];
    save_workspaces(&path, &workspaces).unwrap();

    let loaded = load_workspaces(&path).unwrap();
    assert_eq!(loaded, workspaces);
    assert_eq!(loaded[0].id, WorkspaceId::new("ws-1"));
}

#[test]
fn missing_registry_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_workspaces(&registry_path(dir.path())).unwrap().is_empty());
}

#[test]
fn malformed_registry_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = registry_path(dir.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[{]").unwrap();
    assert!(matches!(load_workspaces(&path), Err(StoreError::Registry { .. })));
}

#[test]
fn registry_lives_under_app_dir() {
    let path = registry_path(std::path::Path::new("/home/u"));
    assert_eq!(path, std::path::PathBuf::from("/home/u/.taskfactory/workspaces.json"));
}
