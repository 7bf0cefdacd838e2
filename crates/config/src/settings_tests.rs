// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn built_in_defaults_apply_when_layers_are_empty() {
    let limits = WorkflowOverrides::default().resolve(&WorkflowOverrides::default());
    assert_eq!(limits, WorkflowLimits::default());
    assert_eq!(limits.executing_limit, 1);
    assert!(!limits.ready_to_executing);
}

#[test]
fn workspace_layer_wins_over_global() {
    let global = WorkflowOverrides { executing_limit: Some(3), ready_limit: Some(10), ..Default::default() };
    let workspace = WorkflowOverrides { executing_limit: Some(2), ..Default::default() };
    let limits = workspace.resolve(&global);
    assert_eq!(limits.executing_limit, 2);
    assert_eq!(limits.ready_limit, 10);
}

#[test]
fn null_override_inherits() {
    let global = WorkflowOverrides { backlog_to_ready: Some(true), ..Default::default() };
    let limits = WorkflowOverrides::default().resolve(&global);
    assert!(limits.backlog_to_ready);
}

#[test]
fn legacy_queue_enabled_backs_ready_to_executing() {
    let workspace = WorkflowOverrides { queue_enabled: Some(true), ..Default::default() };
    let limits = workspace.resolve(&WorkflowOverrides::default());
    assert!(limits.ready_to_executing);

    // The modern field takes precedence within a layer
    let workspace = WorkflowOverrides {
        ready_to_executing: Some(false),
        queue_enabled: Some(true),
        ..Default::default()
    };
    assert!(!workspace.resolve(&WorkflowOverrides::default()).ready_to_executing);
}

#[test]
fn patching_ready_to_executing_syncs_legacy_flag() {
    let mut overrides = WorkflowOverrides::default();
    overrides.apply(&WorkflowPatch {
        ready_to_executing: Some(Some(true)),
        ..Default::default()
    });
    assert_eq!(overrides.ready_to_executing, Some(true));
    assert_eq!(overrides.queue_enabled, Some(true));

    overrides.apply(&WorkflowPatch { ready_to_executing: Some(None), ..Default::default() });
    assert_eq!(overrides.ready_to_executing, None);
    assert_eq!(overrides.queue_enabled, None);
}

#[test]
fn patch_leaves_untouched_fields_alone() {
    let mut overrides = WorkflowOverrides { executing_limit: Some(4), ..Default::default() };
    overrides.apply(&WorkflowPatch { ready_limit: Some(Some(8)), ..Default::default() });
    assert_eq!(overrides.executing_limit, Some(4));
    assert_eq!(overrides.ready_limit, Some(8));
}

#[test]
fn patch_json_null_clears_while_absent_key_is_untouched() {
    // null must survive as Some(None), not collapse to "key absent"
    let patch: WorkflowPatch =
        serde_json::from_str(r#"{"executingLimit": null, "readyLimit": 7}"#).unwrap();
    assert_eq!(patch.executing_limit, Some(None));
    assert_eq!(patch.ready_limit, Some(Some(7)));
    assert_eq!(patch.backlog_to_ready, None);

    let mut overrides = WorkflowOverrides {
        executing_limit: Some(4),
        backlog_to_ready: Some(true),
        ..Default::default()
    };
    overrides.apply(&patch);
    // Cleared back to inherit
    assert_eq!(overrides.executing_limit, None);
    assert_eq!(overrides.ready_limit, Some(7));
    // Absent key left alone
    assert_eq!(overrides.backlog_to_ready, Some(true));
}

#[test]
fn patch_json_null_on_queue_toggle_clears_legacy_flag_too() {
    let patch: WorkflowPatch = serde_json::from_str(r#"{"readyToExecuting": null}"#).unwrap();
    let mut overrides = WorkflowOverrides {
        ready_to_executing: Some(true),
        queue_enabled: Some(true),
        ..Default::default()
    };
    overrides.apply(&patch);
    assert_eq!(overrides.ready_to_executing, None);
    assert_eq!(overrides.queue_enabled, None);
}

#[test]
fn empty_patch_json_changes_nothing() {
    let patch: WorkflowPatch = serde_json::from_str("{}").unwrap();
    assert_eq!(patch, WorkflowPatch::default());
    let mut overrides = WorkflowOverrides { executing_limit: Some(2), ..Default::default() };
    overrides.apply(&patch);
    assert_eq!(overrides.executing_limit, Some(2));
}

#[test]
fn load_missing_file_is_empty_layer() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = WorkflowOverrides::load(&dir.path().join("nope.json")).unwrap();
    assert_eq!(loaded, WorkflowOverrides::default());
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings").join("workflow.json");
    let overrides = WorkflowOverrides {
        executing_limit: Some(2),
        ready_to_executing: Some(true),
        queue_enabled: Some(true),
        ..Default::default()
    };
    overrides.save(&path).unwrap();
    assert_eq!(WorkflowOverrides::load(&path).unwrap(), overrides);
}

#[test]
fn malformed_file_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflow.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(WorkflowOverrides::load(&path), Err(ConfigError::Parse { .. })));
}
