// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::utc_from_epoch_ms;

fn meta(task: &str, ms: u64) -> EntryMeta {
    EntryMeta::new(TaskId::new(task), utc_from_epoch_ms(ms))
}

fn separator(task: &str, ms: u64) -> ActivityEntry {
    ActivityEntry::TaskSeparator { meta: meta(task, ms) }
}

fn message(task: &str, ms: u64, content: &str) -> ActivityEntry {
    ActivityEntry::ChatMessage {
        meta: meta(task, ms),
        role: ChatRole::Agent,
        content: content.into(),
        metadata: None,
    }
}

#[test]
fn entries_serialize_with_type_tag() {
    let entry = message("PIFA-1", 1_000, "hello");
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["type"], "chat-message");
    assert_eq!(json["taskId"], "PIFA-1");
    assert_eq!(json["role"], "agent");
}

#[test]
fn system_event_round_trips() {
    let entry = ActivityEntry::SystemEvent {
        meta: meta("PIFA-2", 2_000),
        kind: SystemEventKind::PhaseChange,
        message: "ready to executing".into(),
        data: None,
    };
    let json = serde_json::to_string(&entry).unwrap();
    assert!(json.contains("\"kind\":\"phase-change\""));
    let back: ActivityEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(entry, back);
}

#[test]
fn tool_metadata_round_trips() {
    let entry = ActivityEntry::ChatMessage {
        meta: meta("PIFA-3", 3_000),
        role: ChatRole::Agent,
        content: "ran the tests".into(),
        metadata: Some(MessageMetadata {
            tool_name: Some("shell".into()),
            tool_args: Some(serde_json::json!({"command": "cargo test"})),
            result: Some("ok".into()),
            is_error: false,
        }),
    };
    let json = serde_json::to_string(&entry).unwrap();
    let back: ActivityEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(entry, back);
}

#[test]
fn grouping_folds_at_separators() {
    // Newest-first: task B's session, then task A's session
    let entries = vec![
        message("B", 500, "b-last"),
        message("B", 400, "b-first"),
        separator("B", 300),
        message("A", 200, "a-only"),
        separator("A", 100),
    ];
    let sessions = group_sessions(&entries);
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].task_id, "B");
    assert_eq!(sessions[0].entries.len(), 3);
    assert!(sessions[0].entries[2].is_separator());
    assert_eq!(sessions[1].task_id, "A");
    assert_eq!(sessions[1].entries.len(), 2);
}

#[test]
fn grouping_keeps_trailing_entries_without_separator() {
    let entries = vec![message("A", 300, "new"), separator("A", 200), message("A", 100, "old")];
    let sessions = group_sessions(&entries);
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[1].entries.len(), 1);
    assert_eq!(sessions[1].task_id, "A");
}

#[test]
fn grouping_empty_input_is_empty() {
    assert!(group_sessions(&[]).is_empty());
}

#[test]
fn entry_ids_are_unique_per_meta() {
    let a = meta("T", 0);
    let b = meta("T", 0);
    assert_ne!(a.id, b.id);
}
