// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex as PlMutex;
use serde_json::json;

#[test]
fn save_plan_requires_criteria() {
    let registry = ToolCallbackRegistry::new();
    let result = registry.invoke_save_plan(json!({
        "taskId": "PIFA-1",
        "acceptanceCriteria": ["  ", ""],
        "goal": "ship"
    }));
    assert!(matches!(result, Err(ToolError::InvalidArgs(_))));
}

#[test]
fn save_plan_requires_some_plan_shape() {
    let registry = ToolCallbackRegistry::new();
    let result = registry.invoke_save_plan(json!({
        "taskId": "PIFA-1",
        "acceptanceCriteria": ["compiles"]
    }));
    assert!(matches!(result, Err(ToolError::InvalidArgs(_))));
}

#[test]
fn save_plan_rejects_unknown_fields() {
    let registry = ToolCallbackRegistry::new();
    let result = registry.invoke_save_plan(json!({
        "taskId": "PIFA-1",
        "acceptanceCriteria": ["compiles"],
        "goal": "ship",
        "surprise": true
    }));
    assert!(matches!(result, Err(ToolError::InvalidArgs(_))));
}

#[test]
fn legacy_plan_gains_synthesized_visual_section() {
    let args: SavePlanArgs = serde_json::from_value(json!({
        "taskId": "PIFA-1",
        "acceptanceCriteria": [" compiles ", "tests pass"],
        "goal": "ship it",
        "steps": ["a", "b"]
    }))
    .unwrap();
    let payload = args.normalized().unwrap();
    assert_eq!(payload.acceptance_criteria, vec!["compiles".to_string(), "tests pass".into()]);
    assert_eq!(payload.plan.goal, "ship it");
    assert_eq!(payload.plan.visual_plan.len(), 1);
    assert_eq!(payload.plan.visual_plan[0]["component"], "PlanSummary");
}

#[test]
fn visual_plan_gains_placeholder_goal() {
    let args: SavePlanArgs = serde_json::from_value(json!({
        "taskId": "PIFA-1",
        "acceptanceCriteria": ["works"],
        "visualPlan": [{"component": "ArchitectureDiff", "before": [], "after": []}]
    }))
    .unwrap();
    let payload = args.normalized().unwrap();
    assert_eq!(payload.plan.goal, "See visual plan");
    assert_eq!(payload.plan.visual_plan.len(), 1);
}

#[test]
fn visual_plan_sections_are_shape_checked() {
    let args: SavePlanArgs = serde_json::from_value(json!({
        "taskId": "PIFA-1",
        "acceptanceCriteria": ["works"],
        "visualPlan": [{"missing": "component"}]
    }))
    .unwrap();
    assert!(matches!(args.normalized(), Err(ToolError::InvalidArgs(_))));
}

#[test]
fn unregistered_tool_returns_fallback_message() {
    let registry = ToolCallbackRegistry::new();
    let result = registry
        .invoke_task_complete(json!({"taskId": "PIFA-9", "summary": "done"}))
        .unwrap();
    assert_eq!(result, UNAVAILABLE_MESSAGE);
}

#[test]
fn complete_callback_receives_summary() {
    let registry = ToolCallbackRegistry::new();
    let seen: Arc<PlMutex<Vec<String>>> = Arc::new(PlMutex::new(Vec::new()));
    let sink = seen.clone();
    registry.register_complete(
        TaskId::new("PIFA-1"),
        Arc::new(move |summary| sink.lock().push(summary)),
    );

    registry
        .invoke_task_complete(json!({"taskId": "PIFA-1", "summary": "all green"}))
        .unwrap();
    assert_eq!(seen.lock().as_slice(), ["all green"]);
}

#[test]
fn plan_callback_gets_normalized_payload() {
    let registry = ToolCallbackRegistry::new();
    let seen: Arc<PlMutex<Option<PlanPayload>>> = Arc::new(PlMutex::new(None));
    let sink = seen.clone();
    registry.register_plan(
        TaskId::new("PIFA-1"),
        Arc::new(move |payload| {
            *sink.lock() = Some(payload);
            Ok("saved".into())
        }),
    );

    let out = registry
        .invoke_save_plan(json!({
            "taskId": "PIFA-1",
            "acceptanceCriteria": ["c1"],
            "goal": "g",
            "validation": ["cargo test"]
        }))
        .unwrap();
    assert_eq!(out, "saved");
    let payload = seen.lock().clone().unwrap();
    assert_eq!(payload.task_id, "PIFA-1");
    assert_eq!(payload.plan.validation, vec!["cargo test".to_string()]);
}

#[test]
fn removal_is_idempotent() {
    let registry = ToolCallbackRegistry::new();
    registry.register_complete(TaskId::new("PIFA-1"), Arc::new(|_| {}));
    registry.remove_complete(&TaskId::new("PIFA-1"));
    registry.remove_complete(&TaskId::new("PIFA-1"));

    let out = registry
        .invoke_task_complete(json!({"taskId": "PIFA-1", "summary": "late"}))
        .unwrap();
    assert_eq!(out, UNAVAILABLE_MESSAGE);
}

#[test]
fn message_agent_kind_parses_kebab_case() {
    let args: MessageAgentArgs = serde_json::from_value(json!({
        "taskId": "PIFA-1",
        "kind": "follow-up",
        "content": "keep going"
    }))
    .unwrap();
    assert_eq!(args.kind, MessageAgentKind::FollowUp);
}

#[test]
fn ask_questions_requires_questions() {
    let registry = ToolCallbackRegistry::new();
    let result = registry.invoke_ask_questions(json!({
        "requestId": "r1",
        "questions": [],
        "workspaceId": "ws-1"
    }));
    assert!(matches!(result, Err(ToolError::InvalidArgs(_))));
}

#[test]
fn factory_control_validates_action() {
    let registry = ToolCallbackRegistry::new();
    let bad = registry.invoke_factory_control(
        &WorkspaceId::new("ws-1"),
        json!({"action": "explode"}),
    );
    assert!(matches!(bad, Err(ToolError::InvalidArgs(_))));

    let seen = Arc::new(PlMutex::new(Vec::new()));
    let sink = seen.clone();
    registry.register_factory_control(
        WorkspaceId::new("ws-1"),
        Arc::new(move |args| {
            sink.lock().push(args.action);
            Ok("queue running".into())
        }),
    );
    let out = registry
        .invoke_factory_control(&WorkspaceId::new("ws-1"), json!({"action": "status"}))
        .unwrap();
    assert_eq!(out, "queue running");
    assert_eq!(seen.lock().as_slice(), [FactoryAction::Status]);
}

#[test]
fn attach_file_defaults_to_context_task() {
    let registry = ToolCallbackRegistry::new();
    let seen = Arc::new(PlMutex::new(Vec::new()));
    let sink = seen.clone();
    registry.register_attach_file(
        TaskId::new("PIFA-7"),
        Arc::new(move |args| {
            sink.lock().push(args.path.clone());
            Ok("attached".into())
        }),
    );

    let out = registry
        .invoke_attach_file(&TaskId::new("PIFA-7"), json!({"path": "/tmp/shot.png"}))
        .unwrap();
    assert_eq!(out, "attached");
    assert_eq!(seen.lock().as_slice(), ["/tmp/shot.png"]);
}
