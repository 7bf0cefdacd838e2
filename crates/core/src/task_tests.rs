// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{utc_from_epoch_ms, FakeClock};
use crate::model::ModelConfig;

#[test]
fn new_task_starts_in_backlog() {
    let clock = FakeClock::new();
    let task = Task::new(
        TaskId::new("PIFA-1"),
        "Fix the login flow",
        ModelConfig::new("openai", "gpt-plan"),
        ModelConfig::new("openai", "gpt-exec"),
        &clock,
    );
    assert_eq!(task.phase, TaskPhase::Backlog);
    assert_eq!(task.planning_status, PlanningStatus::None);
    assert!(task.plan.is_none());
    assert_eq!(task.created, task.updated);
}

#[test]
fn touch_bumps_updated_only() {
    let clock = FakeClock::new();
    let mut task = Task::builder().build();
    let created = task.created;
    clock.set_epoch_ms(2_000_000);
    task.touch(&clock);
    assert_eq!(task.created, created);
    assert!(task.updated > created);
}

#[test]
fn planning_in_flight_requires_running_without_plan() {
    let mut task = Task::builder().planning_status(PlanningStatus::Running).build();
    assert!(task.planning_in_flight());

    task.plan = Some(crate::plan::Plan::new("goal"));
    assert!(!task.planning_in_flight());

    task.planning_status = PlanningStatus::Completed;
    task.plan = None;
    assert!(!task.planning_in_flight());
}

#[test]
fn execution_model_chain_is_active_then_fallbacks() {
    let task = Task::builder()
        .execution_model_config(ModelConfig::new("openai", "gpt-primary"))
        .execution_fallback_models(vec![
            ModelConfig::new("openai", "gpt-fallback-1"),
            ModelConfig::new("anthropic", "claude-fallback"),
        ])
        .build();
    let chain = task.execution_model_chain();
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[0].model_id, "gpt-primary");
    assert_eq!(chain[2].provider, "anthropic");
}

#[test]
fn started_age_reflects_elapsed_time() {
    let started = utc_from_epoch_ms(1_000_000);
    let task = Task::builder().started(started).build();
    assert_eq!(task.started_age_ms(1_600_000), Some(600_000));

    let unstarted = Task::builder().build();
    assert_eq!(unstarted.started_age_ms(1_600_000), None);
}

#[test]
fn frontmatter_round_trips_through_yaml() {
    let task = Task::builder()
        .id("PIFA-7")
        .acceptance_criteria(vec!["compiles".into(), "tests pass".into()])
        .session_file("sess-abc.jsonl")
        .plan(crate::plan::Plan::new("ship it"))
        .build();
    let yaml = serde_yaml::to_string(&task).unwrap();
    let back: Task = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(task, back);
}

#[test]
fn phase_serializes_lowercase() {
    let yaml = serde_yaml::to_string(&TaskPhase::Executing).unwrap();
    assert_eq!(yaml.trim(), "executing");
}

#[test]
fn attachment_image_detection() {
    let meta = AttachmentMeta {
        id: AttachmentId::from_string("att-x"),
        filename: "shot.png".into(),
        stored_name: "att-x.png".into(),
        mime_type: "image/png".into(),
        size: 10,
        created_at: utc_from_epoch_ms(0),
    };
    assert!(meta.is_image());

    let doc = AttachmentMeta { mime_type: "application/pdf".into(), ..meta };
    assert!(!doc.is_image());
}
