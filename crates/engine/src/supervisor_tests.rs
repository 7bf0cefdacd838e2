// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::env::LeaseConfig;
use crate::registry::ToolCallbackRegistry;
use std::time::Duration;
use tf_config::SkillHook;
use tf_core::{FakeClock, LeaseOwner, PlanningStatus, SessionStatus};
use tf_runtime::{FakeRuntime, FakeTurn, ScriptedSession, SessionEvent, StopReason};
use tf_storage::{StorePaths, TaskDocument};
use tokio::sync::oneshot;

struct Fixture {
    _dir: tempfile::TempDir,
    clock: FakeClock,
    runtime: Arc<FakeRuntime>,
    store: Arc<TaskStore<FakeClock>>,
    activity: Arc<ActivityLog>,
    leases: Arc<LeaseStore>,
    registry: Arc<ToolCallbackRegistry>,
    supervisor: Arc<Supervisor<FakeRuntime, FakeClock>>,
}

fn fixture_with_skills(skills: SkillSet) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let paths = StorePaths::for_workspace(dir.path());
    let clock = FakeClock::new();
    let runtime = Arc::new(FakeRuntime::new());
    let store = Arc::new(TaskStore::new(paths.clone(), clock.clone()));
    let activity = Arc::new(ActivityLog::new(&paths));
    let leases = Arc::new(LeaseStore::new(&paths, LeaseOwner::new("test", 1, "n", 0)));
    let registry = Arc::new(ToolCallbackRegistry::new());
    let broadcaster = Broadcaster::new();
    let workspace = Workspace::new("ws-1", dir.path(), "Test");
    let config = SupervisorConfig {
        workspace,
        skills,
        lease: LeaseConfig { ttl_ms: 120_000, heartbeat_ms: 60_000, enabled: true },
        planning_template: None,
        execution_template: None,
    };
    let supervisor = Supervisor::new(
        runtime.clone(),
        store.clone(),
        activity.clone(),
        leases.clone(),
        registry.clone(),
        broadcaster,
        clock.clone(),
        config,
    );
    Fixture { _dir: dir, clock, runtime, store, activity, leases, registry, supervisor }
}

fn fixture() -> Fixture {
    fixture_with_skills(SkillSet::default())
}

fn seed(f: &Fixture, id: &str, phase: TaskPhase) -> Task {
    let task = Task::builder().id(id).phase(phase).build();
    f.store.create(TaskDocument::new(task, "Do the thing.\n")).unwrap()
}

fn completion_turn(registry: Arc<ToolCallbackRegistry>, task_id: &str, summary: &str) -> FakeTurn {
    let task_id = task_id.to_string();
    let summary = summary.to_string();
    FakeTurn::new(vec![
        SessionEvent::MessageStart,
        SessionEvent::TextDelta { text: "working".into() },
        SessionEvent::MessageEnd {
            content: "working".into(),
            stop_reason: StopReason::Stop,
            error_message: None,
        },
        SessionEvent::TurnEnd,
    ])
    .before_settle(move || {
        registry
            .invoke_task_complete(serde_json::json!({"taskId": task_id, "summary": summary}))
            .map(|_| ())
            .unwrap_or(());
    })
}

async fn wait_for<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn execution_completes_on_task_complete_signal() {
    let f = fixture();
    let task = seed(&f, "PIFA-1", TaskPhase::Executing);
    f.runtime.script_session(ScriptedSession::new(
        "sess-1.jsonl",
        vec![completion_turn(f.registry.clone(), "PIFA-1", "all done")],
    ));

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, details| {
            let _ = tx.send((success, details));
        }))
        .unwrap();

    let (success, details) = rx.await.unwrap();
    assert!(success);
    assert_eq!(details.summary.as_deref(), Some("all done"));

    // Session file persisted, lease cleared, summary appended to the body
    let task = f.store.read(&TaskId::new("PIFA-1")).unwrap();
    assert_eq!(task.session_file.as_deref(), Some("sess-1.jsonl"));
    assert!(f.leases.read().unwrap().is_empty());
    let document = f.store.read_document(&TaskId::new("PIFA-1")).unwrap();
    assert!(document.body.contains("## Completion summary"));
    assert!(document.body.contains("all done"));
    assert!(!f.supervisor.has_live_session(&TaskId::new("PIFA-1")));
}

#[tokio::test]
async fn settle_without_signal_goes_idle_and_waits() {
    let f = fixture();
    let task = seed(&f, "PIFA-2", TaskPhase::Executing);
    f.runtime.script_session(ScriptedSession::new(
        "sess-2.jsonl",
        vec![FakeTurn::text("I did some work, what next?")],
    ));

    f.supervisor
        .execute_task(task, false, Box::new(|_, _| panic!("must not settle")))
        .unwrap();

    let supervisor = f.supervisor.clone();
    let id = TaskId::new("PIFA-2");
    wait_for(|| supervisor.session_status(&id) == Some(SessionStatus::Idle)).await;

    let entries = f.activity.read_for_task(&id).unwrap();
    let waiting = entries.iter().any(|e| matches!(
        e,
        tf_core::ActivityEntry::SystemEvent { kind: tf_core::SystemEventKind::WaitingForInput, .. }
    ));
    assert!(waiting, "expected waiting-for-input event, got {entries:?}");
    // Task is still executing; the session remains live for follow-ups
    assert!(f.supervisor.has_live_session(&id));
    assert_eq!(f.store.read(&id).unwrap().phase, TaskPhase::Executing);
}

#[tokio::test]
async fn assistant_messages_land_on_the_timeline_stripped() {
    let f = fixture();
    let task = seed(&f, "PIFA-3", TaskPhase::Executing);
    let preamble = tf_core::build_preamble(
        tf_core::AgentMode::TaskExecution,
        TaskPhase::Executing,
        PlanningStatus::None,
    );
    let echoed = format!("{preamble}\nHere is my answer.");
    f.runtime.script_session(ScriptedSession::new(
        "sess-3.jsonl",
        vec![FakeTurn::new(vec![
            SessionEvent::MessageStart,
            SessionEvent::MessageEnd {
                content: echoed,
                stop_reason: StopReason::Stop,
                error_message: None,
            },
            SessionEvent::TurnEnd,
        ])],
    ));

    f.supervisor.execute_task(task, false, Box::new(|_, _| {})).unwrap();
    let activity = f.activity.clone();
    let id = TaskId::new("PIFA-3");
    wait_for(move || {
        activity
            .read_for_task(&id)
            .map(|entries| {
                entries.iter().any(|e| matches!(
                    e,
                    tf_core::ActivityEntry::ChatMessage { content, .. } if content == "Here is my answer."
                ))
            })
            .unwrap_or(false)
    })
    .await;
}

#[tokio::test]
async fn retryable_open_failure_falls_over_to_next_model() {
    let f = fixture();
    let mut task = seed(&f, "PIFA-4", TaskPhase::Executing);
    task = f
        .store
        .update(&task.id, |t| {
            t.execution_model_config = ModelConfig::new("openai", "gpt-primary");
            t.execution_fallback_models = vec![ModelConfig::new("openai", "gpt-fallback-1")];
        })
        .unwrap();

    f.runtime.script_open_failure("429 rate limit");
    f.runtime.script_session(ScriptedSession::new(
        "sess-4.jsonl",
        vec![completion_turn(f.registry.clone(), "PIFA-4", "recovered")],
    ));

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, _| {
            let _ = tx.send(success);
        }))
        .unwrap();
    assert!(rx.await.unwrap());

    let specs = f.runtime.opened_specs();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].model.model_id, "gpt-primary");
    assert_eq!(specs[1].model.model_id, "gpt-fallback-1");

    let entries = f.activity.read_for_task(&TaskId::new("PIFA-4")).unwrap();
    let failover: Vec<_> = entries
        .iter()
        .filter_map(|e| match e {
            tf_core::ActivityEntry::SystemEvent {
                kind: tf_core::SystemEventKind::ExecutionModelFailover,
                data,
                ..
            } => data.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(failover.len(), 1);
    assert_eq!(failover[0]["fromModelId"], "gpt-primary");
    assert_eq!(failover[0]["toModelId"], "gpt-fallback-1");
}

#[tokio::test]
async fn non_retryable_failure_does_not_fall_over() {
    let f = fixture();
    let task = seed(&f, "PIFA-5", TaskPhase::Executing);
    f.store
        .update(&task.id, |t| {
            t.execution_fallback_models = vec![ModelConfig::new("openai", "gpt-fallback-1")];
        })
        .unwrap();
    let task = f.store.read(&task.id).unwrap();

    f.runtime.script_session(ScriptedSession::new(
        "sess-5.jsonl",
        vec![FakeTurn::failing("segfault in provider")],
    ));

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, details| {
            let _ = tx.send((success, details));
        }))
        .unwrap();
    let (success, details) = rx.await.unwrap();
    assert!(!success);
    assert_eq!(details.error_message.as_deref(), Some("segfault in provider"));
    // Only the primary model was tried
    assert_eq!(f.runtime.opened_specs().len(), 1);
}

#[tokio::test]
async fn pre_skills_run_once_across_fallback() {
    let skills = SkillSet::new(vec![SkillDef {
        id: "prep".into(),
        name: "Prep".into(),
        hooks: vec![SkillHook::Pre],
        kind: SkillKind::FollowUp,
        template: "Run the prep checklist.".into(),
        done_signal: None,
        max_iterations: 3,
    }])
    .unwrap();
    let f = fixture_with_skills(skills);

    let task = seed(&f, "PIFA-6", TaskPhase::Executing);
    f.store
        .update(&task.id, |t| {
            t.pre_execution_skills = vec!["prep".into()];
            t.execution_fallback_models = vec![ModelConfig::new("openai", "gpt-fallback-1")];
        })
        .unwrap();
    let task = f.store.read(&task.id).unwrap();

    // Session 1: pre-skill turn succeeds, main turn fails retryably.
    f.runtime.script_session(ScriptedSession::new(
        "sess-6a.jsonl",
        vec![FakeTurn::text("prep done"), FakeTurn::failing("429 rate limit")],
    ));
    // Session 2: main turn only.
    f.runtime.script_session(ScriptedSession::new(
        "sess-6b.jsonl",
        vec![completion_turn(f.registry.clone(), "PIFA-6", "done")],
    ));

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, _| {
            let _ = tx.send(success);
        }))
        .unwrap();
    assert!(rx.await.unwrap());

    let sessions = f.runtime.sessions();
    assert_eq!(sessions.len(), 2);
    let first: Vec<String> = sessions[0].prompts();
    let second_prompts = sessions[1].prompts();
    assert!(first[0].contains("prep checklist"), "first session runs the pre-skill first");
    assert!(
        !second_prompts.iter().chain(sessions[1].follow_ups().iter()).any(|p| p.contains("prep checklist")),
        "fallback session must not rerun pre-skills"
    );
}

#[tokio::test]
async fn pre_skill_failure_aborts_without_fallback() {
    let skills = SkillSet::new(vec![SkillDef {
        id: "prep".into(),
        name: "Prep".into(),
        hooks: vec![SkillHook::Pre],
        kind: SkillKind::FollowUp,
        template: "Run the prep checklist.".into(),
        done_signal: None,
        max_iterations: 3,
    }])
    .unwrap();
    let f = fixture_with_skills(skills);

    let task = seed(&f, "PIFA-7", TaskPhase::Executing);
    f.store
        .update(&task.id, |t| {
            t.pre_execution_skills = vec!["prep".into()];
            t.execution_fallback_models = vec![ModelConfig::new("openai", "gpt-fallback-1")];
        })
        .unwrap();
    let task = f.store.read(&task.id).unwrap();

    f.runtime.script_session(ScriptedSession::new(
        "sess-7.jsonl",
        vec![FakeTurn::failing("429 rate limit")],
    ));

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, details| {
            let _ = tx.send((success, details));
        }))
        .unwrap();
    let (success, details) = rx.await.unwrap();
    assert!(!success);
    assert!(details.error_message.unwrap().contains("pre-execution skill 'prep' failed"));
    // No fallback session was opened
    assert_eq!(f.runtime.opened_specs().len(), 1);
}

#[tokio::test]
async fn loop_skill_repeats_until_done_signal() {
    let skills = SkillSet::new(vec![SkillDef {
        id: "fix".into(),
        name: "Fix loop".into(),
        hooks: vec![SkillHook::Pre],
        kind: SkillKind::Loop,
        template: "Fix the build.".into(),
        done_signal: Some("BUILD GREEN".into()),
        max_iterations: 5,
    }])
    .unwrap();
    let f = fixture_with_skills(skills);

    let task = seed(&f, "PIFA-8", TaskPhase::Executing);
    f.store.update(&task.id, |t| t.pre_execution_skills = vec!["fix".into()]).unwrap();
    let task = f.store.read(&task.id).unwrap();

    f.runtime.script_session(ScriptedSession::new(
        "sess-8.jsonl",
        vec![
            FakeTurn::text("still broken"),
            FakeTurn::text("almost there"),
            FakeTurn::text("BUILD GREEN"),
            completion_turn(f.registry.clone(), "PIFA-8", "done"),
        ],
    ));

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, _| {
            let _ = tx.send(success);
        }))
        .unwrap();
    assert!(rx.await.unwrap());

    let sessions = f.runtime.sessions();
    // Three loop iterations + the main execution turn
    let total = sessions[0].prompts().len() + sessions[0].follow_ups().len();
    assert_eq!(total, 4);
}

#[tokio::test]
async fn planning_persists_plan_via_save_plan() {
    let f = fixture();
    let task = seed(&f, "PIFA-9", TaskPhase::Backlog);
    f.store.update(&task.id, |t| t.planning_status = PlanningStatus::Running).unwrap();
    let task = f.store.read(&task.id).unwrap();

    let registry = f.registry.clone();
    f.runtime.script_session(ScriptedSession::new(
        "sess-9.jsonl",
        vec![FakeTurn::new(vec![
            SessionEvent::MessageEnd {
                content: "planned".into(),
                stop_reason: StopReason::Stop,
                error_message: None,
            },
            SessionEvent::TurnEnd,
        ])
        .before_settle(move || {
            registry
                .invoke_save_plan(serde_json::json!({
                    "taskId": "PIFA-9",
                    "acceptanceCriteria": ["builds", "tests pass"],
                    "goal": "refactor the cache",
                    "steps": ["read", "edit"]
                }))
                .map(|_| ())
                .unwrap_or(());
        })],
    ));

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, _| {
            let _ = tx.send(success);
        }))
        .unwrap();
    assert!(rx.await.unwrap());

    let task = f.store.read(&TaskId::new("PIFA-9")).unwrap();
    assert_eq!(task.planning_status, PlanningStatus::Completed);
    let plan = task.plan.unwrap();
    assert_eq!(plan.goal, "refactor the cache");
    assert_eq!(task.acceptance_criteria, vec!["builds".to_string(), "tests pass".into()]);
}

#[tokio::test]
async fn planning_without_save_plan_is_an_error() {
    let f = fixture();
    let task = seed(&f, "PIFA-10", TaskPhase::Backlog);
    f.store.update(&task.id, |t| t.planning_status = PlanningStatus::Running).unwrap();
    let task = f.store.read(&task.id).unwrap();

    f.runtime.script_session(ScriptedSession::new(
        "sess-10.jsonl",
        vec![FakeTurn::text("I forgot to save a plan")],
    ));

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, _| {
            let _ = tx.send(success);
        }))
        .unwrap();
    assert!(!rx.await.unwrap());

    let task = f.store.read(&TaskId::new("PIFA-10")).unwrap();
    assert_eq!(task.planning_status, PlanningStatus::Error);
    assert!(task.plan.is_none());
}

#[tokio::test]
async fn planning_fallback_chain_exhaustion_flips_status_to_error() {
    let f = fixture();
    let task = seed(&f, "PIFA-11", TaskPhase::Backlog);
    f.store
        .update(&task.id, |t| {
            t.planning_status = PlanningStatus::Running;
            t.planning_model_config = ModelConfig::new("openai", "gpt-primary");
            t.planning_fallback_models = vec![ModelConfig::new("openai", "gpt-fallback-1")];
        })
        .unwrap();
    let task = f.store.read(&task.id).unwrap();

    f.runtime.script_open_failure("429 rate limit");
    f.runtime.script_open_failure("quota exhausted");

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, details| {
            let _ = tx.send((success, details));
        }))
        .unwrap();
    let (success, details) = rx.await.unwrap();
    assert!(!success);
    assert_eq!(details.error_message.as_deref(), Some("quota exhausted"));

    let task = f.store.read(&TaskId::new("PIFA-11")).unwrap();
    assert_eq!(task.planning_status, PlanningStatus::Error);
    assert!(task.plan.is_none());

    let entries = f.activity.read_for_task(&TaskId::new("PIFA-11")).unwrap();
    let failovers = entries
        .iter()
        .filter(|e| matches!(
            e,
            tf_core::ActivityEntry::SystemEvent {
                kind: tf_core::SystemEventKind::PlanningModelFailover,
                ..
            }
        ))
        .count();
    assert_eq!(failovers, 1);
}

#[tokio::test]
async fn stop_tears_down_and_drops_callback() {
    let f = fixture();
    let task = seed(&f, "PIFA-12", TaskPhase::Executing);
    f.runtime.script_session(ScriptedSession::new(
        "sess-12.jsonl",
        vec![FakeTurn::text("waiting around")],
    ));

    f.supervisor.execute_task(task, false, Box::new(|_, _| {})).unwrap();
    let supervisor = f.supervisor.clone();
    let id = TaskId::new("PIFA-12");
    wait_for(|| supervisor.session_status(&id) == Some(SessionStatus::Idle)).await;

    f.supervisor.stop(&id).await.unwrap();
    assert!(!f.supervisor.has_live_session(&id));
    assert!(f.runtime.sessions()[0].was_aborted());
    // Task untouched: still executing, operator decides what happens next
    assert_eq!(f.store.read(&id).unwrap().phase, TaskPhase::Executing);

    // Follow-up against the stopped session is rejected
    assert!(f.supervisor.follow_up(&id, "hello?", Vec::new()).await.is_err());
}

#[tokio::test]
async fn follow_up_requires_fresh_completion_signal() {
    let f = fixture();
    let task = seed(&f, "PIFA-13", TaskPhase::Executing);
    f.runtime.script_session(ScriptedSession::new(
        "sess-13.jsonl",
        vec![
            FakeTurn::text("first pass done, waiting"),
            completion_turn(f.registry.clone(), "PIFA-13", "follow-up finished"),
        ],
    ));

    let (tx, rx) = oneshot::channel();
    f.supervisor
        .execute_task(task, false, Box::new(move |success, details| {
            let _ = tx.send((success, details));
        }))
        .unwrap();

    let supervisor = f.supervisor.clone();
    let id = TaskId::new("PIFA-13");
    wait_for(|| supervisor.session_status(&id) == Some(SessionStatus::Idle)).await;

    f.supervisor.follow_up(&id, "please finish up", Vec::new()).await.unwrap();
    let (success, details) = rx.await.unwrap();
    assert!(success);
    assert_eq!(details.summary.as_deref(), Some("follow-up finished"));
}

#[tokio::test]
async fn steer_delivers_interrupt_and_logs_user_message() {
    let f = fixture();
    let task = seed(&f, "PIFA-14", TaskPhase::Executing);
    f.runtime.script_session(ScriptedSession::new(
        "sess-14.jsonl",
        vec![FakeTurn::text("working away")],
    ));

    f.supervisor.execute_task(task, false, Box::new(|_, _| {})).unwrap();
    let supervisor = f.supervisor.clone();
    let id = TaskId::new("PIFA-14");
    wait_for(|| supervisor.session_status(&id) == Some(SessionStatus::Idle)).await;

    f.supervisor.steer(&id, "focus on the parser", Vec::new()).await.unwrap();
    assert_eq!(f.runtime.sessions()[0].steers(), vec!["focus on the parser".to_string()]);

    let entries = f.activity.read_for_task(&id).unwrap();
    assert!(entries.iter().any(|e| matches!(
        e,
        tf_core::ActivityEntry::ChatMessage { role: tf_core::ChatRole::User, content, .. }
            if content == "focus on the parser"
    )));
}

#[tokio::test]
async fn resume_chat_reopens_from_session_file() {
    let f = fixture();
    let task = seed(&f, "PIFA-15", TaskPhase::Complete);
    f.store.update(&task.id, |t| t.session_file = Some("old-sess.jsonl".into())).unwrap();
    let task = f.store.read(&task.id).unwrap();

    f.runtime.script_session(ScriptedSession::new(
        "new-sess.jsonl",
        vec![FakeTurn::text("we changed the cache layer")],
    ));

    f.supervisor.resume_chat(task, "what did you change?").await.unwrap();
    let supervisor = f.supervisor.clone();
    let id = TaskId::new("PIFA-15");
    wait_for(|| supervisor.session_status(&id) == Some(SessionStatus::Idle)).await;

    let specs = f.runtime.opened_specs();
    assert_eq!(specs.len(), 1);
    assert_eq!(
        specs[0].session_source,
        tf_runtime::SessionSource::ResumeFrom("old-sess.jsonl".into())
    );
    // The chat prompt carries the completed-task contract
    let prompts = f.runtime.sessions()[0].prompts();
    assert!(prompts[0].contains("mode: task_complete"));
    assert!(prompts[0].contains("what did you change?"));
}

#[tokio::test]
async fn lease_is_written_for_execution_sessions() {
    let f = fixture();
    f.clock.set_epoch_ms(50_000);
    let task = seed(&f, "PIFA-16", TaskPhase::Executing);
    f.runtime.script_session(ScriptedSession::new(
        "sess-16.jsonl",
        vec![FakeTurn::text("waiting")],
    ));

    f.supervisor.execute_task(task, false, Box::new(|_, _| {})).unwrap();
    let supervisor = f.supervisor.clone();
    let id = TaskId::new("PIFA-16");
    wait_for(|| supervisor.session_status(&id) == Some(SessionStatus::Idle)).await;

    let leases = f.leases.read().unwrap();
    let lease = leases.get(&id).expect("lease written at execution start");
    assert_eq!(lease.status, "running");
    assert_eq!(lease.started_at_ms, 50_000);
}
