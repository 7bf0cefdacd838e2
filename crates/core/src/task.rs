// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record and phase state machine.
//!
//! A task is the atomic unit of work: a human-assigned id (e.g. `PIFA-123`),
//! a Markdown body, and structured frontmatter carrying the phase, plan,
//! model configuration, and attachment list. Tasks move
//! backlog → ready → executing → complete, and may be archived at any point.

use crate::clock::Clock;
use crate::model::ModelConfig;
use crate::plan::Plan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_string_id! {
    /// Human-assigned task identifier (e.g. `PIFA-123`).
    pub struct TaskId;
}

crate::define_id! {
    /// Generated identifier for a stored attachment.
    pub struct AttachmentId("att-");
}

/// Phase a task is resting in.
///
/// Exactly one phase per task at rest; the queue manager owns transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    Backlog,
    Ready,
    Executing,
    Complete,
    Archived,
}

impl TaskPhase {
    /// All phases, in pipeline order.
    pub const ALL: [TaskPhase; 5] = [
        TaskPhase::Backlog,
        TaskPhase::Ready,
        TaskPhase::Executing,
        TaskPhase::Complete,
        TaskPhase::Archived,
    ];

    /// Phases the queue manager dispatches from or into.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskPhase::Ready | TaskPhase::Executing)
    }
}

crate::simple_display! {
    TaskPhase {
        Backlog => "backlog",
        Ready => "ready",
        Executing => "executing",
        Complete => "complete",
        Archived => "archived",
    }
}

/// Progress of plan generation for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanningStatus {
    #[default]
    None,
    Running,
    Completed,
    Error,
}

crate::simple_display! {
    PlanningStatus {
        None => "none",
        Running => "running",
        Completed => "completed",
        Error => "error",
    }
}

/// Frontmatter record for one stored attachment.
///
/// `stored_name` is the on-disk filename (`{attachment_id}{ext}`); `filename`
/// is the user-facing display name and never touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMeta {
    pub id: AttachmentId,
    pub filename: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl AttachmentMeta {
    /// Whether the attachment is an image (loaded inline for prompts).
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// A task record — the frontmatter half of a task file.
///
/// Serializes with camelCase keys to match the on-disk frontmatter layout.
/// The Markdown body travels separately (see `tf-storage`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    pub phase: TaskPhase,
    /// FIFO tiebreaker within (workspace, phase). Unique per phase.
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub planning_status: PlanningStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentMeta>,
    pub planning_model_config: ModelConfig,
    pub execution_model_config: ModelConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planning_fallback_models: Vec<ModelConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution_fallback_models: Vec<ModelConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_execution_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_execution_skills: Vec<String>,
    /// Opaque identifier from the agent runtime that lets a later turn
    /// resume the same conversation. Never interpreted by the orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<String>,
}

impl Task {
    /// Create a new backlog task with the given id, title, and model configs.
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        planning_model_config: ModelConfig,
        execution_model_config: ModelConfig,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.now_utc();
        Self {
            id,
            title: title.into(),
            created: now,
            updated: now,
            started: None,
            completed: None,
            phase: TaskPhase::Backlog,
            order: 0,
            planning_status: PlanningStatus::None,
            plan: None,
            acceptance_criteria: Vec::new(),
            attachments: Vec::new(),
            planning_model_config,
            execution_model_config,
            planning_fallback_models: Vec::new(),
            execution_fallback_models: Vec::new(),
            pre_execution_skills: Vec::new(),
            post_execution_skills: Vec::new(),
            session_file: None,
        }
    }

    /// Bump the `updated` stamp.
    pub fn touch(&mut self, clock: &impl Clock) {
        self.updated = clock.now_utc();
    }

    /// Age of the `started` stamp in milliseconds, if any.
    ///
    /// Used by orphan recovery to distinguish recently-started work from
    /// work stranded by a previous process.
    pub fn started_age_ms(&self, now_ms: u64) -> Option<u64> {
        self.started
            .map(|s| now_ms.saturating_sub(s.timestamp_millis().max(0) as u64))
    }

    /// Whether the task's plan generation is in flight without a plan yet.
    ///
    /// Such tasks are excluded from ready-queue dispatch.
    pub fn planning_in_flight(&self) -> bool {
        self.planning_status == PlanningStatus::Running && self.plan.is_none()
    }

    /// The ordered model chain for execution: active config then fallbacks.
    pub fn execution_model_chain(&self) -> Vec<ModelConfig> {
        let mut chain = vec![self.execution_model_config.clone()];
        chain.extend(self.execution_fallback_models.iter().cloned());
        chain
    }

    /// The ordered model chain for planning: active config then fallbacks.
    pub fn planning_model_chain(&self) -> Vec<ModelConfig> {
        let mut chain = vec![self.planning_model_config.clone()];
        chain.extend(self.planning_fallback_models.iter().cloned());
        chain
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            id: TaskId = "TASK-1",
            title: String = "Test task",
        }
        set {
            phase: TaskPhase = TaskPhase::Backlog,
            order: u32 = 0,
            planning_status: PlanningStatus = PlanningStatus::None,
            acceptance_criteria: Vec<String> = Vec::new(),
            attachments: Vec<AttachmentMeta> = Vec::new(),
            planning_model_config: ModelConfig = ModelConfig::new("openai", "gpt-plan"),
            execution_model_config: ModelConfig = ModelConfig::new("openai", "gpt-exec"),
            planning_fallback_models: Vec<ModelConfig> = Vec::new(),
            execution_fallback_models: Vec<ModelConfig> = Vec::new(),
            pre_execution_skills: Vec<String> = Vec::new(),
            post_execution_skills: Vec<String> = Vec::new(),
            created: chrono::DateTime<chrono::Utc> = crate::clock::utc_from_epoch_ms(1_000_000),
            updated: chrono::DateTime<chrono::Utc> = crate::clock::utc_from_epoch_ms(1_000_000),
        }
        option {
            started: chrono::DateTime<chrono::Utc> = None,
            completed: chrono::DateTime<chrono::Utc> = None,
            plan: Plan = None,
            session_file: String = None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
