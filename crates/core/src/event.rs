// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast events emitted by the orchestration core.
//!
//! Consumed by the HTTP/WebSocket collaborator; emission is fire-and-forget.
//! Serializes with `{"type": "task:moved", ...fields}` format.

use crate::activity::ActivityEntry;
use crate::plan::Plan;
use crate::session::SessionStatus;
use crate::task::{Task, TaskId, TaskPhase};
use crate::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};

/// Events broadcast to UI listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Broadcast {
    // -- queue --
    #[serde(rename = "queue:status")]
    QueueStatus {
        workspace_id: WorkspaceId,
        enabled: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_task_id: Option<TaskId>,
        /// Breaker keys (`provider/model`) currently blocking dispatch.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        open_breakers: Vec<String>,
    },

    // -- task --
    #[serde(rename = "task:moved")]
    TaskMoved { task: Task, from: TaskPhase, to: TaskPhase },

    #[serde(rename = "task:updated")]
    TaskUpdated {
        task: Task,
        /// Names of the frontmatter fields that changed.
        changes: Vec<String>,
    },

    #[serde(rename = "task:plan_generated")]
    PlanGenerated { task_id: TaskId, plan: Plan },

    // -- activity --
    #[serde(rename = "activity:entry")]
    Activity { entry: ActivityEntry },

    // -- agent session --
    #[serde(rename = "agent:execution_status")]
    ExecutionStatus { task_id: TaskId, status: SessionStatus },

    #[serde(rename = "agent:streaming_start")]
    StreamingStart { task_id: TaskId },

    #[serde(rename = "agent:streaming_text")]
    StreamingText { task_id: TaskId, text: String },

    #[serde(rename = "agent:streaming_end")]
    StreamingEnd { task_id: TaskId },

    #[serde(rename = "agent:thinking_delta")]
    ThinkingDelta { task_id: TaskId, text: String },

    #[serde(rename = "agent:thinking_end")]
    ThinkingEnd { task_id: TaskId },

    #[serde(rename = "agent:tool_start")]
    ToolStart { task_id: TaskId, tool: String, args: serde_json::Value },

    #[serde(rename = "agent:tool_update")]
    ToolUpdate {
        task_id: TaskId,
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    #[serde(rename = "agent:tool_end")]
    ToolEnd {
        task_id: TaskId,
        tool: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },

    #[serde(rename = "agent:turn_end")]
    TurnEnd { task_id: TaskId },
}

impl Broadcast {
    /// Wire tag for logging and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Broadcast::QueueStatus { .. } => "queue:status",
            Broadcast::TaskMoved { .. } => "task:moved",
            Broadcast::TaskUpdated { .. } => "task:updated",
            Broadcast::PlanGenerated { .. } => "task:plan_generated",
            Broadcast::Activity { .. } => "activity:entry",
            Broadcast::ExecutionStatus { .. } => "agent:execution_status",
            Broadcast::StreamingStart { .. } => "agent:streaming_start",
            Broadcast::StreamingText { .. } => "agent:streaming_text",
            Broadcast::StreamingEnd { .. } => "agent:streaming_end",
            Broadcast::ThinkingDelta { .. } => "agent:thinking_delta",
            Broadcast::ThinkingEnd { .. } => "agent:thinking_end",
            Broadcast::ToolStart { .. } => "agent:tool_start",
            Broadcast::ToolUpdate { .. } => "agent:tool_update",
            Broadcast::ToolEnd { .. } => "agent:tool_end",
            Broadcast::TurnEnd { .. } => "agent:turn_end",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
