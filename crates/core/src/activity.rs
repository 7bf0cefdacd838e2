// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity timeline entry types.
//!
//! Entries are appended to a per-workspace journal and never mutated.
//! Serializes with `{"type": "chat-message", ...fields}` format.

use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Generated identifier for a journal entry.
    pub struct EntryId("ent-");
}

/// Who produced a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Agent,
    System,
}

crate::simple_display! {
    ChatRole {
        User => "user",
        Agent => "agent",
        System => "system",
    }
}

/// Kinds of system events recorded on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemEventKind {
    PhaseChange,
    WaitingForInput,
    ExecutionError,
    PlanningError,
    PlanningModelFailover,
    ExecutionModelFailover,
    BreakerOpened,
    BreakerClosed,
    DispatchBlocked,
    OrphanRecovered,
    QueueStarted,
    QueueStopped,
    SkillFailed,
}

crate::simple_display! {
    SystemEventKind {
        PhaseChange => "phase-change",
        WaitingForInput => "waiting-for-input",
        ExecutionError => "execution-error",
        PlanningError => "planning-error",
        PlanningModelFailover => "planning-model-failover",
        ExecutionModelFailover => "execution-model-failover",
        BreakerOpened => "breaker-opened",
        BreakerClosed => "breaker-closed",
        DispatchBlocked => "dispatch-blocked",
        OrphanRecovered => "orphan-recovered",
        QueueStarted => "queue-started",
        QueueStopped => "queue-stopped",
        SkillFailed => "skill-failed",
    }
}

/// Tool-call metadata attached to agent chat messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_args: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// Fields common to every journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMeta {
    pub id: EntryId,
    pub task_id: TaskId,
    pub timestamp: DateTime<Utc>,
}

impl EntryMeta {
    pub fn new(task_id: TaskId, timestamp: DateTime<Utc>) -> Self {
        Self { id: EntryId::new(), task_id, timestamp }
    }
}

/// One record on the activity timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActivityEntry {
    /// Marks the start of a task session on the timeline.
    #[serde(rename = "task-separator")]
    TaskSeparator {
        #[serde(flatten)]
        meta: EntryMeta,
    },

    #[serde(rename = "chat-message")]
    ChatMessage {
        #[serde(flatten)]
        meta: EntryMeta,
        role: ChatRole,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<MessageMetadata>,
    },

    #[serde(rename = "system-event")]
    SystemEvent {
        #[serde(flatten)]
        meta: EntryMeta,
        kind: SystemEventKind,
        message: String,
        /// Structured payload for events that carry more than a message
        /// (e.g. failover from/to model ids).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
}

impl ActivityEntry {
    pub fn meta(&self) -> &EntryMeta {
        match self {
            ActivityEntry::TaskSeparator { meta } => meta,
            ActivityEntry::ChatMessage { meta, .. } => meta,
            ActivityEntry::SystemEvent { meta, .. } => meta,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.meta().task_id
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, ActivityEntry::TaskSeparator { .. })
    }
}

/// One task session folded out of the newest-first timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySession {
    pub task_id: TaskId,
    /// Entries newest-first, ending with the separator that opened the session.
    pub entries: Vec<ActivityEntry>,
}

/// Fold a newest-first entry sequence into per-task sessions.
///
/// A session starts (chronologically) at each `task-separator`; reading
/// newest-first, the separator is therefore the last entry of its group.
/// Entries older than the first separator encountered form a trailing
/// group keyed by their own task id.
pub fn group_sessions(entries: &[ActivityEntry]) -> Vec<ActivitySession> {
    let mut sessions = Vec::new();
    let mut current: Vec<ActivityEntry> = Vec::new();

    for entry in entries {
        let closes = entry.is_separator();
        current.push(entry.clone());
        if closes {
            sessions.push(ActivitySession {
                task_id: entry.task_id().clone(),
                entries: std::mem::take(&mut current),
            });
        }
    }

    if let Some(first) = current.first() {
        sessions.push(ActivitySession {
            task_id: first.task_id().clone(),
            entries: current,
        });
    }

    sessions
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
