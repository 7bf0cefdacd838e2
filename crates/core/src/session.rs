// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor session status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a supervised agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No turn in flight; the session is alive and accepting follow-ups.
    #[default]
    Idle,
    /// A turn is in flight.
    Running,
    /// Operator stopped the session; stale settlements are dropped.
    Paused,
    /// The agent signaled completion and post-skills finished.
    Completed,
    /// The last turn ended in an unrecovered error.
    Error,
}

crate::simple_display! {
    SessionStatus {
        Idle => "idle",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Error => "error",
    }
}

impl SessionStatus {
    /// Whether the session counts as live for WIP accounting.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::Idle | SessionStatus::Running)
    }
}
