// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session state owned by the supervisor.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tf_core::{AgentMode, SessionStatus, TaskId};
use tf_runtime::{AgentSession, SessionEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::CompletionCallback;

/// Mutable per-session state.
#[derive(Default)]
pub(crate) struct SessionState {
    pub status: SessionStatus,
    pub agent_signaled_complete: bool,
    pub completion_summary: Option<String>,
    pub current_stream_text: String,
    pub current_thinking_text: String,
    /// Final stripped text of the last assistant message.
    pub last_assistant_text: String,
    /// Args captured at tool_execution_start, keyed by tool name.
    pub tool_call_args: HashMap<String, serde_json::Value>,
    pub awaiting_user_input: bool,
    /// Provider error carried by a `message_end` with `stop_reason = error`.
    pub last_turn_error: Option<String>,
    /// Turns started on the current underlying session (reset on reopen).
    pub turns_started: u32,
}

/// Handle to one supervised session.
pub struct SessionHandle {
    pub(crate) task_id: TaskId,
    pub(crate) mode: AgentMode,
    pub(crate) state: Mutex<SessionState>,
    /// The underlying runtime session; replaced on model fallover.
    pub(crate) session: tokio::sync::Mutex<Option<Arc<dyn AgentSession>>>,
    /// Event stream of the underlying session; replaced on fallover.
    pub(crate) events: tokio::sync::Mutex<Option<mpsc::Receiver<SessionEvent>>>,
    /// Taken exactly once — on completion, failure, or stop.
    pub(crate) on_complete: Mutex<Option<CompletionCallback>>,
    pub(crate) heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    pub(crate) fn new(task_id: TaskId, mode: AgentMode, on_complete: Option<CompletionCallback>) -> Arc<Self> {
        Arc::new(Self {
            task_id,
            mode,
            state: Mutex::new(SessionState { status: SessionStatus::Running, ..Default::default() }),
            session: tokio::sync::Mutex::new(None),
            events: tokio::sync::Mutex::new(None),
            on_complete: Mutex::new(on_complete),
            heartbeat: Mutex::new(None),
        })
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    pub(crate) fn set_status(&self, status: SessionStatus) {
        self.state.lock().status = status;
    }

    pub(crate) fn stop_heartbeat(&self) {
        if let Some(task) = self.heartbeat.lock().take() {
            task.abort();
        }
    }

    /// Take the completion callback; `None` if it was already consumed or
    /// the session was stopped.
    pub(crate) fn take_callback(&self) -> Option<CompletionCallback> {
        self.on_complete.lock().take()
    }
}
