// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tf-runtime: The narrow capability interface to the agent runtime.
//!
//! The orchestrator consumes a third-party agent runtime through these
//! traits and never links against it directly. A session is an open
//! conversation; events stream back over an mpsc channel handed to
//! `open_session`. The session file is an opaque resume token — the
//! orchestrator stores it and passes it back, never interprets it.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tf_core::ModelConfig;
use thiserror::Error;
use tokio::sync::mpsc;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRuntime, FakeSession, FakeTurn, ScriptedSession};

/// Errors from runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to open session: {0}")]
    OpenFailed(String),
    #[error("prompt failed: {0}")]
    PromptFailed(String),
    #[error("session is closed")]
    SessionClosed,
}

impl RuntimeError {
    /// The provider-facing message, used for failure classification.
    pub fn provider_message(&self) -> &str {
        match self {
            RuntimeError::OpenFailed(m) | RuntimeError::PromptFailed(m) => m,
            RuntimeError::SessionClosed => "session is closed",
        }
    }
}

/// Whether a new conversation starts or a stored one resumes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionSource {
    #[default]
    New,
    /// Resume from an opaque session file produced by a previous session.
    ResumeFrom(String),
}

/// Configuration for opening a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSpec {
    pub cwd: PathBuf,
    pub model: ModelConfig,
    pub session_source: SessionSource,
    /// Extension tool names enabled for this session.
    pub extensions: Vec<String>,
}

impl SessionSpec {
    pub fn new(cwd: impl Into<PathBuf>, model: ModelConfig) -> Self {
        Self {
            cwd: cwd.into(),
            model,
            session_source: SessionSource::New,
            extensions: Vec::new(),
        }
    }

    tf_core::setters! {
        set {
            session_source: SessionSource,
            extensions: Vec<String>,
        }
    }
}

/// An image passed inline with a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Why an assistant message stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Stop,
    Aborted,
    Error,
}

/// Events a session emits while a turn is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AgentStart,
    AgentEnd,
    MessageStart,
    TextDelta { text: String },
    ThinkingDelta { text: String },
    MessageEnd { content: String, stop_reason: StopReason, error_message: Option<String> },
    ToolExecutionStart { tool: String, args: serde_json::Value },
    ToolExecutionUpdate { tool: String, output: String },
    ToolExecutionEnd { tool: String, result: String, is_error: bool },
    TurnEnd,
    AutoCompactionStart,
    AutoCompactionEnd,
    AutoRetryStart { attempt: u32 },
    AutoRetryEnd,
}

/// Capability interface the orchestrator consumes. Implemented by the real
/// runtime bridge out-of-tree and by [`FakeRuntime`] in tests.
#[async_trait]
pub trait AgentRuntime: Send + Sync + 'static {
    /// Open a session. Events stream to `events` until the session is
    /// aborted or dropped.
    async fn open_session(
        &self,
        spec: SessionSpec,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<dyn AgentSession>, RuntimeError>;
}

/// An open conversation with the agent runtime.
#[async_trait]
pub trait AgentSession: Send + Sync {
    /// Send the turn's prompt; settles when the turn ends.
    async fn prompt(&self, text: &str, images: Vec<PromptImage>) -> Result<(), RuntimeError>;

    /// Queue a follow-up message; settles when the resulting turn ends.
    async fn follow_up(&self, text: &str, images: Vec<PromptImage>) -> Result<(), RuntimeError>;

    /// Interrupt the in-flight turn with a steering message; returns once
    /// the interrupt is delivered.
    async fn steer(&self, text: &str, images: Vec<PromptImage>) -> Result<(), RuntimeError>;

    /// Cancel any in-flight operation and tear the session down.
    async fn abort(&self);

    /// Opaque identifier of the persisted conversation.
    fn session_file(&self) -> String;
}
