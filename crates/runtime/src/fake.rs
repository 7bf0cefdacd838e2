// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted fake runtime for orchestration tests.
//!
//! Each `open_session` call consumes the next scripted result: either a
//! session with a queue of turns, or an open failure. Each prompt/follow-up
//! consumes the next turn, replays its events into the session's event
//! channel, runs an optional hook before settling (used by tests to fire
//! extension tool callbacks mid-turn), then settles with the turn's result.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    AgentRuntime, AgentSession, PromptImage, RuntimeError, SessionEvent, SessionSpec,
};

/// Hook run after a turn's events are replayed, before the turn settles.
pub type TurnHook = Box<dyn FnOnce() + Send>;

/// One scripted turn.
pub struct FakeTurn {
    events: Vec<SessionEvent>,
    error: Option<String>,
    before_settle: Option<TurnHook>,
}

impl FakeTurn {
    /// A turn that replays `events` and settles cleanly.
    pub fn new(events: Vec<SessionEvent>) -> Self {
        Self { events, error: None, before_settle: None }
    }

    /// A plain assistant-text turn.
    pub fn text(content: &str) -> Self {
        Self::new(vec![
            SessionEvent::MessageStart,
            SessionEvent::TextDelta { text: content.to_string() },
            SessionEvent::MessageEnd {
                content: content.to_string(),
                stop_reason: crate::StopReason::Stop,
                error_message: None,
            },
            SessionEvent::TurnEnd,
        ])
    }

    /// A turn whose prompt call fails with the given provider message
    /// after replaying any staged events.
    pub fn failing(message: &str) -> Self {
        Self { events: Vec::new(), error: Some(message.to_string()), before_settle: None }
    }

    /// Stage events on a failing turn (e.g. a `message_end` with
    /// `stop_reason = Error`).
    pub fn with_events(mut self, events: Vec<SessionEvent>) -> Self {
        self.events = events;
        self
    }

    /// Run `hook` after events are replayed, before the turn settles.
    pub fn before_settle(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.before_settle = Some(Box::new(hook));
        self
    }
}

/// Script for one session.
pub struct ScriptedSession {
    pub session_file: String,
    pub turns: Vec<FakeTurn>,
}

impl ScriptedSession {
    pub fn new(session_file: &str, turns: Vec<FakeTurn>) -> Self {
        Self { session_file: session_file.to_string(), turns }
    }
}

#[derive(Default)]
struct FakeState {
    open_results: VecDeque<Result<ScriptedSession, String>>,
    opened_specs: Vec<SessionSpec>,
    sessions: Vec<Arc<FakeSession>>,
}

/// Scripted [`AgentRuntime`] implementation.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful open with the given session script.
    pub fn script_session(&self, session: ScriptedSession) {
        self.state.lock().open_results.push_back(Ok(session));
    }

    /// Queue an open failure (e.g. `"429 rate limit"`).
    pub fn script_open_failure(&self, message: &str) {
        self.state.lock().open_results.push_back(Err(message.to_string()));
    }

    /// Specs of every session opened so far.
    pub fn opened_specs(&self) -> Vec<SessionSpec> {
        self.state.lock().opened_specs.clone()
    }

    /// Handles of every session opened so far.
    pub fn sessions(&self) -> Vec<Arc<FakeSession>> {
        self.state.lock().sessions.clone()
    }
}

#[async_trait]
impl AgentRuntime for FakeRuntime {
    async fn open_session(
        &self,
        spec: SessionSpec,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<dyn AgentSession>, RuntimeError> {
        let mut state = self.state.lock();
        state.opened_specs.push(spec);
        let script = state
            .open_results
            .pop_front()
            .unwrap_or_else(|| Ok(ScriptedSession::new("fake-session.jsonl", Vec::new())));
        match script {
            Ok(script) => {
                let session = Arc::new(FakeSession {
                    session_file: script.session_file,
                    turns: Mutex::new(script.turns.into_iter().collect()),
                    events,
                    prompts: Mutex::new(Vec::new()),
                    follow_ups: Mutex::new(Vec::new()),
                    steers: Mutex::new(Vec::new()),
                    aborted: AtomicBool::new(false),
                });
                state.sessions.push(session.clone());
                Ok(session)
            }
            Err(message) => Err(RuntimeError::OpenFailed(message)),
        }
    }
}

/// A scripted session; records everything sent to it.
pub struct FakeSession {
    session_file: String,
    turns: Mutex<VecDeque<FakeTurn>>,
    events: mpsc::Sender<SessionEvent>,
    prompts: Mutex<Vec<String>>,
    follow_ups: Mutex<Vec<String>>,
    steers: Mutex<Vec<String>>,
    aborted: AtomicBool,
}

impl FakeSession {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn follow_ups(&self) -> Vec<String> {
        self.follow_ups.lock().clone()
    }

    pub fn steers(&self) -> Vec<String> {
        self.steers.lock().clone()
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    async fn run_turn(&self) -> Result<(), RuntimeError> {
        if self.aborted.load(Ordering::SeqCst) {
            return Err(RuntimeError::SessionClosed);
        }
        let turn = self.turns.lock().pop_front();
        let Some(turn) = turn else {
            tracing::warn!("fake session ran out of scripted turns");
            return Ok(());
        };
        for event in turn.events {
            let _ = self.events.send(event).await;
        }
        if let Some(hook) = turn.before_settle {
            hook();
        }
        match turn.error {
            Some(message) => Err(RuntimeError::PromptFailed(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AgentSession for FakeSession {
    async fn prompt(&self, text: &str, _images: Vec<PromptImage>) -> Result<(), RuntimeError> {
        self.prompts.lock().push(text.to_string());
        self.run_turn().await
    }

    async fn follow_up(&self, text: &str, _images: Vec<PromptImage>) -> Result<(), RuntimeError> {
        self.follow_ups.lock().push(text.to_string());
        self.run_turn().await
    }

    async fn steer(&self, text: &str, _images: Vec<PromptImage>) -> Result<(), RuntimeError> {
        if self.aborted.load(Ordering::SeqCst) {
            return Err(RuntimeError::SessionClosed);
        }
        self.steers.lock().push(text.to_string());
        Ok(())
    }

    async fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn session_file(&self) -> String {
        self.session_file.clone()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
