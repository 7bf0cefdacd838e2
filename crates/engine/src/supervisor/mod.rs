// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent session supervisor.
//!
//! The only component that speaks to the agent runtime. Owns one session
//! per task: opens it, prepends the state preamble to every turn, runs
//! pre/post-execution skills, walks the model fallback chain on retryable
//! provider errors, translates runtime events into activity entries and
//! broadcasts, and reports completion back to the queue manager.

mod events;
mod handle;

pub use handle::SessionHandle;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tf_config::{SkillDef, SkillKind, SkillSet};
use tf_core::{
    build_preamble, is_retryable, mode_for, ActivityEntry, AgentMode, Broadcast, ChatRole, Clock,
    EntryMeta, ModelConfig, SessionStatus, SystemEventKind, Task, TaskId, TaskPhase, Workspace,
};
use tf_runtime::{
    AgentRuntime, PromptImage, RuntimeError, SessionSource, SessionSpec,
};
use tf_storage::{ActivityLog, AttachmentStore, LeaseStore, TaskStore};
use tokio::sync::mpsc;

use crate::broadcast::Broadcaster;
use crate::env::LeaseConfig;
use crate::prompts;
use crate::registry::{
    AttachFileCallback, CompleteCallback, MessageAgentCallback, MessageAgentKind, PlanCallback,
    ToolCallbackRegistry,
};
use crate::EngineError;

/// Outcome details passed to the completion callback.
#[derive(Debug, Clone, Default)]
pub struct CompletionDetails {
    pub summary: Option<String>,
    pub error_message: Option<String>,
}

/// Invoked exactly once per execution attempt — on completion or failure,
/// never after a stop.
pub type CompletionCallback = Box<dyn FnOnce(bool, CompletionDetails) + Send>;

/// Static configuration for a workspace's supervisor.
#[derive(Clone)]
pub struct SupervisorConfig {
    pub workspace: Workspace,
    pub skills: SkillSet,
    pub lease: LeaseConfig,
    pub planning_template: Option<String>,
    pub execution_template: Option<String>,
}

/// Supervises agent sessions for one workspace.
pub struct Supervisor<R: AgentRuntime, C: Clock> {
    runtime: Arc<R>,
    store: Arc<TaskStore<C>>,
    activity: Arc<ActivityLog>,
    leases: Arc<LeaseStore>,
    registry: Arc<ToolCallbackRegistry>,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) clock: C,
    config: SupervisorConfig,
    sessions: Mutex<HashMap<TaskId, Arc<SessionHandle>>>,
    /// Self-reference for continuations spawned off verb calls.
    weak: Weak<Self>,
}

impl<R: AgentRuntime, C: Clock> Supervisor<R, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runtime: Arc<R>,
        store: Arc<TaskStore<C>>,
        activity: Arc<ActivityLog>,
        leases: Arc<LeaseStore>,
        registry: Arc<ToolCallbackRegistry>,
        broadcaster: Broadcaster,
        clock: C,
        config: SupervisorConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            runtime,
            store,
            activity,
            leases,
            registry,
            broadcaster,
            clock,
            config,
            sessions: Mutex::new(HashMap::new()),
            weak: weak.clone(),
        })
    }

    /// Upgrade the self-reference; `None` only during teardown.
    fn strong(&self) -> Option<Arc<Self>> {
        self.weak.upgrade()
    }

    // ── Session inspection ─────────────────────────────────────────────

    /// Tasks with a live (idle or running) session.
    pub fn live_task_ids(&self) -> Vec<TaskId> {
        self.sessions
            .lock()
            .iter()
            .filter(|(_, h)| h.status().is_live())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn has_live_session(&self, task_id: &TaskId) -> bool {
        self.sessions.lock().get(task_id).is_some_and(|h| h.status().is_live())
    }

    pub fn session_status(&self, task_id: &TaskId) -> Option<SessionStatus> {
        self.sessions.lock().get(task_id).map(|h| h.status())
    }

    fn handle_for(&self, task_id: &TaskId) -> Result<Arc<SessionHandle>, EngineError> {
        self.sessions
            .lock()
            .get(task_id)
            .cloned()
            .ok_or_else(|| EngineError::SessionNotFound(task_id.clone()))
    }

    // ── Verbs ──────────────────────────────────────────────────────────

    /// Start a planning or execution session for the task. Returns once the
    /// session is registered; the work runs on a spawned task and reports
    /// through `on_complete`.
    pub fn execute_task(
        &self,
        task: Task,
        resume: bool,
        on_complete: CompletionCallback,
    ) -> Result<(), EngineError> {
        let mode = mode_for(task.phase, task.planning_status, task.plan.is_some());
        let planning = mode == AgentMode::TaskPlanning;
        if !planning && task.phase != TaskPhase::Executing {
            return Err(EngineError::NotDispatchable(task.id.clone()));
        }

        let handle = SessionHandle::new(task.id.clone(), mode, Some(on_complete));
        self.sessions.lock().insert(task.id.clone(), handle.clone());
        self.register_task_callbacks(&handle);

        self.append_activity(&ActivityEntry::TaskSeparator {
            meta: EntryMeta::new(task.id.clone(), self.clock.now_utc()),
        });
        self.broadcaster.emit(Broadcast::ExecutionStatus {
            task_id: task.id.clone(),
            status: SessionStatus::Running,
        });

        if !planning && self.config.lease.enabled {
            if let Err(e) = self.leases.upsert(&task.id, "running", self.clock.epoch_ms()) {
                tracing::warn!(task = task.id.as_str(), error = %e, "failed to write execution lease");
            }
            self.spawn_heartbeat(&handle);
        }

        let Some(this) = self.strong() else { return Ok(()) };
        let driver = handle.clone();
        tokio::spawn(async move {
            if planning {
                this.drive_planning(task, driver).await;
            } else {
                this.drive_execution(task, resume, driver).await;
            }
        });
        Ok(())
    }

    /// Interrupt-style injection into a running session.
    pub async fn steer(
        &self,
        task_id: &TaskId,
        content: &str,
        images: Vec<PromptImage>,
    ) -> Result<(), EngineError> {
        let handle = self.handle_for(task_id)?;
        self.append_user_message(task_id, content);
        let session = handle
            .session
            .lock()
            .await
            .clone()
            .ok_or_else(|| EngineError::SessionNotFound(task_id.clone()))?;
        session.steer(content, images).await?;
        Ok(())
    }

    /// Queued injection. Clears the completion flag so a fresh completion
    /// signal is required before the task can advance.
    pub async fn follow_up(
        &self,
        task_id: &TaskId,
        content: &str,
        images: Vec<PromptImage>,
    ) -> Result<(), EngineError> {
        let handle = self.handle_for(task_id)?;
        {
            let mut state = handle.state.lock();
            state.agent_signaled_complete = false;
            state.completion_summary = None;
            state.awaiting_user_input = false;
        }
        self.append_user_message(task_id, content);

        let task = self.store.read(task_id)?;
        let prompt = self.with_preamble(&task, handle.mode(), content);
        handle.set_status(SessionStatus::Running);
        self.broadcaster.emit(Broadcast::ExecutionStatus {
            task_id: task_id.clone(),
            status: SessionStatus::Running,
        });

        let Some(this) = self.strong() else { return Ok(()) };
        let driver = handle.clone();
        let task_id = task_id.clone();
        tokio::spawn(async move {
            let outcome = this.run_turn(&driver, &prompt, images).await;
            if driver.status() == SessionStatus::Paused {
                return;
            }
            match outcome {
                Ok(None) => this.settle_after_turn(&task_id, &driver).await,
                Ok(Some(message)) => this.fail_execution(&task_id, &driver, message).await,
                Err(e) => this.fail_execution(&task_id, &driver, e.to_string()).await,
            }
        });
        Ok(())
    }

    /// Open a fresh session from the task's stored session file and send
    /// `content` as a chat turn. Used for non-executing phases.
    pub async fn resume_chat(&self, task: Task, content: &str) -> Result<(), EngineError> {
        let mode = mode_for(task.phase, task.planning_status, task.plan.is_some());
        let handle = SessionHandle::new(task.id.clone(), mode, None);
        self.sessions.lock().insert(task.id.clone(), handle.clone());
        self.register_task_callbacks(&handle);

        self.append_activity(&ActivityEntry::TaskSeparator {
            meta: EntryMeta::new(task.id.clone(), self.clock.now_utc()),
        });
        if let Err(message) =
            self.open_for(&task, &task.execution_model_config, true, &handle).await
        {
            self.cleanup_session(&task.id);
            return Err(EngineError::Runtime(RuntimeError::OpenFailed(message)));
        }

        self.append_user_message(&task.id, content);
        let prompt = self.with_preamble(&task, mode, &prompts::chat_prompt(&task, content));
        let Some(this) = self.strong() else { return Ok(()) };
        let driver = handle.clone();
        let task_id = task.id.clone();
        tokio::spawn(async move {
            let outcome = this.run_turn(&driver, &prompt, Vec::new()).await;
            if driver.status() == SessionStatus::Paused {
                return;
            }
            match outcome {
                Ok(None) => this.settle_after_turn(&task_id, &driver).await,
                Ok(Some(message)) | Err(EngineError::Runtime(RuntimeError::PromptFailed(message))) => {
                    this.append_system_event(&task_id, SystemEventKind::ExecutionError, &message);
                    driver.set_status(SessionStatus::Error);
                    this.broadcaster.emit(Broadcast::ExecutionStatus {
                        task_id: task_id.clone(),
                        status: SessionStatus::Error,
                    });
                    this.cleanup_session(&task_id);
                }
                Err(e) => {
                    tracing::error!(task = task_id.as_str(), error = %e, "chat turn failed");
                    this.cleanup_session(&task_id);
                }
            }
        });
        Ok(())
    }

    /// Cancel any in-flight operation and tear the session down. The task
    /// stays in its phase; the pending completion callback is dropped so a
    /// stale settlement cannot advance it.
    pub async fn stop(&self, task_id: &TaskId) -> Result<(), EngineError> {
        let handle = self
            .sessions
            .lock()
            .remove(task_id)
            .ok_or_else(|| EngineError::SessionNotFound(task_id.clone()))?;

        handle.take_callback();
        handle.set_status(SessionStatus::Paused);
        handle.stop_heartbeat();
        if let Some(session) = handle.session.lock().await.take() {
            session.abort().await;
        }
        self.unregister_task_callbacks(task_id);
        self.broadcaster.emit(Broadcast::ExecutionStatus {
            task_id: task_id.clone(),
            status: SessionStatus::Idle,
        });
        tracing::info!(task = task_id.as_str(), "session stopped");
        Ok(())
    }

    // ── Drivers ────────────────────────────────────────────────────────

    async fn drive_execution(self: Arc<Self>, task: Task, resume: bool, handle: Arc<SessionHandle>) {
        let chain = task.execution_model_chain();
        let images = self.load_prompt_images(&task);
        let prompt = self.build_execution_prompt(&task);

        let mut pre_skills_done = false;
        let mut index = 0;
        let final_error: Option<String> = loop {
            let model = &chain[index];
            if let Err(message) = self.open_for(&task, model, resume, &handle).await {
                match self.next_fallback(&task, false, &chain, index, &message) {
                    Some(next) => {
                        index = next;
                        continue;
                    }
                    None => break Some(message),
                }
            }

            if !pre_skills_done {
                match self.run_pre_skills(&task, &handle).await {
                    Ok(()) => pre_skills_done = true,
                    // A pre-skill failure aborts the task outright — no fallback.
                    Err(message) => break Some(message),
                }
            }

            match self.run_turn(&handle, &prompt, images.clone()).await {
                Ok(None) => break None,
                Ok(Some(message)) => match self.next_fallback(&task, false, &chain, index, &message)
                {
                    Some(next) => {
                        index = next;
                        continue;
                    }
                    None => break Some(message),
                },
                Err(e) => break Some(e.to_string()),
            }
        };

        if handle.status() == SessionStatus::Paused {
            return;
        }
        match final_error {
            None => self.settle_after_turn(&task.id, &handle).await,
            Some(message) => self.fail_execution(&task.id, &handle, message).await,
        }
    }

    async fn drive_planning(self: Arc<Self>, task: Task, handle: Arc<SessionHandle>) {
        let chain = task.planning_model_chain();
        let prompt = self.build_planning_prompt(&task);

        let mut index = 0;
        let final_error: Option<String> = loop {
            let model = &chain[index];
            if let Err(message) = self.open_for(&task, model, false, &handle).await {
                match self.next_fallback(&task, true, &chain, index, &message) {
                    Some(next) => {
                        index = next;
                        continue;
                    }
                    None => break Some(message),
                }
            }

            match self.run_turn(&handle, &prompt, Vec::new()).await {
                Ok(None) => break None,
                Ok(Some(message)) => match self.next_fallback(&task, true, &chain, index, &message)
                {
                    Some(next) => {
                        index = next;
                        continue;
                    }
                    None => break Some(message),
                },
                Err(e) => break Some(e.to_string()),
            }
        };

        if handle.status() == SessionStatus::Paused {
            return;
        }
        match final_error {
            None => {
                // save_plan persists the plan and flips planningStatus; a
                // turn that settled without it is a failed planning run.
                let planned = self
                    .store
                    .read(&task.id)
                    .map(|t| t.plan.is_some())
                    .unwrap_or(false);
                if planned {
                    handle.set_status(SessionStatus::Completed);
                    self.cleanup_session(&task.id);
                    if let Some(callback) = handle.take_callback() {
                        callback(true, CompletionDetails::default());
                    }
                } else {
                    self.fail_planning(&task.id, &handle, "planning turn ended without saving a plan".into())
                        .await;
                }
            }
            Some(message) => self.fail_planning(&task.id, &handle, message).await,
        }
    }

    /// Decide whether a provider failure falls over to the next chain entry.
    /// Emits the failover system event when it does.
    fn next_fallback(
        &self,
        task: &Task,
        planning: bool,
        chain: &[ModelConfig],
        index: usize,
        message: &str,
    ) -> Option<usize> {
        if !is_retryable(message) || index + 1 >= chain.len() {
            return None;
        }
        let from = &chain[index];
        let to = &chain[index + 1];
        let kind = if planning {
            SystemEventKind::PlanningModelFailover
        } else {
            SystemEventKind::ExecutionModelFailover
        };
        let entry = ActivityEntry::SystemEvent {
            meta: EntryMeta::new(task.id.clone(), self.clock.now_utc()),
            kind,
            message: format!("{} failed ({}); retrying on {}", from.model_id, message, to.model_id),
            data: Some(serde_json::json!({
                "fromModelId": from.model_id,
                "toModelId": to.model_id,
            })),
        };
        self.append_activity(&entry);
        tracing::warn!(
            task = task.id.as_str(),
            from = from.model_id.as_str(),
            to = to.model_id.as_str(),
            "model failover"
        );
        Some(index + 1)
    }

    // ── Turn machinery ─────────────────────────────────────────────────

    /// Open a session on the given model and swap it into the handle.
    /// Returns the provider error message on failure.
    pub(crate) async fn open_for(
        &self,
        task: &Task,
        model: &ModelConfig,
        resume: bool,
        handle: &SessionHandle,
    ) -> Result<(), String> {
        let source = if resume {
            task.session_file
                .clone()
                .map(SessionSource::ResumeFrom)
                .unwrap_or_default()
        } else {
            SessionSource::New
        };
        let extensions =
            handle.mode().contract().allowed.iter().map(|s| s.to_string()).collect();
        let spec = SessionSpec::new(self.config.workspace.path.clone(), model.clone())
            .session_source(source)
            .extensions(extensions);

        let (tx, rx) = mpsc::channel(256);
        match self.runtime.open_session(spec, tx).await {
            Ok(session) => {
                let session_file = session.session_file();
                *handle.session.lock().await = Some(session);
                *handle.events.lock().await = Some(rx);
                handle.state.lock().turns_started = 0;
                let stored = session_file.clone();
                if let Err(e) = self.store.update(&task.id, move |t| t.session_file = Some(stored)) {
                    tracing::warn!(task = task.id.as_str(), error = %e, "failed to persist session file");
                }
                Ok(())
            }
            Err(e) => Err(e.provider_message().to_string()),
        }
    }

    /// Send one turn and pump session events until it settles.
    ///
    /// Returns `Ok(None)` on a clean settle, `Ok(Some(message))` when the
    /// turn ended in a provider error (thrown or carried by a `message_end`
    /// with `stop_reason = error`).
    pub(crate) async fn run_turn(
        &self,
        handle: &SessionHandle,
        text: &str,
        images: Vec<PromptImage>,
    ) -> Result<Option<String>, EngineError> {
        handle.state.lock().last_turn_error = None;
        let session = handle
            .session
            .lock()
            .await
            .clone()
            .ok_or_else(|| EngineError::SessionNotFound(handle.task_id.clone()))?;
        let mut events_guard = handle.events.lock().await;
        let events = events_guard
            .as_mut()
            .ok_or_else(|| EngineError::SessionNotFound(handle.task_id.clone()))?;

        let first = {
            let mut state = handle.state.lock();
            let first = state.turns_started == 0;
            state.turns_started += 1;
            first
        };

        let turn = async {
            if first {
                session.prompt(text, images).await
            } else {
                session.follow_up(text, images).await
            }
        };
        tokio::pin!(turn);

        let mut channel_open = true;
        let result = loop {
            tokio::select! {
                event = events.recv(), if channel_open => {
                    match event {
                        Some(event) => self.handle_event(handle, event),
                        None => channel_open = false,
                    }
                }
                result = &mut turn => break result,
            }
        };
        // Events buffered before settlement are handled before the caller
        // acts on the outcome.
        while let Ok(event) = events.try_recv() {
            self.handle_event(handle, event);
        }

        match result {
            Ok(()) => Ok(handle.state.lock().last_turn_error.take()),
            Err(e) => Ok(Some(e.provider_message().to_string())),
        }
    }

    /// Completion-signal check after a clean settle.
    pub(crate) async fn settle_after_turn(&self, task_id: &TaskId, handle: &Arc<SessionHandle>) {
        let signaled = handle.state.lock().agent_signaled_complete;
        if !signaled {
            handle.set_status(SessionStatus::Idle);
            handle.state.lock().awaiting_user_input = true;
            self.append_system_event(
                task_id,
                SystemEventKind::WaitingForInput,
                "Agent is waiting for user input",
            );
            self.broadcaster.emit(Broadcast::ExecutionStatus {
                task_id: task_id.clone(),
                status: SessionStatus::Idle,
            });
            return;
        }

        if let Ok(task) = self.store.read(task_id) {
            self.run_post_skills(&task, handle).await;
        }
        let summary = handle.state.lock().completion_summary.clone();
        if let Some(summary) = &summary {
            let section = format!("## Completion summary\n\n{summary}\n");
            if let Err(e) = self.store.append_body(task_id, &section) {
                tracing::warn!(task = task_id.as_str(), error = %e, "failed to append completion summary");
            }
        }

        handle.set_status(SessionStatus::Completed);
        handle.stop_heartbeat();
        if handle.mode() == AgentMode::TaskExecution && self.config.lease.enabled {
            if let Err(e) = self.leases.clear(task_id) {
                tracing::warn!(task = task_id.as_str(), error = %e, "failed to clear lease");
            }
        }
        self.broadcaster.emit(Broadcast::ExecutionStatus {
            task_id: task_id.clone(),
            status: SessionStatus::Completed,
        });
        self.cleanup_session(task_id);
        if let Some(callback) = handle.take_callback() {
            callback(true, CompletionDetails { summary, error_message: None });
        }
    }

    async fn fail_execution(&self, task_id: &TaskId, handle: &Arc<SessionHandle>, message: String) {
        self.append_system_event(task_id, SystemEventKind::ExecutionError, &message);
        handle.set_status(SessionStatus::Error);
        handle.stop_heartbeat();
        self.broadcaster.emit(Broadcast::ExecutionStatus {
            task_id: task_id.clone(),
            status: SessionStatus::Error,
        });
        self.cleanup_session(task_id);
        if let Some(callback) = handle.take_callback() {
            callback(false, CompletionDetails { summary: None, error_message: Some(message) });
        }
    }

    async fn fail_planning(&self, task_id: &TaskId, handle: &Arc<SessionHandle>, message: String) {
        if let Err(e) = self.store.update(task_id, |t| t.planning_status = tf_core::PlanningStatus::Error)
        {
            tracing::warn!(task = task_id.as_str(), error = %e, "failed to record planning error");
        }
        self.append_system_event(task_id, SystemEventKind::PlanningError, &message);
        handle.set_status(SessionStatus::Error);
        self.broadcaster.emit(Broadcast::ExecutionStatus {
            task_id: task_id.clone(),
            status: SessionStatus::Error,
        });
        self.cleanup_session(task_id);
        if let Some(callback) = handle.take_callback() {
            callback(false, CompletionDetails { summary: None, error_message: Some(message) });
        }
    }

    // ── Skills ─────────────────────────────────────────────────────────

    /// Run pre-execution skills sequentially on the session. A failure
    /// aborts the task; these never rerun on fallback retry.
    async fn run_pre_skills(&self, task: &Task, handle: &SessionHandle) -> Result<(), String> {
        for skill in self.config.skills.resolve_ids(&task.pre_execution_skills) {
            self.run_skill(task, handle, &skill)
                .await
                .map_err(|e| format!("pre-execution skill '{}' failed: {e}", skill.id))?;
        }
        Ok(())
    }

    /// Run post-execution skills; failures are logged and skipped.
    async fn run_post_skills(&self, task: &Task, handle: &SessionHandle) {
        for skill in self.config.skills.resolve_ids(&task.post_execution_skills) {
            if let Err(e) = self.run_skill(task, handle, &skill).await {
                tracing::warn!(task = task.id.as_str(), skill = skill.id.as_str(), error = %e, "post-execution skill failed");
                self.append_system_event(
                    &task.id,
                    SystemEventKind::SkillFailed,
                    &format!("post-execution skill '{}' failed: {e}", skill.id),
                );
            }
        }
    }

    async fn run_skill(
        &self,
        task: &Task,
        handle: &SessionHandle,
        skill: &SkillDef,
    ) -> Result<(), String> {
        let prompt = self.with_preamble(task, handle.mode(), &skill.template);
        match skill.kind {
            SkillKind::FollowUp => match self.run_turn(handle, &prompt, Vec::new()).await {
                Ok(None) => Ok(()),
                Ok(Some(message)) => Err(message),
                Err(e) => Err(e.to_string()),
            },
            SkillKind::Loop => {
                let done_signal = skill.done_signal.clone().unwrap_or_default();
                for _ in 0..skill.max_iterations.max(1) {
                    match self.run_turn(handle, &prompt, Vec::new()).await {
                        Ok(None) => {}
                        Ok(Some(message)) => return Err(message),
                        Err(e) => return Err(e.to_string()),
                    }
                    if !done_signal.is_empty()
                        && handle.state.lock().last_assistant_text.contains(&done_signal)
                    {
                        return Ok(());
                    }
                }
                Ok(())
            }
        }
    }

    // ── Prompts & attachments ──────────────────────────────────────────

    fn with_preamble(&self, task: &Task, mode: AgentMode, body: &str) -> String {
        format!("{}\n\n{}", build_preamble(mode, task.phase, task.planning_status), body)
    }

    fn build_execution_prompt(&self, task: &Task) -> String {
        let body = self.store.read_document(&task.id).map(|d| d.body).unwrap_or_default();
        let section = prompts::attachment_section(&self.attachment_entries(task));
        let raw = prompts::execution_prompt(
            task,
            &body,
            self.config.execution_template.as_deref(),
            &section,
        );
        self.with_preamble(task, AgentMode::TaskExecution, &raw)
    }

    fn build_planning_prompt(&self, task: &Task) -> String {
        let body = self.store.read_document(&task.id).map(|d| d.body).unwrap_or_default();
        let section = prompts::attachment_section(&self.attachment_entries(task));
        let raw = prompts::planning_prompt(
            task,
            &body,
            self.config.planning_template.as_deref(),
            &section,
        );
        self.with_preamble(task, AgentMode::TaskPlanning, &raw)
    }

    fn attachment_entries(&self, task: &Task) -> Vec<(tf_core::AttachmentMeta, std::path::PathBuf)> {
        let attachments = AttachmentStore::new(self.store.as_ref());
        task.attachments
            .iter()
            .map(|meta| (meta.clone(), attachments.path_of(&task.id, meta)))
            .collect()
    }

    fn load_prompt_images(&self, task: &Task) -> Vec<PromptImage> {
        let attachments = AttachmentStore::new(self.store.as_ref());
        task.attachments
            .iter()
            .filter(|meta| meta.is_image())
            .filter_map(|meta| match attachments.load(&task.id, meta) {
                Ok(data) => Some(PromptImage { mime_type: meta.mime_type.clone(), data }),
                Err(e) => {
                    tracing::warn!(task = task.id.as_str(), attachment = meta.filename.as_str(), error = %e, "failed to load image attachment");
                    None
                }
            })
            .collect()
    }

    // ── Callback registration ──────────────────────────────────────────

    fn register_task_callbacks(&self, handle: &Arc<SessionHandle>) {
        let task_id = handle.task_id.clone();

        if handle.mode() == AgentMode::TaskPlanning {
            let store = self.store.clone();
            let broadcaster = self.broadcaster.clone();
            let plan_callback: PlanCallback = Arc::new(move |payload| {
                let plan = payload.plan.clone();
                let criteria = payload.acceptance_criteria.clone();
                store
                    .update(&payload.task_id, move |t| {
                        t.acceptance_criteria = criteria;
                        t.planning_status = tf_core::PlanningStatus::Completed;
                        t.plan = Some(plan);
                    })
                    .map_err(|e| e.to_string())?;
                broadcaster.emit(Broadcast::PlanGenerated {
                    task_id: payload.task_id.clone(),
                    plan: payload.plan.clone(),
                });
                Ok("Plan saved.".to_string())
            });
            self.registry.register_plan(task_id.clone(), plan_callback);
        }

        if handle.mode() == AgentMode::TaskExecution {
            let state_handle = handle.clone();
            let complete_callback: CompleteCallback = Arc::new(move |summary| {
                let mut state = state_handle.state.lock();
                state.agent_signaled_complete = true;
                state.completion_summary = Some(summary);
            });
            self.registry.register_complete(task_id.clone(), complete_callback);
        }

        let store = self.store.clone();
        let default_task = task_id.clone();
        let attach_callback: AttachFileCallback = Arc::new(move |args| {
            let attachments = AttachmentStore::new(store.as_ref());
            let target = args
                .task_id
                .clone()
                .map(TaskId::new)
                .unwrap_or_else(|| default_task.clone());
            attachments
                .attach(
                    &target,
                    std::path::Path::new(&args.path),
                    args.filename.as_deref(),
                )
                .map(|meta| format!("Attached {} to {}", meta.filename, target))
                .map_err(|e| e.to_string())
        });
        self.registry.register_attach_file(task_id.clone(), attach_callback);

        let weak = self.weak.clone();
        let message_callback: MessageAgentCallback = Arc::new(move |args| {
            let Some(supervisor) = weak.upgrade() else {
                return Err("orchestrator is shutting down".to_string());
            };
            let target = TaskId::new(args.task_id.clone());
            let content = args.content.clone();
            match args.kind {
                MessageAgentKind::Steer => {
                    tokio::spawn(async move {
                        if let Err(e) = supervisor.steer(&target, &content, Vec::new()).await {
                            tracing::warn!(task = target.as_str(), error = %e, "steer via message_agent failed");
                        }
                    });
                }
                MessageAgentKind::FollowUp => {
                    tokio::spawn(async move {
                        if let Err(e) = supervisor.follow_up(&target, &content, Vec::new()).await {
                            tracing::warn!(task = target.as_str(), error = %e, "follow-up via message_agent failed");
                        }
                    });
                }
                MessageAgentKind::Chat => {
                    tokio::spawn(async move {
                        match supervisor.store.read(&target) {
                            Ok(task) => {
                                if let Err(e) = supervisor.resume_chat(task, &content).await {
                                    tracing::warn!(task = target.as_str(), error = %e, "chat via message_agent failed");
                                }
                            }
                            Err(e) => {
                                tracing::warn!(task = target.as_str(), error = %e, "message_agent chat target not found");
                            }
                        }
                    });
                }
            }
            Ok("Message dispatched.".to_string())
        });
        self.registry.register_message_agent(task_id, message_callback);
    }

    fn unregister_task_callbacks(&self, task_id: &TaskId) {
        self.registry.remove_plan(task_id);
        self.registry.remove_complete(task_id);
        self.registry.remove_attach_file(task_id);
        self.registry.remove_message_agent(task_id);
    }

    fn cleanup_session(&self, task_id: &TaskId) {
        self.sessions.lock().remove(task_id);
        self.unregister_task_callbacks(task_id);
    }

    // ── Misc ───────────────────────────────────────────────────────────

    fn spawn_heartbeat(&self, handle: &Arc<SessionHandle>) {
        let leases = self.leases.clone();
        let clock = self.clock.clone();
        let task_id = handle.task_id.clone();
        let interval = Duration::from_millis(self.config.lease.heartbeat_ms.max(1));
        let join = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = leases.heartbeat(&task_id, "running", clock.epoch_ms()) {
                    tracing::warn!(task = task_id.as_str(), error = %e, "lease heartbeat failed");
                }
            }
        });
        *handle.heartbeat.lock() = Some(join);
    }

    fn append_user_message(&self, task_id: &TaskId, content: &str) {
        self.append_activity(&ActivityEntry::ChatMessage {
            meta: EntryMeta::new(task_id.clone(), self.clock.now_utc()),
            role: ChatRole::User,
            content: content.to_string(),
            metadata: None,
        });
    }

    pub(crate) fn append_system_event(
        &self,
        task_id: &TaskId,
        kind: SystemEventKind,
        message: &str,
    ) {
        self.append_activity(&ActivityEntry::SystemEvent {
            meta: EntryMeta::new(task_id.clone(), self.clock.now_utc()),
            kind,
            message: message.to_string(),
            data: None,
        });
    }
}

#[cfg(test)]
#[path = "../supervisor_tests.rs"]
mod tests;
