// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workspace queue manager.
//!
//! The only component that decides when a task transitions phases. A
//! single-flight kick loop scans the workspace: recovers orphaned
//! executing tasks, honors the executing WIP limit, skips models with an
//! open breaker, and dispatches the oldest unblocked ready task to the
//! supervisor. Every asynchronous continuation carries the lifecycle
//! generation it was started under and becomes a no-op once the generation
//! advances.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tf_core::{Broadcast, Clock, SystemEventKind, Task, TaskId, TaskPhase, Workspace};
use tf_runtime::AgentRuntime;
use tf_storage::{ActivityLog, LeaseStore, TaskStore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::breaker::ExecutionBreaker;
use crate::broadcast::Broadcaster;
use crate::env::LeaseConfig;
use crate::supervisor::{CompletionDetails, Supervisor};
use crate::EngineError;

/// An orphan younger than this is treated as a recent crash and sent back
/// to ready instead of being resumed.
const RECENT_START_WINDOW_MS: u64 = 120_000;

/// Delay before re-kicking after a completion.
const REKICK_DELAY: Duration = Duration::from_millis(200);

#[derive(Default)]
struct QueueState {
    enabled: bool,
    processing: bool,
    generation: u64,
    current_task_id: Option<TaskId>,
    /// Attempt token per executing task; stale callbacks are dropped.
    attempts: HashMap<TaskId, Uuid>,
    /// One blocked notice per (task, retry_at).
    blocked_notices: HashSet<(TaskId, u64)>,
}

/// Drives one workspace's tasks through ready → executing → complete.
pub struct QueueManager<R: AgentRuntime, C: Clock> {
    workspace: Workspace,
    store: Arc<TaskStore<C>>,
    activity: Arc<ActivityLog>,
    leases: Arc<LeaseStore>,
    breaker: Arc<ExecutionBreaker>,
    supervisor: Arc<Supervisor<R, C>>,
    broadcaster: Broadcaster,
    clock: C,
    lease_config: LeaseConfig,
    executing_limit: Mutex<u32>,
    state: Mutex<QueueState>,
    /// Self-reference for continuations spawned off the kick loop.
    weak: Weak<Self>,
}

impl<R: AgentRuntime, C: Clock> QueueManager<R, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        workspace: Workspace,
        store: Arc<TaskStore<C>>,
        activity: Arc<ActivityLog>,
        leases: Arc<LeaseStore>,
        breaker: Arc<ExecutionBreaker>,
        supervisor: Arc<Supervisor<R, C>>,
        broadcaster: Broadcaster,
        clock: C,
        lease_config: LeaseConfig,
        executing_limit: u32,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            workspace,
            store,
            activity,
            leases,
            breaker,
            supervisor,
            broadcaster,
            clock,
            lease_config,
            executing_limit: Mutex::new(executing_limit.max(1)),
            state: Mutex::new(QueueState::default()),
            weak: weak.clone(),
        })
    }

    /// Upgrade the self-reference; `None` only during teardown.
    fn strong(&self) -> Option<Arc<Self>> {
        self.weak.upgrade()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn set_executing_limit(&self, limit: u32) {
        *self.executing_limit.lock() = limit.max(1);
    }

    /// Enable the queue. Operator intent is "resume", so all open breakers
    /// are cleared.
    pub async fn start(&self) {
        {
            let mut state = self.state.lock();
            state.enabled = true;
            state.generation += 1;
        }
        let cleared = self.breaker.clear_all();
        if !cleared.is_empty() {
            tracing::info!(workspace = self.workspace.id.as_str(), models = ?cleared, "breakers cleared on queue start");
        }
        self.broadcast_status();
        self.kick().await;
    }

    /// Disable the queue. In-flight continuations from the previous
    /// generation become no-ops; running sessions are left alone.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.enabled = false;
        state.generation += 1;
        drop(state);
        self.broadcast_status();
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Re-enter the kick loop. Concurrent kicks coalesce: at most one scan
    /// is in flight; extra kicks while scanning are dropped.
    pub async fn kick(&self) {
        let generation = {
            let mut state = self.state.lock();
            if !state.enabled || state.processing {
                return;
            }
            state.processing = true;
            state.generation
        };

        let result = self.scan(generation).await;
        self.state.lock().processing = false;
        if let Err(e) = result {
            tracing::error!(workspace = self.workspace.id.as_str(), error = %e, "queue scan failed");
        }
    }

    /// Background safety poll; re-enters the kick loop in case an external
    /// event was missed.
    pub async fn run(self: Arc<Self>, poll_interval: Duration, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(poll_interval) => self.kick().await,
            }
        }
    }

    fn generation_still(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.enabled && state.generation == generation
    }

    // ── The kick loop ──────────────────────────────────────────────────

    async fn scan(&self, generation: u64) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();

        // 1. Expired breakers auto-close before anything is considered.
        let closed = self.breaker.clear_expired(now_ms);
        for (model, open) in &closed {
            self.append_system_event(
                &open.task_id,
                SystemEventKind::BreakerClosed,
                &format!("Breaker for {model} auto-closed; dispatch resumes"),
            );
        }
        if !closed.is_empty() {
            self.broadcast_status();
        }

        if !self.generation_still(generation) {
            return Ok(());
        }

        // 2. Enumerate executing tasks and find orphans.
        let executing = self.store.list_phase(TaskPhase::Executing)?;
        let live: HashSet<String> =
            self.supervisor.live_task_ids().into_iter().map(|id| id.0).collect();
        let leases = if self.lease_config.enabled {
            self.leases.read()?
        } else {
            HashMap::new()
        };

        let mut orphans: Vec<Task> = Vec::new();
        for task in &executing {
            if live.contains(task.id.as_str()) {
                continue;
            }
            // A fresh lease held by a live session elsewhere (or a stopped
            // session in this process) is not an orphan yet.
            let fresh_lease = leases
                .get(&task.id)
                .is_some_and(|lease| lease.is_fresh(now_ms, self.lease_config.ttl_ms));
            if fresh_lease {
                continue;
            }
            orphans.push(task.clone());
        }

        // 3. Resolve WIP and pick at most one resumable orphan: one that
        //    was not started within the recent-crash window.
        let live_count = live.len() as u32;
        let executing_limit = *self.executing_limit.lock();
        let available_resume_slots = executing_limit.saturating_sub(live_count);
        let mut resumable: Option<Task> = None;
        let mut to_ready: Vec<(Task, bool)> = Vec::new(); // (task, recently_started)

        for task in orphans {
            let recently_started = task
                .started_age_ms(now_ms)
                .is_some_and(|age| age < RECENT_START_WINDOW_MS);
            if !recently_started && resumable.is_none() && available_resume_slots > 0 {
                resumable = Some(task);
            } else {
                to_ready.push((task, recently_started));
            }
        }

        // 4. Everything else goes back to ready.
        for (task, recently_started) in to_ready {
            if !self.generation_still(generation) {
                return Ok(());
            }
            if let Err(e) = self.supervisor.stop(&task.id).await {
                tracing::debug!(task = task.id.as_str(), error = %e, "no lingering session to stop");
            }
            let reason = if recently_started {
                "Moved back to ready after execution failure"
            } else {
                "Moved back to ready for orphan recovery"
            };
            let (moved, from) =
                self.store.move_task(&task.id, TaskPhase::Ready, reason, &self.activity)?;
            let _ = self.leases.clear(&task.id);
            self.broadcaster.emit(Broadcast::TaskMoved { task: moved, from, to: TaskPhase::Ready });
        }

        // 5. Resume the orphan (new session from its stored session file).
        if let Some(task) = resumable {
            if !self.generation_still(generation) {
                return Ok(());
            }
            self.append_system_event(
                &task.id,
                SystemEventKind::OrphanRecovered,
                &format!("Resuming orphaned task {} from its stored session", task.id),
            );
            self.begin_attempt(task, true, generation)?;
            return Ok(());
        }

        // 6. Respect the WIP limit.
        if live_count >= executing_limit {
            return Ok(());
        }

        // 7. Ready tasks, oldest first, excluding plans still in flight.
        let ready: Vec<Task> = self
            .store
            .list_phase(TaskPhase::Ready)?
            .into_iter()
            .filter(|t| !t.planning_in_flight())
            .collect();

        // 8. Walk from the oldest end; skip tasks blocked by an open breaker.
        let mut picked: Option<Task> = None;
        for task in ready {
            match self.breaker.open_for(&task.execution_model_config, now_ms) {
                Some(open) => {
                    self.emit_blocked_notice(&task, open.retry_at_ms);
                }
                None => {
                    picked = Some(task);
                    break;
                }
            }
        }
        let Some(task) = picked else { return Ok(()) };

        if !self.generation_still(generation) {
            return Ok(());
        }

        // 9. Dispatch.
        let (moved, from) = self.store.move_task(&task.id, TaskPhase::Executing, "", &self.activity)?;
        self.broadcaster.emit(Broadcast::TaskMoved {
            task: moved.clone(),
            from,
            to: TaskPhase::Executing,
        });
        self.begin_attempt(moved, false, generation)?;
        Ok(())
    }

    /// Mint an attempt token and hand the task to the supervisor.
    fn begin_attempt(&self, task: Task, resume: bool, generation: u64) -> Result<(), EngineError> {
        let attempt = Uuid::new_v4();
        {
            let mut state = self.state.lock();
            state.attempts.insert(task.id.clone(), attempt);
            state.current_task_id = Some(task.id.clone());
        }
        self.broadcast_status();

        let Some(this) = self.strong() else { return Ok(()) };
        let task_id = task.id.clone();
        let model = task.execution_model_config.clone();
        let callback = Box::new(move |success: bool, details: CompletionDetails| {
            let manager = this.clone();
            tokio::spawn(async move {
                manager
                    .handle_completion(task_id, attempt, generation, model, success, details)
                    .await;
            });
        });
        self.supervisor.execute_task(task, resume, callback)?;
        Ok(())
    }

    /// Completion report from the supervisor. Ignored when the attempt
    /// token or lifecycle generation no longer matches.
    async fn handle_completion(
        &self,
        task_id: TaskId,
        attempt: Uuid,
        generation: u64,
        model: tf_core::ModelConfig,
        success: bool,
        details: CompletionDetails,
    ) {
        {
            let state = self.state.lock();
            if state.attempts.get(&task_id) != Some(&attempt) {
                tracing::debug!(task = task_id.as_str(), "dropping stale completion callback");
                return;
            }
            if state.generation != generation {
                tracing::debug!(task = task_id.as_str(), "dropping completion from previous generation");
                return;
            }
        }

        if success {
            self.breaker.record_success(&model);
            match self.store.move_task(&task_id, TaskPhase::Complete, "", &self.activity) {
                Ok((moved, from)) => {
                    self.broadcaster.emit(Broadcast::TaskMoved {
                        task: moved,
                        from,
                        to: TaskPhase::Complete,
                    });
                }
                Err(e) => {
                    tracing::error!(task = task_id.as_str(), error = %e, "failed to move completed task");
                }
            }
            {
                let mut state = self.state.lock();
                state.attempts.remove(&task_id);
                if state.current_task_id.as_ref() == Some(&task_id) {
                    state.current_task_id = None;
                }
            }
            self.broadcast_status();

            if let Some(this) = self.strong() {
                tokio::spawn(async move {
                    tokio::time::sleep(REKICK_DELAY).await;
                    if this.generation_still(generation) {
                        this.kick().await;
                    }
                });
            }
        } else {
            // The task stays in `executing` for operator review.
            let message = details
                .error_message
                .unwrap_or_else(|| "execution failed".to_string());
            let now_ms = self.clock.epoch_ms();
            if let Some(open) = self.breaker.record_failure(&model, &task_id, &message, now_ms) {
                self.append_system_event(
                    &task_id,
                    SystemEventKind::BreakerOpened,
                    &format!(
                        "Breaker opened for {} ({}): {} failures in window; retry at {}",
                        model.key(),
                        open.category,
                        open.failure_count,
                        open.retry_at_ms
                    ),
                );
                self.broadcast_status();
                self.schedule_retry_kick(open.retry_at_ms, generation);
            }
            let mut state = self.state.lock();
            state.attempts.remove(&task_id);
            if state.current_task_id.as_ref() == Some(&task_id) {
                state.current_task_id = None;
            }
        }
    }

    /// Wake the queue shortly after an open breaker's retry time.
    fn schedule_retry_kick(&self, retry_at_ms: u64, generation: u64) {
        let delay_ms = retry_at_ms.saturating_sub(self.clock.epoch_ms()) + 250;
        let Some(this) = self.strong() else { return };
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if this.generation_still(generation) {
                this.kick().await;
            }
        });
    }

    /// Emit at most one blocked notice per (task, retry_at).
    fn emit_blocked_notice(&self, task: &Task, retry_at_ms: u64) {
        {
            let mut state = self.state.lock();
            if !state.blocked_notices.insert((task.id.clone(), retry_at_ms)) {
                return;
            }
        }
        self.append_system_event(
            &task.id,
            SystemEventKind::DispatchBlocked,
            &format!(
                "Dispatch of {} blocked: breaker open for {} until {}",
                task.id,
                task.execution_model_config.key(),
                retry_at_ms
            ),
        );
    }

    fn broadcast_status(&self) {
        let (enabled, current_task_id) = {
            let state = self.state.lock();
            (state.enabled, state.current_task_id.clone())
        };
        self.broadcaster.emit(Broadcast::QueueStatus {
            workspace_id: self.workspace.id.clone(),
            enabled,
            current_task_id,
            open_breakers: self.breaker.open_keys(self.clock.epoch_ms()),
        });
    }

    fn append_system_event(&self, task_id: &TaskId, kind: SystemEventKind, message: &str) {
        let entry = tf_core::ActivityEntry::SystemEvent {
            meta: tf_core::EntryMeta::new(task_id.clone(), self.clock.now_utc()),
            kind,
            message: message.to_string(),
            data: None,
        };
        if let Err(e) = self.activity.append(&entry) {
            tracing::error!(task = task_id.as_str(), error = %e, "failed to append queue event");
        }
        self.broadcaster.emit(Broadcast::Activity { entry });
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
