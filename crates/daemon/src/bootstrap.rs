// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workspace wiring.
//!
//! Builds the storage, supervisor, and queue manager stack for one
//! workspace. Generic over the runtime bridge so deployments can link
//! their own implementation.

use std::sync::Arc;
use tf_config::{SkillSet, TaskDefaultsLayer};
use tf_core::{Clock, LeaseOwner, Workspace};
use tf_engine::{
    Broadcaster, ExecutionBreaker, LeaseConfig, QueueManager, Supervisor, SupervisorConfig,
    ToolCallbackRegistry, WorkflowSettingsService,
};
use tf_engine::env::BreakerConfig;
use tf_runtime::AgentRuntime;
use tf_storage::{ActivityLog, LeaseStore, StorePaths, TaskStore};

/// Everything the daemon holds per workspace.
pub struct WorkspaceStack<R: AgentRuntime, C: Clock> {
    pub queue: Arc<QueueManager<R, C>>,
    pub supervisor: Arc<Supervisor<R, C>>,
    pub broadcaster: Broadcaster,
}

/// The process identity used for lease ownership. One nonce per startup,
/// so a recycled pid still reads as a new owner.
pub fn lease_owner(clock: &impl Clock) -> LeaseOwner {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    LeaseOwner::new(host, std::process::id(), nanoid::nanoid!(8), clock.epoch_ms())
}

#[allow(clippy::too_many_arguments)]
pub fn build_workspace_stack<R: AgentRuntime, C: Clock>(
    workspace: Workspace,
    runtime: Arc<R>,
    registry: Arc<ToolCallbackRegistry>,
    settings: &WorkflowSettingsService,
    defaults: &TaskDefaultsLayer,
    skills: SkillSet,
    clock: C,
    owner: LeaseOwner,
) -> anyhow::Result<WorkspaceStack<R, C>> {
    let paths = StorePaths::for_workspace(&workspace.path);
    let store = Arc::new(TaskStore::new(paths.clone(), clock.clone()));
    let activity = Arc::new(ActivityLog::new(&paths));
    let leases = Arc::new(LeaseStore::new(&paths, owner));
    let broadcaster = Broadcaster::new();
    let lease_config = LeaseConfig::from_env();
    let breaker = Arc::new(ExecutionBreaker::new(BreakerConfig::from_env()));
    let limits = settings.resolve(&paths.state_dir)?;

    let supervisor = Supervisor::new(
        runtime,
        store.clone(),
        activity.clone(),
        leases.clone(),
        registry,
        broadcaster.clone(),
        clock.clone(),
        SupervisorConfig {
            workspace: workspace.clone(),
            skills,
            lease: lease_config,
            planning_template: defaults.planning_prompt_template.clone(),
            execution_template: defaults.execution_prompt_template.clone(),
        },
    );

    let queue = QueueManager::new(
        workspace,
        store,
        activity,
        leases,
        breaker,
        supervisor.clone(),
        broadcaster.clone(),
        clock,
        lease_config,
        limits.executing_limit,
    );

    Ok(WorkspaceStack { queue, supervisor, broadcaster })
}
