// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tfd: the Task Factory daemon.
//!
//! Discovers registered workspaces, builds a queue manager per workspace,
//! and drives them until shutdown. The HTTP/WebSocket surface and the
//! agent runtime bridge are external collaborators; this binary wires the
//! orchestration core together.

mod bootstrap;
mod env;
mod runtime_stub;

use fs2::FileExt;
use std::sync::Arc;
use tf_config::SkillSet;
use tf_core::SystemClock;
use tf_engine::{ToolCallbackRegistry, WorkflowSettingsService};
use tf_storage::{load_workspaces, registry_path};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_tracing(state_dir: &std::path::Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(state_dir)?;
    let file_appender = tracing_appender::rolling::daily(state_dir.join("logs"), "tfd.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state_dir = env::state_dir()?;
    let config_dir = env::config_dir()?;
    let _log_guard = init_tracing(&state_dir)?;

    // One daemon per state dir.
    std::fs::create_dir_all(&state_dir)?;
    let lock_path = state_dir.join("tfd.lock");
    let lock_file = std::fs::File::create(&lock_path)?;
    if lock_file.try_lock_exclusive().is_err() {
        anyhow::bail!("another tfd instance holds {}", lock_path.display());
    }

    let clock = SystemClock;
    let owner = bootstrap::lease_owner(&clock);
    let runtime = Arc::new(runtime_stub::UnconfiguredRuntime);
    let registry = Arc::new(ToolCallbackRegistry::new());
    let settings = WorkflowSettingsService::new(&config_dir);
    let skills = SkillSet::load(&config_dir.join("skills.json"))?;
    let defaults = tf_config::TaskDefaultsLayer::load(&config_dir.join("task-defaults.json"))?;

    let workspaces = load_workspaces(&registry_path(
        &dirs::home_dir().ok_or_else(|| anyhow::anyhow!("no home directory"))?,
    ))?;
    if workspaces.is_empty() {
        tracing::warn!("no workspaces registered; nothing to drive");
    }

    let cancel = CancellationToken::new();
    let poll_interval = tf_engine::env::queue_poll_interval();
    let mut drivers = Vec::new();

    for workspace in workspaces {
        tracing::info!(
            workspace = workspace.id.as_str(),
            path = %workspace.path.display(),
            "starting workspace"
        );
        let stack = bootstrap::build_workspace_stack(
            workspace.clone(),
            runtime.clone(),
            registry.clone(),
            &settings,
            &defaults,
            skills.clone(),
            clock.clone(),
            owner.clone(),
        )?;

        let paths = tf_storage::StorePaths::for_workspace(&workspace.path);
        let limits = settings.resolve(&paths.state_dir)?;
        if limits.ready_to_executing {
            stack.queue.start().await;
        }
        drivers.push(tokio::spawn(
            stack.queue.clone().run(poll_interval, cancel.clone()),
        ));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    cancel.cancel();
    for driver in drivers {
        let _ = driver.await;
    }
    Ok(())
}
