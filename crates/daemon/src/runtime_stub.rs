// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder runtime used when no agent runtime bridge is linked.
//!
//! The real bridge is an external collaborator wired in at deployment
//! time. Without one, the daemon still runs — queues, settings, and the
//! activity surface all work — but session opens fail with a clear,
//! non-retryable message so the breaker never counts them.

use async_trait::async_trait;
use std::sync::Arc;
use tf_runtime::{AgentRuntime, AgentSession, RuntimeError, SessionEvent, SessionSpec};
use tokio::sync::mpsc;

pub struct UnconfiguredRuntime;

#[async_trait]
impl AgentRuntime for UnconfiguredRuntime {
    async fn open_session(
        &self,
        spec: SessionSpec,
        _events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<dyn AgentSession>, RuntimeError> {
        tracing::error!(model = %spec.model, "no agent runtime bridge configured");
        Err(RuntimeError::OpenFailed(
            "no agent runtime bridge configured for this daemon".to_string(),
        ))
    }
}
