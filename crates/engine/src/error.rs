// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types.

use tf_core::TaskId;
use thiserror::Error;

/// Errors from orchestration operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] tf_storage::StoreError),

    #[error(transparent)]
    Config(#[from] tf_config::ConfigError),

    #[error(transparent)]
    Runtime(#[from] tf_runtime::RuntimeError),

    #[error("no live session for task {0}")]
    SessionNotFound(TaskId),

    #[error("task {0} is not in a dispatchable state")]
    NotDispatchable(TaskId),

    #[error("workspace queue is at its executing limit")]
    AtCapacity,
}
