// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error types.

use tf_core::TaskId;
use thiserror::Error;

/// Errors from disk operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("task already exists: {0}")]
    TaskExists(TaskId),

    #[error("attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("malformed frontmatter in {path}: {message}")]
    Frontmatter { path: String, message: String },

    #[error("reorder list does not match the current members of phase '{phase}'")]
    InvalidReorder { phase: String },

    #[error("a task with planning in flight cannot carry a plan: {0}")]
    PlanDuringPlanning(TaskId),

    #[error("invalid registry file {path}: {source}")]
    Registry {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io { path: path.display().to_string(), source }
    }

    pub(crate) fn frontmatter(path: &std::path::Path, message: impl Into<String>) -> Self {
        StoreError::Frontmatter { path: path.display().to_string(), message: message.into() }
    }
}
