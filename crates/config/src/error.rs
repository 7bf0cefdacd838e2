// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration error types.

use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model config is missing a provider or model id")]
    IncompleteModel,

    #[error("model '{0}' does not support a thinking level")]
    ThinkingNotSupported(String),

    #[error("unknown skill '{0}'")]
    UnknownSkill(String),

    #[error("skill '{id}' does not declare the '{hook}' hook")]
    SkillHookMismatch { id: String, hook: String },

    #[error("loop skill '{0}' is missing a done signal")]
    LoopWithoutDoneSignal(String),

    #[error("duplicate model profile id '{0}'")]
    DuplicateProfile(String),
}

impl ConfigError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ConfigError::Io { path: path.display().to_string(), source }
    }

    pub(crate) fn parse(path: &std::path::Path, source: serde_json::Error) -> Self {
        ConfigError::Parse { path: path.display().to_string(), source }
    }
}
