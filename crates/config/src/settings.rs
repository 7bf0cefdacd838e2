// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow limits and automation flags.
//!
//! Effective limits resolve from (a) the workspace override file, (b) the
//! global defaults file, (c) built-in defaults. An override field set to
//! `null` (absent) means "inherit from the next layer down".

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Built-in executing WIP limit.
pub const DEFAULT_EXECUTING_LIMIT: u32 = 1;

/// Built-in ready-column limit.
pub const DEFAULT_READY_LIMIT: u32 = 5;

/// Fully-resolved workflow limits for one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowLimits {
    /// Maximum concurrently-executing tasks.
    pub executing_limit: u32,
    /// Maximum tasks promoted into `ready`.
    pub ready_limit: u32,
    /// Automation: promote planned backlog tasks into `ready`.
    pub backlog_to_ready: bool,
    /// Automation: dispatch ready tasks into `executing` (the queue toggle).
    pub ready_to_executing: bool,
}

impl Default for WorkflowLimits {
    fn default() -> Self {
        Self {
            executing_limit: DEFAULT_EXECUTING_LIMIT,
            ready_limit: DEFAULT_READY_LIMIT,
            backlog_to_ready: false,
            ready_to_executing: false,
        }
    }
}

/// One override layer (global or workspace file). All fields optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executing_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backlog_to_ready: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_to_executing: Option<bool>,
    /// Legacy persisted queue toggle. Kept in sync with
    /// `ready_to_executing` by [`WorkflowOverrides::apply`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_enabled: Option<bool>,
}

impl WorkflowOverrides {
    /// Load an override file; a missing file is an empty layer.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        serde_json::from_str(&raw).map_err(|e| ConfigError::parse(path, e))
    }

    /// Persist this layer as JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(path, e))?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::parse(path, e))?;
        std::fs::write(path, raw).map_err(|e| ConfigError::io(path, e))
    }

    /// Apply a patch, keeping the legacy `queue_enabled` flag in sync
    /// whenever `ready_to_executing` changes.
    pub fn apply(&mut self, patch: &WorkflowPatch) {
        if let Some(v) = patch.executing_limit {
            self.executing_limit = v;
        }
        if let Some(v) = patch.ready_limit {
            self.ready_limit = v;
        }
        if let Some(v) = patch.backlog_to_ready {
            self.backlog_to_ready = v;
        }
        if let Some(v) = patch.ready_to_executing {
            self.ready_to_executing = v;
            self.queue_enabled = v;
        }
    }

    /// Resolve effective limits: `self` over `global` over built-ins.
    ///
    /// The legacy `queue_enabled` flag participates as a lower-precedence
    /// source for `ready_to_executing` within each layer.
    pub fn resolve(&self, global: &WorkflowOverrides) -> WorkflowLimits {
        let built_in = WorkflowLimits::default();
        WorkflowLimits {
            executing_limit: self
                .executing_limit
                .or(global.executing_limit)
                .unwrap_or(built_in.executing_limit),
            ready_limit: self.ready_limit.or(global.ready_limit).unwrap_or(built_in.ready_limit),
            backlog_to_ready: self
                .backlog_to_ready
                .or(global.backlog_to_ready)
                .unwrap_or(built_in.backlog_to_ready),
            ready_to_executing: self
                .ready_to_executing
                .or(self.queue_enabled)
                .or(global.ready_to_executing)
                .or(global.queue_enabled)
                .unwrap_or(built_in.ready_to_executing),
        }
    }
}

/// Keeps an explicit JSON `null` distinguishable from an absent key.
///
/// serde's stock `Option` impl folds `null` into the outer `None`, which
/// would turn a "clear this override" patch into a no-op. Wrapping the
/// present case in `Some` preserves the three states: absent (`None`),
/// `null` (`Some(None)`), value (`Some(Some(v))`).
fn clear_or_set<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update to one override layer. `None` leaves a field untouched;
/// `Some(Some(v))` sets it; `Some(None)` clears it back to inherit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowPatch {
    #[serde(deserialize_with = "clear_or_set")]
    pub executing_limit: Option<Option<u32>>,
    #[serde(deserialize_with = "clear_or_set")]
    pub ready_limit: Option<Option<u32>>,
    #[serde(deserialize_with = "clear_or_set")]
    pub backlog_to_ready: Option<Option<bool>>,
    #[serde(deserialize_with = "clear_or_set")]
    pub ready_to_executing: Option<Option<bool>>,
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
