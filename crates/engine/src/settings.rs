// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow settings service.
//!
//! Resolves effective workflow limits for a workspace from its override
//! file layered over the global defaults file over built-ins, and applies
//! patches to the workspace layer (keeping the legacy queue flag in sync).

use std::path::{Path, PathBuf};
use tf_config::{ConfigError, WorkflowLimits, WorkflowOverrides, WorkflowPatch};

const WORKFLOW_FILE: &str = "workflow.json";

/// Resolves and patches workflow limits.
pub struct WorkflowSettingsService {
    global_path: PathBuf,
}

impl WorkflowSettingsService {
    /// `global_dir` holds the global `workflow.json`.
    pub fn new(global_dir: &Path) -> Self {
        Self { global_path: global_dir.join(WORKFLOW_FILE) }
    }

    fn workspace_path(workspace_state_dir: &Path) -> PathBuf {
        workspace_state_dir.join(WORKFLOW_FILE)
    }

    /// Effective limits for a workspace.
    pub fn resolve(&self, workspace_state_dir: &Path) -> Result<WorkflowLimits, ConfigError> {
        let global = WorkflowOverrides::load(&self.global_path)?;
        let workspace = WorkflowOverrides::load(&Self::workspace_path(workspace_state_dir))?;
        Ok(workspace.resolve(&global))
    }

    /// Patch the workspace layer and return the new effective limits.
    pub fn patch_workspace(
        &self,
        workspace_state_dir: &Path,
        patch: &WorkflowPatch,
    ) -> Result<WorkflowLimits, ConfigError> {
        let path = Self::workspace_path(workspace_state_dir);
        let mut overrides = WorkflowOverrides::load(&path)?;
        overrides.apply(patch);
        overrides.save(&path)?;
        let global = WorkflowOverrides::load(&self.global_path)?;
        Ok(overrides.resolve(&global))
    }

    /// Patch the global layer and return its new contents.
    pub fn patch_global(&self, patch: &WorkflowPatch) -> Result<WorkflowOverrides, ConfigError> {
        let mut overrides = WorkflowOverrides::load(&self.global_path)?;
        overrides.apply(patch);
        overrides.save(&self.global_path)?;
        Ok(overrides)
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
