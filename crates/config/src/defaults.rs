// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task defaults overlay.
//!
//! A task's effective configuration is computed by overlaying layers:
//! built-in defaults ← global `taskDefaults` ← workspace override ← creation
//! request. Each layer may supply any subset of fields; the legacy
//! `modelConfig` alias is honored as a lower-precedence source for
//! `executionModelConfig` and kept in sync on write.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tf_core::ModelConfig;

use crate::skills::{SkillHook, SkillSet};
use crate::ConfigError;

/// One overlay layer. All fields optional; absent means inherit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDefaultsLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_model_config: Option<ModelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_model_config: Option<ModelConfig>,
    /// Legacy alias for `execution_model_config`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_config: Option<ModelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_fallback_models: Option<Vec<ModelConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_fallback_models: Option<Vec<ModelConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_execution_skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_execution_skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_prompt_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_prompt_template: Option<String>,
}

impl TaskDefaultsLayer {
    /// Load a defaults file; missing file = empty layer.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        serde_json::from_str(&raw).map_err(|e| ConfigError::parse(path, e))
    }

    /// Effective execution config within this layer: the modern field wins,
    /// the legacy alias fills in behind it.
    fn execution_config(&self) -> Option<&ModelConfig> {
        self.execution_model_config.as_ref().or(self.model_config.as_ref())
    }

    /// Re-align the legacy alias with the modern field (called before
    /// persisting a layer so both names agree on disk).
    pub fn sync_legacy_alias(&mut self) {
        if let Some(config) = self.execution_config().cloned() {
            self.execution_model_config = Some(config.clone());
            self.model_config = Some(config);
        }
    }
}

/// Fully-resolved task defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTaskDefaults {
    pub planning_model_config: ModelConfig,
    pub execution_model_config: ModelConfig,
    pub planning_fallback_models: Vec<ModelConfig>,
    pub execution_fallback_models: Vec<ModelConfig>,
    pub pre_execution_skills: Vec<String>,
    pub post_execution_skills: Vec<String>,
    pub planning_prompt_template: Option<String>,
    pub execution_prompt_template: Option<String>,
}

impl ResolvedTaskDefaults {
    /// Built-in floor of the overlay chain.
    pub fn built_in() -> Self {
        Self {
            planning_model_config: ModelConfig::new("openai", "gpt-4.1"),
            execution_model_config: ModelConfig::new("openai", "gpt-4.1"),
            planning_fallback_models: Vec::new(),
            execution_fallback_models: Vec::new(),
            pre_execution_skills: Vec::new(),
            post_execution_skills: Vec::new(),
            planning_prompt_template: None,
            execution_prompt_template: None,
        }
    }

    /// Overlay layers lowest-precedence-first onto the built-ins.
    pub fn resolve(layers: &[&TaskDefaultsLayer]) -> Self {
        let mut resolved = Self::built_in();
        for layer in layers {
            if let Some(v) = &layer.planning_model_config {
                resolved.planning_model_config = v.clone();
            }
            if let Some(v) = layer.execution_config() {
                resolved.execution_model_config = v.clone();
            }
            if let Some(v) = &layer.planning_fallback_models {
                resolved.planning_fallback_models = v.clone();
            }
            if let Some(v) = &layer.execution_fallback_models {
                resolved.execution_fallback_models = v.clone();
            }
            if let Some(v) = &layer.pre_execution_skills {
                resolved.pre_execution_skills = v.clone();
            }
            if let Some(v) = &layer.post_execution_skills {
                resolved.post_execution_skills = v.clone();
            }
            if let Some(v) = &layer.planning_prompt_template {
                resolved.planning_prompt_template = Some(v.clone());
            }
            if let Some(v) = &layer.execution_prompt_template {
                resolved.execution_prompt_template = Some(v.clone());
            }
        }
        resolved
    }

    /// Validate the resolved configuration against the known skills.
    pub fn validate(&self, skills: &SkillSet) -> Result<(), ConfigError> {
        for config in [&self.planning_model_config, &self.execution_model_config]
            .into_iter()
            .chain(&self.planning_fallback_models)
            .chain(&self.execution_fallback_models)
        {
            if config.provider.is_empty() || config.model_id.is_empty() {
                return Err(ConfigError::IncompleteModel);
            }
            if config.thinking_level.is_some() && !config.supports_thinking() {
                return Err(ConfigError::ThinkingNotSupported(config.model_id.clone()));
            }
        }
        skills.validate_assignment(&self.pre_execution_skills, SkillHook::Pre)?;
        skills.validate_assignment(&self.post_execution_skills, SkillHook::Post)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "defaults_tests.rs"]
mod tests;
