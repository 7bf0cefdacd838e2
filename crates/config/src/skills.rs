// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skill definitions.
//!
//! A skill is a named prompt template with a hook designation (`pre` and/or
//! `post`) and a type: `follow-up` runs once; `loop` repeats until the
//! assistant text contains the configured done signal or the iteration cap
//! is hit.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Default iteration cap for loop skills.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// Which execution hook a skill may be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillHook {
    Pre,
    Post,
}

tf_core::simple_display! {
    SkillHook {
        Pre => "pre",
        Post => "post",
    }
}

/// How a skill's prompt turn behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SkillKind {
    #[default]
    FollowUp,
    Loop,
}

tf_core::simple_display! {
    SkillKind {
        FollowUp => "follow-up",
        Loop => "loop",
    }
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// One skill definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Hooks this skill may be assigned to.
    pub hooks: Vec<SkillHook>,
    #[serde(default)]
    pub kind: SkillKind,
    /// Prompt template sent as the skill's turn body.
    pub template: String,
    /// Loop skills stop once the assistant text contains this marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_signal: Option<String>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl SkillDef {
    pub fn supports_hook(&self, hook: SkillHook) -> bool {
        self.hooks.contains(&hook)
    }
}

/// The set of known skills, keyed by id in definition order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet {
    skills: IndexMap<String, SkillDef>,
}

impl SkillSet {
    pub fn new(defs: impl IntoIterator<Item = SkillDef>) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        for def in defs {
            set.insert(def)?;
        }
        Ok(set)
    }

    /// Load a skill file (JSON array of definitions); missing file = empty set.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        let defs: Vec<SkillDef> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::parse(path, e))?;
        Self::new(defs)
    }

    /// Insert a definition, validating loop skills carry a done signal.
    pub fn insert(&mut self, def: SkillDef) -> Result<(), ConfigError> {
        if def.kind == SkillKind::Loop && def.done_signal.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::LoopWithoutDoneSignal(def.id));
        }
        self.skills.insert(def.id.clone(), def);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SkillDef> {
        self.skills.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillDef> {
        self.skills.values()
    }

    /// Check that every id exists and declares the hook it is assigned to.
    pub fn validate_assignment(&self, ids: &[String], hook: SkillHook) -> Result<(), ConfigError> {
        for id in ids {
            let def = self.get(id).ok_or_else(|| ConfigError::UnknownSkill(id.clone()))?;
            if !def.supports_hook(hook) {
                return Err(ConfigError::SkillHookMismatch {
                    id: id.clone(),
                    hook: hook.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolve an ordered id list into definitions, skipping unknown ids
    /// with a warning (used at execution time, after validation has had its
    /// chance at write time).
    pub fn resolve_ids(&self, ids: &[String]) -> Vec<SkillDef> {
        ids.iter()
            .filter_map(|id| match self.get(id) {
                Some(def) => Some(def.clone()),
                None => {
                    tracing::warn!(skill = id.as_str(), "skipping unknown skill id");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "skills_tests.rs"]
mod tests;
