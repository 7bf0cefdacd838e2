// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reusable model profiles.
//!
//! A profile is a named bundle of planning/execution model configs plus
//! fallback chains, used by UIs to populate task defaults in one pick.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tf_core::ModelConfig;

use crate::ConfigError;

/// One named profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProfile {
    pub id: String,
    pub name: String,
    pub planning_model_config: ModelConfig,
    pub execution_model_config: ModelConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planning_fallback_models: Vec<ModelConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution_fallback_models: Vec<ModelConfig>,
}

impl ModelProfile {
    /// Validate both model configs are complete.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for config in [&self.planning_model_config, &self.execution_model_config]
            .into_iter()
            .chain(&self.planning_fallback_models)
            .chain(&self.execution_fallback_models)
        {
            if config.provider.is_empty() || config.model_id.is_empty() {
                return Err(ConfigError::IncompleteModel);
            }
        }
        Ok(())
    }
}

/// An ordered collection of profiles with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileSet {
    profiles: Vec<ModelProfile>,
}

impl ProfileSet {
    pub fn new(profiles: impl IntoIterator<Item = ModelProfile>) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        for profile in profiles {
            set.add(profile)?;
        }
        Ok(set)
    }

    /// Load a profile file (JSON array); missing file = empty set.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        let profiles: Vec<ModelProfile> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::parse(path, e))?;
        Self::new(profiles)
    }

    /// Add a profile; duplicates by id are rejected.
    pub fn add(&mut self, profile: ModelProfile) -> Result<(), ConfigError> {
        profile.validate()?;
        if self.get(&profile.id).is_some() {
            return Err(ConfigError::DuplicateProfile(profile.id));
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ModelProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelProfile> {
        self.profiles.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
#[path = "profiles_tests.rs"]
mod tests;
