// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider/model configuration for agent sessions.

use serde::{Deserialize, Serialize};

/// Reasoning effort requested from a reasoning-capable model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    Low,
    Medium,
    High,
}

crate::simple_display! {
    ThinkingLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// Model id prefixes the orchestrator treats as reasoning-capable.
///
/// Thinking levels are rejected for anything else at validation time.
const REASONING_MODEL_PREFIXES: &[&str] = &["o1", "o3", "o4", "claude-", "gemini-2.5"];

/// Which provider and model an agent session runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub provider: String,
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<ThinkingLevel>,
}

impl ModelConfig {
    pub fn new(provider: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self { provider: provider.into(), model_id: model_id.into(), thinking_level: None }
    }

    crate::setters! {
        option {
            thinking_level: ThinkingLevel,
        }
    }

    /// Breaker/tracker key: `provider/model_id`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.provider, self.model_id)
    }

    /// Whether the model accepts a thinking level.
    pub fn supports_thinking(&self) -> bool {
        REASONING_MODEL_PREFIXES.iter().any(|p| self.model_id.starts_with(p))
    }
}

impl std::fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model_id)
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
