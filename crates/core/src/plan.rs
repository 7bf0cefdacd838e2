// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan artifact produced by the planning turn.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured plan for a task.
///
/// `visual_plan` sections have dynamic shapes the orchestrator does not
/// interpret; the store enforces only the minimum shape it needs (a
/// non-empty sequence of objects carrying a `component` tag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub goal: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visual_plan: Vec<serde_json::Value>,
}

/// Validation failures for plan payloads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("visual plan must be a non-empty sequence")]
    EmptyVisualPlan,
    #[error("visual plan section {0} is not an object")]
    SectionNotObject(usize),
    #[error("visual plan section {0} is missing a `component` tag")]
    MissingComponent(usize),
}

impl Plan {
    pub fn new(goal: impl Into<String>) -> Self {
        Self { goal: goal.into(), ..Default::default() }
    }

    crate::setters! {
        set {
            steps: Vec<String>,
            validation: Vec<String>,
            cleanup: Vec<String>,
        }
    }

    /// Whether the plan carries any content at all.
    pub fn is_empty(&self) -> bool {
        self.goal.is_empty()
            && self.steps.is_empty()
            && self.validation.is_empty()
            && self.cleanup.is_empty()
            && self.visual_plan.is_empty()
    }

    /// Attach visual sections after shape validation.
    pub fn with_visual_plan(mut self, sections: Vec<serde_json::Value>) -> Result<Self, PlanError> {
        validate_visual_sections(&sections)?;
        self.visual_plan = sections;
        Ok(self)
    }
}

/// Check the minimum shape the store requires of visual plan sections:
/// a non-empty sequence of objects, each with a string `component` tag.
/// Section contents beyond the tag are opaque.
pub fn validate_visual_sections(sections: &[serde_json::Value]) -> Result<(), PlanError> {
    if sections.is_empty() {
        return Err(PlanError::EmptyVisualPlan);
    }
    for (i, section) in sections.iter().enumerate() {
        let obj = section.as_object().ok_or(PlanError::SectionNotObject(i))?;
        match obj.get("component") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => {}
            _ => return Err(PlanError::MissingComponent(i)),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
