// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task file parsing and rendering.
//!
//! A task file is "frontmatter block + blank line + Markdown body". The
//! frontmatter is YAML between `---` fences. Unknown keys are preserved on
//! round-trip so external tooling can stash its own fields.

use serde_yaml::{Mapping, Value};
use std::path::Path;
use tf_core::Task;

use crate::StoreError;

const FENCE: &str = "---";

/// Frontmatter keys owned by [`Task`]. Anything else in the block is
/// carried through writes untouched.
const KNOWN_KEYS: &[&str] = &[
    "id",
    "title",
    "created",
    "updated",
    "started",
    "completed",
    "phase",
    "order",
    "planningStatus",
    "plan",
    "acceptanceCriteria",
    "attachments",
    "planningModelConfig",
    "executionModelConfig",
    "planningFallbackModels",
    "executionFallbackModels",
    "preExecutionSkills",
    "postExecutionSkills",
    "sessionFile",
];

/// One parsed task file: the typed record, foreign frontmatter keys, and
/// the Markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDocument {
    pub task: Task,
    /// Frontmatter keys not owned by [`Task`], in file order.
    pub extra: Mapping,
    pub body: String,
}

impl TaskDocument {
    pub fn new(task: Task, body: impl Into<String>) -> Self {
        Self { task, extra: Mapping::new(), body: body.into() }
    }

    /// Parse a task file's raw contents.
    pub fn parse(path: &Path, raw: &str) -> Result<Self, StoreError> {
        let rest = raw
            .strip_prefix(FENCE)
            .and_then(|r| r.strip_prefix('\n'))
            .ok_or_else(|| StoreError::frontmatter(path, "missing opening fence"))?;

        let close = rest
            .find(&format!("\n{FENCE}"))
            .ok_or_else(|| StoreError::frontmatter(path, "missing closing fence"))?;
        let block = &rest[..close + 1];
        let after = &rest[close + 1 + FENCE.len()..];
        let body = after.strip_prefix('\n').unwrap_or(after);
        let body = body.strip_prefix('\n').unwrap_or(body);

        let mapping: Mapping = serde_yaml::from_str(block)
            .map_err(|e| StoreError::frontmatter(path, e.to_string()))?;
        let task: Task = serde_yaml::from_value(Value::Mapping(mapping.clone()))
            .map_err(|e| StoreError::frontmatter(path, e.to_string()))?;

        let mut extra = Mapping::new();
        for (key, value) in mapping {
            let keep = match key.as_str() {
                Some(name) => !KNOWN_KEYS.contains(&name),
                None => true,
            };
            if keep {
                extra.insert(key, value);
            }
        }

        Ok(Self { task, extra, body: body.to_string() })
    }

    /// Render back to file contents: normalized frontmatter (stable key
    /// order from the struct definition, foreign keys appended) + body.
    pub fn render(&self, path: &Path) -> Result<String, StoreError> {
        let value = serde_yaml::to_value(&self.task)
            .map_err(|e| StoreError::frontmatter(path, e.to_string()))?;
        let mut mapping = match value {
            Value::Mapping(m) => m,
            other => {
                return Err(StoreError::frontmatter(
                    path,
                    format!("task serialized to non-mapping: {other:?}"),
                ))
            }
        };
        for (key, value) in &self.extra {
            if !mapping.contains_key(key) {
                mapping.insert(key.clone(), value.clone());
            }
        }

        let yaml = serde_yaml::to_string(&Value::Mapping(mapping))
            .map_err(|e| StoreError::frontmatter(path, e.to_string()))?;

        let mut out = String::with_capacity(yaml.len() + self.body.len() + 16);
        out.push_str(FENCE);
        out.push('\n');
        out.push_str(&yaml);
        if !yaml.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(FENCE);
        out.push('\n');
        if !self.body.is_empty() {
            out.push('\n');
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "frontmatter_tests.rs"]
mod tests;
