// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool callback registry.
//!
//! Extension tools run inside the agent runtime and reach back into the
//! orchestrator exclusively through this process-wide registry: typed
//! callback families keyed by task or workspace id. The supervisor and
//! queue manager register callbacks before starting a session and remove
//! them on cleanup; insert and remove are idempotent. Nothing here is
//! persisted — the registry is recreated on startup.

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tf_core::{validate_visual_sections, Plan, TaskId, WorkspaceId};
use thiserror::Error;

/// Returned to a tool invoked with no registered callback. The turn keeps
/// going; the agent is told to continue on its own.
pub const UNAVAILABLE_MESSAGE: &str = "Proceed with your best judgement.";

/// Tool invocation failures surfaced to the extension.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid tool arguments: {0}")]
    InvalidArgs(String),
    #[error("{0}")]
    Rejected(String),
}

// ── Tool argument shapes ───────────────────────────────────────────────
//
// Unknown fields are rejected: a tool sending anything outside its contract
// is a bug worth surfacing, not silently ignoring.

/// `save_plan` — canonical contract: `acceptance_criteria` required and
/// non-empty; either `visual_plan` or the legacy plan fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SavePlanArgs {
    pub task_id: String,
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub visual_plan: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<String>>,
    #[serde(default)]
    pub validation: Option<Vec<String>>,
    #[serde(default)]
    pub cleanup: Option<Vec<String>>,
}

/// A validated, normalized `save_plan` payload carrying both plan shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanPayload {
    pub task_id: TaskId,
    pub acceptance_criteria: Vec<String>,
    pub plan: Plan,
}

impl SavePlanArgs {
    /// Validate and normalize the two accepted shapes into both: a legacy
    /// plan always gains a synthesized visual section, and a visual-only
    /// payload gains a placeholder goal.
    pub fn normalized(self) -> Result<PlanPayload, ToolError> {
        let acceptance_criteria: Vec<String> = self
            .acceptance_criteria
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if acceptance_criteria.is_empty() {
            return Err(ToolError::InvalidArgs(
                "acceptance_criteria must be a non-empty array".into(),
            ));
        }

        let has_legacy = self.goal.is_some()
            || self.steps.is_some()
            || self.validation.is_some()
            || self.cleanup.is_some();

        let plan = match (self.visual_plan, has_legacy) {
            (Some(sections), _) => {
                validate_visual_sections(&sections)
                    .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;
                let mut plan = Plan::new(
                    self.goal.unwrap_or_else(|| "See visual plan".to_string()),
                );
                plan.steps = self.steps.unwrap_or_default();
                plan.validation = self.validation.unwrap_or_default();
                plan.cleanup = self.cleanup.unwrap_or_default();
                plan.visual_plan = sections;
                plan
            }
            (None, true) => {
                let mut plan = Plan::new(self.goal.unwrap_or_default());
                plan.steps = self.steps.unwrap_or_default();
                plan.validation = self.validation.unwrap_or_default();
                plan.cleanup = self.cleanup.unwrap_or_default();
                plan.visual_plan = vec![serde_json::json!({
                    "component": "PlanSummary",
                    "goal": plan.goal,
                    "steps": plan.steps,
                    "validation": plan.validation,
                    "cleanup": plan.cleanup,
                })];
                plan
            }
            (None, false) => {
                return Err(ToolError::InvalidArgs(
                    "save_plan requires visual_plan or the legacy plan fields".into(),
                ))
            }
        };

        Ok(PlanPayload { task_id: TaskId::new(self.task_id), acceptance_criteria, plan })
    }
}

/// `task_complete`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskCompleteArgs {
    pub task_id: String,
    pub summary: String,
}

/// `attach_task_file`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttachFileArgs {
    pub path: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// One question in an `ask_questions` call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuestionArg {
    pub question: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// `ask_questions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AskQuestionsArgs {
    pub request_id: String,
    pub questions: Vec<QuestionArg>,
    pub workspace_id: String,
}

/// How `message_agent` injects its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageAgentKind {
    Steer,
    FollowUp,
    Chat,
}

/// `message_agent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MessageAgentArgs {
    pub task_id: String,
    pub kind: MessageAgentKind,
    pub content: String,
    #[serde(default)]
    pub attachment_ids: Option<Vec<String>>,
}

/// `factory_control`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FactoryControlArgs {
    pub action: FactoryAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactoryAction {
    Status,
    Start,
    Stop,
}

/// `manage_shelf`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManageShelfArgs {
    pub action: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub updates: Option<serde_json::Value>,
}

/// `create_extension`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateExtensionArgs {
    pub name: String,
    pub audience: String,
    pub source: String,
    #[serde(default)]
    pub confirmed: Option<bool>,
}

// ── Callback families ──────────────────────────────────────────────────

pub type PlanCallback = Arc<dyn Fn(PlanPayload) -> Result<String, String> + Send + Sync>;
pub type CompleteCallback = Arc<dyn Fn(String) + Send + Sync>;
pub type AttachFileCallback = Arc<dyn Fn(AttachFileArgs) -> Result<String, String> + Send + Sync>;
pub type QaCallback = Arc<dyn Fn(AskQuestionsArgs) -> Result<String, String> + Send + Sync>;
pub type MessageAgentCallback =
    Arc<dyn Fn(MessageAgentArgs) -> Result<String, String> + Send + Sync>;
pub type FactoryControlCallback =
    Arc<dyn Fn(FactoryControlArgs) -> Result<String, String> + Send + Sync>;
pub type ShelfCallback = Arc<dyn Fn(ManageShelfArgs) -> Result<String, String> + Send + Sync>;
pub type CreateExtensionCallback =
    Arc<dyn Fn(CreateExtensionArgs) -> Result<String, String> + Send + Sync>;

/// Process-wide routing table for extension tool callbacks.
#[derive(Default)]
pub struct ToolCallbackRegistry {
    plan: RwLock<HashMap<TaskId, PlanCallback>>,
    complete: RwLock<HashMap<TaskId, CompleteCallback>>,
    attach_file: RwLock<HashMap<TaskId, AttachFileCallback>>,
    qa: RwLock<HashMap<WorkspaceId, QaCallback>>,
    message_agent: RwLock<HashMap<TaskId, MessageAgentCallback>>,
    factory_control: RwLock<HashMap<WorkspaceId, FactoryControlCallback>>,
    shelf: RwLock<HashMap<WorkspaceId, ShelfCallback>>,
    create_extension: RwLock<HashMap<WorkspaceId, CreateExtensionCallback>>,
}

fn parse_args<T: serde::de::DeserializeOwned>(raw: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(raw).map_err(|e| ToolError::InvalidArgs(e.to_string()))
}

impl ToolCallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Registration. Inserting over an existing key replaces it; removal of
    // an absent key is a no-op.

    pub fn register_plan(&self, task_id: TaskId, callback: PlanCallback) {
        self.plan.write().insert(task_id, callback);
    }

    pub fn remove_plan(&self, task_id: &TaskId) {
        self.plan.write().remove(task_id);
    }

    pub fn register_complete(&self, task_id: TaskId, callback: CompleteCallback) {
        self.complete.write().insert(task_id, callback);
    }

    pub fn remove_complete(&self, task_id: &TaskId) {
        self.complete.write().remove(task_id);
    }

    pub fn register_attach_file(&self, task_id: TaskId, callback: AttachFileCallback) {
        self.attach_file.write().insert(task_id, callback);
    }

    pub fn remove_attach_file(&self, task_id: &TaskId) {
        self.attach_file.write().remove(task_id);
    }

    pub fn register_qa(&self, workspace_id: WorkspaceId, callback: QaCallback) {
        self.qa.write().insert(workspace_id, callback);
    }

    pub fn remove_qa(&self, workspace_id: &WorkspaceId) {
        self.qa.write().remove(workspace_id);
    }

    pub fn register_message_agent(&self, task_id: TaskId, callback: MessageAgentCallback) {
        self.message_agent.write().insert(task_id, callback);
    }

    pub fn remove_message_agent(&self, task_id: &TaskId) {
        self.message_agent.write().remove(task_id);
    }

    pub fn register_factory_control(
        &self,
        workspace_id: WorkspaceId,
        callback: FactoryControlCallback,
    ) {
        self.factory_control.write().insert(workspace_id, callback);
    }

    pub fn remove_factory_control(&self, workspace_id: &WorkspaceId) {
        self.factory_control.write().remove(workspace_id);
    }

    pub fn register_shelf(&self, workspace_id: WorkspaceId, callback: ShelfCallback) {
        self.shelf.write().insert(workspace_id, callback);
    }

    pub fn remove_shelf(&self, workspace_id: &WorkspaceId) {
        self.shelf.write().remove(workspace_id);
    }

    pub fn register_create_extension(
        &self,
        workspace_id: WorkspaceId,
        callback: CreateExtensionCallback,
    ) {
        self.create_extension.write().insert(workspace_id, callback);
    }

    pub fn remove_create_extension(&self, workspace_id: &WorkspaceId) {
        self.create_extension.write().remove(workspace_id);
    }

    // Invocation. Arguments are validated before the callback runs; a
    // missing callback yields the user-facing fallback message without
    // failing the turn.

    pub fn invoke_save_plan(&self, raw: serde_json::Value) -> Result<String, ToolError> {
        let payload = parse_args::<SavePlanArgs>(raw)?.normalized()?;
        let callback = self.plan.read().get(&payload.task_id).cloned();
        match callback {
            Some(callback) => callback(payload).map_err(ToolError::Rejected),
            None => Ok(UNAVAILABLE_MESSAGE.to_string()),
        }
    }

    pub fn invoke_task_complete(&self, raw: serde_json::Value) -> Result<String, ToolError> {
        let args: TaskCompleteArgs = parse_args(raw)?;
        let task_id = TaskId::new(args.task_id);
        let callback = self.complete.read().get(&task_id).cloned();
        match callback {
            Some(callback) => {
                callback(args.summary);
                Ok("Completion signal recorded.".to_string())
            }
            None => Ok(UNAVAILABLE_MESSAGE.to_string()),
        }
    }

    pub fn invoke_attach_file(
        &self,
        context_task: &TaskId,
        raw: serde_json::Value,
    ) -> Result<String, ToolError> {
        let args: AttachFileArgs = parse_args(raw)?;
        let task_id = args.task_id.clone().map(TaskId::new).unwrap_or_else(|| context_task.clone());
        let callback = self.attach_file.read().get(&task_id).cloned();
        match callback {
            Some(callback) => callback(args).map_err(ToolError::Rejected),
            None => Ok(UNAVAILABLE_MESSAGE.to_string()),
        }
    }

    pub fn invoke_ask_questions(&self, raw: serde_json::Value) -> Result<String, ToolError> {
        let args: AskQuestionsArgs = parse_args(raw)?;
        if args.questions.is_empty() {
            return Err(ToolError::InvalidArgs("questions must be non-empty".into()));
        }
        let workspace_id = WorkspaceId::new(args.workspace_id.clone());
        let callback = self.qa.read().get(&workspace_id).cloned();
        match callback {
            Some(callback) => callback(args).map_err(ToolError::Rejected),
            None => Ok(UNAVAILABLE_MESSAGE.to_string()),
        }
    }

    pub fn invoke_message_agent(&self, raw: serde_json::Value) -> Result<String, ToolError> {
        let args: MessageAgentArgs = parse_args(raw)?;
        let task_id = TaskId::new(args.task_id.clone());
        let callback = self.message_agent.read().get(&task_id).cloned();
        match callback {
            Some(callback) => callback(args).map_err(ToolError::Rejected),
            None => Ok(UNAVAILABLE_MESSAGE.to_string()),
        }
    }

    pub fn invoke_factory_control(
        &self,
        workspace_id: &WorkspaceId,
        raw: serde_json::Value,
    ) -> Result<String, ToolError> {
        let args: FactoryControlArgs = parse_args(raw)?;
        let callback = self.factory_control.read().get(workspace_id).cloned();
        match callback {
            Some(callback) => callback(args).map_err(ToolError::Rejected),
            None => Ok(UNAVAILABLE_MESSAGE.to_string()),
        }
    }

    pub fn invoke_manage_shelf(
        &self,
        workspace_id: &WorkspaceId,
        raw: serde_json::Value,
    ) -> Result<String, ToolError> {
        let args: ManageShelfArgs = parse_args(raw)?;
        let callback = self.shelf.read().get(workspace_id).cloned();
        match callback {
            Some(callback) => callback(args).map_err(ToolError::Rejected),
            None => Ok(UNAVAILABLE_MESSAGE.to_string()),
        }
    }

    pub fn invoke_create_extension(
        &self,
        workspace_id: &WorkspaceId,
        raw: serde_json::Value,
    ) -> Result<String, ToolError> {
        let args: CreateExtensionArgs = parse_args(raw)?;
        let callback = self.create_extension.read().get(workspace_id).cloned();
        match callback {
            Some(callback) => callback(args).map_err(ToolError::Rejected),
            None => Ok(UNAVAILABLE_MESSAGE.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
