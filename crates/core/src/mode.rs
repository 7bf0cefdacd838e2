// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent mode contract.
//!
//! Maps a task's (phase, planning status, plan presence) to the mode its
//! agent session runs in, and fixes per-mode tool allowances. The supervisor
//! prepends a state preamble built from the contract before every turn and
//! strips an echoed preamble from assistant output.

use crate::task::{PlanningStatus, TaskPhase};
use serde::{Deserialize, Serialize};

/// Mode a session operates in. Workspace-scope sessions run as `Foreman`;
/// task-scope sessions derive their mode from task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    Foreman,
    TaskPlanning,
    TaskExecution,
    TaskComplete,
}

crate::simple_display! {
    AgentMode {
        Foreman => "foreman",
        TaskPlanning => "task_planning",
        TaskExecution => "task_execution",
        TaskComplete => "task_complete",
    }
}

/// Fixed tool allowances and completion rule for a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeContract {
    pub allowed: &'static [&'static str],
    pub forbidden: &'static [&'static str],
    pub completion: &'static str,
}

/// Derive the task-scope mode from task state.
///
/// Backlog with planning in flight (and no plan yet) is the planning mode;
/// executing tasks get the execution mode; everything else — backlog with a
/// plan, ready, complete, archived — gets the completed-task chat mode.
pub fn mode_for(phase: TaskPhase, planning: PlanningStatus, plan_present: bool) -> AgentMode {
    match phase {
        TaskPhase::Backlog if planning == PlanningStatus::Running && !plan_present => {
            AgentMode::TaskPlanning
        }
        TaskPhase::Executing => AgentMode::TaskExecution,
        _ => AgentMode::TaskComplete,
    }
}

impl AgentMode {
    pub fn contract(&self) -> ModeContract {
        match self {
            AgentMode::Foreman => ModeContract {
                allowed: &[
                    "read",
                    "shell",
                    "ask_questions",
                    "create_draft_task",
                    "create_artifact",
                    "manage_shelf",
                    "factory_control",
                ],
                forbidden: &["edit", "write", "save_plan", "task_complete"],
                completion: "Reply and stop unless asked for more.",
            },
            AgentMode::TaskPlanning => ModeContract {
                allowed: &["read", "shell", "save_plan"],
                forbidden: &["edit", "write", "task_complete"],
                completion: "Call save_plan exactly once, then stop.",
            },
            AgentMode::TaskExecution => ModeContract {
                allowed: &["read", "shell", "edit", "write", "task_complete", "attach_task_file"],
                forbidden: &["save_plan"],
                completion: "Call task_complete when the acceptance criteria are met.",
            },
            AgentMode::TaskComplete => ModeContract {
                allowed: &["read", "shell", "edit", "write", "attach_task_file"],
                forbidden: &["save_plan", "task_complete"],
                completion: "Respond to the user.",
            },
        }
    }

    /// Whether the contract permits the named tool.
    pub fn allows_tool(&self, tool: &str) -> bool {
        let contract = self.contract();
        contract.allowed.contains(&tool) && !contract.forbidden.contains(&tool)
    }
}

const PREAMBLE_OPEN: &str = "<session-state>";
const PREAMBLE_CLOSE: &str = "</session-state>";

/// Build the state preamble prepended to every agent turn.
pub fn build_preamble(mode: AgentMode, phase: TaskPhase, planning: PlanningStatus) -> String {
    let contract = mode.contract();
    format!(
        "{open}\nmode: {mode}\nphase: {phase}\nplanning: {planning}\nallowed tools: {allowed}\nforbidden tools: {forbidden}\ncompletion: {completion}\n{close}",
        open = PREAMBLE_OPEN,
        mode = mode,
        phase = phase,
        planning = planning,
        allowed = contract.allowed.join(", "),
        forbidden = contract.forbidden.join(", "),
        completion = contract.completion,
        close = PREAMBLE_CLOSE,
    )
}

/// Strip an echoed preamble block from the front of assistant output.
///
/// Models occasionally quote the state block back; the stripped text is what
/// lands on the activity timeline.
pub fn strip_preamble(text: &str) -> &str {
    let trimmed = text.trim_start();
    if !trimmed.starts_with(PREAMBLE_OPEN) {
        return text;
    }
    match trimmed.find(PREAMBLE_CLOSE) {
        Some(end) => trimmed[end + PREAMBLE_CLOSE.len()..].trim_start(),
        None => text,
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
