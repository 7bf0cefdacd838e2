// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt construction.
//!
//! Pure string functions over (task, body, attachments) so every prompt the
//! supervisor sends is directly testable. Templates interpolate `{name}`
//! placeholders; unknown placeholders are left in place.

use std::collections::HashMap;
use tf_core::{AttachmentMeta, Task};

/// Default planning prompt template.
pub const DEFAULT_PLANNING_TEMPLATE: &str = "\
You are planning the task {id}: {title}

Task description:
{body}
{attachments}
Investigate the repository, then produce a plan. Save it with the save_plan \
tool: acceptance criteria the implementation must meet, the goal, ordered \
steps, validation commands, and any cleanup. Call save_plan exactly once.";

/// Default execution prompt template.
pub const DEFAULT_EXECUTION_TEMPLATE: &str = "\
You are executing the task {id}: {title}

Task description:
{body}

Plan goal: {goal}

Steps:
{steps}

Acceptance criteria:
{criteria}
{attachments}
Work through the plan. When every acceptance criterion is met, call the \
task_complete tool with a short summary.";

/// Substitute `{name}` placeholders from the map. Unknown placeholders are
/// left untouched so a template typo is visible instead of silently empty.
pub fn interpolate(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
}

/// The attachment section of a prompt: images are inlined alongside the
/// prompt, so they are named; other files are referenced by path for the
/// agent's own file-read tool.
pub fn attachment_section(attachments: &[(AttachmentMeta, std::path::PathBuf)]) -> String {
    if attachments.is_empty() {
        return String::new();
    }
    let mut lines = vec!["\nAttachments:".to_string()];
    for (meta, path) in attachments {
        if meta.is_image() {
            lines.push(format!("- {} (image, attached inline)", meta.filename));
        } else {
            lines.push(format!("- {} at {}", meta.filename, path.display()));
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

fn base_vars(task: &Task, body: &str, attachment_section: &str) -> HashMap<&'static str, String> {
    let mut vars = HashMap::new();
    vars.insert("id", task.id.to_string());
    vars.insert("title", task.title.clone());
    vars.insert("body", body.to_string());
    vars.insert("attachments", attachment_section.to_string());
    vars.insert("criteria", bullet_list(&task.acceptance_criteria));
    vars
}

/// Build the planning turn's prompt.
pub fn planning_prompt(
    task: &Task,
    body: &str,
    template: Option<&str>,
    attachment_section: &str,
) -> String {
    let vars = base_vars(task, body, attachment_section);
    interpolate(template.unwrap_or(DEFAULT_PLANNING_TEMPLATE), &vars)
}

/// Build the execution turn's prompt.
pub fn execution_prompt(
    task: &Task,
    body: &str,
    template: Option<&str>,
    attachment_section: &str,
) -> String {
    let mut vars = base_vars(task, body, attachment_section);
    let (goal, steps) = match &task.plan {
        Some(plan) => (plan.goal.clone(), bullet_list(&plan.steps)),
        None => ("(no plan recorded)".to_string(), "(none)".to_string()),
    };
    vars.insert("goal", goal);
    vars.insert("steps", steps);
    interpolate(template.unwrap_or(DEFAULT_EXECUTION_TEMPLATE), &vars)
}

/// Build a chat turn for a non-executing task: the user's message with
/// just enough task framing.
pub fn chat_prompt(task: &Task, content: &str) -> String {
    format!("Regarding task {} ({}):\n\n{}", task.id, task.title, content)
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
