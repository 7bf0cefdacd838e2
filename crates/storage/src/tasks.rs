// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed task store.
//!
//! One directory per task under the workspace tasks dir, holding `task.md`
//! and an `attachments/` subdirectory. All writes are whole-file
//! replacements (write-temp + rename) serialized by a per-task mutex.
//! Readers may race writers and discard unparseable files.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tf_core::{
    ActivityEntry, Clock, EntryMeta, PlanningStatus, SystemEventKind, Task, TaskId, TaskPhase,
};

use crate::frontmatter::TaskDocument;
use crate::{ActivityLog, StoreError, StorePaths};

/// Persists tasks as Markdown files with YAML frontmatter.
pub struct TaskStore<C: Clock> {
    paths: StorePaths,
    clock: C,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<C: Clock> TaskStore<C> {
    pub fn new(paths: StorePaths, clock: C) -> Self {
        Self { paths, clock, locks: Mutex::new(HashMap::new()) }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn lock_for(&self, task_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(task_id.to_string()).or_default().clone()
    }

    pub fn exists(&self, task_id: &TaskId) -> bool {
        self.paths.task_file(task_id.as_str()).is_file()
    }

    /// Create a new task file. The task is placed at the end of its phase's
    /// order. Fails if the id is already taken.
    pub fn create(&self, mut document: TaskDocument) -> Result<Task, StoreError> {
        let task_id = document.task.id.clone();
        let lock = self.lock_for(task_id.as_str());
        let _guard = lock.lock();

        if self.exists(&task_id) {
            return Err(StoreError::TaskExists(task_id));
        }
        document.task.order = self.next_order(document.task.phase)?;
        self.write_document(&document)?;
        Ok(document.task)
    }

    /// Enumerate every parseable task in the workspace.
    ///
    /// Files that fail to parse are skipped with a warning — a torn read of
    /// an in-flight write must not fail the listing.
    pub fn list(&self) -> Result<Vec<Task>, StoreError> {
        let entries = match std::fs::read_dir(&self.paths.tasks_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.paths.tasks_dir, e)),
        };

        let mut tasks = Vec::new();
        for entry in entries.flatten() {
            let file = entry.path().join("task.md");
            if !file.is_file() {
                continue;
            }
            match self.read_file(&file) {
                Ok(document) => tasks.push(document.task),
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "skipping unparseable task file");
                }
            }
        }
        Ok(tasks)
    }

    /// Tasks in one phase, order ascending, newer-created-first on ties.
    pub fn list_phase(&self, phase: TaskPhase) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> =
            self.list()?.into_iter().filter(|t| t.phase == phase).collect();
        tasks.sort_by(|a, b| a.order.cmp(&b.order).then(b.created.cmp(&a.created)));
        Ok(tasks)
    }

    pub fn read(&self, task_id: &TaskId) -> Result<Task, StoreError> {
        Ok(self.read_document(task_id)?.task)
    }

    pub fn read_document(&self, task_id: &TaskId) -> Result<TaskDocument, StoreError> {
        let path = self.paths.task_file(task_id.as_str());
        if !path.is_file() {
            return Err(StoreError::TaskNotFound(task_id.clone()));
        }
        self.read_file(&path)
    }

    /// Apply a frontmatter patch under the task's lock and persist.
    pub fn update(
        &self,
        task_id: &TaskId,
        patch: impl FnOnce(&mut Task),
    ) -> Result<Task, StoreError> {
        self.update_document(task_id, |document| patch(&mut document.task))
    }

    /// Apply a patch to the whole document (frontmatter + body) under the
    /// task's lock and persist.
    pub fn update_document(
        &self,
        task_id: &TaskId,
        patch: impl FnOnce(&mut TaskDocument),
    ) -> Result<Task, StoreError> {
        let lock = self.lock_for(task_id.as_str());
        let _guard = lock.lock();

        let mut document = self.read_document(task_id)?;
        patch(&mut document);
        document.task.touch(&self.clock);
        self.write_document(&document)?;
        Ok(document.task)
    }

    /// Append a Markdown section to the task body.
    pub fn append_body(&self, task_id: &TaskId, section: &str) -> Result<Task, StoreError> {
        self.update_document(task_id, |document| {
            if !document.body.is_empty() && !document.body.ends_with('\n') {
                document.body.push('\n');
            }
            if !document.body.is_empty() {
                document.body.push('\n');
            }
            document.body.push_str(section);
        })
    }

    /// Move a task to another phase, appending it at the receiving end of
    /// the order and recording the transition on the activity timeline.
    pub fn move_task(
        &self,
        task_id: &TaskId,
        to: TaskPhase,
        reason: &str,
        activity: &ActivityLog,
    ) -> Result<(Task, TaskPhase), StoreError> {
        let next_order = self.next_order(to)?;
        let now = self.clock.now_utc();
        let mut from = to;
        let task = self.update(task_id, |task| {
            from = task.phase;
            task.phase = to;
            task.order = next_order;
            match to {
                TaskPhase::Executing => task.started = Some(now),
                TaskPhase::Complete => task.completed = Some(now),
                _ => {}
            }
        })?;

        let message = if reason.is_empty() {
            format!("Moved from {from} to {to}")
        } else {
            reason.to_string()
        };
        activity.append(&ActivityEntry::SystemEvent {
            meta: EntryMeta::new(task_id.clone(), now),
            kind: SystemEventKind::PhaseChange,
            message,
            data: Some(serde_json::json!({ "from": from.to_string(), "to": to.to_string() })),
        })?;

        tracing::info!(task = task_id.as_str(), %from, %to, "task moved");
        Ok((task, from))
    }

    /// Reassign order within a phase to match the given permutation.
    ///
    /// Refuses a list that is not exactly the phase's current member set.
    pub fn reorder(&self, phase: TaskPhase, ids: &[TaskId]) -> Result<(), StoreError> {
        let current: HashSet<String> = self
            .list()?
            .into_iter()
            .filter(|t| t.phase == phase)
            .map(|t| t.id.0)
            .collect();
        let given: HashSet<String> = ids.iter().map(|id| id.0.clone()).collect();
        if current != given || given.len() != ids.len() {
            return Err(StoreError::InvalidReorder { phase: phase.to_string() });
        }

        for (position, id) in ids.iter().enumerate() {
            self.update(id, |task| task.order = position as u32)?;
        }
        Ok(())
    }

    /// Delete the task file and its attachments directory.
    pub fn delete(&self, task_id: &TaskId) -> Result<(), StoreError> {
        let lock = self.lock_for(task_id.as_str());
        let _guard = lock.lock();

        let dir = self.paths.task_dir(task_id.as_str());
        if !dir.is_dir() {
            return Err(StoreError::TaskNotFound(task_id.clone()));
        }
        std::fs::remove_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(())
    }

    fn next_order(&self, phase: TaskPhase) -> Result<u32, StoreError> {
        let max = self
            .list()?
            .into_iter()
            .filter(|t| t.phase == phase)
            .map(|t| t.order)
            .max();
        Ok(max.map(|m| m + 1).unwrap_or(0))
    }

    fn read_file(&self, path: &Path) -> Result<TaskDocument, StoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        TaskDocument::parse(path, &raw)
    }

    fn write_document(&self, document: &TaskDocument) -> Result<(), StoreError> {
        if document.task.planning_status == PlanningStatus::Running && document.task.plan.is_some()
        {
            return Err(StoreError::PlanDuringPlanning(document.task.id.clone()));
        }

        let path = self.paths.task_file(document.task.id.as_str());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let rendered = document.render(&path)?;

        // Whole-file replacement: write a sibling temp file, then rename
        // over the target so readers never observe a half-written file.
        let tmp = path.with_extension("md.tmp");
        std::fs::write(&tmp, rendered).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
