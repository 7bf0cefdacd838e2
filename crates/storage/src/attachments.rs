// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attachment files.
//!
//! External files are copied into `<task-dir>/attachments/<id><ext>`; the
//! on-disk name is never user-controlled. Display names live in the task
//! frontmatter. If the frontmatter write fails after the copy, the copy is
//! removed so disk and frontmatter stay consistent.

use std::path::Path;
use tf_core::{AttachmentId, AttachmentMeta, Clock, TaskId};

use crate::tasks::TaskStore;
use crate::StoreError;

/// MIME type inferred from a file extension.
///
/// Falls back to `application/octet-stream` for anything unrecognized.
pub(crate) fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Copies attachments into task directories and keeps the frontmatter
/// attachment list in sync.
pub struct AttachmentStore<'a, C: Clock> {
    store: &'a TaskStore<C>,
}

impl<'a, C: Clock> AttachmentStore<'a, C> {
    pub fn new(store: &'a TaskStore<C>) -> Self {
        Self { store }
    }

    /// Copy `source` into the task's attachment directory and record it in
    /// the frontmatter. The stored filename is `{attachment_id}{ext}`.
    pub fn attach(
        &self,
        task_id: &TaskId,
        source: &Path,
        filename_override: Option<&str>,
    ) -> Result<AttachmentMeta, StoreError> {
        let metadata = std::fs::metadata(source).map_err(|e| StoreError::io(source, e))?;

        let filename = match filename_override {
            Some(name) => name.to_string(),
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string()),
        };
        let ext = Path::new(&filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let id = AttachmentId::new();
        let stored_name = format!("{id}{ext}");
        let meta = AttachmentMeta {
            id,
            filename,
            stored_name: stored_name.clone(),
            mime_type: mime_for_extension(ext.trim_start_matches('.')).to_string(),
            size: metadata.len(),
            created_at: self.store.clock().now_utc(),
        };

        let dir = self.store.paths().attachments_dir(task_id.as_str());
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let dest = dir.join(&stored_name);
        std::fs::copy(source, &dest).map_err(|e| StoreError::io(&dest, e))?;

        let recorded = meta.clone();
        let result = self.store.update(task_id, move |task| task.attachments.push(recorded));
        if let Err(e) = result {
            // Frontmatter write failed: roll the copy back.
            if let Err(cleanup) = std::fs::remove_file(&dest) {
                tracing::warn!(path = %dest.display(), error = %cleanup, "failed to remove orphaned attachment copy");
            }
            return Err(e);
        }
        Ok(meta)
    }

    /// Remove an attachment's file and frontmatter entry.
    pub fn delete(&self, task_id: &TaskId, attachment_id: &AttachmentId) -> Result<(), StoreError> {
        let task = self.store.read(task_id)?;
        let meta = task
            .attachments
            .iter()
            .find(|a| a.id == *attachment_id)
            .cloned()
            .ok_or_else(|| StoreError::AttachmentNotFound(attachment_id.to_string()))?;

        let wanted = *attachment_id;
        self.store.update(task_id, move |task| task.attachments.retain(|a| a.id != wanted))?;

        let path = self.store.paths().attachments_dir(task_id.as_str()).join(&meta.stored_name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Read an attachment's bytes (used to inline images into prompts).
    pub fn load(&self, task_id: &TaskId, meta: &AttachmentMeta) -> Result<Vec<u8>, StoreError> {
        let path = self.store.paths().attachments_dir(task_id.as_str()).join(&meta.stored_name);
        std::fs::read(&path).map_err(|e| StoreError::io(&path, e))
    }

    /// Absolute path of an attachment (referenced in prompt text for
    /// non-image files so the agent can read them itself).
    pub fn path_of(&self, task_id: &TaskId, meta: &AttachmentMeta) -> std::path::PathBuf {
        self.store.paths().attachments_dir(task_id.as_str()).join(&meta.stored_name)
    }
}

#[cfg(test)]
#[path = "attachments_tests.rs"]
mod tests;
