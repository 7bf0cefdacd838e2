// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only activity journal.
//!
//! One JSONL file per workspace: one serde_json record per line, appended
//! under a per-workspace write lock. Entries are never rewritten or
//! reordered. Readers return newest-first views and skip malformed lines,
//! so a torn tail from a crashed writer never fails a read.

use parking_lot::Mutex;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use tf_core::{ActivityEntry, TaskId};

use crate::{StoreError, StorePaths};

/// Append-only journal for one workspace.
pub struct ActivityLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ActivityLog {
    pub fn new(paths: &StorePaths) -> Self {
        Self { path: paths.activity_file(), write_lock: Mutex::new(()) }
    }

    /// Durably append one entry.
    pub fn append(&self, entry: &ActivityEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let line = serde_json::to_string(entry)
            .map_err(|e| StoreError::frontmatter(&self.path, e.to_string()))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;

        // A crashed writer can leave a torn, unterminated tail. Close it off
        // so the new record starts on its own line; the torn line is skipped
        // on read.
        if !ends_with_newline(&mut file).map_err(|e| StoreError::io(&self.path, e))? {
            file.write_all(b"\n").map_err(|e| StoreError::io(&self.path, e))?;
        }

        file.write_all(line.as_bytes()).map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(b"\n").map_err(|e| StoreError::io(&self.path, e))?;
        file.flush().map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    /// All entries, newest first.
    pub fn read_all(&self) -> Result<Vec<ActivityEntry>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let mut entries = Vec::new();
        for (number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ActivityEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = number + 1,
                        error = %e,
                        "skipping malformed journal line"
                    );
                }
            }
        }
        entries.reverse();
        Ok(entries)
    }

    /// Entries for one task, newest first.
    pub fn read_for_task(&self, task_id: &TaskId) -> Result<Vec<ActivityEntry>, StoreError> {
        Ok(self.read_all()?.into_iter().filter(|e| e.task_id() == task_id).collect())
    }

    /// Page through the newest-first view. `cursor` is an offset from the
    /// newest entry; returns the page and the next cursor, if any.
    pub fn read_stream(
        &self,
        cursor: usize,
        limit: usize,
    ) -> Result<(Vec<ActivityEntry>, Option<usize>), StoreError> {
        let all = self.read_all()?;
        if cursor >= all.len() || limit == 0 {
            return Ok((Vec::new(), None));
        }
        let end = (cursor + limit).min(all.len());
        let page = all[cursor..end].to_vec();
        let next = if end < all.len() { Some(end) } else { None };
        Ok((page, next))
    }
}

fn ends_with_newline(file: &mut std::fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
