// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution lease file.
//!
//! `<state-dir>/execution-leases.json` holds a map from task id to lease.
//! Writes go through a per-workspace lock so concurrent heartbeats do not
//! race each other.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tf_core::{ExecutionLease, LeaseOwner, TaskId};

use crate::{StoreError, StorePaths};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LeaseFile {
    leases: HashMap<String, ExecutionLease>,
}

/// Reads and writes the per-workspace lease file.
pub struct LeaseStore {
    path: PathBuf,
    owner: LeaseOwner,
    write_lock: Mutex<()>,
}

impl LeaseStore {
    pub fn new(paths: &StorePaths, owner: LeaseOwner) -> Self {
        Self { path: paths.lease_file(), owner, write_lock: Mutex::new(()) }
    }

    pub fn owner(&self) -> &LeaseOwner {
        &self.owner
    }

    /// Write or refresh a lease for this process. `started_at_ms` is
    /// preserved when an entry already exists.
    pub fn upsert(
        &self,
        task_id: &TaskId,
        status: &str,
        now_ms: u64,
    ) -> Result<ExecutionLease, StoreError> {
        let _guard = self.write_lock.lock();

        let mut file = self.read_file()?;
        let started_at_ms = file
            .leases
            .get(task_id.as_str())
            .map(|lease| lease.started_at_ms)
            .unwrap_or(now_ms);
        let lease = ExecutionLease {
            owner_id: self.owner.clone(),
            started_at_ms,
            last_heartbeat_at_ms: now_ms,
            status: status.to_string(),
        };
        file.leases.insert(task_id.0.clone(), lease.clone());
        self.write_file(&file)?;
        Ok(lease)
    }

    /// Heartbeat is a plain upsert.
    pub fn heartbeat(&self, task_id: &TaskId, status: &str, now_ms: u64) -> Result<(), StoreError> {
        self.upsert(task_id, status, now_ms).map(|_| ())
    }

    /// Remove a lease entry.
    pub fn clear(&self, task_id: &TaskId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();

        let mut file = self.read_file()?;
        if file.leases.remove(task_id.as_str()).is_some() {
            self.write_file(&file)?;
        }
        Ok(())
    }

    /// All current lease entries.
    pub fn read(&self) -> Result<HashMap<TaskId, ExecutionLease>, StoreError> {
        let file = self.read_file()?;
        Ok(file.leases.into_iter().map(|(id, lease)| (TaskId::new(id), lease)).collect())
    }

    fn read_file(&self) -> Result<LeaseFile, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LeaseFile::default()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        match serde_json::from_str(&raw) {
            Ok(file) => Ok(file),
            Err(e) => {
                // A corrupt lease file only costs orphan detection accuracy;
                // start over rather than wedging the queue.
                tracing::warn!(path = %self.path.display(), error = %e, "resetting corrupt lease file");
                Ok(LeaseFile::default())
            }
        }
    }

    fn write_file(&self, file: &LeaseFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let raw = serde_json::to_string_pretty(file)
            .map_err(|e| StoreError::frontmatter(&self.path, e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "leases_tests.rs"]
mod tests;
