// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace registry.
//!
//! `<home>/<app-dir>/workspaces.json` holds the array of registered
//! workspaces the daemon drives.

use std::path::{Path, PathBuf};
use tf_core::Workspace;

use crate::paths::DEFAULT_APP_DIR;
use crate::StoreError;

/// Conventional registry location under a home directory.
pub fn registry_path(home: &Path) -> PathBuf {
    home.join(DEFAULT_APP_DIR).join("workspaces.json")
}

/// Load the workspace registry; a missing file is an empty registry.
pub fn load_workspaces(path: &Path) -> Result<Vec<Workspace>, StoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_str(&raw)
        .map_err(|e| StoreError::Registry { path: path.display().to_string(), source: e })
}

/// Persist the workspace registry.
pub fn save_workspaces(path: &Path, workspaces: &[Workspace]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let raw = serde_json::to_string_pretty(workspaces)
        .map_err(|e| StoreError::Registry { path: path.display().to_string(), source: e })?;
    std::fs::write(path, raw).map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
