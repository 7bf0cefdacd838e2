// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identity and registry record.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_string_id! {
    /// Identifier for a registered workspace.
    pub struct WorkspaceId;
}

/// One entry in the workspace registry file.
///
/// A workspace is a local repository the orchestrator runs agents against;
/// it holds its own tasks, activity journal, attachments, leases, and
/// settings under its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub path: PathBuf,
    pub name: String,
}

impl Workspace {
    pub fn new(id: impl Into<WorkspaceId>, path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { id: id.into(), path: path.into(), name: name.into() }
    }
}
