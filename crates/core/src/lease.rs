// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution lease records.
//!
//! A lease marks a task as executing under a specific process so that a
//! restarted orchestrator can tell live work from orphans. Leases are
//! heartbeated while the session is alive and expire after a TTL.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default lease TTL in milliseconds.
pub const DEFAULT_LEASE_TTL_MS: u64 = 120_000;

/// Minimum heartbeat cadence in milliseconds.
pub const MIN_HEARTBEAT_MS: u64 = 5_000;

/// Heartbeat cadence for a given TTL: `max(5s, TTL/3)`.
pub fn heartbeat_interval_ms(ttl_ms: u64) -> u64 {
    MIN_HEARTBEAT_MS.max(ttl_ms / 3)
}

/// Identity of the process holding a lease.
///
/// Serializes as a string using Display format:
/// `"host:pid:startup-nonce:started_at_ms"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaseOwner {
    pub host: String,
    pub pid: u32,
    /// Random nonce minted once per process startup, so a recycled pid on
    /// the same host still reads as a different owner.
    pub nonce: String,
    pub started_at_ms: u64,
}

impl LeaseOwner {
    pub fn new(host: impl Into<String>, pid: u32, nonce: impl Into<String>, started_at_ms: u64) -> Self {
        Self { host: host.into(), pid, nonce: nonce.into(), started_at_ms }
    }

    /// Parse from Display format.
    pub fn parse(s: &str) -> Result<Self, InvalidLeaseOwner> {
        let mut parts = s.splitn(4, ':');
        let host = parts.next().filter(|p| !p.is_empty());
        let pid = parts.next().and_then(|p| p.parse::<u32>().ok());
        let nonce = parts.next().filter(|p| !p.is_empty());
        let started = parts.next().and_then(|p| p.parse::<u64>().ok());
        match (host, pid, nonce, started) {
            (Some(host), Some(pid), Some(nonce), Some(started_at_ms)) => Ok(Self {
                host: host.to_string(),
                pid,
                nonce: nonce.to_string(),
                started_at_ms,
            }),
            _ => Err(InvalidLeaseOwner(s.to_string())),
        }
    }
}

impl fmt::Display for LeaseOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.host, self.pid, self.nonce, self.started_at_ms)
    }
}

impl serde::Serialize for LeaseOwner {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for LeaseOwner {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LeaseOwner::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Malformed lease owner string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid lease owner: {0}")]
pub struct InvalidLeaseOwner(pub String);

/// One lease entry in the per-workspace lease file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLease {
    pub owner_id: LeaseOwner,
    pub started_at_ms: u64,
    pub last_heartbeat_at_ms: u64,
    pub status: String,
}

impl ExecutionLease {
    /// A lease is fresh iff `now − last_heartbeat_at ≤ TTL`.
    pub fn is_fresh(&self, now_ms: u64, ttl_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_heartbeat_at_ms) <= ttl_ms
    }

    /// Whether this lease is held by the given owner (exact identity match).
    pub fn held_by(&self, owner: &LeaseOwner) -> bool {
        &self.owner_id == owner
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
