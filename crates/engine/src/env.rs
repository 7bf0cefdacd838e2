// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine.

use std::time::Duration;
use tf_core::{heartbeat_interval_ms, DEFAULT_LEASE_TTL_MS};

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok())
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|s| s.parse::<u32>().ok())
}

/// Execution breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Classified failures within the burst window before opening.
    pub threshold: u32,
    /// Sliding window for counting classified failures.
    pub burst_window_ms: u64,
    /// How long an open breaker blocks dispatch.
    pub cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { threshold: 3, burst_window_ms: 120_000, cooldown_ms: 300_000 }
    }
}

impl BreakerConfig {
    /// `TF_EXECUTION_BREAKER_THRESHOLD`, `TF_EXECUTION_BREAKER_BURST_WINDOW_MS`,
    /// `TF_EXECUTION_BREAKER_COOLDOWN_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            threshold: env_u32("TF_EXECUTION_BREAKER_THRESHOLD").unwrap_or(defaults.threshold),
            burst_window_ms: env_u64("TF_EXECUTION_BREAKER_BURST_WINDOW_MS")
                .unwrap_or(defaults.burst_window_ms),
            cooldown_ms: env_u64("TF_EXECUTION_BREAKER_COOLDOWN_MS")
                .unwrap_or(defaults.cooldown_ms),
        }
    }
}

/// Execution lease tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseConfig {
    pub ttl_ms: u64,
    pub heartbeat_ms: u64,
    pub enabled: bool,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_LEASE_TTL_MS,
            heartbeat_ms: heartbeat_interval_ms(DEFAULT_LEASE_TTL_MS),
            enabled: true,
        }
    }
}

impl LeaseConfig {
    /// `TF_EXECUTION_LEASE_TTL_MS`, `TF_EXECUTION_LEASE_HEARTBEAT_MS`,
    /// `TF_EXECUTION_LEASES_ENABLED`.
    pub fn from_env() -> Self {
        let ttl_ms = env_u64("TF_EXECUTION_LEASE_TTL_MS").unwrap_or(DEFAULT_LEASE_TTL_MS);
        Self {
            ttl_ms,
            heartbeat_ms: env_u64("TF_EXECUTION_LEASE_HEARTBEAT_MS")
                .unwrap_or_else(|| heartbeat_interval_ms(ttl_ms)),
            enabled: std::env::var("TF_EXECUTION_LEASES_ENABLED")
                .map(|v| v != "0")
                .unwrap_or(true),
        }
    }
}

/// Safety poll cadence for the queue manager (`TF_QUEUE_POLL_MS`, default 30 s).
pub fn queue_poll_interval() -> Duration {
    env_u64("TF_QUEUE_POLL_MS").map(Duration::from_millis).unwrap_or(Duration::from_secs(30))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
