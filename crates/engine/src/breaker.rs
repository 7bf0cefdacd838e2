// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per (provider, model) execution breaker.
//!
//! Classified provider failures accumulate in a sliding burst window; at the
//! threshold the breaker opens and blocks dispatch to that model until the
//! cooldown elapses or an operator resumes the queue. State is in-memory
//! only and lives for the process lifetime.

use parking_lot::Mutex;
use std::collections::HashMap;
use tf_core::{classify_provider_error, FailureCategory, ModelConfig, TaskId};

use crate::env::BreakerConfig;

/// Record of an open breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBreaker {
    pub category: FailureCategory,
    pub opened_at_ms: u64,
    pub retry_at_ms: u64,
    pub failure_count: u32,
    pub error_message: String,
    /// Task whose failure tripped the breaker (for timeline attribution).
    pub task_id: TaskId,
}

#[derive(Debug, Default)]
struct Tracker {
    /// Timestamps of classified failures inside the burst window.
    failures: Vec<u64>,
    open: Option<OpenBreaker>,
}

/// Tracks failing provider/model pairs for one workspace.
pub struct ExecutionBreaker {
    config: BreakerConfig,
    trackers: Mutex<HashMap<String, Tracker>>,
}

impl ExecutionBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self { config, trackers: Mutex::new(HashMap::new()) }
    }

    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    /// Record a provider failure for a model. Unclassified errors are not
    /// counted. Returns the open record iff this failure newly opened the
    /// breaker (exactly once per opening).
    pub fn record_failure(
        &self,
        model: &ModelConfig,
        task_id: &TaskId,
        message: &str,
        now_ms: u64,
    ) -> Option<OpenBreaker> {
        let category = classify_provider_error(message)?;
        let key = model.key();
        let mut trackers = self.trackers.lock();
        let tracker = trackers.entry(key.clone()).or_default();

        tracker.failures.push(now_ms);
        let window_start = now_ms.saturating_sub(self.config.burst_window_ms);
        tracker.failures.retain(|&t| t >= window_start);

        if tracker.open.is_some() {
            return None;
        }
        let failure_count = tracker.failures.len() as u32;
        if failure_count < self.config.threshold {
            return None;
        }

        let open = OpenBreaker {
            category,
            opened_at_ms: now_ms,
            retry_at_ms: now_ms + self.config.cooldown_ms,
            failure_count,
            error_message: message.to_string(),
            task_id: task_id.clone(),
        };
        tracker.open = Some(open.clone());
        tracing::warn!(model = key.as_str(), category = %category, "execution breaker opened");
        Some(open)
    }

    /// A successful completion resets the model's burst window.
    pub fn record_success(&self, model: &ModelConfig) {
        let mut trackers = self.trackers.lock();
        if let Some(tracker) = trackers.get_mut(&model.key()) {
            tracker.failures.clear();
        }
    }

    /// The open record blocking this model, if any (cooldown not yet elapsed).
    pub fn open_for(&self, model: &ModelConfig, now_ms: u64) -> Option<OpenBreaker> {
        let trackers = self.trackers.lock();
        trackers
            .get(&model.key())
            .and_then(|t| t.open.as_ref())
            .filter(|open| open.retry_at_ms > now_ms)
            .cloned()
    }

    /// Auto-close breakers whose cooldown has elapsed. Returns the closed
    /// records (exactly once per closing) keyed by model.
    pub fn clear_expired(&self, now_ms: u64) -> Vec<(String, OpenBreaker)> {
        let mut trackers = self.trackers.lock();
        let mut closed = Vec::new();
        for (key, tracker) in trackers.iter_mut() {
            let expired = tracker.open.as_ref().is_some_and(|open| open.retry_at_ms <= now_ms);
            if expired {
                if let Some(open) = tracker.open.take() {
                    tracker.failures.clear();
                    tracing::info!(model = key.as_str(), "execution breaker auto-closed");
                    closed.push((key.clone(), open));
                }
            }
        }
        closed
    }

    /// Operator resume: clear every open breaker and burst window.
    pub fn clear_all(&self) -> Vec<String> {
        let mut trackers = self.trackers.lock();
        let mut cleared = Vec::new();
        for (key, tracker) in trackers.iter_mut() {
            tracker.failures.clear();
            if tracker.open.take().is_some() {
                cleared.push(key.clone());
            }
        }
        cleared
    }

    /// Keys of currently-open breakers.
    pub fn open_keys(&self, now_ms: u64) -> Vec<String> {
        let trackers = self.trackers.lock();
        let mut keys: Vec<String> = trackers
            .iter()
            .filter(|(_, t)| t.open.as_ref().is_some_and(|o| o.retry_at_ms > now_ms))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
