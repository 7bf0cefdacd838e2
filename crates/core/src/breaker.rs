// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider failure classification.
//!
//! Only classified failures count toward the execution breaker; anything
//! unrecognized is treated as non-retryable and never opens a breaker.

use serde::{Deserialize, Serialize};

/// Category of a retryable provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Invalid or expired credentials.
    Auth,
    /// Quota exhausted or billing problem.
    Quota,
    /// Rate limited or provider overloaded.
    RateLimit,
}

crate::simple_display! {
    FailureCategory {
        Auth => "auth",
        Quota => "quota",
        RateLimit => "rate_limit",
    }
}

const AUTH_MARKERS: &[&str] =
    &["auth", "unauthorized", "forbidden", "invalid api key", "credential", "login"];

const QUOTA_MARKERS: &[&str] =
    &["quota", "insufficient quota", "billing", "credits", "payment required"];

const RATE_LIMIT_MARKERS: &[&str] =
    &["429", "rate limit", "too many requests", "overloaded", "retry delay"];

/// Classify a provider error message by substring match (case-insensitive).
///
/// Returns `None` for anything unrecognized; such errors are surfaced but
/// never counted by the breaker.
pub fn classify_provider_error(message: &str) -> Option<FailureCategory> {
    let lower = message.to_lowercase();
    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(FailureCategory::Auth);
    }
    if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(FailureCategory::Quota);
    }
    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(FailureCategory::RateLimit);
    }
    None
}

/// Whether a provider error message is worth retrying on a fallback model.
pub fn is_retryable(message: &str) -> bool {
    classify_provider_error(message).is_some()
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
