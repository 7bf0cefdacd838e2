// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tf_core::ModelConfig;

fn breaker() -> ExecutionBreaker {
    ExecutionBreaker::new(BreakerConfig { threshold: 3, burst_window_ms: 120_000, cooldown_ms: 300_000 })
}

fn model() -> ModelConfig {
    ModelConfig::new("openai", "gpt-m")
}

fn task() -> TaskId {
    TaskId::new("PIFA-1")
}

#[test]
fn opens_at_threshold_within_window() {
    let b = breaker();
    assert!(b.record_failure(&model(), &task(), "429 rate limit", 1_000).is_none());
    assert!(b.record_failure(&model(), &task(), "429 rate limit", 2_000).is_none());
    let open = b.record_failure(&model(), &task(), "429 rate limit", 3_000);
    let open = open.expect("third classified failure should open");
    assert_eq!(open.failure_count, 3);
    assert_eq!(open.opened_at_ms, 3_000);
    assert_eq!(open.retry_at_ms, 303_000);
    assert_eq!(open.category, tf_core::FailureCategory::RateLimit);
}

#[test]
fn opening_is_reported_exactly_once() {
    let b = breaker();
    for i in 0..3 {
        b.record_failure(&model(), &task(), "429 rate limit", 1_000 + i);
    }
    // Further classified failures while open do not re-open
    assert!(b.record_failure(&model(), &task(), "429 rate limit", 5_000).is_none());
    assert!(b.open_for(&model(), 5_000).is_some());
}

#[test]
fn unclassified_errors_are_not_counted() {
    let b = breaker();
    for i in 0..10 {
        assert!(b.record_failure(&model(), &task(), "segfault in provider", i).is_none());
    }
    assert!(b.open_for(&model(), 100).is_none());
}

#[test]
fn failures_outside_burst_window_age_out() {
    let b = breaker();
    b.record_failure(&model(), &task(), "429", 0);
    b.record_failure(&model(), &task(), "429", 1_000);
    // Third failure lands after the first two left the window
    assert!(b.record_failure(&model(), &task(), "429", 200_000).is_none());
    assert!(b.open_for(&model(), 200_000).is_none());
}

#[test]
fn trackers_are_per_provider_model_pair() {
    let b = breaker();
    let other = ModelConfig::new("anthropic", "claude-x");
    for i in 0..3 {
        b.record_failure(&model(), &task(), "429", i);
    }
    assert!(b.open_for(&model(), 10).is_some());
    assert!(b.open_for(&other, 10).is_none());
}

#[test]
fn auto_close_exactly_once_when_cooldown_elapses() {
    let b = breaker();
    for i in 0..3 {
        b.record_failure(&model(), &task(), "429", i);
    }
    // Not yet due
    assert!(b.clear_expired(300_001).is_empty());
    // Due: retry_at = 2 + 300_000
    let closed = b.clear_expired(300_002);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].0, "openai/gpt-m");
    // Second sweep reports nothing
    assert!(b.clear_expired(300_003).is_empty());
    assert!(b.open_for(&model(), 300_003).is_none());
}

#[test]
fn open_for_respects_retry_time() {
    let b = breaker();
    for i in 0..3 {
        b.record_failure(&model(), &task(), "429", i);
    }
    assert!(b.open_for(&model(), 300_001).is_some());
    // At/after retry_at the breaker no longer blocks even before the sweep
    assert!(b.open_for(&model(), 300_002).is_none());
}

#[test]
fn success_resets_burst_window() {
    let b = breaker();
    b.record_failure(&model(), &task(), "429", 0);
    b.record_failure(&model(), &task(), "429", 1);
    b.record_success(&model());
    // Two more failures are not enough after the reset
    assert!(b.record_failure(&model(), &task(), "429", 2).is_none());
    assert!(b.record_failure(&model(), &task(), "429", 3).is_none());
    assert!(b.open_for(&model(), 4).is_none());
}

#[test]
fn clear_all_closes_everything() {
    let b = breaker();
    let other = ModelConfig::new("openai", "gpt-n");
    for i in 0..3 {
        b.record_failure(&model(), &task(), "429", i);
        b.record_failure(&other, &task(), "quota exceeded", i);
    }
    let mut cleared = b.clear_all();
    cleared.sort();
    assert_eq!(cleared, vec!["openai/gpt-m".to_string(), "openai/gpt-n".to_string()]);
    assert!(b.open_keys(10).is_empty());
}

#[test]
fn open_keys_lists_open_trackers() {
    let b = breaker();
    for i in 0..3 {
        b.record_failure(&model(), &task(), "429", i);
    }
    assert_eq!(b.open_keys(10), vec!["openai/gpt-m".to_string()]);
}
