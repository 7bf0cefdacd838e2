// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    for name in [
        "TF_EXECUTION_BREAKER_THRESHOLD",
        "TF_EXECUTION_BREAKER_BURST_WINDOW_MS",
        "TF_EXECUTION_BREAKER_COOLDOWN_MS",
        "TF_EXECUTION_LEASE_TTL_MS",
        "TF_EXECUTION_LEASE_HEARTBEAT_MS",
        "TF_EXECUTION_LEASES_ENABLED",
        "TF_QUEUE_POLL_MS",
    ] {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn breaker_defaults() {
    clear_env();
    let config = BreakerConfig::from_env();
    assert_eq!(config.threshold, 3);
    assert_eq!(config.burst_window_ms, 120_000);
    assert_eq!(config.cooldown_ms, 300_000);
}

#[test]
#[serial]
fn breaker_env_overrides() {
    clear_env();
    std::env::set_var("TF_EXECUTION_BREAKER_THRESHOLD", "5");
    std::env::set_var("TF_EXECUTION_BREAKER_COOLDOWN_MS", "1000");
    let config = BreakerConfig::from_env();
    assert_eq!(config.threshold, 5);
    assert_eq!(config.cooldown_ms, 1_000);
    assert_eq!(config.burst_window_ms, 120_000);
    clear_env();
}

#[test]
#[serial]
fn lease_defaults_derive_heartbeat_from_ttl() {
    clear_env();
    let config = LeaseConfig::from_env();
    assert_eq!(config.ttl_ms, 120_000);
    assert_eq!(config.heartbeat_ms, 40_000);
    assert!(config.enabled);
}

#[test]
#[serial]
fn lease_heartbeat_floors_for_small_ttl() {
    clear_env();
    std::env::set_var("TF_EXECUTION_LEASE_TTL_MS", "6000");
    let config = LeaseConfig::from_env();
    assert_eq!(config.heartbeat_ms, 5_000);
    clear_env();
}

#[test]
#[serial]
fn leases_can_be_disabled() {
    clear_env();
    std::env::set_var("TF_EXECUTION_LEASES_ENABLED", "0");
    assert!(!LeaseConfig::from_env().enabled);
    clear_env();
}

#[test]
#[serial]
fn invalid_values_fall_back_to_defaults() {
    clear_env();
    std::env::set_var("TF_EXECUTION_BREAKER_THRESHOLD", "not-a-number");
    assert_eq!(BreakerConfig::from_env().threshold, 3);
    clear_env();
}

#[test]
#[serial]
fn queue_poll_interval_default_and_override() {
    clear_env();
    assert_eq!(queue_poll_interval(), Duration::from_secs(30));
    std::env::set_var("TF_QUEUE_POLL_MS", "500");
    assert_eq!(queue_poll_interval(), Duration::from_millis(500));
    clear_env();
}
