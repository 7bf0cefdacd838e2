// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    unauthorized = { "401 Unauthorized", FailureCategory::Auth },
    forbidden = { "request forbidden by policy", FailureCategory::Auth },
    bad_key = { "Invalid API key provided", FailureCategory::Auth },
    credential = { "credential has expired, please login again", FailureCategory::Auth },
    quota = { "insufficient quota for this request", FailureCategory::Quota },
    billing = { "billing hard limit reached", FailureCategory::Quota },
    credits = { "you are out of credits", FailureCategory::Quota },
    payment = { "402 Payment Required", FailureCategory::Quota },
    status_429 = { "HTTP 429 from upstream", FailureCategory::RateLimit },
    rate_limit = { "Rate limit exceeded, slow down", FailureCategory::RateLimit },
    too_many = { "too many requests", FailureCategory::RateLimit },
    overloaded = { "the model is overloaded", FailureCategory::RateLimit },
    retry_delay = { "retry delay of 20s suggested", FailureCategory::RateLimit },
)]
fn classifies_known_failures(message: &str, expected: FailureCategory) {
    assert_eq!(classify_provider_error(message), Some(expected));
}

#[parameterized(
    timeout = { "connection timed out" },
    parse = { "failed to parse response body" },
    internal = { "500 internal server error" },
    empty = { "" },
)]
fn unrecognized_errors_are_not_classified(message: &str) {
    assert_eq!(classify_provider_error(message), None);
    assert!(!is_retryable(message));
}

#[test]
fn classification_is_case_insensitive() {
    assert_eq!(classify_provider_error("RATE LIMIT"), Some(FailureCategory::RateLimit));
    assert_eq!(classify_provider_error("UNAUTHORIZED"), Some(FailureCategory::Auth));
}

#[test]
fn auth_wins_over_later_categories_on_overlap() {
    // "unauthorized ... rate limit" matches both lists; auth is checked first
    let msg = "unauthorized: upstream also reported a rate limit";
    assert_eq!(classify_provider_error(msg), Some(FailureCategory::Auth));
}

#[test]
fn category_display_matches_wire_names() {
    assert_eq!(FailureCategory::Auth.to_string(), "auth");
    assert_eq!(FailureCategory::Quota.to_string(), "quota");
    assert_eq!(FailureCategory::RateLimit.to_string(), "rate_limit");
}
