// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn headers_with(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(v) = value.parse() {
        headers.insert("authorization", v);
    }
    headers
}

#[test]
fn no_configured_token_allows_everything() {
    assert!(validate_bearer(&HeaderMap::new(), None).is_ok());
    assert!(validate_bearer(&headers_with("Bearer whatever"), None).is_ok());
}

#[test]
fn matching_bearer_token_passes() {
    assert!(validate_bearer(&headers_with("Bearer s3cret"), Some("s3cret")).is_ok());
}

#[test]
fn missing_header_is_rejected() {
    let err = validate_bearer(&HeaderMap::new(), Some("s3cret")).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

#[test]
fn wrong_token_is_rejected() {
    assert!(validate_bearer(&headers_with("Bearer nope"), Some("s3cret")).is_err());
    // Same length, different content.
    assert!(validate_bearer(&headers_with("Bearer s3creX"), Some("s3cret")).is_err());
}

#[test]
fn non_bearer_scheme_is_rejected() {
    assert!(validate_bearer(&headers_with("Basic s3cret"), Some("s3cret")).is_err());
    assert!(validate_bearer(&headers_with("s3cret"), Some("s3cret")).is_err());
}

#[test]
fn constant_time_eq_semantics() {
    assert!(constant_time_eq("", ""));
    assert!(constant_time_eq("abc", "abc"));
    assert!(!constant_time_eq("abc", "abd"));
    assert!(!constant_time_eq("abc", "abcd"));
}
