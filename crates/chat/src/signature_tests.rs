// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
const NOW: i64 = 1_700_000_000;

#[test]
fn accepts_a_correctly_signed_request() {
    let body = br#"{"type":"event_callback"}"#;
    let sig = sign(SECRET, NOW, body);
    assert_eq!(verify(SECRET, &NOW.to_string(), body, &sig, NOW), Ok(()));
}

#[test]
fn accepts_within_the_skew_window() {
    let body = b"{}";
    let sig = sign(SECRET, NOW, body);
    assert_eq!(verify(SECRET, &NOW.to_string(), body, &sig, NOW + MAX_SKEW_SECS), Ok(()));
}

#[test]
fn rejects_a_stale_timestamp() {
    let body = b"{}";
    let sig = sign(SECRET, NOW, body);
    assert_eq!(
        verify(SECRET, &NOW.to_string(), body, &sig, NOW + MAX_SKEW_SECS + 1),
        Err(SignatureError::StaleTimestamp),
    );
}

#[test]
fn rejects_a_tampered_body() {
    let sig = sign(SECRET, NOW, b"{}");
    assert_eq!(
        verify(SECRET, &NOW.to_string(), b"{ }", &sig, NOW),
        Err(SignatureError::Mismatch),
    );
}

#[test]
fn rejects_the_wrong_secret() {
    let body = b"{}";
    let sig = sign("other-secret", NOW, body);
    assert_eq!(verify(SECRET, &NOW.to_string(), body, &sig, NOW), Err(SignatureError::Mismatch));
}

#[test]
fn rejects_malformed_headers() {
    let body = b"{}";
    let sig = sign(SECRET, NOW, body);
    assert_eq!(
        verify(SECRET, "not-a-number", body, &sig, NOW),
        Err(SignatureError::BadTimestamp),
    );
    assert_eq!(
        verify(SECRET, &NOW.to_string(), body, "v1=abcd", NOW),
        Err(SignatureError::MalformedSignature),
    );
    assert_eq!(
        verify(SECRET, &NOW.to_string(), body, "v0=zzzz", NOW),
        Err(SignatureError::MalformedSignature),
    );
}
