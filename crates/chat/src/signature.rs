// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook signature verification.
//!
//! The platform signs `v0:{timestamp}:{raw body}` with HMAC-SHA256 under the
//! signing secret and sends `v0={hex}`. Comparison is constant-time and the
//! timestamp must be within the skew window, or a captured request could be
//! replayed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const VERSION: &str = "v0";

/// Maximum accepted clock skew between the platform and us.
pub const MAX_SKEW_SECS: i64 = 5 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("timestamp header is not an integer")]
    BadTimestamp,

    #[error("timestamp outside the accepted window")]
    StaleTimestamp,

    #[error("signature header is malformed")]
    MalformedSignature,

    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a webhook request. `now_epoch` is injected so callers can use
/// their clock (and tests a fake one).
pub fn verify(
    secret: &str,
    timestamp_header: &str,
    body: &[u8],
    signature_header: &str,
    now_epoch: i64,
) -> Result<(), SignatureError> {
    let timestamp: i64 =
        timestamp_header.trim().parse().map_err(|_| SignatureError::BadTimestamp)?;
    if (now_epoch - timestamp).abs() > MAX_SKEW_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    let hex_sig = signature_header
        .strip_prefix(VERSION)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or(SignatureError::MalformedSignature)?;
    let expected = hex::decode(hex_sig).map_err(|_| SignatureError::MalformedSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::MalformedSignature)?;
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp_header.trim().as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Produce the signature header for a body; used by tests and local tools.
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("hmac accepts any key length"),
    };
    mac.update(format!("{VERSION}:{timestamp}:").as_bytes());
    mac.update(body);
    format!("{VERSION}={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
