// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope codec: JSON text in, typed envelope out.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::Envelope;

/// Errors from envelope encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Encode an envelope to its JSON wire form.
pub fn encode<M: Serialize>(envelope: &Envelope<M>) -> Result<String, ProtocolError> {
    serde_json::to_string(envelope).map_err(ProtocolError::Encode)
}

/// Decode a JSON wire frame into a typed envelope.
///
/// Unknown `type` tags and missing payload fields are `Malformed`; the
/// caller decides whether that drops the frame or the connection.
pub fn decode<M: DeserializeOwned>(text: &str) -> Result<Envelope<M>, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
