// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-channel envelope protocol.
//!
//! Wire format: JSON envelopes `{ id, type, payload }` carried over a
//! persistent bidirectional channel. Framing is the transport's concern;
//! this crate only defines the typed envelopes and their codec.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod envelope;
mod wire;

#[cfg(test)]
mod property_tests;

pub use envelope::{
    Envelope, ServerEnvelope, ServerMsg, WorkerEnvelope, WorkerMsg, AGENT_ERROR_PREFIX,
};
pub use wire::{decode, encode, ProtocolError};
