// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed inbound webhook events.
//!
//! The platform wraps everything in an outer envelope; only the event types
//! the control plane consumes get variants, everything else falls into the
//! catch-alls and is acknowledged without effect.

use serde::Deserialize;

/// Outer webhook envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Endpoint ownership handshake; the nonce must be echoed back.
    UrlVerification { challenge: String },

    /// A real event, scoped to one chat workspace.
    EventCallback {
        team_id: String,
        event: InboundEvent,
    },

    #[serde(other)]
    Other,
}

/// The inner event of an `event_callback`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// The bot was mentioned in a channel.
    AppMention(MessageEvent),

    /// A direct message (or channel message the bot can see).
    Message(MessageEvent),

    ReactionAdded(ReactionAddedEvent),

    /// The workspace removed the app; the integration must be torn down.
    AppUninstalled {},

    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    pub channel: String,
    pub ts: String,
    /// Set when the message is a threaded reply (or a thread broadcast).
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Present on messages authored by bots; those are never work.
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl MessageEvent {
    /// The key of the thread this message belongs to.
    pub fn thread_key_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    /// A reply inside an existing thread, as opposed to a top-level message.
    pub fn is_thread_reply(&self) -> bool {
        self.thread_ts.as_deref().is_some_and(|t| t != self.ts)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionAddedEvent {
    pub user: String,
    pub reaction: String,
    pub item: ReactionItem,
}

/// The message a reaction was placed on.
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionItem {
    pub channel: String,
    pub ts: String,
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
