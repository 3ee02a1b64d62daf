// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The chat client seam.
//!
//! Everything the control plane needs from the platform, and nothing else.
//! The token is passed per call because each tenant integration holds its
//! own credential.

use async_trait::async_trait;
use thiserror::Error;

/// Address of one posted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

/// One reaction currently on a message, with the users who set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionOnMessage {
    pub name: String,
    pub users: Vec<String>,
}

/// Errors from chat platform calls.
///
/// These are `EXTERNAL` in the control plane's taxonomy: callers log and
/// continue, and no state machine may deadlock on one.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The platform answered with an application-level error code.
    #[error("chat api error: {0}")]
    Api(String),

    /// Transport-level failure (timeout, connect, TLS).
    #[error("chat transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The platform answered 200 but the body made no sense.
    #[error("malformed chat response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post a message, optionally threaded under `thread_ts`.
    async fn post_message(
        &self,
        token: &str,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<MessageRef, ChatError>;

    async fn add_reaction(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
        name: &str,
    ) -> Result<(), ChatError>;

    async fn remove_reaction(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
        name: &str,
    ) -> Result<(), ChatError>;

    /// Reactions currently on a message.
    async fn list_reactions(
        &self,
        token: &str,
        channel: &str,
        ts: &str,
    ) -> Result<Vec<ReactionOnMessage>, ChatError>;

    /// Permanent link to a message, for work envelopes.
    async fn permalink(&self, token: &str, channel: &str, ts: &str)
        -> Result<String, ChatError>;

    /// Display name for a user id, for mention resolution.
    async fn display_name(&self, token: &str, user_id: &str) -> Result<String, ChatError>;

    /// The authenticated bot's own user id.
    async fn bot_user_id(&self, token: &str) -> Result<String, ChatError>;
}
