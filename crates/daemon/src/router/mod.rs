// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation router: maps chat threads to jobs and mediates the four
//! event streams: inbound chat messages, reaction events, agent envelopes,
//! and outbound reaction updates.

pub mod agent;
pub mod chat;
pub mod reactions;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gf_chat::{ChatClient, ChatError};
use gf_storage::{Db, StorageError};
use gf_wire::{WorkerEnvelope, WorkerMsg};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::channel::{ChannelError, ChannelEvents, ChannelHandle, ClientMeta};
use crate::registry::AgentRegistry;

/// Reply posted when a threaded reply arrives for a thread with no job.
pub const REPLY_WITHOUT_JOB_TEXT: &str =
    "Error: new jobs can only be started from top-level messages";

/// Substituted when an agent sends blank assistant text.
pub const EMPTY_RESPONSE_TEXT: &str = "(agent sent empty response)";

/// Posted when a message is queued and the tenant opted into queue notices.
pub const QUEUED_NOTICE_TEXT: &str = ":gear: Queued. Waiting for an agent to connect.";

#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("channel send failed: {0}")]
    Channel(#[from] ChannelError),
}

impl RouterError {
    /// Handlers log-and-continue on external failures, but never swallow an
    /// invariant violation.
    pub(crate) fn escalate_invariants(&self) {
        if let Self::Storage(inner) = self {
            exit_on_invariant(inner);
        }
    }
}

/// An invariant violation is a programmer error: crash with exit code 2 so
/// the service restarts and the platform retries the offending event.
pub(crate) fn exit_on_invariant(err: &StorageError) {
    if let StorageError::Invariant(reason) = err {
        tracing::error!(reason = %reason, "invariant violated; aborting");
        std::process::exit(2);
    }
}

pub struct Router {
    pub(crate) db: Db,
    pub(crate) chat: Arc<dyn ChatClient>,
    pub(crate) channel: ChannelHandle,
    pub(crate) registry: Arc<AgentRegistry>,
    /// access token → bot user id, learned on first use.
    bot_ids: Mutex<HashMap<String, String>>,
}

impl Router {
    pub fn new(
        db: Db,
        chat: Arc<dyn ChatClient>,
        channel: ChannelHandle,
        registry: Arc<AgentRegistry>,
    ) -> Self {
        Self { db, chat, channel, registry, bot_ids: Mutex::new(HashMap::new()) }
    }

    /// The bot's own user id for an integration token, cached per token.
    pub(crate) async fn bot_user_id(&self, token: &str) -> Result<String, ChatError> {
        if let Some(id) = self.bot_ids.lock().get(token) {
            return Ok(id.clone());
        }
        let id = self.chat.bot_user_id(token).await?;
        self.bot_ids.lock().insert(token.to_string(), id.clone());
        Ok(id)
    }
}

/// Composes the registry's lifecycle hooks with the router's envelope
/// handling behind the gateway's event trait.
pub struct ChannelSink {
    registry: Arc<AgentRegistry>,
    router: Arc<Router>,
}

impl ChannelSink {
    pub fn new(registry: Arc<AgentRegistry>, router: Arc<Router>) -> Self {
        Self { registry, router }
    }
}

#[async_trait]
impl ChannelEvents for ChannelSink {
    async fn agent_connected(&self, meta: &ClientMeta) -> Result<(), StorageError> {
        self.registry.register(meta).await.map(|_| ())
    }

    async fn agent_disconnected(&self, meta: &ClientMeta) {
        self.registry.deregister(meta).await;
    }

    async fn agent_ping(&self, meta: &ClientMeta) -> Result<(), StorageError> {
        self.registry.process_ping(meta).await
    }

    async fn envelope(&self, meta: &ClientMeta, envelope: WorkerEnvelope) {
        // application-level liveness, same effect as a transport ping
        if matches!(envelope.msg, WorkerMsg::HealthcheckAck {}) {
            if let Err(err) = self.registry.process_ping(meta).await {
                debug!(connection = %meta.connection_id, error = %err, "healthcheck ack from unknown agent");
            }
            return;
        }
        self.router.handle_envelope(meta, envelope).await;
    }
}
