// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel gateway: the only component holding raw transport references.
//!
//! Workers connect over a WebSocket upgrade, authenticated by tenant secret
//! and worker instance id. Each connection gets a bounded outbound queue
//! and a single consumer task, so a worker's own messages are processed in
//! order while connections run in parallel. Everything else refers to
//! agents by connection id through [`ChannelHandle`].

pub mod socket;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gf_core::{ConnectionId, TenantId, WorkerId};
use gf_storage::StorageError;
use gf_wire::{ServerEnvelope, ServerMsg, WorkerEnvelope};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Outbound queue depth per connection; sends suspend when a worker reads
/// slower than the control plane produces.
const OUTBOUND_QUEUE: usize = 64;

/// Identity of one authenticated connection, passed to every hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMeta {
    pub connection_id: ConnectionId,
    pub tenant_id: TenantId,
    pub worker_id: WorkerId,
}

/// Hooks the gateway invokes for connection lifecycle and inbound traffic.
///
/// A closed trait rather than a handler map: the registry implements the
/// lifecycle hooks, the router the envelope hook, and the sink composes
/// them.
#[async_trait]
pub trait ChannelEvents: Send + Sync {
    /// Runs after authentication, before the connection serves traffic.
    /// An error refuses the connection.
    async fn agent_connected(&self, meta: &ClientMeta) -> Result<(), StorageError>;

    /// Runs on disconnect, before the connection entry is removed.
    async fn agent_disconnected(&self, meta: &ClientMeta);

    /// Liveness ping. An error closes the connection so the worker
    /// reconnects and re-registers.
    async fn agent_ping(&self, meta: &ClientMeta) -> Result<(), StorageError>;

    /// One inbound envelope, already decoded.
    async fn envelope(&self, meta: &ClientMeta, envelope: WorkerEnvelope);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("connection {0} is not registered")]
    NotConnected(ConnectionId),
}

struct Conn {
    meta: ClientMeta,
    tx: mpsc::Sender<ServerEnvelope>,
    cancel: CancellationToken,
}

/// Shared view of the live connection map. Cheap to clone; readers for
/// lookup, writer for register/deregister.
#[derive(Clone, Default)]
pub struct ChannelHandle {
    inner: Arc<RwLock<HashMap<ConnectionId, Conn>>>,
}

impl ChannelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, meta: ClientMeta, tx: mpsc::Sender<ServerEnvelope>, cancel: CancellationToken) {
        let mut map = self.inner.write();
        map.insert(meta.connection_id, Conn { meta, tx, cancel });
    }

    fn remove(&self, connection: &ConnectionId) {
        self.inner.write().remove(connection.as_str());
    }

    pub fn is_connected(&self, connection: &ConnectionId) -> bool {
        self.inner.read().contains_key(connection.as_str())
    }

    pub fn meta(&self, connection: &ConnectionId) -> Option<ClientMeta> {
        self.inner.read().get(connection.as_str()).map(|c| c.meta.clone())
    }

    pub fn connected_ids(&self) -> Vec<ConnectionId> {
        self.inner.read().keys().copied().collect()
    }

    pub fn connected_ids_for_tenant(&self, tenant: &TenantId) -> Vec<ConnectionId> {
        self.inner
            .read()
            .values()
            .filter(|c| &c.meta.tenant_id == tenant)
            .map(|c| c.meta.connection_id)
            .collect()
    }

    /// Queue an envelope to one connection. Suspends under backpressure;
    /// fails only when the connection is gone.
    pub async fn send(
        &self,
        connection: &ConnectionId,
        msg: ServerMsg,
    ) -> Result<(), ChannelError> {
        // clone the sender out so the lock is not held across the await
        let tx = self
            .inner
            .read()
            .get(connection.as_str())
            .map(|c| c.tx.clone())
            .ok_or(ChannelError::NotConnected(*connection))?;
        tx.send(ServerEnvelope::new(msg))
            .await
            .map_err(|_| ChannelError::NotConnected(*connection))
    }

    /// Cancel one connection's scope (reaper path). The socket task runs
    /// its disconnect hook and removes the entry.
    pub fn close(&self, connection: &ConnectionId) -> bool {
        let map = self.inner.read();
        match map.get(connection.as_str()) {
            Some(conn) => {
                conn.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every connection scope; returns how many were told to close.
    pub fn close_all(&self) -> usize {
        let map = self.inner.read();
        for conn in map.values() {
            conn.cancel.cancel();
        }
        map.len()
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
