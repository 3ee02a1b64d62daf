// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent registry: derived state only.
//!
//! The authoritative row lives in storage; the live set lives in the
//! channel gateway's map. The registry is the glue invoked from the
//! gateway's lifecycle hooks.

use std::sync::Arc;

use gf_chat::ChatClient;
use gf_core::TenantId;
use gf_storage::{agents, assignments, jobs, ActiveAgent, Db, StorageError};
use tracing::{debug, info, warn};

use crate::channel::{ChannelHandle, ClientMeta};
use crate::cleanup;

pub struct AgentRegistry {
    db: Db,
    chat: Arc<dyn ChatClient>,
    channel: ChannelHandle,
}

impl AgentRegistry {
    pub fn new(db: Db, chat: Arc<dyn ChatClient>, channel: ChannelHandle) -> Self {
        Self { db, chat, channel }
    }

    /// Connect hook: upsert the agent row. A reconnect with the same worker
    /// instance id takes over the old row; held assignments survive.
    pub async fn register(&self, meta: &ClientMeta) -> Result<ActiveAgent, StorageError> {
        let mut conn = self.db.acquire().await?;
        let agent = agents::upsert(
            &mut conn,
            self.db.schema(),
            &meta.tenant_id,
            &meta.worker_id,
            &meta.connection_id,
        )
        .await?;
        info!(agent = %agent.id, worker = %meta.worker_id, "agent registered");
        Ok(agent)
    }

    /// Ping hook: advance liveness. A missing row means the registry no
    /// longer knows this worker (reaped, or never registered); the caller
    /// closes the connection so the worker reconnects.
    pub async fn process_ping(&self, meta: &ClientMeta) -> Result<(), StorageError> {
        let mut conn = self.db.acquire().await?;
        let agent =
            agents::get_by_connection_id(&mut conn, self.db.schema(), &meta.connection_id)
                .await?;
        match agent {
            Some(agent) => agents::touch(&mut conn, self.db.schema(), &agent.id).await,
            None => Err(StorageError::NotFound("agent")),
        }
    }

    /// Disconnect hook: abandon every held job, then drop the agent row.
    ///
    /// Errors are logged, not returned; a disconnect cannot be refused.
    pub async fn deregister(&self, meta: &ClientMeta) {
        let agent = {
            let mut conn = match self.db.acquire().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(connection = %meta.connection_id, error = %err, "deregister skipped");
                    return;
                }
            };
            match agents::get_by_connection_id(&mut conn, self.db.schema(), &meta.connection_id)
                .await
            {
                Ok(Some(agent)) => agent,
                Ok(None) => {
                    // reaped while connected, or replaced by a reconnect
                    debug!(connection = %meta.connection_id, "no agent row on disconnect");
                    return;
                }
                Err(err) => {
                    warn!(connection = %meta.connection_id, error = %err, "deregister lookup failed");
                    return;
                }
            }
        };

        // A reconnect may have re-pointed the row at a newer connection;
        // that worker is alive, so its jobs must not be abandoned.
        if agent.connection_id != meta.connection_id {
            debug!(agent = %agent.id, "row already owned by a newer connection");
            return;
        }

        let held = {
            let mut conn = match self.db.acquire().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(agent = %agent.id, error = %err, "deregister skipped");
                    return;
                }
            };
            match assignments::list_for_agent(&mut conn, self.db.schema(), &agent.id).await {
                Ok(held) => held,
                Err(err) => {
                    warn!(agent = %agent.id, error = %err, "assignment lookup failed");
                    Vec::new()
                }
            }
        };

        for assignment in held {
            let job = {
                let mut conn = match self.db.acquire().await {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(job = %assignment.job_id, error = %err, "abandon skipped");
                        continue;
                    }
                };
                jobs::get(&mut conn, self.db.schema(), &agent.tenant_id, &assignment.job_id).await
            };
            match job {
                Ok(Some(job)) => {
                    if let Err(err) = cleanup::fail_job(
                        &self.db,
                        self.chat.as_ref(),
                        &job,
                        cleanup::DISCONNECT_FAILURE_TEXT,
                    )
                    .await
                    {
                        warn!(job = %job.id, error = %err, "abandon failed");
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(job = %assignment.job_id, error = %err, "abandon lookup failed"),
            }
        }

        let mut conn = match self.db.acquire().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(agent = %agent.id, error = %err, "agent row not removed");
                return;
            }
        };
        match agents::delete(&mut conn, self.db.schema(), &agent.id).await {
            Ok(()) => info!(agent = %agent.id, worker = %agent.worker_id, "agent deregistered"),
            Err(StorageError::NotFound(_)) => {}
            Err(err) => warn!(agent = %agent.id, error = %err, "agent row not removed"),
        }
    }

    /// Persisted agents intersected with the gateway's live connection set.
    pub async fn connected_agents(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<ActiveAgent>, StorageError> {
        let mut conn = self.db.acquire().await?;
        let persisted = agents::list_for_tenant(&mut conn, self.db.schema(), tenant).await?;
        let live = self.channel.connected_ids_for_tenant(tenant);
        Ok(agents::filter_connected(persisted, &live))
    }
}
