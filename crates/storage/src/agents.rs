// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active-agent store.
//!
//! A row exists per currently registered worker, keyed by
//! (tenant, worker instance). A reconnect with the same worker instance id
//! updates the row in place; assignments survive, only the transport
//! connection id changes.

use gf_core::{AgentId, ConnectionId, JobId, TenantId, WorkerId};
use sqlx::PgConnection;

use crate::db::table;
use crate::error::StorageError;
use crate::records::ActiveAgent;

/// Insert-or-update on (tenant, worker instance); advances `last_active_at`.
pub async fn upsert(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    worker: &WorkerId,
    connection: &ConnectionId,
) -> Result<ActiveAgent, StorageError> {
    let sql = format!(
        "INSERT INTO {} (id, tenant_id, worker_id, connection_id, last_active_at) \
         VALUES ($1, $2, $3, $4, now()) \
         ON CONFLICT (tenant_id, worker_id) DO UPDATE \
         SET connection_id = EXCLUDED.connection_id, last_active_at = now() \
         RETURNING *",
        table(schema, "active_agents"),
    );
    Ok(sqlx::query_as::<_, ActiveAgent>(&sql)
        .bind(AgentId::new().as_str())
        .bind(tenant.as_str())
        .bind(worker.as_str())
        .bind(connection.as_str())
        .fetch_one(&mut *conn)
        .await?)
}

pub async fn get(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    id: &AgentId,
) -> Result<Option<ActiveAgent>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 AND id = $2",
        table(schema, "active_agents"),
    );
    Ok(sqlx::query_as::<_, ActiveAgent>(&sql)
        .bind(tenant.as_str())
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn get_by_connection_id(
    conn: &mut PgConnection,
    schema: &str,
    connection: &ConnectionId,
) -> Result<Option<ActiveAgent>, StorageError> {
    let sql =
        format!("SELECT * FROM {} WHERE connection_id = $1", table(schema, "active_agents"));
    Ok(sqlx::query_as::<_, ActiveAgent>(&sql)
        .bind(connection.as_str())
        .fetch_optional(&mut *conn)
        .await?)
}

/// The agent currently owning a job, joined through the assignment table.
pub async fn get_by_job_id(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    job: &JobId,
) -> Result<Option<ActiveAgent>, StorageError> {
    let sql = format!(
        "SELECT a.* FROM {} a \
         JOIN {} asg ON asg.agent_id = a.id \
         WHERE asg.tenant_id = $1 AND asg.job_id = $2",
        table(schema, "active_agents"),
        table(schema, "job_assignments"),
    );
    Ok(sqlx::query_as::<_, ActiveAgent>(&sql)
        .bind(tenant.as_str())
        .bind(job.as_str())
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn list_for_tenant(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
) -> Result<Vec<ActiveAgent>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 ORDER BY id",
        table(schema, "active_agents"),
    );
    Ok(sqlx::query_as::<_, ActiveAgent>(&sql)
        .bind(tenant.as_str())
        .fetch_all(&mut *conn)
        .await?)
}

/// Intersect a persisted agent list with the live connection set held by
/// the channel gateway. Pure; the gateway map is the authority on liveness.
pub fn filter_connected(
    agents: Vec<ActiveAgent>,
    connected: &[ConnectionId],
) -> Vec<ActiveAgent> {
    agents.into_iter().filter(|a| connected.contains(&a.connection_id)).collect()
}

/// Agents whose `last_active_at` is older than the threshold.
pub async fn get_inactive(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    threshold_minutes: i64,
) -> Result<Vec<ActiveAgent>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 \
         AND last_active_at < now() - ($2::bigint * interval '1 minute') \
         ORDER BY id",
        table(schema, "active_agents"),
    );
    Ok(sqlx::query_as::<_, ActiveAgent>(&sql)
        .bind(tenant.as_str())
        .bind(threshold_minutes)
        .fetch_all(&mut *conn)
        .await?)
}

/// Advance `last_active_at` for a liveness ping.
pub async fn touch(
    conn: &mut PgConnection,
    schema: &str,
    id: &AgentId,
) -> Result<(), StorageError> {
    let sql = format!(
        "UPDATE {} SET last_active_at = now() WHERE id = $1",
        table(schema, "active_agents"),
    );
    let result = sqlx::query(&sql).bind(id.as_str()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("agent"));
    }
    Ok(())
}

/// Delete an agent row. Assignments cascade with it.
pub async fn delete(
    conn: &mut PgConnection,
    schema: &str,
    id: &AgentId,
) -> Result<(), StorageError> {
    let sql = format!("DELETE FROM {} WHERE id = $1", table(schema, "active_agents"));
    let result = sqlx::query(&sql).bind(id.as_str()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("agent"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
