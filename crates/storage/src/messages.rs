// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processed-message store.
//!
//! `message_ts` is unique within a job, so a platform retry of the same
//! chat message surfaces `Conflict` and the caller treats it as already
//! handled.

use gf_core::{JobId, ProcessedMessageId, TenantId};
use sqlx::PgConnection;

use crate::db::table;
use crate::error::StorageError;
use crate::records::{MessageStatus, ProcessedMessage};

pub struct NewMessage<'a> {
    pub tenant: &'a TenantId,
    pub job: &'a JobId,
    pub channel_id: &'a str,
    pub message_ts: &'a str,
    pub text: &'a str,
    pub status: MessageStatus,
}

pub async fn create(
    conn: &mut PgConnection,
    schema: &str,
    msg: NewMessage<'_>,
) -> Result<ProcessedMessage, StorageError> {
    let sql = format!(
        "INSERT INTO {} (id, job_id, tenant_id, channel_id, message_ts, text, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        table(schema, "processed_messages"),
    );
    sqlx::query_as::<_, ProcessedMessage>(&sql)
        .bind(ProcessedMessageId::new().as_str())
        .bind(msg.job.as_str())
        .bind(msg.tenant.as_str())
        .bind(msg.channel_id)
        .bind(msg.message_ts)
        .bind(msg.text)
        .bind(msg.status.as_str())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| StorageError::on_insert(e, "processed message timestamp"))
}

pub async fn get(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    id: &ProcessedMessageId,
) -> Result<Option<ProcessedMessage>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 AND id = $2",
        table(schema, "processed_messages"),
    );
    Ok(sqlx::query_as::<_, ProcessedMessage>(&sql)
        .bind(tenant.as_str())
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?)
}

/// QUEUED → IN_PROGRESS, exactly once.
///
/// Returns whether this call performed the transition; a duplicate drain
/// tick gets `false` and must not re-send the message.
pub async fn mark_in_progress(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    id: &ProcessedMessageId,
) -> Result<bool, StorageError> {
    let sql = format!(
        "UPDATE {} SET status = 'IN_PROGRESS' \
         WHERE tenant_id = $1 AND id = $2 AND status = 'QUEUED'",
        table(schema, "processed_messages"),
    );
    let result =
        sqlx::query(&sql).bind(tenant.as_str()).bind(id.as_str()).execute(&mut *conn).await?;
    Ok(result.rows_affected() == 1)
}

/// Terminal transition once the agent's reply for this message arrived.
pub async fn set_completed(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    id: &ProcessedMessageId,
) -> Result<(), StorageError> {
    let sql = format!(
        "UPDATE {} SET status = 'COMPLETED' WHERE tenant_id = $1 AND id = $2",
        table(schema, "processed_messages"),
    );
    let result =
        sqlx::query(&sql).bind(tenant.as_str()).bind(id.as_str()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("processed message"));
    }
    Ok(())
}

/// Queued messages for a job in insertion order; the drain replays these.
pub async fn list_queued_for_job(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    job: &JobId,
) -> Result<Vec<ProcessedMessage>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 AND job_id = $2 AND status = 'QUEUED' \
         ORDER BY created_at, id",
        table(schema, "processed_messages"),
    );
    Ok(sqlx::query_as::<_, ProcessedMessage>(&sql)
        .bind(tenant.as_str())
        .bind(job.as_str())
        .fetch_all(&mut *conn)
        .await?)
}

pub async fn count_completed_for_job(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    job: &JobId,
) -> Result<i64, StorageError> {
    let sql = format!(
        "SELECT count(*) FROM {} \
         WHERE tenant_id = $1 AND job_id = $2 AND status = 'COMPLETED'",
        table(schema, "processed_messages"),
    );
    Ok(sqlx::query_scalar::<_, i64>(&sql)
        .bind(tenant.as_str())
        .bind(job.as_str())
        .fetch_one(&mut *conn)
        .await?)
}

/// The most recently created message of a job, any status.
pub async fn latest_for_job(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    job: &JobId,
) -> Result<Option<ProcessedMessage>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 AND job_id = $2 \
         ORDER BY created_at DESC, id DESC LIMIT 1",
        table(schema, "processed_messages"),
    );
    Ok(sqlx::query_as::<_, ProcessedMessage>(&sql)
        .bind(tenant.as_str())
        .bind(job.as_str())
        .fetch_optional(&mut *conn)
        .await?)
}

/// Remove every message of a job. Returns the number deleted; part of the
/// abandonment teardown (job deletion also cascades here).
pub async fn delete_for_job(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    job: &JobId,
) -> Result<u64, StorageError> {
    let sql = format!(
        "DELETE FROM {} WHERE tenant_id = $1 AND job_id = $2",
        table(schema, "processed_messages"),
    );
    let result =
        sqlx::query(&sql).bind(tenant.as_str()).bind(job.as_str()).execute(&mut *conn).await?;
    Ok(result.rows_affected())
}
