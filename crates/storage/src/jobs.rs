// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store.
//!
//! Exactly one live job per (tenant, integration, thread); the unique index
//! is the serialization point and a conflict means "use the existing row".

use gf_core::{ChatIntegrationId, JobId, TenantId};
use sqlx::PgConnection;

use crate::db::table;
use crate::error::StorageError;
use crate::records::{Job, ThreadKey};

/// Atomic get-or-create under the thread uniqueness index.
///
/// Returns the job and whether this call created it.
pub async fn get_or_create_for_thread(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    integration: &ChatIntegrationId,
    thread: &ThreadKey,
    user_id: &str,
) -> Result<(Job, bool), StorageError> {
    let sql = format!(
        "INSERT INTO {} (id, tenant_id, chat_integration_id, channel_id, thread_ts, user_id) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (tenant_id, chat_integration_id, channel_id, thread_ts) DO NOTHING \
         RETURNING *",
        table(schema, "jobs"),
    );
    let inserted = sqlx::query_as::<_, Job>(&sql)
        .bind(JobId::new().as_str())
        .bind(tenant.as_str())
        .bind(integration.as_str())
        .bind(&thread.channel_id)
        .bind(&thread.thread_ts)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(job) = inserted {
        return Ok((job, true));
    }

    // Lost the insert race or the row predates us; either way it exists now.
    match get_for_thread(conn, schema, tenant, integration, thread).await? {
        Some(job) => Ok((job, false)),
        None => Err(StorageError::Invariant(format!(
            "job vanished between upsert and read for thread {}/{}",
            thread.channel_id, thread.thread_ts,
        ))),
    }
}

pub async fn get(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    id: &JobId,
) -> Result<Option<Job>, StorageError> {
    let sql = format!("SELECT * FROM {} WHERE tenant_id = $1 AND id = $2", table(schema, "jobs"));
    Ok(sqlx::query_as::<_, Job>(&sql)
        .bind(tenant.as_str())
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn get_for_thread(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    integration: &ChatIntegrationId,
    thread: &ThreadKey,
) -> Result<Option<Job>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 AND chat_integration_id = $2 \
         AND channel_id = $3 AND thread_ts = $4",
        table(schema, "jobs"),
    );
    Ok(sqlx::query_as::<_, Job>(&sql)
        .bind(tenant.as_str())
        .bind(integration.as_str())
        .bind(&thread.channel_id)
        .bind(&thread.thread_ts)
        .fetch_optional(&mut *conn)
        .await?)
}

/// Advance `updated_at`; any assistant or system activity counts.
pub async fn touch(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    id: &JobId,
) -> Result<(), StorageError> {
    let sql = format!(
        "UPDATE {} SET updated_at = now() WHERE tenant_id = $1 AND id = $2",
        table(schema, "jobs"),
    );
    let result =
        sqlx::query(&sql).bind(tenant.as_str()).bind(id.as_str()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("job"));
    }
    Ok(())
}

/// Jobs with a stale `updated_at` that still have an owning agent; the
/// idle-prompt loop nudges their workers.
pub async fn get_idle(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    threshold_minutes: i64,
) -> Result<Vec<Job>, StorageError> {
    let sql = format!(
        "SELECT j.* FROM {} j \
         WHERE j.tenant_id = $1 \
         AND j.updated_at < now() - ($2::bigint * interval '1 minute') \
         AND EXISTS (SELECT 1 FROM {} a WHERE a.tenant_id = j.tenant_id AND a.job_id = j.id) \
         ORDER BY j.updated_at",
        table(schema, "jobs"),
        table(schema, "job_assignments"),
    );
    Ok(sqlx::query_as::<_, Job>(&sql)
        .bind(tenant.as_str())
        .bind(threshold_minutes)
        .fetch_all(&mut *conn)
        .await?)
}

/// Jobs holding at least one QUEUED message: drain candidates.
pub async fn list_with_queued(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
) -> Result<Vec<Job>, StorageError> {
    let sql = format!(
        "SELECT j.* FROM {} j \
         WHERE j.tenant_id = $1 \
         AND EXISTS (SELECT 1 FROM {} m WHERE m.job_id = j.id AND m.status = 'QUEUED') \
         ORDER BY j.id",
        table(schema, "jobs"),
        table(schema, "processed_messages"),
    );
    Ok(sqlx::query_as::<_, Job>(&sql).bind(tenant.as_str()).fetch_all(&mut *conn).await?)
}

/// Delete a completed or abandoned job. Processed messages and the
/// assignment cascade with it.
pub async fn delete(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    id: &JobId,
) -> Result<(), StorageError> {
    let sql = format!("DELETE FROM {} WHERE tenant_id = $1 AND id = $2", table(schema, "jobs"));
    let result =
        sqlx::query(&sql).bind(tenant.as_str()).bind(id.as_str()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("job"));
    }
    Ok(())
}
