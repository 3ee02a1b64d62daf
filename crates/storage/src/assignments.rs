// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-assignment store.
//!
//! The (tenant, job) primary key is the dispatcher's only serialization
//! point: concurrent assigners race on the INSERT and the loser re-reads.

use gf_core::{AgentId, JobId, TenantId};
use sqlx::PgConnection;

use crate::db::table;
use crate::error::StorageError;
use crate::records::JobAssignment;

/// Bind a job to an agent. Surfaces `Conflict` when the job is already
/// owned; callers resolve that by re-reading the assignment.
pub async fn insert(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    job: &JobId,
    agent: &AgentId,
) -> Result<JobAssignment, StorageError> {
    let sql = format!(
        "INSERT INTO {} (tenant_id, job_id, agent_id) VALUES ($1, $2, $3) RETURNING *",
        table(schema, "job_assignments"),
    );
    sqlx::query_as::<_, JobAssignment>(&sql)
        .bind(tenant.as_str())
        .bind(job.as_str())
        .bind(agent.as_str())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| StorageError::on_insert(e, "job assignment"))
}

pub async fn get_for_job(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    job: &JobId,
) -> Result<Option<JobAssignment>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 AND job_id = $2",
        table(schema, "job_assignments"),
    );
    Ok(sqlx::query_as::<_, JobAssignment>(&sql)
        .bind(tenant.as_str())
        .bind(job.as_str())
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn list_for_agent(
    conn: &mut PgConnection,
    schema: &str,
    agent: &AgentId,
) -> Result<Vec<JobAssignment>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE agent_id = $1 ORDER BY job_id",
        table(schema, "job_assignments"),
    );
    Ok(sqlx::query_as::<_, JobAssignment>(&sql)
        .bind(agent.as_str())
        .fetch_all(&mut *conn)
        .await?)
}

/// Current load of one agent, for least-loaded dispatch.
pub async fn count_for_agent(
    conn: &mut PgConnection,
    schema: &str,
    agent: &AgentId,
) -> Result<i64, StorageError> {
    let sql =
        format!("SELECT count(*) FROM {} WHERE agent_id = $1", table(schema, "job_assignments"));
    Ok(sqlx::query_scalar::<_, i64>(&sql).bind(agent.as_str()).fetch_one(&mut *conn).await?)
}

/// Unassign a job. Returns whether a row was removed (an already-unassigned
/// job is not an error during teardown).
pub async fn delete_for_job(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    job: &JobId,
) -> Result<bool, StorageError> {
    let sql = format!(
        "DELETE FROM {} WHERE tenant_id = $1 AND job_id = $2",
        table(schema, "job_assignments"),
    );
    let result =
        sqlx::query(&sql).bind(tenant.as_str()).bind(job.as_str()).execute(&mut *conn).await?;
    Ok(result.rows_affected() == 1)
}
