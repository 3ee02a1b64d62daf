// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat integration store.
//!
//! One row per (tenant, chat workspace). Created on OAuth success, deleted
//! on uninstall; the workspace id is globally unique so inbound webhook
//! events can be routed to a tenant without further context.

use gf_core::{ChatIntegrationId, TenantId};
use sqlx::PgConnection;

use crate::db::table;
use crate::error::StorageError;
use crate::records::ChatIntegration;

pub async fn create(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    workspace_id: &str,
    access_token: &str,
) -> Result<ChatIntegration, StorageError> {
    let sql = format!(
        "INSERT INTO {} (id, tenant_id, workspace_id, access_token) \
         VALUES ($1, $2, $3, $4) RETURNING *",
        table(schema, "chat_integrations"),
    );
    sqlx::query_as::<_, ChatIntegration>(&sql)
        .bind(ChatIntegrationId::new().as_str())
        .bind(tenant.as_str())
        .bind(workspace_id)
        .bind(access_token)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| StorageError::on_insert(e, "chat workspace"))
}

pub async fn get(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    id: &ChatIntegrationId,
) -> Result<Option<ChatIntegration>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 AND id = $2",
        table(schema, "chat_integrations"),
    );
    Ok(sqlx::query_as::<_, ChatIntegration>(&sql)
        .bind(tenant.as_str())
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?)
}

/// Resolve the integration an inbound webhook event belongs to.
pub async fn get_by_workspace(
    conn: &mut PgConnection,
    schema: &str,
    workspace_id: &str,
) -> Result<Option<ChatIntegration>, StorageError> {
    let sql =
        format!("SELECT * FROM {} WHERE workspace_id = $1", table(schema, "chat_integrations"));
    Ok(sqlx::query_as::<_, ChatIntegration>(&sql)
        .bind(workspace_id)
        .fetch_optional(&mut *conn)
        .await?)
}

pub async fn list_for_tenant(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
) -> Result<Vec<ChatIntegration>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 ORDER BY id",
        table(schema, "chat_integrations"),
    );
    Ok(sqlx::query_as::<_, ChatIntegration>(&sql)
        .bind(tenant.as_str())
        .fetch_all(&mut *conn)
        .await?)
}

pub async fn delete(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    id: &ChatIntegrationId,
) -> Result<(), StorageError> {
    let sql = format!(
        "DELETE FROM {} WHERE tenant_id = $1 AND id = $2",
        table(schema, "chat_integrations"),
    );
    let result =
        sqlx::query(&sql).bind(tenant.as_str()).bind(id.as_str()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("chat integration"));
    }
    Ok(())
}
