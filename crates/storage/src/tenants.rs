// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant store.

use gf_core::TenantId;
use sqlx::PgConnection;

use crate::db::table;
use crate::error::StorageError;
use crate::records::Tenant;

pub async fn create(
    conn: &mut PgConnection,
    schema: &str,
    secret: &str,
) -> Result<Tenant, StorageError> {
    let sql = format!(
        "INSERT INTO {} (id, secret) VALUES ($1, $2) RETURNING *",
        table(schema, "tenants"),
    );
    sqlx::query_as::<_, Tenant>(&sql)
        .bind(TenantId::new().as_str())
        .bind(secret)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| StorageError::on_insert(e, "tenant secret"))
}

pub async fn get(
    conn: &mut PgConnection,
    schema: &str,
    id: &TenantId,
) -> Result<Option<Tenant>, StorageError> {
    let sql = format!("SELECT * FROM {} WHERE id = $1", table(schema, "tenants"));
    Ok(sqlx::query_as::<_, Tenant>(&sql).bind(id.as_str()).fetch_optional(&mut *conn).await?)
}

/// Resolve a tenant from the shared secret a worker presented on connect.
pub async fn get_by_secret(
    conn: &mut PgConnection,
    schema: &str,
    secret: &str,
) -> Result<Option<Tenant>, StorageError> {
    let sql = format!("SELECT * FROM {} WHERE secret = $1", table(schema, "tenants"));
    Ok(sqlx::query_as::<_, Tenant>(&sql).bind(secret).fetch_optional(&mut *conn).await?)
}

pub async fn list(conn: &mut PgConnection, schema: &str) -> Result<Vec<Tenant>, StorageError> {
    let sql = format!("SELECT * FROM {} ORDER BY id", table(schema, "tenants"));
    Ok(sqlx::query_as::<_, Tenant>(&sql).fetch_all(&mut *conn).await?)
}

pub async fn delete(
    conn: &mut PgConnection,
    schema: &str,
    id: &TenantId,
) -> Result<(), StorageError> {
    let sql = format!("DELETE FROM {} WHERE id = $1", table(schema, "tenants"));
    let result = sqlx::query(&sql).bind(id.as_str()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("tenant"));
    }
    Ok(())
}
