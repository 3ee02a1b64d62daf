// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tenant settings store.
//!
//! One explicit column per primitive kind with a `kind` discriminator; the
//! key→kind registry ([`SettingKey::kind`]) is enforced on both read and
//! write, so a mismatched value never reaches a row.

use gf_core::TenantId;
use sqlx::PgConnection;

use crate::db::table;
use crate::error::StorageError;
use crate::records::{Setting, SettingKey, SettingValue};

/// Upsert a setting. The value's kind must match the key's registered kind.
pub async fn set(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    key: SettingKey,
    value: SettingValue,
) -> Result<Setting, StorageError> {
    if value.kind() != key.kind() {
        return Err(StorageError::Validation(format!(
            "setting {} expects {}, got {}",
            key.as_str(),
            key.kind().as_str(),
            value.kind().as_str(),
        )));
    }

    let (value_bool, value_string, value_string_list) = match &value {
        SettingValue::Bool(b) => (Some(*b), None, None),
        SettingValue::String(s) => (None, Some(s.clone()), None),
        SettingValue::StringList(v) => (None, None, Some(v.clone())),
    };

    let sql = format!(
        "INSERT INTO {} (tenant_id, key, kind, value_bool, value_string, value_string_list) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (tenant_id, key) DO UPDATE \
         SET kind = EXCLUDED.kind, value_bool = EXCLUDED.value_bool, \
             value_string = EXCLUDED.value_string, \
             value_string_list = EXCLUDED.value_string_list, updated_at = now() \
         RETURNING *",
        table(schema, "settings"),
    );
    Ok(sqlx::query_as::<_, Setting>(&sql)
        .bind(tenant.as_str())
        .bind(key.as_str())
        .bind(key.kind().as_str())
        .bind(value_bool)
        .bind(value_string)
        .bind(value_string_list)
        .fetch_one(&mut *conn)
        .await?)
}

pub async fn get(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    key: SettingKey,
) -> Result<Option<SettingValue>, StorageError> {
    let sql = format!(
        "SELECT * FROM {} WHERE tenant_id = $1 AND key = $2",
        table(schema, "settings"),
    );
    let setting = sqlx::query_as::<_, Setting>(&sql)
        .bind(tenant.as_str())
        .bind(key.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(setting.map(|s| s.value))
}

/// Convenience: boolean setting with a default for the unset case.
pub async fn get_bool(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    key: SettingKey,
    default: bool,
) -> Result<bool, StorageError> {
    Ok(get(conn, schema, tenant, key).await?.and_then(|v| v.as_bool()).unwrap_or(default))
}

pub async fn list_for_tenant(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
) -> Result<Vec<Setting>, StorageError> {
    let sql =
        format!("SELECT * FROM {} WHERE tenant_id = $1 ORDER BY key", table(schema, "settings"));
    Ok(sqlx::query_as::<_, Setting>(&sql).bind(tenant.as_str()).fetch_all(&mut *conn).await?)
}

pub async fn delete(
    conn: &mut PgConnection,
    schema: &str,
    tenant: &TenantId,
    key: SettingKey,
) -> Result<(), StorageError> {
    let sql =
        format!("DELETE FROM {} WHERE tenant_id = $1 AND key = $2", table(schema, "settings"));
    let result =
        sqlx::query(&sql).bind(tenant.as_str()).bind(key.as_str()).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("setting"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
