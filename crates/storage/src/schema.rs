// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! First-boot schema bootstrap.
//!
//! Creates the configured schema and every table with the uniqueness
//! indexes the dispatcher and router rely on. All statements are
//! `IF NOT EXISTS`; running against an existing schema is a no-op. This is
//! not a migration system; structural changes need operator action.

use crate::db::{table, Db};
use crate::error::StorageError;

/// Create the schema and all tables if they do not exist yet.
pub async fn ensure_schema(db: &Db) -> Result<(), StorageError> {
    let s = db.schema();
    let mut conn = db.acquire().await?;
    for statement in ddl(s) {
        sqlx::query(&statement).execute(&mut *conn).await?;
    }
    tracing::debug!(schema = s, "schema bootstrap complete");
    Ok(())
}

fn ddl(s: &str) -> Vec<String> {
    let tenants = table(s, "tenants");
    let integrations = table(s, "chat_integrations");
    let agents = table(s, "active_agents");
    let jobs = table(s, "jobs");
    let messages = table(s, "processed_messages");
    let assignments = table(s, "job_assignments");
    let settings = table(s, "settings");

    vec![
        format!("CREATE SCHEMA IF NOT EXISTS \"{s}\""),
        format!(
            "CREATE TABLE IF NOT EXISTS {tenants} (\
             id TEXT PRIMARY KEY, \
             secret TEXT NOT NULL UNIQUE, \
             created_at TIMESTAMPTZ NOT NULL DEFAULT now())"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {integrations} (\
             id TEXT PRIMARY KEY, \
             tenant_id TEXT NOT NULL REFERENCES {tenants} (id) ON DELETE CASCADE, \
             workspace_id TEXT NOT NULL UNIQUE, \
             access_token TEXT NOT NULL, \
             created_at TIMESTAMPTZ NOT NULL DEFAULT now())"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {agents} (\
             id TEXT PRIMARY KEY, \
             tenant_id TEXT NOT NULL REFERENCES {tenants} (id) ON DELETE CASCADE, \
             worker_id TEXT NOT NULL, \
             connection_id TEXT NOT NULL, \
             last_active_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
             created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
             UNIQUE (tenant_id, worker_id))"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS active_agents_connection_idx \
             ON {agents} (connection_id)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {jobs} (\
             id TEXT PRIMARY KEY, \
             tenant_id TEXT NOT NULL REFERENCES {tenants} (id) ON DELETE CASCADE, \
             chat_integration_id TEXT NOT NULL REFERENCES {integrations} (id) ON DELETE CASCADE, \
             channel_id TEXT NOT NULL, \
             thread_ts TEXT NOT NULL, \
             user_id TEXT NOT NULL, \
             created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
             updated_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
             UNIQUE (tenant_id, chat_integration_id, channel_id, thread_ts))"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {messages} (\
             id TEXT PRIMARY KEY, \
             job_id TEXT NOT NULL REFERENCES {jobs} (id) ON DELETE CASCADE, \
             tenant_id TEXT NOT NULL, \
             channel_id TEXT NOT NULL, \
             message_ts TEXT NOT NULL, \
             text TEXT NOT NULL, \
             status TEXT NOT NULL, \
             created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
             UNIQUE (job_id, message_ts))"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS processed_messages_status_idx \
             ON {messages} (tenant_id, status)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {assignments} (\
             tenant_id TEXT NOT NULL, \
             job_id TEXT NOT NULL REFERENCES {jobs} (id) ON DELETE CASCADE, \
             agent_id TEXT NOT NULL REFERENCES {agents} (id) ON DELETE CASCADE, \
             created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
             PRIMARY KEY (tenant_id, job_id))"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS job_assignments_agent_idx \
             ON {assignments} (agent_id)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {settings} (\
             tenant_id TEXT NOT NULL REFERENCES {tenants} (id) ON DELETE CASCADE, \
             key TEXT NOT NULL, \
             kind TEXT NOT NULL, \
             value_bool BOOLEAN, \
             value_string TEXT, \
             value_string_list TEXT[], \
             updated_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
             PRIMARY KEY (tenant_id, key))"
        ),
    ]
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
