// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection pool and transaction scope.

use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::StorageError;

/// Postgres gateway: one pool plus the schema every query is scoped to.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
    schema: String,
}

impl Db {
    /// Connect a pool and validate the schema identifier.
    pub async fn connect(
        url: &str,
        schema: &str,
        max_connections: u32,
    ) -> Result<Self, StorageError> {
        validate_schema_ident(schema)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await?;
        Ok(Self { pool, schema: schema.to_string() })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out a connection for a sequence of store calls.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, StorageError> {
        Ok(self.pool.acquire().await?)
    }

    /// Open a transaction scope. Every store call made with the returned
    /// handle sees the same transactional state; drop without commit rolls
    /// back.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, StorageError> {
        Ok(self.pool.begin().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Qualify a table name with the configured schema.
pub(crate) fn table(schema: &str, name: &str) -> String {
    format!("\"{schema}\".\"{name}\"")
}

/// Schema names are interpolated into SQL, so they must be plain
/// identifiers. Anything else is a programmer error, not caller input.
fn validate_schema_ident(schema: &str) -> Result<(), StorageError> {
    let ok = !schema.is_empty()
        && schema.len() <= 63
        && schema.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && schema.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::Invariant(format!("bad schema identifier: {schema:?}")))
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
