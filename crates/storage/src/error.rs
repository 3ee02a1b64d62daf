// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error taxonomy.

use thiserror::Error;

/// Errors from the persistence layer.
///
/// Lookups that may miss return `Ok(None)`, never `NotFound`; `NotFound`
/// means a mutation targeted no row. `Conflict` is a uniqueness violation
/// the caller interprets (usually "re-read and treat as success").
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict on {0}")]
    Conflict(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl StorageError {
    /// Map an insert error, converting unique violations into `Conflict(what)`.
    pub(crate) fn on_insert(err: sqlx::Error, what: &'static str) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict(what)
        } else {
            Self::Db(err)
        }
    }

    /// True for `Conflict`, which callers usually resolve by re-reading.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.kind() == sqlx::error::ErrorKind::UniqueViolation)
}
