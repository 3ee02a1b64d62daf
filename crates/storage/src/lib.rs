// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gf-storage: Postgres persistence for the Gaffer control plane.
//!
//! One connection pool, schema-scoped SQL, and typed per-entity stores.
//! Store functions take `&mut PgConnection` so the same call sites work
//! against a pool-acquired connection or inside a transaction; the
//! transaction handle is the request-scoped scope.

pub mod agents;
pub mod assignments;
pub mod db;
pub mod error;
pub mod integrations;
pub mod jobs;
pub mod messages;
pub mod records;
pub mod schema;
pub mod settings;
pub mod tenants;

pub use db::Db;
pub use error::StorageError;
pub use records::{
    ActiveAgent, ChatIntegration, Job, JobAssignment, MessageStatus, ProcessedMessage, Setting,
    SettingKey, SettingKind, SettingValue, Tenant, ThreadKey,
};
