// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted entity records.
//!
//! Row mapping is hand-written (`FromRow`) because id columns are prefixed
//! strings and `status`/`kind` columns are closed sets stored as TEXT.

use chrono::{DateTime, Utc};
use gf_core::{
    AgentId, ChatIntegrationId, ConnectionId, JobId, ProcessedMessageId, TenantId, WorkerId,
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

/// Isolation boundary. Workers authenticate with the tenant secret.
#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
    pub id: TenantId,
    #[serde(skip_serializing)]
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

/// Per-tenant binding to one chat workspace.
#[derive(Debug, Clone, Serialize)]
pub struct ChatIntegration {
    pub id: ChatIntegrationId,
    pub tenant_id: TenantId,
    pub workspace_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

/// A currently registered worker. The row exists iff the control plane
/// believes the worker is connected or within the inactivity grace window.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveAgent {
    pub id: AgentId,
    pub tenant_id: TenantId,
    pub worker_id: WorkerId,
    pub connection_id: ConnectionId,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// (channel, thread timestamp): uniquely identifies a conversation within
/// one chat integration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ThreadKey {
    pub channel_id: String,
    pub thread_ts: String,
}

impl ThreadKey {
    pub fn new(channel_id: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        Self { channel_id: channel_id.into(), thread_ts: thread_ts.into() }
    }
}

/// A unit of work rooted in a single chat thread.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub chat_integration_id: ChatIntegrationId,
    pub channel_id: String,
    pub thread_ts: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn thread_key(&self) -> ThreadKey {
        ThreadKey::new(self.channel_id.clone(), self.thread_ts.clone())
    }
}

/// Processing state of a message the control plane took responsibility for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Queued,
    InProgress,
    Completed,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUEUED" => Some(Self::Queued),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A chat message under the control plane's responsibility.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedMessage {
    pub id: ProcessedMessageId,
    pub job_id: JobId,
    pub tenant_id: TenantId,
    pub channel_id: String,
    pub message_ts: String,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// Link row binding one job to one agent. Source of truth for "who owns
/// this job right now"; unique per (tenant, job).
#[derive(Debug, Clone, Serialize)]
pub struct JobAssignment {
    pub tenant_id: TenantId,
    pub job_id: JobId,
    pub agent_id: AgentId,
    pub created_at: DateTime<Utc>,
}

/// Value kind of a tenant setting. One explicit column per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    Bool,
    String,
    StringList,
}

impl SettingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::StringList => "string_list",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bool" => Some(Self::Bool),
            "string" => Some(Self::String),
            "string_list" => Some(Self::StringList),
            _ => None,
        }
    }
}

/// The closed registry of recognized setting keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    /// Post a system reply when a message is queued with no agent live.
    NotifyOnQueue,
    /// Branch name prefix forwarded to workers on new conversations.
    BranchPrefix,
    /// Channels jobs may start from; empty admits all.
    AllowedChannels,
}

impl SettingKey {
    pub const ALL: [SettingKey; 3] =
        [Self::NotifyOnQueue, Self::BranchPrefix, Self::AllowedChannels];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotifyOnQueue => "notify_on_queue",
            Self::BranchPrefix => "branch_prefix",
            Self::AllowedChannels => "allowed_channels",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "notify_on_queue" => Some(Self::NotifyOnQueue),
            "branch_prefix" => Some(Self::BranchPrefix),
            "allowed_channels" => Some(Self::AllowedChannels),
            _ => None,
        }
    }

    /// The kind this key's value must have.
    pub fn kind(self) -> SettingKind {
        match self {
            Self::NotifyOnQueue => SettingKind::Bool,
            Self::BranchPrefix => SettingKind::String,
            Self::AllowedChannels => SettingKind::StringList,
        }
    }
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    String(String),
    StringList(Vec<String>),
}

impl SettingValue {
    pub fn kind(&self) -> SettingKind {
        match self {
            Self::Bool(_) => SettingKind::Bool,
            Self::String(_) => SettingKind::String,
            Self::StringList(_) => SettingKind::StringList,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Self::StringList(v) => Some(v),
            _ => None,
        }
    }
}

/// A persisted per-tenant setting row.
#[derive(Debug, Clone, Serialize)]
pub struct Setting {
    pub tenant_id: TenantId,
    pub key: SettingKey,
    pub value: SettingValue,
    pub updated_at: DateTime<Utc>,
}

// --- row mapping ---

fn decode_err(column: &str, detail: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode { index: column.to_string(), source: detail.into() }
}

impl FromRow<'_, PgRow> for Tenant {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: TenantId::from(row.try_get::<String, _>("id")?),
            secret: row.try_get("secret")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for ChatIntegration {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: ChatIntegrationId::from(row.try_get::<String, _>("id")?),
            tenant_id: TenantId::from(row.try_get::<String, _>("tenant_id")?),
            workspace_id: row.try_get("workspace_id")?,
            access_token: row.try_get("access_token")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for ActiveAgent {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: AgentId::from(row.try_get::<String, _>("id")?),
            tenant_id: TenantId::from(row.try_get::<String, _>("tenant_id")?),
            worker_id: WorkerId::from(row.try_get::<String, _>("worker_id")?),
            connection_id: ConnectionId::from(row.try_get::<String, _>("connection_id")?),
            last_active_at: row.try_get("last_active_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for Job {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: JobId::from(row.try_get::<String, _>("id")?),
            tenant_id: TenantId::from(row.try_get::<String, _>("tenant_id")?),
            chat_integration_id: ChatIntegrationId::from(
                row.try_get::<String, _>("chat_integration_id")?,
            ),
            channel_id: row.try_get("channel_id")?,
            thread_ts: row.try_get("thread_ts")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for ProcessedMessage {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let status_text: String = row.try_get("status")?;
        let status = MessageStatus::parse(&status_text)
            .ok_or_else(|| decode_err("status", format!("unknown status {status_text:?}")))?;
        Ok(Self {
            id: ProcessedMessageId::from(row.try_get::<String, _>("id")?),
            job_id: JobId::from(row.try_get::<String, _>("job_id")?),
            tenant_id: TenantId::from(row.try_get::<String, _>("tenant_id")?),
            channel_id: row.try_get("channel_id")?,
            message_ts: row.try_get("message_ts")?,
            text: row.try_get("text")?,
            status,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for JobAssignment {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            tenant_id: TenantId::from(row.try_get::<String, _>("tenant_id")?),
            job_id: JobId::from(row.try_get::<String, _>("job_id")?),
            agent_id: AgentId::from(row.try_get::<String, _>("agent_id")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow<'_, PgRow> for Setting {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let key_text: String = row.try_get("key")?;
        let key = SettingKey::parse(&key_text)
            .ok_or_else(|| decode_err("key", format!("unregistered setting key {key_text:?}")))?;
        let kind_text: String = row.try_get("kind")?;
        let kind = SettingKind::parse(&kind_text)
            .ok_or_else(|| decode_err("kind", format!("unknown setting kind {kind_text:?}")))?;
        let value = match kind {
            SettingKind::Bool => SettingValue::Bool(
                row.try_get::<Option<bool>, _>("value_bool")?
                    .ok_or_else(|| decode_err("value_bool", "null bool value".to_string()))?,
            ),
            SettingKind::String => SettingValue::String(
                row.try_get::<Option<String>, _>("value_string")?
                    .ok_or_else(|| decode_err("value_string", "null string value".to_string()))?,
            ),
            SettingKind::StringList => SettingValue::StringList(
                row.try_get::<Option<Vec<String>>, _>("value_string_list")?.ok_or_else(|| {
                    decode_err("value_string_list", "null string list value".to_string())
                })?,
            ),
        };
        Ok(Self {
            tenant_id: TenantId::from(row.try_get::<String, _>("tenant_id")?),
            key,
            value,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
