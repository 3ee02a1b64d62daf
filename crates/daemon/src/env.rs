// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    File(PathBuf),
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection URL (`GAFFER_DATABASE_URL`, required).
    pub database_url: String,
    /// Schema all tables live in (`GAFFER_DB_SCHEMA`, default `gaffer`).
    pub db_schema: String,
    /// HTTP port serving the webhook and the worker channel
    /// (`GAFFER_HTTP_PORT`, default 8080).
    pub http_port: u16,
    /// CORS origins for the HTTP surface (`GAFFER_ALLOWED_ORIGINS`, comma
    /// separated; empty means no cross-origin access).
    pub allowed_origins: Vec<String>,
    /// Chat webhook signing secret (`GAFFER_SIGNING_SECRET`). Absent in
    /// non-strict mode disables the webhook route instead of failing.
    pub signing_secret: Option<String>,
    /// OAuth client credentials for the out-of-scope install flow; carried
    /// in config so operators keep one environment
    /// (`GAFFER_CHAT_CLIENT_ID` / `GAFFER_CHAT_CLIENT_SECRET`).
    pub chat_client_id: Option<String>,
    pub chat_client_secret: Option<String>,
    /// `GAFFER_LOG`: `stderr` (default) or a file path.
    pub log: LogDestination,
    /// `GAFFER_STRICT`: missing integration credentials fail startup
    /// instead of disabling that integration at runtime.
    pub strict: bool,

    /// Reconciler intervals (`GAFFER_IDLE_TICK_MS`, `GAFFER_DRAIN_TICK_MS`,
    /// `GAFFER_REAPER_TICK_MS`).
    pub idle_tick: Duration,
    pub drain_tick: Duration,
    pub reaper_tick: Duration,
    /// Minutes of thread silence before the idle prompt nudges a worker
    /// (`GAFFER_IDLE_JOB_THRESHOLD_MIN`).
    pub idle_job_threshold_min: i64,
    /// Minutes without a liveness ping before an agent row is reaped
    /// (`GAFFER_INACTIVITY_THRESHOLD_MIN`).
    pub inactivity_threshold_min: i64,
    /// Shutdown drain budget (`GAFFER_DRAIN_TIMEOUT_MS`).
    pub drain_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("strict mode: {0} must be set")]
    StrictMissing(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let strict = bool_var("GAFFER_STRICT")?;
        let signing_secret = var("GAFFER_SIGNING_SECRET");
        if strict && signing_secret.is_none() {
            return Err(ConfigError::StrictMissing("GAFFER_SIGNING_SECRET"));
        }

        Ok(Self {
            database_url: var("GAFFER_DATABASE_URL")
                .ok_or(ConfigError::Missing("GAFFER_DATABASE_URL"))?,
            db_schema: var("GAFFER_DB_SCHEMA").unwrap_or_else(|| "gaffer".to_string()),
            http_port: parse_var("GAFFER_HTTP_PORT")?.unwrap_or(8080),
            allowed_origins: var("GAFFER_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            signing_secret,
            chat_client_id: var("GAFFER_CHAT_CLIENT_ID"),
            chat_client_secret: var("GAFFER_CHAT_CLIENT_SECRET"),
            log: match var("GAFFER_LOG") {
                None => LogDestination::Stderr,
                Some(raw) if raw == "stderr" => LogDestination::Stderr,
                Some(path) => LogDestination::File(PathBuf::from(path)),
            },
            strict,
            idle_tick: ms_var("GAFFER_IDLE_TICK_MS", Duration::from_secs(30))?,
            drain_tick: ms_var("GAFFER_DRAIN_TICK_MS", Duration::from_secs(10))?,
            reaper_tick: ms_var("GAFFER_REAPER_TICK_MS", Duration::from_secs(60))?,
            idle_job_threshold_min: parse_var("GAFFER_IDLE_JOB_THRESHOLD_MIN")?.unwrap_or(5),
            inactivity_threshold_min: parse_var("GAFFER_INACTIVITY_THRESHOLD_MIN")?.unwrap_or(10),
            drain_timeout: ms_var("GAFFER_DRAIN_TIMEOUT_MS", Duration::from_secs(5))?,
        })
    }
}

/// Read a variable, treating empty as unset.
fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match var(key) {
        None => Ok(None),
        Some(raw) => {
            raw.parse().map(Some).map_err(|_| ConfigError::Invalid { key, value: raw })
        }
    }
}

fn ms_var(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    Ok(parse_var::<u64>(key)?.map(Duration::from_millis).unwrap_or(default))
}

fn bool_var(key: &'static str) -> Result<bool, ConfigError> {
    match var(key).as_deref() {
        None => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(ConfigError::Invalid { key, value: other.to_string() }),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
