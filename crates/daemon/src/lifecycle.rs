// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervisor: assemble once, serve, shut down in order.
//!
//! Shutdown sequence on SIGINT/SIGTERM: cancel the parent scope, give the
//! reconcilers and the HTTP server a bounded drain window, then close the
//! channel gateway so every connection runs its deregister hook before the
//! process exits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gf_chat::{ChatClient, ChatError, SlackClient};
use gf_core::{format_elapsed_ms, SystemClock};
use gf_storage::{schema, Db, StorageError};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::channel::{ChannelEvents, ChannelHandle};
use crate::env::{Config, ConfigError};
use crate::http::{self, AppState};
use crate::reconcile::{self, ReconcileCtx, Ticks};
use crate::registry::AgentRegistry;
use crate::router::{ChannelSink, Router};

/// Pool size for the control plane's single writer process.
const DB_POOL_SIZE: u32 = 10;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("chat client error: {0}")]
    Chat(#[from] ChatError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    /// 1 for config/startup failures, 2 for invariant violations.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Storage(StorageError::Invariant(_)) => 2,
            _ => 1,
        }
    }
}

/// Run the control plane until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    let started = Instant::now();

    let db = Db::connect(&config.database_url, &config.db_schema, DB_POOL_SIZE).await?;
    schema::ensure_schema(&db).await?;

    let chat: Arc<dyn ChatClient> = Arc::new(SlackClient::new()?);
    let channel = ChannelHandle::new();
    let registry =
        Arc::new(AgentRegistry::new(db.clone(), Arc::clone(&chat), channel.clone()));
    let router = Arc::new(Router::new(
        db.clone(),
        Arc::clone(&chat),
        channel.clone(),
        Arc::clone(&registry),
    ));
    let events: Arc<dyn ChannelEvents> =
        Arc::new(ChannelSink::new(Arc::clone(&registry), Arc::clone(&router)));

    let config = Arc::new(config);
    let state = AppState {
        db: db.clone(),
        channel: channel.clone(),
        events,
        router,
        clock: SystemClock,
        config: Arc::clone(&config),
    };

    let cancel = CancellationToken::new();

    let listener = TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    let app = http::build_router(state);

    let loops = reconcile::spawn_loops(
        Arc::new(ReconcileCtx {
            db: db.clone(),
            chat,
            channel: channel.clone(),
            registry,
            idle_job_threshold_min: config.idle_job_threshold_min,
            inactivity_threshold_min: config.inactivity_threshold_min,
        }),
        Ticks { idle: config.idle_tick, drain: config.drain_tick, reaper: config.reaper_tick },
        &cancel,
    );

    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    info!(
        port = config.http_port,
        schema = %config.db_schema,
        startup = %format_elapsed_ms(started.elapsed().as_millis() as u64),
        "control plane ready"
    );

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");
    cancel.cancel();

    let drain = config.drain_timeout;

    // 1. reconcilers finish their in-flight tick
    if tokio::time::timeout(drain, async {
        for handle in loops {
            let _ = handle.await;
        }
    })
    .await
    .is_err()
    {
        warn!("reconcilers did not stop within the drain budget");
    }

    // 2. the HTTP server stops accepting and drains handlers
    match tokio::time::timeout(drain, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => warn!(error = %err, "server exited with an error"),
        Ok(Err(err)) => warn!(error = %err, "server task panicked"),
        Err(_) => warn!("server did not drain within the budget"),
    }

    // 3. close the gateway last so deregister hooks still have storage
    let closing = channel.close_all();
    if closing > 0 {
        info!(connections = closing, "closing channel gateway");
        let _ = tokio::time::timeout(drain, async {
            while !channel.connected_ids().is_empty() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;
    }

    db.close().await;
    info!("shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable; interrupt only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
