// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background reconciliation loops.
//!
//! Three timers with their own cancellable scopes: the idle-job prompt, the
//! queued-message drain, and the inactive-agent reaper. Every loop iterates
//! tenants on a snapshot, logs per-tenant failures, and keeps going; a
//! failing tenant never stalls the others.

pub mod drain;
pub mod idle;
pub mod reaper;

use std::sync::Arc;
use std::time::Duration;

use gf_chat::ChatClient;
use gf_storage::{tenants, Db, Tenant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channel::ChannelHandle;
use crate::registry::AgentRegistry;

/// Shared dependencies for all three loops.
pub struct ReconcileCtx {
    pub db: Db,
    pub chat: Arc<dyn ChatClient>,
    pub channel: ChannelHandle,
    pub registry: Arc<AgentRegistry>,
    /// Minutes of thread silence before a held job counts as idle.
    pub idle_job_threshold_min: i64,
    /// Minutes without liveness before an agent row is reaped.
    pub inactivity_threshold_min: i64,
}

/// Loop intervals, from config.
#[derive(Debug, Clone, Copy)]
pub struct Ticks {
    pub idle: Duration,
    pub drain: Duration,
    pub reaper: Duration,
}

/// Which of the three loops a task runs.
#[derive(Debug, Clone, Copy)]
enum Loop {
    IdlePrompt,
    QueueDrain,
    Reaper,
}

impl Loop {
    fn name(self) -> &'static str {
        match self {
            Self::IdlePrompt => "idle-prompt",
            Self::QueueDrain => "queue-drain",
            Self::Reaper => "reaper",
        }
    }
}

/// Spawn the three loops under child scopes of `cancel`.
pub fn spawn_loops(
    ctx: Arc<ReconcileCtx>,
    ticks: Ticks,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    vec![
        spawn_one(Loop::IdlePrompt, ticks.idle, Arc::clone(&ctx), cancel.child_token()),
        spawn_one(Loop::QueueDrain, ticks.drain, Arc::clone(&ctx), cancel.child_token()),
        spawn_one(Loop::Reaper, ticks.reaper, ctx, cancel.child_token()),
    ]
}

fn spawn_one(
    which: Loop,
    interval: Duration,
    ctx: Arc<ReconcileCtx>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first interval tick fires immediately; skip it so startup
        // isn't a thundering herd of reconciliation
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match which {
                    Loop::IdlePrompt => idle::tick(&ctx).await,
                    Loop::QueueDrain => drain::tick(&ctx).await,
                    Loop::Reaper => reaper::tick(&ctx).await,
                },
            }
        }
        debug!(name = which.name(), "reconcile loop stopped");
    })
}

/// Tenant snapshot for one tick; empty (with a warning) when the store is
/// unreachable so the loop just tries again next tick.
pub(crate) async fn tenant_snapshot(ctx: &ReconcileCtx, loop_name: &str) -> Vec<Tenant> {
    let mut conn = match ctx.db.acquire().await {
        Ok(conn) => conn,
        Err(err) => {
            warn!(loop_name, error = %err, "tick skipped: no connection");
            return Vec::new();
        }
    };
    match tenants::list(&mut conn, ctx.db.schema()).await {
        Ok(tenants) => tenants,
        Err(err) => {
            warn!(loop_name, error = %err, "tick skipped: tenant list failed");
            Vec::new()
        }
    }
}
