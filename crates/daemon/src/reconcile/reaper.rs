// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inactive-agent reaper.
//!
//! Deletes agent rows whose `last_active_at` fell past the threshold. The
//! delete cascades to the agent's assignments, freeing those jobs for the
//! drain loop; the jobs themselves are kept (their owner may reconnect, or
//! the user closes the thread).

use gf_core::TenantId;
use gf_storage::{agents, StorageError};
use tracing::{info, warn};

use gf_core::format_utc;

use super::ReconcileCtx;

pub(crate) async fn tick(ctx: &ReconcileCtx) {
    for tenant in super::tenant_snapshot(ctx, "reaper").await {
        if let Err(err) = tick_tenant(ctx, &tenant.id).await {
            crate::router::exit_on_invariant(&err);
            warn!(tenant = %tenant.id, error = %err, "reaper failed");
        }
    }
}

async fn tick_tenant(ctx: &ReconcileCtx, tenant: &TenantId) -> Result<(), StorageError> {
    let mut conn = ctx.db.acquire().await?;
    let inactive =
        agents::get_inactive(&mut conn, ctx.db.schema(), tenant, ctx.inactivity_threshold_min)
            .await?;

    for agent in inactive {
        info!(
            agent = %agent.id,
            worker = %agent.worker_id,
            last_active = %format_utc(agent.last_active_at),
            "reaping inactive agent"
        );
        match agents::delete(&mut conn, ctx.db.schema(), &agent.id).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(err) => {
                warn!(agent = %agent.id, error = %err, "reap failed");
                continue;
            }
        }
        // sever any half-dead socket so the worker reconnects cleanly; the
        // disconnect hook finds no row and does nothing further
        ctx.channel.close(&agent.connection_id);
    }
    Ok(())
}
