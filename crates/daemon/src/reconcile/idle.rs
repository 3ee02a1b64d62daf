// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle-job prompt.
//!
//! Finds jobs whose threads have gone quiet while still held by an agent,
//! then asks each owning worker (once per tick) to self-poll its jobs and
//! report completion or failure. Stateless on the control plane side: the
//! worker answers with `SYSTEM_MESSAGE` or `JOB_COMPLETE` if anything
//! changed.

use std::collections::HashSet;

use gf_core::{ConnectionId, TenantId};
use gf_storage::{agents, jobs, StorageError};
use gf_wire::ServerMsg;
use tracing::{debug, warn};

use super::ReconcileCtx;

pub(crate) async fn tick(ctx: &ReconcileCtx) {
    for tenant in super::tenant_snapshot(ctx, "idle-prompt").await {
        if let Err(err) = tick_tenant(ctx, &tenant.id).await {
            crate::router::exit_on_invariant(&err);
            warn!(tenant = %tenant.id, error = %err, "idle prompt failed");
        }
    }
}

async fn tick_tenant(ctx: &ReconcileCtx, tenant: &TenantId) -> Result<(), StorageError> {
    let targets: HashSet<ConnectionId> = {
        let mut conn = ctx.db.acquire().await?;
        let idle =
            jobs::get_idle(&mut conn, ctx.db.schema(), tenant, ctx.idle_job_threshold_min)
                .await?;
        let mut targets = HashSet::new();
        for job in idle {
            if let Some(agent) =
                agents::get_by_job_id(&mut conn, ctx.db.schema(), tenant, &job.id).await?
            {
                targets.insert(agent.connection_id);
            }
        }
        targets
    };

    for connection in targets {
        if !ctx.channel.is_connected(&connection) {
            continue;
        }
        if let Err(err) = ctx.channel.send(&connection, ServerMsg::CheckIdleJobs {}).await {
            debug!(connection = %connection, error = %err, "idle prompt not delivered");
        }
    }
    Ok(())
}
