// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher: pick the least-loaded live agent for a job.
//!
//! Pure policy over the stores and the gateway's live set. The assignment
//! row's uniqueness is the only serialization point; a conflict means a
//! concurrent caller won and we adopt their choice.

use gf_core::{AgentId, JobId, TenantId};
use gf_storage::{agents, assignments, ActiveAgent, Db, Job, StorageError};
use tracing::debug;

use crate::channel::ChannelHandle;
use crate::registry::AgentRegistry;

/// Resolve the agent for a job, assigning one if the job is unbound.
///
/// A job whose assigned agent is offline yields `None`: no stealing; the
/// binding only clears through the deregister path.
pub async fn get_or_assign(
    db: &Db,
    registry: &AgentRegistry,
    channel: &ChannelHandle,
    job: &Job,
) -> Result<Option<ActiveAgent>, StorageError> {
    {
        let mut conn = db.acquire().await?;
        if let Some(assignment) =
            assignments::get_for_job(&mut conn, db.schema(), &job.tenant_id, &job.id).await?
        {
            let agent =
                agents::get(&mut conn, db.schema(), &job.tenant_id, &assignment.agent_id).await?;
            return Ok(agent.filter(|a| channel.is_connected(&a.connection_id)));
        }
    }
    try_assign(db, registry, channel, &job.tenant_id, &job.id).await
}

/// Assign an unbound job to the least-loaded connected agent.
pub async fn try_assign(
    db: &Db,
    registry: &AgentRegistry,
    channel: &ChannelHandle,
    tenant: &TenantId,
    job_id: &JobId,
) -> Result<Option<ActiveAgent>, StorageError> {
    // double-check under the same tenant scope
    {
        let mut conn = db.acquire().await?;
        if let Some(assignment) =
            assignments::get_for_job(&mut conn, db.schema(), tenant, job_id).await?
        {
            let agent = agents::get(&mut conn, db.schema(), tenant, &assignment.agent_id).await?;
            return Ok(agent.filter(|a| channel.is_connected(&a.connection_id)));
        }
    }

    let candidates = registry.connected_agents(tenant).await?;
    if candidates.is_empty() {
        return Ok(None);
    }

    let mut conn = db.acquire().await?;
    let mut loads = Vec::with_capacity(candidates.len());
    for agent in &candidates {
        let count = assignments::count_for_agent(&mut conn, db.schema(), &agent.id).await?;
        loads.push((agent.id, count));
    }
    let Some(winner_id) = pick_least_loaded(&loads) else {
        return Ok(None);
    };
    let Some(winner) = candidates.into_iter().find(|a| a.id == winner_id) else {
        return Ok(None);
    };

    match assignments::insert(&mut conn, db.schema(), tenant, job_id, &winner.id).await {
        Ok(_) => {
            debug!(job = %job_id, agent = %winner.id, "job assigned");
            Ok(Some(winner))
        }
        Err(err) if err.is_conflict() => {
            // lost the race; adopt the concurrent winner
            match assignments::get_for_job(&mut conn, db.schema(), tenant, job_id).await? {
                Some(assignment) => {
                    agents::get(&mut conn, db.schema(), tenant, &assignment.agent_id).await
                }
                None => Ok(None),
            }
        }
        Err(err) => Err(err),
    }
}

/// Smallest load wins; ties break on agent id ascending so dispatch is
/// deterministic under test.
pub fn pick_least_loaded(loads: &[(AgentId, i64)]) -> Option<AgentId> {
    loads
        .iter()
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(id, _)| *id)
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
