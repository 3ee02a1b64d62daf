// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue drain.
//!
//! Replays work that was queued while no agent was online. For each job
//! holding QUEUED messages: assign an agent, then move the messages to
//! IN_PROGRESS in insertion order and ship them. The exactly-once
//! transition guards against overlapping ticks; the loser of the race
//! simply skips the message.

use gf_chat::reactions::Reaction;
use gf_core::TenantId;
use gf_storage::{integrations, jobs, messages, settings, Job, SettingKey};
use gf_wire::ServerMsg;
use tracing::{debug, warn};

use super::ReconcileCtx;
use crate::dispatch;
use crate::router::reactions::set_status_reaction;
use crate::router::RouterError;

pub(crate) async fn tick(ctx: &ReconcileCtx) {
    for tenant in super::tenant_snapshot(ctx, "queue-drain").await {
        if let Err(err) = tick_tenant(ctx, &tenant.id).await {
            err.escalate_invariants();
            warn!(tenant = %tenant.id, error = %err, "queue drain failed");
        }
    }
}

async fn tick_tenant(ctx: &ReconcileCtx, tenant: &TenantId) -> Result<(), RouterError> {
    let drainable = {
        let mut conn = ctx.db.acquire().await?;
        jobs::list_with_queued(&mut conn, ctx.db.schema(), tenant).await?
    };
    for job in drainable {
        if let Err(err) = drain_job(ctx, &job).await {
            err.escalate_invariants();
            warn!(job = %job.id, error = %err, "drain failed for job");
        }
    }
    Ok(())
}

async fn drain_job(ctx: &ReconcileCtx, job: &Job) -> Result<(), RouterError> {
    let Some(agent) =
        dispatch::try_assign(&ctx.db, &ctx.registry, &ctx.channel, &job.tenant_id, &job.id)
            .await?
    else {
        return Ok(());
    };
    if !ctx.channel.is_connected(&agent.connection_id) {
        // bound to an owner that is offline again; next tick retries
        return Ok(());
    }

    let (token, queued, completed, branch_prefix) = {
        let mut conn = ctx.db.acquire().await?;
        let Some(integration) = integrations::get(
            &mut conn,
            ctx.db.schema(),
            &job.tenant_id,
            &job.chat_integration_id,
        )
        .await?
        else {
            warn!(job = %job.id, "drainable job has no chat integration");
            return Ok(());
        };
        let queued =
            messages::list_queued_for_job(&mut conn, ctx.db.schema(), &job.tenant_id, &job.id)
                .await?;
        let completed = messages::count_completed_for_job(
            &mut conn,
            ctx.db.schema(),
            &job.tenant_id,
            &job.id,
        )
        .await?;
        let branch_prefix =
            settings::get(&mut conn, ctx.db.schema(), &job.tenant_id, SettingKey::BranchPrefix)
                .await?
                .and_then(|v| v.as_string().map(str::to_string));
        (integration.access_token, queued, completed, branch_prefix)
    };

    let permalink = match ctx.chat.permalink(&token, &job.channel_id, &job.thread_ts).await {
        Ok(link) => link,
        Err(err) => {
            warn!(job = %job.id, error = %err, "permalink unavailable");
            String::new()
        }
    };

    // the conversation exists once anything completed on this job
    let mut conversation_open = completed > 0;
    for pm in queued {
        let transitioned = {
            let mut conn = ctx.db.acquire().await?;
            messages::mark_in_progress(&mut conn, ctx.db.schema(), &job.tenant_id, &pm.id)
                .await?
        };
        if !transitioned {
            // another tick replayed this message already
            debug!(message = %pm.id, "skipping concurrently drained message");
            continue;
        }

        if let Err(err) = set_status_reaction(
            ctx.chat.as_ref(),
            &token,
            &pm.channel_id,
            &pm.message_ts,
            Reaction::Working,
        )
        .await
        {
            warn!(message = %pm.id, error = %err, "working reaction did not apply");
        }

        let out = if conversation_open {
            ServerMsg::UserMessage {
                job_id: job.id,
                processed_message_id: pm.id,
                message: pm.text.clone(),
                permalink: permalink.clone(),
            }
        } else {
            ServerMsg::StartConversation {
                job_id: job.id,
                processed_message_id: pm.id,
                message: pm.text.clone(),
                permalink: permalink.clone(),
                branch_prefix: branch_prefix.clone(),
            }
        };
        if let Err(err) = ctx.channel.send(&agent.connection_id, out).await {
            warn!(job = %job.id, error = %err, "drain envelope not delivered");
            break;
        }
        conversation_open = true;
    }
    Ok(())
}
