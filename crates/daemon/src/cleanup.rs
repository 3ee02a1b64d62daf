// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared job teardown.
//!
//! Failure (abandonment) and completion both end the same way: unassign,
//! delete the job and its messages in one transaction scope, then update
//! the thread. Chat calls run after commit and are best-effort; a failed
//! post must never wedge the state machine.

use gf_chat::reactions::Reaction;
use gf_chat::ChatClient;
use gf_storage::{assignments, integrations, jobs, messages, Db, Job, StorageError};
use tracing::{debug, info, warn};

use crate::router::reactions::set_status_reaction;

/// Posted into a thread whose agent dropped off the channel.
pub const DISCONNECT_FAILURE_TEXT: &str =
    ":warning: The agent working on this job disconnected. Job abandoned.";

/// Posted into a thread whose agent reported a fatal error.
pub const FATAL_ERROR_TEXT: &str =
    ":warning: The agent reported a fatal error. Job abandoned.";

/// Posted when the originating user closes the job with a reaction.
pub const USER_COMPLETED_TEXT: &str = "Job marked complete.";

/// Tear a job down as failed: unassign, delete, then mark the thread.
pub async fn fail_job(
    db: &Db,
    chat: &dyn ChatClient,
    job: &Job,
    failure_text: &str,
) -> Result<(), StorageError> {
    let token = integration_token(db, job).await?;

    if !teardown(db, job).await? {
        debug!(job = %job.id, "fail requested for a job already gone");
        return Ok(());
    }
    info!(job = %job.id, "job abandoned");

    if let Some(token) = token {
        if let Err(err) =
            chat.post_message(&token, &job.channel_id, Some(&job.thread_ts), failure_text).await
        {
            warn!(job = %job.id, error = %err, "failure message did not post");
        }
        if let Err(err) =
            set_status_reaction(chat, &token, &job.channel_id, &job.thread_ts, Reaction::Failed)
                .await
        {
            warn!(job = %job.id, error = %err, "failed reaction did not apply");
        }
    }
    Ok(())
}

/// Tear a job down as completed and post the reason into the thread.
pub async fn complete_job(
    db: &Db,
    chat: &dyn ChatClient,
    job: &Job,
    reason: &str,
) -> Result<(), StorageError> {
    let token = integration_token(db, job).await?;

    if !teardown(db, job).await? {
        debug!(job = %job.id, "complete requested for a job already gone");
        return Ok(());
    }
    info!(job = %job.id, "job completed");

    if let Some(token) = token {
        if let Err(err) = set_status_reaction(
            chat,
            &token,
            &job.channel_id,
            &job.thread_ts,
            Reaction::Completed,
        )
        .await
        {
            warn!(job = %job.id, error = %err, "completed reaction did not apply");
        }
        let text = format!(":gear: {reason}");
        if let Err(err) =
            chat.post_message(&token, &job.channel_id, Some(&job.thread_ts), &text).await
        {
            warn!(job = %job.id, error = %err, "completion message did not post");
        }
    }
    Ok(())
}

/// One transaction scope: unassign, drop messages, drop the job.
/// Returns false when the job row was already gone (idempotent teardown).
async fn teardown(db: &Db, job: &Job) -> Result<bool, StorageError> {
    let mut tx = db.begin().await?;
    assignments::delete_for_job(&mut tx, db.schema(), &job.tenant_id, &job.id).await?;
    messages::delete_for_job(&mut tx, db.schema(), &job.tenant_id, &job.id).await?;
    match jobs::delete(&mut tx, db.schema(), &job.tenant_id, &job.id).await {
        Ok(()) => {}
        Err(StorageError::NotFound(_)) => return Ok(false),
        Err(err) => return Err(err),
    }
    tx.commit().await?;
    Ok(true)
}

async fn integration_token(db: &Db, job: &Job) -> Result<Option<String>, StorageError> {
    let mut conn = db.acquire().await?;
    let integration =
        integrations::get(&mut conn, db.schema(), &job.tenant_id, &job.chat_integration_id)
            .await?;
    if integration.is_none() {
        warn!(job = %job.id, "job has no chat integration; thread left untouched");
    }
    Ok(integration.map(|i| i.access_token))
}
