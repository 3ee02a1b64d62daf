// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound agent envelopes.
//!
//! Every handler validates that the sending connection's agent owns the
//! job it names; envelopes from impostors or stale owners are dropped with
//! a warning, never acted on.

use gf_chat::mrkdwn;
use gf_chat::reactions::Reaction;
use gf_core::{JobId, ProcessedMessageId};
use gf_storage::{
    agents, assignments, integrations, jobs, messages, ChatIntegration, Job, StorageError,
};
use gf_wire::{WorkerEnvelope, WorkerMsg, AGENT_ERROR_PREFIX};
use tracing::{debug, warn};

use super::{reactions, Router, RouterError, EMPTY_RESPONSE_TEXT};
use crate::channel::ClientMeta;
use crate::cleanup;

impl Router {
    pub(crate) async fn handle_envelope(&self, meta: &ClientMeta, envelope: WorkerEnvelope) {
        let envelope_id = envelope.id;
        let result = match envelope.msg {
            WorkerMsg::ProcessingAck { processed_message_id } => {
                self.handle_processing_ack(meta, &processed_message_id).await
            }
            WorkerMsg::AssistantMessage { job_id, text, processed_message_id } => {
                self.handle_assistant_message(meta, &job_id, text, &processed_message_id).await
            }
            WorkerMsg::SystemMessage { job_id, text } => {
                self.handle_system_message(meta, &job_id, &text).await
            }
            WorkerMsg::JobComplete { job_id, reason } => {
                self.handle_job_complete(meta, &job_id, &reason).await
            }
            // handled by the sink before reaching the router
            WorkerMsg::HealthcheckAck {} => Ok(()),
        };
        if let Err(err) = result {
            err.escalate_invariants();
            warn!(
                envelope = %envelope_id,
                connection = %meta.connection_id,
                error = %err,
                "agent envelope handling failed"
            );
        }
    }

    /// The agent picked a queued message up: flip its reaction to working.
    async fn handle_processing_ack(
        &self,
        meta: &ClientMeta,
        pm_id: &ProcessedMessageId,
    ) -> Result<(), RouterError> {
        let (pm, integration) = {
            let mut conn = self.db.acquire().await?;
            let Some(pm) =
                messages::get(&mut conn, self.db.schema(), &meta.tenant_id, pm_id).await?
            else {
                debug!(message = %pm_id, "ack for unknown message");
                return Ok(());
            };
            let Some(job) =
                jobs::get(&mut conn, self.db.schema(), &meta.tenant_id, &pm.job_id).await?
            else {
                return Ok(());
            };
            let Some(integration) = integrations::get(
                &mut conn,
                self.db.schema(),
                &meta.tenant_id,
                &job.chat_integration_id,
            )
            .await?
            else {
                return Ok(());
            };
            (pm, integration)
        };
        reactions::set_status_reaction(
            self.chat.as_ref(),
            &integration.access_token,
            &pm.channel_id,
            &pm.message_ts,
            Reaction::Working,
        )
        .await?;
        Ok(())
    }

    async fn handle_assistant_message(
        &self,
        meta: &ClientMeta,
        job_id: &JobId,
        text: String,
        pm_id: &ProcessedMessageId,
    ) -> Result<(), RouterError> {
        let Some((job, integration)) = self.owned_job(meta, job_id).await? else {
            return Ok(());
        };
        let token = &integration.access_token;

        let body = if text.trim().is_empty() {
            EMPTY_RESPONSE_TEXT.to_string()
        } else {
            mrkdwn::to_mrkdwn(&text)
        };
        if let Err(err) =
            self.chat.post_message(token, &job.channel_id, Some(&job.thread_ts), &body).await
        {
            warn!(job = %job.id, error = %err, "assistant message did not post");
        }

        let (pm, latest_id) = {
            let mut conn = self.db.acquire().await?;
            match jobs::touch(&mut conn, self.db.schema(), &job.tenant_id, &job.id).await {
                Ok(()) => {}
                Err(StorageError::NotFound(_)) => return Ok(()),
                Err(err) => return Err(err.into()),
            }
            let Some(pm) =
                messages::get(&mut conn, self.db.schema(), &job.tenant_id, pm_id).await?
            else {
                debug!(message = %pm_id, "assistant reply names an unknown message");
                return Ok(());
            };
            messages::set_completed(&mut conn, self.db.schema(), &job.tenant_id, &pm.id).await?;
            let latest =
                messages::latest_for_job(&mut conn, self.db.schema(), &job.tenant_id, &job.id)
                    .await?;
            (pm, latest.map(|m| m.id))
        };

        if pm.message_ts != job.thread_ts {
            reactions::set_status_reaction(
                self.chat.as_ref(),
                token,
                &pm.channel_id,
                &pm.message_ts,
                Reaction::Completed,
            )
            .await?;
        }
        if latest_id == Some(pm.id) {
            // nothing left in flight for this job; hand the thread back
            reactions::set_status_reaction(
                self.chat.as_ref(),
                token,
                &job.channel_id,
                &job.thread_ts,
                Reaction::AwaitingUser,
            )
            .await?;
        }
        Ok(())
    }

    async fn handle_system_message(
        &self,
        meta: &ClientMeta,
        job_id: &JobId,
        text: &str,
    ) -> Result<(), RouterError> {
        let Some((job, integration)) = self.owned_job(meta, job_id).await? else {
            return Ok(());
        };

        if text.starts_with(AGENT_ERROR_PREFIX) {
            warn!(job = %job.id, "agent reported a fatal error; abandoning job");
            cleanup::fail_job(&self.db, self.chat.as_ref(), &job, cleanup::FATAL_ERROR_TEXT)
                .await?;
            return Ok(());
        }

        let body = format!(":gear: {}", mrkdwn::to_mrkdwn(text));
        if let Err(err) = self
            .chat
            .post_message(&integration.access_token, &job.channel_id, Some(&job.thread_ts), &body)
            .await
        {
            warn!(job = %job.id, error = %err, "system message did not post");
        }
        let mut conn = self.db.acquire().await?;
        match jobs::touch(&mut conn, self.db.schema(), &job.tenant_id, &job.id).await {
            Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn handle_job_complete(
        &self,
        meta: &ClientMeta,
        job_id: &JobId,
        reason: &str,
    ) -> Result<(), RouterError> {
        let Some((job, _)) = self.owned_job(meta, job_id).await? else {
            return Ok(());
        };
        cleanup::complete_job(&self.db, self.chat.as_ref(), &job, reason).await?;
        Ok(())
    }

    /// Resolve the job and integration iff the sending connection owns it.
    async fn owned_job(
        &self,
        meta: &ClientMeta,
        job_id: &JobId,
    ) -> Result<Option<(Job, ChatIntegration)>, RouterError> {
        let mut conn = self.db.acquire().await?;

        let Some(agent) =
            agents::get_by_connection_id(&mut conn, self.db.schema(), &meta.connection_id).await?
        else {
            warn!(connection = %meta.connection_id, "envelope from unregistered connection");
            return Ok(None);
        };
        let Some(job) = jobs::get(&mut conn, self.db.schema(), &meta.tenant_id, job_id).await?
        else {
            debug!(job = %job_id, "envelope names a job that no longer exists");
            return Ok(None);
        };
        let Some(assignment) =
            assignments::get_for_job(&mut conn, self.db.schema(), &meta.tenant_id, job_id).await?
        else {
            warn!(job = %job_id, "envelope for an unassigned job ignored");
            return Ok(None);
        };
        if assignment.agent_id != agent.id {
            warn!(
                job = %job_id,
                sender = %agent.id,
                owner = %assignment.agent_id,
                "envelope from an agent that does not own the job"
            );
            return Ok(None);
        }
        let Some(integration) = integrations::get(
            &mut conn,
            self.db.schema(),
            &meta.tenant_id,
            &job.chat_integration_id,
        )
        .await?
        else {
            warn!(job = %job_id, "job's chat integration is gone");
            return Ok(None);
        };
        Ok(Some((job, integration)))
    }
}
