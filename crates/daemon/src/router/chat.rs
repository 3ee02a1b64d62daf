// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound chat events: mentions, messages, and completion reactions.

use std::collections::HashMap;

use gf_chat::events::{InboundEvent, MessageEvent, ReactionAddedEvent};
use gf_chat::mrkdwn;
use gf_chat::reactions::{is_completion_reaction, Reaction};
use gf_storage::messages::NewMessage;
use gf_storage::{
    integrations, jobs, messages, settings, ChatIntegration, MessageStatus, SettingKey,
    SettingValue, StorageError, ThreadKey,
};
use gf_wire::ServerMsg;
use tracing::{debug, info, warn};

use super::{reactions, Router, RouterError, QUEUED_NOTICE_TEXT, REPLY_WITHOUT_JOB_TEXT};
use crate::{cleanup, dispatch};

impl Router {
    /// Entry point from the webhook. Errors are logged here; the webhook
    /// has already been acknowledged.
    pub async fn handle_chat_event(&self, integration: &ChatIntegration, event: InboundEvent) {
        let result = match event {
            InboundEvent::AppMention(msg) | InboundEvent::Message(msg) => {
                self.handle_message(integration, msg).await
            }
            InboundEvent::ReactionAdded(ev) => self.handle_reaction_added(integration, ev).await,
            InboundEvent::AppUninstalled {} => self.handle_app_uninstalled(integration).await,
            InboundEvent::Other => Ok(()),
        };
        if let Err(err) = result {
            err.escalate_invariants();
            warn!(integration = %integration.id, error = %err, "chat event handling failed");
        }
    }

    pub(crate) async fn handle_message(
        &self,
        integration: &ChatIntegration,
        msg: MessageEvent,
    ) -> Result<(), RouterError> {
        // bot echoes and system chatter are never work
        if msg.bot_id.is_some() || msg.user.is_empty() {
            return Ok(());
        }
        let token = integration.access_token.clone();
        let bot = self.bot_user_id(&token).await?;
        if msg.user == bot {
            return Ok(());
        }

        let thread = ThreadKey::new(&msg.channel, msg.thread_key_ts());

        let mut conn = self.db.acquire().await?;

        if let Some(SettingValue::StringList(allowed)) = settings::get(
            &mut conn,
            self.db.schema(),
            &integration.tenant_id,
            SettingKey::AllowedChannels,
        )
        .await?
        {
            if !allowed.is_empty() && !allowed.contains(&msg.channel) {
                debug!(channel = %msg.channel, "channel not in allow-list; ignoring");
                return Ok(());
            }
        }

        let (job, created) = if msg.is_thread_reply() {
            match jobs::get_for_thread(
                &mut conn,
                self.db.schema(),
                &integration.tenant_id,
                &integration.id,
                &thread,
            )
            .await?
            {
                Some(job) => (job, false),
                None => {
                    drop(conn);
                    if let Err(err) = self
                        .chat
                        .post_message(
                            &token,
                            &msg.channel,
                            Some(&thread.thread_ts),
                            REPLY_WITHOUT_JOB_TEXT,
                        )
                        .await
                    {
                        warn!(error = %err, "dead-thread reply notice did not post");
                    }
                    return Ok(());
                }
            }
        } else {
            jobs::get_or_create_for_thread(
                &mut conn,
                self.db.schema(),
                &integration.tenant_id,
                &integration.id,
                &thread,
                &msg.user,
            )
            .await?
        };
        drop(conn);

        let stripped = mrkdwn::strip_leading_mention(&msg.text, &bot);
        let resolved = self.resolve_text(&token, &stripped).await;

        let assigned =
            dispatch::get_or_assign(&self.db, &self.registry, &self.channel, &job).await?;

        let mut conn = self.db.acquire().await?;
        let status =
            if assigned.is_some() { MessageStatus::InProgress } else { MessageStatus::Queued };
        let pm = match messages::create(
            &mut conn,
            self.db.schema(),
            NewMessage {
                tenant: &job.tenant_id,
                job: &job.id,
                channel_id: &msg.channel,
                message_ts: &msg.ts,
                text: &resolved,
                status,
            },
        )
        .await
        {
            Ok(pm) => pm,
            Err(err) if err.is_conflict() => {
                debug!(ts = %msg.ts, "duplicate delivery; message already processed");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        // keep updated_at ahead of the newest processed message
        match jobs::touch(&mut conn, self.db.schema(), &job.tenant_id, &job.id).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }
        let notify_on_queue = settings::get_bool(
            &mut conn,
            self.db.schema(),
            &job.tenant_id,
            SettingKey::NotifyOnQueue,
            false,
        )
        .await?;
        let branch_prefix = if created && assigned.is_some() {
            settings::get(&mut conn, self.db.schema(), &job.tenant_id, SettingKey::BranchPrefix)
                .await?
                .and_then(|v| v.as_string().map(str::to_string))
        } else {
            None
        };
        drop(conn);

        // the thread marker is add-only and never reduced away
        if let Err(err) =
            reactions::mark_processing(self.chat.as_ref(), &token, &msg.channel, &thread.thread_ts)
                .await
        {
            warn!(job = %job.id, error = %err, "processing marker did not apply");
        }

        match assigned {
            None => {
                if let Err(err) = reactions::set_status_reaction(
                    self.chat.as_ref(),
                    &token,
                    &msg.channel,
                    &msg.ts,
                    Reaction::Queued,
                )
                .await
                {
                    warn!(job = %job.id, error = %err, "queued reaction did not apply");
                }
                if notify_on_queue {
                    if let Err(err) = self
                        .chat
                        .post_message(
                            &token,
                            &msg.channel,
                            Some(&thread.thread_ts),
                            QUEUED_NOTICE_TEXT,
                        )
                        .await
                    {
                        warn!(job = %job.id, error = %err, "queue notice did not post");
                    }
                }
                Ok(())
            }
            Some(agent) => {
                if let Err(err) = reactions::set_status_reaction(
                    self.chat.as_ref(),
                    &token,
                    &msg.channel,
                    &msg.ts,
                    Reaction::Working,
                )
                .await
                {
                    warn!(job = %job.id, error = %err, "working reaction did not apply");
                }

                let permalink = match self
                    .chat
                    .permalink(&token, &msg.channel, &thread.thread_ts)
                    .await
                {
                    Ok(link) => link,
                    Err(err) => {
                        warn!(job = %job.id, error = %err, "permalink unavailable");
                        String::new()
                    }
                };

                let out = if created {
                    ServerMsg::StartConversation {
                        job_id: job.id,
                        processed_message_id: pm.id,
                        message: resolved,
                        permalink,
                        branch_prefix,
                    }
                } else {
                    ServerMsg::UserMessage {
                        job_id: job.id,
                        processed_message_id: pm.id,
                        message: resolved,
                        permalink,
                    }
                };
                if let Err(err) = self.channel.send(&agent.connection_id, out).await {
                    // message stays IN_PROGRESS; the deregister path will
                    // abandon the job when the dead connection unwinds
                    warn!(job = %job.id, error = %err, "work envelope not delivered");
                }
                Ok(())
            }
        }
    }

    pub(crate) async fn handle_reaction_added(
        &self,
        integration: &ChatIntegration,
        ev: ReactionAddedEvent,
    ) -> Result<(), RouterError> {
        if !is_completion_reaction(&ev.reaction) {
            return Ok(());
        }

        // only a job's top-level message has a row under this thread key
        let thread = ThreadKey::new(&ev.item.channel, &ev.item.ts);
        let job = {
            let mut conn = self.db.acquire().await?;
            jobs::get_for_thread(
                &mut conn,
                self.db.schema(),
                &integration.tenant_id,
                &integration.id,
                &thread,
            )
            .await?
        };
        let Some(job) = job else { return Ok(()) };

        if job.user_id != ev.user {
            debug!(job = %job.id, user = %ev.user, "completion reaction from non-owner ignored");
            return Ok(());
        }

        cleanup::complete_job(&self.db, self.chat.as_ref(), &job, cleanup::USER_COMPLETED_TEXT)
            .await?;
        Ok(())
    }

    /// The workspace removed the app: drop the integration binding. Jobs
    /// under it cascade with the row; their agents learn via the idle
    /// prompt failing to resolve them.
    pub(crate) async fn handle_app_uninstalled(
        &self,
        integration: &ChatIntegration,
    ) -> Result<(), RouterError> {
        let mut conn = self.db.acquire().await?;
        match integrations::delete(
            &mut conn,
            self.db.schema(),
            &integration.tenant_id,
            &integration.id,
        )
        .await
        {
            Ok(()) => {
                info!(
                    integration = %integration.id,
                    workspace = %integration.workspace_id,
                    "chat integration uninstalled"
                );
                Ok(())
            }
            // the platform retries uninstall events too
            Err(StorageError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve `<@U…>` tokens to display names, best-effort.
    async fn resolve_text(&self, token: &str, text: &str) -> String {
        let users = mrkdwn::mention_tokens(text);
        if users.is_empty() {
            return text.to_string();
        }
        let mut names = HashMap::new();
        for user in users {
            match self.chat.display_name(token, &user).await {
                Ok(name) => {
                    names.insert(user, name);
                }
                Err(err) => debug!(user = %user, error = %err, "mention left unresolved"),
            }
        }
        mrkdwn::resolve_mentions(text, &names)
    }
}
