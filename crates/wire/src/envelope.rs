// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed channel envelopes.
//!
//! Closed tagged unions, one per direction. Every envelope type the v1
//! protocol names has a variant here; variants the control plane does not
//! currently emit or act on (`JOB_UNASSIGNED`, `HEALTHCHECK_CHECK`,
//! `ACKNOWLEDGEMENT`) are reserved and round-trip without effect.

use gf_core::{EnvelopeId, JobId, ProcessedMessageId};
use serde::{Deserialize, Serialize};

/// A `SYSTEM_MESSAGE` whose text starts with this prefix reports a fatal
/// worker-side failure; the job it names is torn down as failed.
pub const AGENT_ERROR_PREFIX: &str = "agent error:";

/// One message on the worker channel: `{ id, type, payload }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<M> {
    pub id: EnvelopeId,
    #[serde(flatten)]
    pub msg: M,
}

impl<M> Envelope<M> {
    pub fn new(msg: M) -> Self {
        Self { id: EnvelopeId::new(), msg }
    }
}

pub type ServerEnvelope = Envelope<ServerMsg>;
pub type WorkerEnvelope = Envelope<WorkerMsg>;

/// Server → worker messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMsg {
    /// First message of a job: the worker should open a fresh conversation.
    StartConversation {
        job_id: JobId,
        processed_message_id: ProcessedMessageId,
        message: String,
        permalink: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_prefix: Option<String>,
    },

    /// Follow-up message on a job the worker already holds.
    UserMessage {
        job_id: JobId,
        processed_message_id: ProcessedMessageId,
        message: String,
        permalink: String,
    },

    /// Ask the worker to self-poll its held jobs and report status.
    CheckIdleJobs {},

    /// Reserved.
    JobUnassigned { job_id: JobId },

    /// Reserved.
    HealthcheckCheck {},

    /// Reserved.
    Acknowledgement { envelope_id: EnvelopeId },
}

/// Worker → server messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMsg {
    /// Assistant output to relay into the job's chat thread.
    AssistantMessage {
        job_id: JobId,
        text: String,
        processed_message_id: ProcessedMessageId,
    },

    /// Out-of-band worker status. Fatal when the text carries
    /// [`AGENT_ERROR_PREFIX`].
    SystemMessage { job_id: JobId, text: String },

    /// The worker considers the job finished.
    JobComplete { job_id: JobId, reason: String },

    /// The worker picked a queued message up and started on it.
    ProcessingAck { processed_message_id: ProcessedMessageId },

    /// Application-level liveness response; treated like a ping.
    HealthcheckAck {},
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
