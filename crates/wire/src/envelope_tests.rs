// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gf_core::{JobId, ProcessedMessageId};

fn job() -> JobId {
    JobId::from_string("job_01ARZ3NDEKTSV4RRFFQ69G5FAV")
}

fn pm() -> ProcessedMessageId {
    ProcessedMessageId::from_string("pm_01ARZ3NDEKTSV4RRFFQ69G5FAV")
}

#[test]
fn server_envelope_has_id_type_payload_shape() {
    let env = Envelope::new(ServerMsg::StartConversation {
        job_id: job(),
        processed_message_id: pm(),
        message: "do X".to_string(),
        permalink: "https://chat.example/p/1".to_string(),
        branch_prefix: None,
    });
    let value: serde_json::Value = serde_json::from_str(&crate::encode(&env).unwrap()).unwrap();

    assert!(value["id"].as_str().unwrap().starts_with("msg_"));
    assert_eq!(value["type"], "START_CONVERSATION");
    assert_eq!(value["payload"]["job_id"], job().as_str());
    assert_eq!(value["payload"]["message"], "do X");
    // unset branch_prefix is omitted, not null
    assert!(value["payload"].get("branch_prefix").is_none());
}

#[test]
fn branch_prefix_serializes_when_set() {
    let env = Envelope::new(ServerMsg::StartConversation {
        job_id: job(),
        processed_message_id: pm(),
        message: "do X".to_string(),
        permalink: "https://chat.example/p/1".to_string(),
        branch_prefix: Some("gaffer/".to_string()),
    });
    let value: serde_json::Value = serde_json::from_str(&crate::encode(&env).unwrap()).unwrap();
    assert_eq!(value["payload"]["branch_prefix"], "gaffer/");
}

#[test]
fn empty_payload_variants_serialize_an_object() {
    let env = Envelope::new(ServerMsg::CheckIdleJobs {});
    let value: serde_json::Value = serde_json::from_str(&crate::encode(&env).unwrap()).unwrap();
    assert_eq!(value["type"], "CHECK_IDLE_JOBS");
    assert!(value["payload"].is_object());
}

#[test]
fn worker_tags_match_v1_names() {
    let cases: Vec<(WorkerMsg, &str)> = vec![
        (
            WorkerMsg::AssistantMessage {
                job_id: job(),
                text: "done".to_string(),
                processed_message_id: pm(),
            },
            "ASSISTANT_MESSAGE",
        ),
        (
            WorkerMsg::SystemMessage { job_id: job(), text: "working on it".to_string() },
            "SYSTEM_MESSAGE",
        ),
        (
            WorkerMsg::JobComplete { job_id: job(), reason: "finished".to_string() },
            "JOB_COMPLETE",
        ),
        (WorkerMsg::ProcessingAck { processed_message_id: pm() }, "PROCESSING_ACK"),
        (WorkerMsg::HealthcheckAck {}, "HEALTHCHECK_ACK"),
    ];
    for (msg, tag) in cases {
        let value = serde_json::to_value(Envelope::new(msg)).unwrap();
        assert_eq!(value["type"], tag);
    }
}

#[test]
fn server_tags_match_v1_names() {
    let cases: Vec<(ServerMsg, &str)> = vec![
        (
            ServerMsg::UserMessage {
                job_id: job(),
                processed_message_id: pm(),
                message: "more".to_string(),
                permalink: "https://chat.example/p/1".to_string(),
            },
            "USER_MESSAGE",
        ),
        (ServerMsg::CheckIdleJobs {}, "CHECK_IDLE_JOBS"),
        (ServerMsg::JobUnassigned { job_id: job() }, "JOB_UNASSIGNED"),
        (ServerMsg::HealthcheckCheck {}, "HEALTHCHECK_CHECK"),
        (
            ServerMsg::Acknowledgement { envelope_id: gf_core::EnvelopeId::new() },
            "ACKNOWLEDGEMENT",
        ),
    ];
    for (msg, tag) in cases {
        let value = serde_json::to_value(Envelope::new(msg)).unwrap();
        assert_eq!(value["type"], tag);
    }
}

#[test]
fn reserved_server_variants_round_trip() {
    for msg in [
        ServerMsg::JobUnassigned { job_id: job() },
        ServerMsg::HealthcheckCheck {},
        ServerMsg::Acknowledgement { envelope_id: gf_core::EnvelopeId::new() },
    ] {
        let env = Envelope::new(msg.clone());
        let back: ServerEnvelope = crate::decode(&crate::encode(&env).unwrap()).unwrap();
        assert_eq!(back.msg, msg);
    }
}

#[test]
fn agent_error_prefix_is_stable() {
    // Workers hard-code this string; changing it is a protocol break.
    assert_eq!(AGENT_ERROR_PREFIX, "agent error:");
}
