// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_url_verification() {
    let raw = r#"{"type":"url_verification","token":"t","challenge":"nonce-123"}"#;
    match serde_json::from_str::<EventEnvelope>(raw).unwrap() {
        EventEnvelope::UrlVerification { challenge } => assert_eq!(challenge, "nonce-123"),
        other => panic!("wrong variant: {other:?}"),
    }
}

#[test]
fn parses_app_mention_callback() {
    let raw = r#"{
        "type": "event_callback",
        "team_id": "T123",
        "event": {
            "type": "app_mention",
            "user": "U1",
            "text": "<@UBOT> do X",
            "channel": "C1",
            "ts": "1700.000"
        }
    }"#;
    let EventEnvelope::EventCallback { team_id, event } =
        serde_json::from_str::<EventEnvelope>(raw).unwrap()
    else {
        panic!("wrong variant");
    };
    assert_eq!(team_id, "T123");
    let InboundEvent::AppMention(msg) = event else { panic!("wrong inner variant") };
    assert_eq!(msg.user, "U1");
    assert!(!msg.is_thread_reply());
    assert_eq!(msg.thread_key_ts(), "1700.000");
}

#[test]
fn threaded_reply_is_detected() {
    let raw = r#"{
        "type": "app_mention",
        "user": "U1",
        "text": "more please",
        "channel": "C1",
        "ts": "1701.500",
        "thread_ts": "1700.000"
    }"#;
    let InboundEvent::AppMention(msg) = serde_json::from_str::<InboundEvent>(raw).unwrap()
    else {
        panic!("wrong variant");
    };
    assert!(msg.is_thread_reply());
    assert_eq!(msg.thread_key_ts(), "1700.000");
}

#[test]
fn top_level_message_with_thread_ts_equal_to_ts_is_not_a_reply() {
    let raw = r#"{
        "type": "message",
        "user": "U1",
        "text": "hi",
        "channel": "D1",
        "ts": "1700.000",
        "thread_ts": "1700.000"
    }"#;
    let InboundEvent::Message(msg) = serde_json::from_str::<InboundEvent>(raw).unwrap() else {
        panic!("wrong variant");
    };
    assert!(!msg.is_thread_reply());
}

#[test]
fn parses_reaction_added() {
    let raw = r#"{
        "type": "reaction_added",
        "user": "U2",
        "reaction": "white_check_mark",
        "item": { "type": "message", "channel": "C1", "ts": "1700.000" }
    }"#;
    let InboundEvent::ReactionAdded(ev) = serde_json::from_str::<InboundEvent>(raw).unwrap()
    else {
        panic!("wrong variant");
    };
    assert_eq!(ev.reaction, "white_check_mark");
    assert_eq!(ev.item.channel, "C1");
}

#[test]
fn parses_app_uninstalled() {
    let raw = r#"{"type":"app_uninstalled"}"#;
    assert!(matches!(
        serde_json::from_str::<InboundEvent>(raw).unwrap(),
        InboundEvent::AppUninstalled {},
    ));
}

#[test]
fn unsupported_types_fall_into_catch_alls() {
    let envelope = r#"{"type":"app_rate_limited","minute_rate_limited":1}"#;
    assert!(matches!(
        serde_json::from_str::<EventEnvelope>(envelope).unwrap(),
        EventEnvelope::Other,
    ));

    let inner = r#"{"type":"channel_archive","channel":"C1"}"#;
    assert!(matches!(serde_json::from_str::<InboundEvent>(inner).unwrap(), InboundEvent::Other));
}
