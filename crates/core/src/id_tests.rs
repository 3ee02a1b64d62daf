// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use yare::parameterized;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("tst_");
}

// --- generation ---

#[test]
fn new_ids_carry_prefix_and_ulid_payload() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst_"));
    assert_eq!(id.suffix().len(), 26);
    assert!(TestId::is_valid(id.as_str()));
}

#[test]
fn new_ids_are_unique() {
    let a = TestId::new();
    let b = TestId::new();
    assert_ne!(a, b);
}

#[test]
fn ids_sort_by_creation_time() {
    let a = TestId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let b = TestId::new();
    assert!(a.as_str() < b.as_str());
    assert!(a < b);
}

// --- validation ---

#[parameterized(
    wrong_prefix = { "job_01ARZ3NDEKTSV4RRFFQ69G5FAV" },
    no_prefix = { "01ARZ3NDEKTSV4RRFFQ69G5FAV" },
    short_payload = { "tst_01ARZ3NDEKTSV4RRFFQ" },
    bad_alphabet = { "tst_01ARZ3NDEKTSV4RRFFQ69G5FAU" },
    empty = { "" },
)]
fn is_valid_rejects(id: &str) {
    assert!(!TestId::is_valid(id));
}

#[test]
fn is_valid_accepts_generated() {
    for _ in 0..16 {
        assert!(TestId::is_valid(TestId::new().as_str()));
    }
}

#[test]
fn from_string_preserves_arbitrary_ids() {
    let id = TestId::from_string("tst_hand-rolled");
    assert_eq!(id.as_str(), "tst_hand-rolled");
    assert!(!TestId::is_valid(id.as_str()));
}

// --- buffer / trait plumbing ---

#[test]
fn hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(TestId::from_string("tst_k"), 42);
    assert_eq!(map.get("tst_k"), Some(&42));
}

#[test]
fn suffix_strips_prefix() {
    let id = TestId::from_string("tst_abcdef");
    assert_eq!(id.suffix(), "abcdef");
    assert_eq!(id.short(3), "abc");
}

#[test]
fn serde_is_transparent() {
    let id = TestId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id.as_str()));
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn oversized_id_fails_deserialization() {
    let long = format!("\"tst_{}\"", "x".repeat(ID_MAX_LEN));
    assert!(serde_json::from_str::<TestId>(&long).is_err());
}

#[test]
fn short_fn_on_str() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}

#[test]
fn domain_prefixes_are_distinct() {
    let prefixes = [
        crate::TenantId::PREFIX,
        crate::ChatIntegrationId::PREFIX,
        crate::AgentId::PREFIX,
        crate::WorkerId::PREFIX,
        crate::JobId::PREFIX,
        crate::ProcessedMessageId::PREFIX,
        crate::ConnectionId::PREFIX,
        crate::EnvelopeId::PREFIX,
    ];
    let unique: std::collections::HashSet<_> = prefixes.iter().collect();
    assert_eq!(unique.len(), prefixes.len());
    assert!(prefixes.iter().all(|p| p.ends_with('_')));
}
