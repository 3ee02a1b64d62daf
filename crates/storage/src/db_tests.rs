// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "gaffer" },
    underscore_lead = { "_scratch" },
    digits = { "gaffer_v2" },
)]
fn schema_ident_accepts(schema: &str) {
    assert!(validate_schema_ident(schema).is_ok());
}

#[parameterized(
    empty = { "" },
    uppercase = { "Gaffer" },
    quote = { "gaffer\"; drop table jobs; --" },
    space = { "gaf fer" },
    digit_lead = { "1gaffer" },
    hyphen = { "gaffer-prod" },
)]
fn schema_ident_rejects(schema: &str) {
    assert!(matches!(validate_schema_ident(schema), Err(StorageError::Invariant(_))));
}

#[test]
fn schema_ident_rejects_oversized() {
    let long = "a".repeat(64);
    assert!(validate_schema_ident(&long).is_err());
    let max = "a".repeat(63);
    assert!(validate_schema_ident(&max).is_ok());
}

#[test]
fn table_qualifies_with_schema() {
    assert_eq!(table("gaffer", "jobs"), "\"gaffer\".\"jobs\"");
}
