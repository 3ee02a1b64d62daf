// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ddl_is_idempotent_by_construction() {
    for statement in ddl("gaffer") {
        assert!(
            statement.contains("IF NOT EXISTS"),
            "statement must be re-runnable: {statement}"
        );
    }
}

#[test]
fn ddl_scopes_every_table() {
    for statement in ddl("gaffer") {
        if statement.contains("CREATE TABLE") {
            assert!(statement.contains("\"gaffer\".\""), "unscoped table: {statement}");
        }
    }
}

#[test]
fn ddl_declares_the_dispatch_uniqueness_points() {
    let all = ddl("gaffer").join("\n");
    // one live job per thread
    assert!(all.contains("UNIQUE (tenant_id, chat_integration_id, channel_id, thread_ts)"));
    // one agent per job
    assert!(all.contains("PRIMARY KEY (tenant_id, job_id)"));
    // one agent row per worker instance
    assert!(all.contains("UNIQUE (tenant_id, worker_id)"));
    // one processed message per chat message
    assert!(all.contains("UNIQUE (job_id, message_ts)"));
}
