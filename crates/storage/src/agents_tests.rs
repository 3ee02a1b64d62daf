// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

fn agent(connection: &str) -> ActiveAgent {
    ActiveAgent {
        id: AgentId::new(),
        tenant_id: TenantId::from_string("tn_A"),
        worker_id: WorkerId::new(),
        connection_id: ConnectionId::from_string(connection),
        last_active_at: Utc::now(),
        created_at: Utc::now(),
    }
}

#[test]
fn filter_connected_keeps_live_only() {
    let live = [ConnectionId::from_string("cx_1"), ConnectionId::from_string("cx_3")];
    let agents = vec![agent("cx_1"), agent("cx_2"), agent("cx_3")];

    let connected = filter_connected(agents, &live);

    let ids: Vec<&str> = connected.iter().map(|a| a.connection_id.as_str()).collect();
    assert_eq!(ids, vec!["cx_1", "cx_3"]);
}

#[test]
fn filter_connected_empty_live_set() {
    assert!(filter_connected(vec![agent("cx_1")], &[]).is_empty());
}
