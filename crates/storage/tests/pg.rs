// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live-Postgres store tests.
//!
//! These need a reachable database and are `#[ignore]`d by default:
//!
//! ```sh
//! GAFFER_TEST_DATABASE_URL=postgres://localhost/gaffer_test \
//!     cargo test -p gf-storage -- --ignored
//! ```
//!
//! Each test bootstraps its own throwaway schema so runs are independent.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use gf_core::{ConnectionId, TenantId, WorkerId};
use gf_storage::records::MessageStatus;
use gf_storage::{
    agents, assignments, integrations, jobs, messages, schema, settings, tenants, Db, SettingKey,
    SettingValue, StorageError, ThreadKey,
};

async fn test_db() -> Db {
    let url = std::env::var("GAFFER_TEST_DATABASE_URL")
        .expect("GAFFER_TEST_DATABASE_URL must be set for ignored storage tests");
    let schema_name = format!("t{}", TenantId::new().suffix().to_lowercase());
    let db = Db::connect(&url, &schema_name, 5).await.expect("connect");
    schema::ensure_schema(&db).await.expect("bootstrap");
    db
}

struct Fixture {
    db: Db,
    tenant: TenantId,
    integration: gf_core::ChatIntegrationId,
}

async fn fixture() -> Fixture {
    let db = test_db().await;
    let mut conn = db.acquire().await.unwrap();
    let tenant = tenants::create(&mut conn, db.schema(), "secret-1").await.unwrap();
    let integration =
        integrations::create(&mut conn, db.schema(), &tenant.id, "T123", "xoxb-token")
            .await
            .unwrap();
    Fixture { db, tenant: tenant.id, integration: integration.id }
}

#[tokio::test]
#[ignore]
async fn agent_upsert_replaces_connection_in_place() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    let worker = WorkerId::new();

    let first = agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &worker,
        &ConnectionId::from_string("cx_first"),
    )
    .await
    .unwrap();
    let second = agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &worker,
        &ConnectionId::from_string("cx_second"),
    )
    .await
    .unwrap();

    // same row, new transport
    assert_eq!(second.id, first.id);
    assert_eq!(second.connection_id.as_str(), "cx_second");
    assert_eq!(agents::list_for_tenant(&mut conn, f.db.schema(), &f.tenant).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn reconnect_preserves_assignments() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    let worker = WorkerId::new();

    let agent = agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &worker,
        &ConnectionId::from_string("cx_old"),
    )
    .await
    .unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();
    assignments::insert(&mut conn, f.db.schema(), &f.tenant, &job.id, &agent.id).await.unwrap();

    agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &worker,
        &ConnectionId::from_string("cx_new"),
    )
    .await
    .unwrap();

    let owner = agents::get_by_job_id(&mut conn, f.db.schema(), &f.tenant, &job.id)
        .await
        .unwrap()
        .expect("assignment survives reconnect");
    assert_eq!(owner.id, agent.id);
    assert_eq!(owner.connection_id.as_str(), "cx_new");
}

#[tokio::test]
#[ignore]
async fn get_or_create_job_is_idempotent_per_thread() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    let thread = ThreadKey::new("C1", "1700.000");

    let (job, created) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &thread,
        "U1",
    )
    .await
    .unwrap();
    let (again, created_again) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &thread,
        "U1",
    )
    .await
    .unwrap();

    assert!(created);
    assert!(!created_again);
    assert_eq!(again.id, job.id);
}

#[tokio::test]
#[ignore]
async fn second_assignment_for_a_job_conflicts() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();

    let a = agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &WorkerId::new(),
        &ConnectionId::from_string("cx_a"),
    )
    .await
    .unwrap();
    let b = agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &WorkerId::new(),
        &ConnectionId::from_string("cx_b"),
    )
    .await
    .unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();

    assignments::insert(&mut conn, f.db.schema(), &f.tenant, &job.id, &a.id).await.unwrap();
    let second = assignments::insert(&mut conn, f.db.schema(), &f.tenant, &job.id, &b.id).await;

    assert!(matches!(second, Err(StorageError::Conflict(_))));
    // losing assigner re-reads and sees the winner
    let current = assignments::get_for_job(&mut conn, f.db.schema(), &f.tenant, &job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.agent_id, a.id);
}

#[tokio::test]
#[ignore]
async fn deleting_agent_cascades_assignments_but_not_jobs() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();

    let agent = agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &WorkerId::new(),
        &ConnectionId::from_string("cx_a"),
    )
    .await
    .unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();
    assignments::insert(&mut conn, f.db.schema(), &f.tenant, &job.id, &agent.id).await.unwrap();

    agents::delete(&mut conn, f.db.schema(), &agent.id).await.unwrap();

    assert!(assignments::get_for_job(&mut conn, f.db.schema(), &f.tenant, &job.id)
        .await
        .unwrap()
        .is_none());
    assert!(jobs::get(&mut conn, f.db.schema(), &f.tenant, &job.id).await.unwrap().is_some());
}

#[tokio::test]
#[ignore]
async fn duplicate_message_timestamp_conflicts() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();

    let new = |text: &'static str| messages::NewMessage {
        tenant: &f.tenant,
        job: &job.id,
        channel_id: "C1",
        message_ts: "1700.000",
        text,
        status: MessageStatus::Queued,
    };
    messages::create(&mut conn, f.db.schema(), new("do X")).await.unwrap();
    let dup = messages::create(&mut conn, f.db.schema(), new("do X again")).await;

    assert!(matches!(dup, Err(StorageError::Conflict(_))));
}

#[tokio::test]
#[ignore]
async fn drain_transition_happens_exactly_once() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();
    let pm = messages::create(
        &mut conn,
        f.db.schema(),
        messages::NewMessage {
            tenant: &f.tenant,
            job: &job.id,
            channel_id: "C1",
            message_ts: "1700.000",
            text: "do X",
            status: MessageStatus::Queued,
        },
    )
    .await
    .unwrap();

    // duplicate drain ticks observe the same QUEUED message
    let first = messages::mark_in_progress(&mut conn, f.db.schema(), &f.tenant, &pm.id)
        .await
        .unwrap();
    let second = messages::mark_in_progress(&mut conn, f.db.schema(), &f.tenant, &pm.id)
        .await
        .unwrap();

    assert!(first);
    assert!(!second);
    let stored = messages::get(&mut conn, f.db.schema(), &f.tenant, &pm.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MessageStatus::InProgress);
}

#[tokio::test]
#[ignore]
async fn queued_messages_replay_in_insertion_order() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();

    for (ts, text) in [("1700.000", "first"), ("1700.001", "second"), ("1700.002", "third")] {
        messages::create(
            &mut conn,
            f.db.schema(),
            messages::NewMessage {
                tenant: &f.tenant,
                job: &job.id,
                channel_id: "C1",
                message_ts: ts,
                text,
                status: MessageStatus::Queued,
            },
        )
        .await
        .unwrap();
    }

    let queued =
        messages::list_queued_for_job(&mut conn, f.db.schema(), &f.tenant, &job.id).await.unwrap();
    let texts: Vec<&str> = queued.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
}

#[tokio::test]
#[ignore]
async fn in_progress_message_implies_live_assignment_after_drain_steps() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();

    let agent = agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &WorkerId::new(),
        &ConnectionId::from_string("cx_a"),
    )
    .await
    .unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();
    let pm = messages::create(
        &mut conn,
        f.db.schema(),
        messages::NewMessage {
            tenant: &f.tenant,
            job: &job.id,
            channel_id: "C1",
            message_ts: "1700.000",
            text: "do X",
            status: MessageStatus::Queued,
        },
    )
    .await
    .unwrap();

    // the drain assigns before it transitions
    assignments::insert(&mut conn, f.db.schema(), &f.tenant, &job.id, &agent.id).await.unwrap();
    assert!(messages::mark_in_progress(&mut conn, f.db.schema(), &f.tenant, &pm.id)
        .await
        .unwrap());

    assert!(assignments::get_for_job(&mut conn, f.db.schema(), &f.tenant, &job.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
#[ignore]
async fn settings_round_trip_and_kind_enforcement() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();

    settings::set(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        SettingKey::AllowedChannels,
        SettingValue::StringList(vec!["C1".into(), "C2".into()]),
    )
    .await
    .unwrap();

    let value = settings::get(&mut conn, f.db.schema(), &f.tenant, SettingKey::AllowedChannels)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value.as_string_list().unwrap(), ["C1".to_string(), "C2".to_string()]);

    let mismatch = settings::set(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        SettingKey::NotifyOnQueue,
        SettingValue::String("yes".into()),
    )
    .await;
    assert!(matches!(mismatch, Err(StorageError::Validation(_))));
}

#[tokio::test]
#[ignore]
async fn queued_work_surfaces_until_drained() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();
    let pm = messages::create(
        &mut conn,
        f.db.schema(),
        messages::NewMessage {
            tenant: &f.tenant,
            job: &job.id,
            channel_id: "C1",
            message_ts: "1700.000",
            text: "do X",
            status: MessageStatus::Queued,
        },
    )
    .await
    .unwrap();

    // while queued, the job is a drain candidate and the conversation is new
    let drainable = jobs::list_with_queued(&mut conn, f.db.schema(), &f.tenant).await.unwrap();
    assert_eq!(drainable.len(), 1);
    assert_eq!(drainable[0].id, job.id);
    assert_eq!(
        messages::count_completed_for_job(&mut conn, f.db.schema(), &f.tenant, &job.id)
            .await
            .unwrap(),
        0,
    );

    // once drained, it stops surfacing
    assert!(messages::mark_in_progress(&mut conn, f.db.schema(), &f.tenant, &pm.id)
        .await
        .unwrap());
    assert!(jobs::list_with_queued(&mut conn, f.db.schema(), &f.tenant).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn idle_jobs_require_staleness_and_an_owner() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    let agent = agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &WorkerId::new(),
        &ConnectionId::from_string("cx_a"),
    )
    .await
    .unwrap();
    let (owned, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();
    let (orphan, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1800.000"),
        "U1",
    )
    .await
    .unwrap();
    assignments::insert(&mut conn, f.db.schema(), &f.tenant, &owned.id, &agent.id)
        .await
        .unwrap();

    // fresh jobs are not idle yet
    assert!(jobs::get_idle(&mut conn, f.db.schema(), &f.tenant, 30).await.unwrap().is_empty());

    // age both threads past the threshold
    let backdate =
        format!("UPDATE \"{}\".\"jobs\" SET updated_at = now() - interval '1 hour'", f.db.schema());
    sqlx::query(&backdate).execute(&mut *conn).await.unwrap();

    // only the job that still has an owner is worth prompting
    let idle = jobs::get_idle(&mut conn, f.db.schema(), &f.tenant, 30).await.unwrap();
    assert_eq!(idle.len(), 1);
    assert_eq!(idle[0].id, owned.id);
    assert_ne!(idle[0].id, orphan.id);
}

#[tokio::test]
#[ignore]
async fn message_lifecycle_tracks_latest_and_completed() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();

    let first = messages::create(
        &mut conn,
        f.db.schema(),
        messages::NewMessage {
            tenant: &f.tenant,
            job: &job.id,
            channel_id: "C1",
            message_ts: "1700.000",
            text: "do X",
            status: MessageStatus::InProgress,
        },
    )
    .await
    .unwrap();
    let second = messages::create(
        &mut conn,
        f.db.schema(),
        messages::NewMessage {
            tenant: &f.tenant,
            job: &job.id,
            channel_id: "C1",
            message_ts: "1700.100",
            text: "and then Y",
            status: MessageStatus::InProgress,
        },
    )
    .await
    .unwrap();

    let latest = messages::latest_for_job(&mut conn, f.db.schema(), &f.tenant, &job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, second.id);

    messages::set_completed(&mut conn, f.db.schema(), &f.tenant, &first.id).await.unwrap();
    messages::set_completed(&mut conn, f.db.schema(), &f.tenant, &second.id).await.unwrap();
    assert_eq!(
        messages::count_completed_for_job(&mut conn, f.db.schema(), &f.tenant, &job.id)
            .await
            .unwrap(),
        2,
    );

    // teardown removes them all
    assert_eq!(
        messages::delete_for_job(&mut conn, f.db.schema(), &f.tenant, &job.id).await.unwrap(),
        2,
    );
    assert!(messages::get(&mut conn, f.db.schema(), &f.tenant, &first.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore]
async fn integration_lifecycle_tracks_install_and_uninstall() {
    let db = test_db().await;
    let mut conn = db.acquire().await.unwrap();
    let tenant = tenants::create(&mut conn, db.schema(), "secret-li").await.unwrap();

    let integration =
        integrations::create(&mut conn, db.schema(), &tenant.id, "T999", "xoxb-999")
            .await
            .unwrap();
    // webhook intake resolves by workspace with no tenant context
    let by_workspace = integrations::get_by_workspace(&mut conn, db.schema(), "T999")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_workspace.tenant_id, tenant.id);
    assert_eq!(
        integrations::list_for_tenant(&mut conn, db.schema(), &tenant.id).await.unwrap().len(),
        1,
    );

    // a second install of the same workspace conflicts
    let dup = integrations::create(&mut conn, db.schema(), &tenant.id, "T999", "xoxb-other").await;
    assert!(matches!(dup, Err(StorageError::Conflict(_))));

    integrations::delete(&mut conn, db.schema(), &tenant.id, &integration.id).await.unwrap();
    assert!(integrations::get_by_workspace(&mut conn, db.schema(), "T999")
        .await
        .unwrap()
        .is_none());
    let again = integrations::delete(&mut conn, db.schema(), &tenant.id, &integration.id).await;
    assert!(matches!(again, Err(StorageError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn tenant_delete_cascades_and_settings_listing_works() {
    let db = test_db().await;
    let mut conn = db.acquire().await.unwrap();
    let tenant = tenants::create(&mut conn, db.schema(), "secret-td").await.unwrap();
    integrations::create(&mut conn, db.schema(), &tenant.id, "T777", "xoxb-777").await.unwrap();
    settings::set(
        &mut conn,
        db.schema(),
        &tenant.id,
        SettingKey::NotifyOnQueue,
        SettingValue::Bool(true),
    )
    .await
    .unwrap();
    settings::set(
        &mut conn,
        db.schema(),
        &tenant.id,
        SettingKey::BranchPrefix,
        SettingValue::String("gaffer/".into()),
    )
    .await
    .unwrap();

    let listed = settings::list_for_tenant(&mut conn, db.schema(), &tenant.id).await.unwrap();
    assert_eq!(listed.len(), 2);

    settings::delete(&mut conn, db.schema(), &tenant.id, SettingKey::BranchPrefix)
        .await
        .unwrap();
    assert!(settings::get(&mut conn, db.schema(), &tenant.id, SettingKey::BranchPrefix)
        .await
        .unwrap()
        .is_none());

    tenants::delete(&mut conn, db.schema(), &tenant.id).await.unwrap();
    assert!(tenants::get_by_secret(&mut conn, db.schema(), "secret-td")
        .await
        .unwrap()
        .is_none());
    assert!(integrations::get_by_workspace(&mut conn, db.schema(), "T777")
        .await
        .unwrap()
        .is_none());
    assert!(settings::list_for_tenant(&mut conn, db.schema(), &tenant.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[ignore]
async fn inactive_agents_are_selected_by_threshold() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();
    agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &WorkerId::new(),
        &ConnectionId::from_string("cx_fresh"),
    )
    .await
    .unwrap();

    // a freshly upserted agent is inside any positive grace window
    assert!(agents::get_inactive(&mut conn, f.db.schema(), &f.tenant, 10)
        .await
        .unwrap()
        .is_empty());
    // threshold zero treats everyone as stale
    assert_eq!(
        agents::get_inactive(&mut conn, f.db.schema(), &f.tenant, 0).await.unwrap().len(),
        1,
    );
}

#[tokio::test]
#[ignore]
async fn transaction_scope_rolls_back_unassign_and_delete_together() {
    let f = fixture().await;
    let mut conn = f.db.acquire().await.unwrap();

    let agent = agents::upsert(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &WorkerId::new(),
        &ConnectionId::from_string("cx_a"),
    )
    .await
    .unwrap();
    let (job, _) = jobs::get_or_create_for_thread(
        &mut conn,
        f.db.schema(),
        &f.tenant,
        &f.integration,
        &ThreadKey::new("C1", "1700.000"),
        "U1",
    )
    .await
    .unwrap();
    assignments::insert(&mut conn, f.db.schema(), &f.tenant, &job.id, &agent.id).await.unwrap();
    drop(conn);

    // begin a teardown but drop the scope without committing
    {
        let mut tx = f.db.begin().await.unwrap();
        assignments::delete_for_job(&mut tx, f.db.schema(), &f.tenant, &job.id).await.unwrap();
        jobs::delete(&mut tx, f.db.schema(), &f.tenant, &job.id).await.unwrap();
    }

    let mut conn = f.db.acquire().await.unwrap();
    assert!(jobs::get(&mut conn, f.db.schema(), &f.tenant, &job.id).await.unwrap().is_some());
    assert!(assignments::get_for_job(&mut conn, f.db.schema(), &f.tenant, &job.id)
        .await
        .unwrap()
        .is_some());
}
