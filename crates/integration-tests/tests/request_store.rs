//! Integration tests for the request store over the in-memory list.

use chrono::Utc;

use sape_core::{
    ChannelId, ListStatus, Request, RequestId, RequestKind, RequestPatch, RequestStatus, UserId,
};
use sape_integration_tests::{
    ADMIN_CHANNEL, BOT_USER, Harness, InMemoryListGateway, LIST_ID, RecordingMessenger, REQUESTER,
};
use sape_intake::lists::{AccessLevel, ListGateway};
use sape_intake::slack::Messenger;
use sape_intake::store::{RequestStore, StoreError};
use std::sync::Arc;

fn request(id: &str, project: &str) -> Request {
    Request::new(
        RequestId::parse(id).expect("request id"),
        RequestId::parse(id)
            .expect("request id")
            .kind()
            .unwrap_or(RequestKind::Pentest),
        project,
        UserId::parse(REQUESTER).expect("user id"),
        Utc::now(),
    )
}

// =============================================================================
// Save and read
// =============================================================================

#[tokio::test]
async fn test_save_then_get_with_list() {
    let harness = Harness::with_list().await;
    let saved = request("PT-1000", "Foo");

    let row_id = harness.store.save_request(&saved).await.expect("save");
    let rows = harness.gateway.rows(LIST_ID);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, row_id.as_str());

    let read = harness
        .store
        .get_request(&saved.request_id)
        .await
        .expect("read")
        .expect("exists");
    assert_eq!(read.project_name, "Foo");
    assert_eq!(read.requested_by.as_str(), REQUESTER);
    assert_eq!(read.status, RequestStatus::Pending);
    assert_eq!(read.list_item_id, Some(row_id));
}

#[tokio::test]
async fn test_save_twice_updates_same_row() {
    let harness = Harness::with_list().await;
    let mut saved = request("PT-1000", "Foo");
    harness.store.save_request(&saved).await.expect("save");

    saved.project_name = "Foo v2".to_string();
    harness.store.save_request(&saved).await.expect("save");

    assert_eq!(harness.gateway.rows(LIST_ID).len(), 1);
    let read = harness
        .store
        .get_request(&saved.request_id)
        .await
        .expect("read")
        .expect("exists");
    assert_eq!(read.project_name, "Foo v2");
}

#[tokio::test]
async fn test_save_without_list_is_a_configuration_error() {
    let harness = Harness::without_list();
    let saved = request("PT-1000", "Foo");

    let err = harness
        .store
        .save_request(&saved)
        .await
        .expect_err("no list");
    assert!(matches!(err, StoreError::Configuration(_)));
}

#[tokio::test]
async fn test_cache_only_request_is_readable_without_list() {
    let harness = Harness::without_list();
    let saved = request("TM-1000", "Betaling");

    harness
        .store
        .update_request(&saved.request_id, saved.to_patch())
        .await
        .expect("cache update");

    let read = harness
        .store
        .get_request(&saved.request_id)
        .await
        .expect("read")
        .expect("cached");
    assert_eq!(read.kind, RequestKind::ThreatModeling);
    assert_eq!(read.project_name, "Betaling");
}

#[tokio::test]
async fn test_save_rejects_invalid_data() {
    let harness = Harness::with_list().await;
    let saved = request("PT-1000", "   ");

    let err = harness
        .store
        .save_request(&saved)
        .await
        .expect_err("blank project");
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(harness.gateway.rows(LIST_ID).is_empty());
}

#[tokio::test]
async fn test_unreachable_list_serves_cached_request() {
    let harness = Harness::with_list().await;
    let saved = request("PT-1000", "Foo");
    harness.store.save_request(&saved).await.expect("save");

    harness.gateway.fail_reads(true);
    let read = harness
        .store
        .get_request(&saved.request_id)
        .await
        .expect("served from cache")
        .expect("exists");
    assert_eq!(read.project_name, "Foo");

    let missing = harness
        .store
        .get_request(&RequestId::parse("PT-9999").expect("request id"))
        .await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn test_row_survives_restart_with_lossy_status() {
    let harness = Harness::with_list().await;
    let saved = request("PT-1000", "Foo");
    harness.store.save_request(&saved).await.expect("save");
    harness
        .store
        .update_request(&saved.request_id, RequestPatch::status(RequestStatus::Approved))
        .await
        .expect("update");

    let restarted = harness.restarted().await;
    let read = restarted
        .store
        .get_request(&saved.request_id)
        .await
        .expect("read")
        .expect("exists");

    // approved projects onto the list's pending and cannot be told apart
    assert_eq!(read.status, RequestStatus::Pending);
    assert_eq!(read.project_name, "Foo");
}

#[tokio::test]
async fn test_update_without_row_stays_in_cache() {
    let harness = Harness::with_list().await;
    let id = RequestId::parse("PT-1000").expect("request id");

    harness
        .store
        .update_request(&id, RequestPatch::status(RequestStatus::Rejected))
        .await
        .expect("update");

    assert!(harness.gateway.rows(LIST_ID).is_empty());
}

#[tokio::test]
async fn test_requests_by_status_filters_rows() {
    let harness = Harness::with_list().await;
    for (id, project) in [("PT-1000", "A"), ("PT-1001", "B"), ("TM-1002", "C")] {
        harness
            .store
            .save_request(&request(id, project))
            .await
            .expect("save");
    }
    harness
        .store
        .update_request(
            &RequestId::parse("PT-1001").expect("request id"),
            RequestPatch::status(RequestStatus::Rejected),
        )
        .await
        .expect("update");

    let pending = harness
        .store
        .requests_by_status(ListStatus::Pending)
        .await
        .expect("list");
    let rejected = harness
        .store
        .requests_by_status(ListStatus::Rejected)
        .await
        .expect("list");

    assert_eq!(pending.len(), 2);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].request_id.as_str(), "PT-1001");
}

// =============================================================================
// Status history
// =============================================================================

#[tokio::test]
async fn test_status_history_is_newest_first() {
    let harness = Harness::without_list();
    let id = RequestId::parse("PT-1000").expect("request id");
    let admin = UserId::parse("U0000000002").expect("user id");

    for status in [RequestStatus::InProgress, RequestStatus::Review] {
        harness
            .store
            .add_status_history(
                &id,
                sape_core::StatusHistoryEntry {
                    status,
                    status_text: status.label().to_string(),
                    updated_by: admin.clone(),
                    note: None,
                    timestamp: Utc::now(),
                },
            )
            .await;
    }

    let history = harness.store.status_history(&id).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, RequestStatus::Review);
}

// =============================================================================
// List lifecycle
// =============================================================================

#[tokio::test]
async fn test_create_list_provisions_and_shares() {
    let gateway = Arc::new(InMemoryListGateway::new());
    let messenger = Arc::new(RecordingMessenger::new());
    let store = RequestStore::new(
        Arc::clone(&gateway) as Arc<dyn ListGateway>,
        Arc::clone(&messenger) as Arc<dyn Messenger>,
        ChannelId::parse(ADMIN_CHANNEL).expect("channel id"),
        None,
    );

    let list_id = store.create_list().await.expect("create list");

    assert_eq!(store.list_id().await, Some(list_id.clone()));
    assert!(store.columns().await.missing().is_empty());

    let rows = gateway.rows(list_id.as_str());
    assert_eq!(rows.len(), 1, "placeholder row");
    let shares = gateway.shares();
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].0, list_id);
    assert_eq!(shares[0].2, AccessLevel::Write);

    let placeholder_users: Vec<&String> = rows[0]
        .fields
        .iter()
        .flat_map(|field| field.as_users())
        .collect();
    assert!(placeholder_users.iter().all(|u| u.as_str() == BOT_USER));

    // the new list is usable straight away
    store
        .save_request(&request("PT-1000", "Foo"))
        .await
        .expect("save");
    assert_eq!(gateway.rows(list_id.as_str()).len(), 2);
}

#[tokio::test]
async fn test_initialize_without_list_prompts_once() {
    let harness = Harness::without_list();

    assert_eq!(harness.store.initialize().await.expect("init"), None);
    assert_eq!(harness.store.initialize().await.expect("init"), None);

    assert_eq!(harness.messenger.posts_to(ADMIN_CHANNEL).len(), 1);
}

#[tokio::test]
async fn test_initialize_unknown_list_fails() {
    let gateway = Arc::new(InMemoryListGateway::new());
    let store = RequestStore::new(
        gateway as Arc<dyn ListGateway>,
        Arc::new(RecordingMessenger::new()) as Arc<dyn Messenger>,
        ChannelId::parse(ADMIN_CHANNEL).expect("channel id"),
        Some(sape_core::ListId::parse("L0000000404").expect("list id")),
    );

    let err = store.initialize().await.expect_err("unknown list");
    assert!(matches!(err, StoreError::Configuration(_)));
    assert!(store.health_check().await.is_err());
}

#[tokio::test]
async fn test_health_check_and_close() {
    let harness = Harness::with_list().await;
    harness.store.health_check().await.expect("healthy");

    let saved = request("PT-1000", "Foo");
    harness.store.save_request(&saved).await.expect("save");
    harness.store.close().await;

    // rows remain, only process-local state is dropped
    harness.gateway.fail_reads(true);
    assert!(harness.store.get_request(&saved.request_id).await.is_err());
}
