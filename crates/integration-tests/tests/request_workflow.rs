//! Integration tests for the request workflow.
//!
//! These tests drive the request actions the way Slack would, against the
//! in-memory list and the recording messenger.

use chrono::Utc;
use serde_json::json;

use sape_core::{
    Choice, ListStatus, MessageTs, Provenance, Request, RequestId, RequestKind, RequestStatus,
    UserId,
};
use sape_integration_tests::{
    ADMIN, ADMIN_CHANNEL, Harness, LIST_ID, OUTSIDER, REQUESTER, echoed, rendered,
};
use sape_intake::error::AppError;
use sape_intake::services::{ActionOutcome, ButtonClick, Submission};
use sape_intake::slack::messages::build_admin_notification;
use sape_intake::slack::modals::callback;
use sape_intake::slack::{Messenger, PrivateMetadata, ViewState};

// =============================================================================
// Helpers
// =============================================================================

fn state(values: serde_json::Value) -> ViewState {
    serde_json::from_value(json!({ "values": values })).expect("view state")
}

fn foo_request() -> Request {
    let mut request = Request::new(
        RequestId::parse("PT-1000").expect("request id"),
        RequestKind::Pentest,
        "Foo",
        UserId::parse(REQUESTER).expect("user id"),
        Utc::now(),
    );
    request.urgency = Choice::urgency(RequestKind::Pentest, "critical");
    request
}

/// Post the admin notification for `request` and save it. Returns the
/// notification's timestamp.
async fn announce(harness: &Harness, request: &mut Request) -> String {
    let notification = build_admin_notification(request);
    let posted = harness
        .messenger
        .post_message(ADMIN_CHANNEL, notification)
        .await
        .expect("post notification");
    request.admin_message_ts = Some(MessageTs::parse(posted.ts.clone()).expect("ts"));
    if let Ok(row_id) = harness.store.save_request(request).await {
        request.list_item_id = Some(row_id);
    }
    posted.ts
}

/// A click on one of the admin notification's buttons.
fn notification_click(user: &str, request: &Request, ts: &str) -> ButtonClick {
    ButtonClick {
        user: user.to_string(),
        trigger_id: Some("trigger-1".to_string()),
        channel_id: Some(ADMIN_CHANNEL.to_string()),
        message: Some(echoed(ts, &build_admin_notification(request))),
        value: Some(request.request_id.to_string()),
        ..ButtonClick::default()
    }
}

fn submission(user: &str, request_id: &str, ts: &str, values: serde_json::Value) -> Submission {
    Submission {
        user: user.to_string(),
        metadata: PrivateMetadata {
            request_id: request_id.to_string(),
            channel_id: Some(ADMIN_CHANNEL.to_string()),
            message_ts: Some(ts.to_string()),
        },
        state: state(values),
    }
}

async fn status_of(harness: &Harness, request_id: &str) -> RequestStatus {
    harness
        .store
        .get_request(&RequestId::parse(request_id).expect("request id"))
        .await
        .expect("read request")
        .expect("request exists")
        .status
}

// =============================================================================
// Approve
// =============================================================================

#[tokio::test]
async fn test_approve_creates_one_channel_and_notifies_requester() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;
    harness.messenger.clear();

    let outcome = harness
        .actions
        .begin_approve(&notification_click(ADMIN, &request, &ts))
        .await
        .expect("begin approve");
    assert_eq!(outcome, ActionOutcome::Applied);
    let views = harness.messenger.opened_views();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].callback_id.as_deref(), Some(callback::APPROVE));

    let outcome = harness
        .actions
        .approve(&submission(ADMIN, "PT-1000", &ts, json!({})))
        .await
        .expect("approve");
    assert_eq!(outcome, ActionOutcome::Applied);

    let channels = harness.messenger.created_channels();
    assert_eq!(channels.len(), 1);
    let (name, channel) = &channels[0];
    assert_eq!(name, "pt-foo-1000");

    assert_eq!(status_of(&harness, "PT-1000").await, RequestStatus::Approved);

    let dms = harness.messenger.posts_to(REQUESTER);
    assert!(
        dms.iter().any(|(_, message)| rendered(message).contains("PT-1000")),
        "requester should get a DM naming the request"
    );

    let invited = harness.messenger.invited_to(channel);
    assert!(invited.contains(&REQUESTER.to_string()));
    assert!(invited.contains(&ADMIN.to_string()));

    let updates = harness.messenger.updates();
    assert!(
        updates
            .iter()
            .any(|(c, updated_ts, _)| c == ADMIN_CHANNEL && updated_ts == &ts),
        "admin notification should be replaced"
    );
}

#[tokio::test]
async fn test_approve_keeps_ticket_url() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;

    harness
        .actions
        .approve(&submission(
            ADMIN,
            "PT-1000",
            &ts,
            json!({"jira_ticket_url": {"jira_url_input": {"value": "https://jira.example/SEC-1"}}}),
        ))
        .await
        .expect("approve");

    let stored = harness
        .store
        .get_request(&request.request_id)
        .await
        .expect("read")
        .expect("exists");
    assert_eq!(stored.ticket_url.as_deref(), Some("https://jira.example/SEC-1"));
    assert_eq!(stored.approved_by.as_ref().map(UserId::as_str), Some(ADMIN));
    assert!(stored.channel_id.is_some());
}

#[tokio::test]
async fn test_second_approval_is_already_handled() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;
    let approval = submission(ADMIN, "PT-1000", &ts, json!({}));

    let first = harness.actions.approve(&approval).await.expect("approve");
    let second = harness.actions.approve(&approval).await.expect("approve");

    assert_eq!(first, ActionOutcome::Applied);
    assert_eq!(second, ActionOutcome::AlreadyHandled(RequestStatus::Approved));
    assert_eq!(harness.messenger.created_channels().len(), 1);

    let notices: Vec<String> = harness
        .messenger
        .ephemerals_for(ADMIN)
        .iter()
        .map(rendered)
        .filter(|text| text.contains("allerede"))
        .collect();
    assert_eq!(notices.len(), 1);
}

#[tokio::test]
async fn test_approve_click_after_approval_opens_no_modal() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;
    harness
        .actions
        .approve(&submission(ADMIN, "PT-1000", &ts, json!({})))
        .await
        .expect("approve");
    harness.messenger.clear();

    let outcome = harness
        .actions
        .begin_approve(&notification_click(ADMIN, &request, &ts))
        .await
        .expect("begin approve");

    assert_eq!(outcome, ActionOutcome::AlreadyHandled(RequestStatus::Approved));
    assert!(harness.messenger.opened_views().is_empty());
}

#[tokio::test]
async fn test_channel_failure_still_approves() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;
    harness.messenger.clear();
    harness.messenger.fail_channel_creation(true);

    let outcome = harness
        .actions
        .approve(&submission(ADMIN, "PT-1000", &ts, json!({})))
        .await
        .expect("approve");

    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(status_of(&harness, "PT-1000").await, RequestStatus::Approved);
    assert!(harness.messenger.created_channels().is_empty());

    let dms = harness.messenger.posts_to(REQUESTER);
    assert_eq!(dms.len(), 1);
    assert!(rendered(&dms[0].1).contains("PT-1000"));

    let stored = harness
        .store
        .get_request(&request.request_id)
        .await
        .expect("read")
        .expect("exists");
    assert_eq!(stored.channel_id, None);

    let updates = harness.messenger.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, ts);
}

// =============================================================================
// Admin gate
// =============================================================================

#[tokio::test]
async fn test_non_admin_reject_is_denied() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;
    harness.messenger.clear();

    let outcome = harness
        .actions
        .begin_reject(&notification_click(OUTSIDER, &request, &ts))
        .await
        .expect("begin reject");
    assert_eq!(outcome, ActionOutcome::Denied);
    assert!(harness.messenger.opened_views().is_empty());
    assert_eq!(harness.messenger.ephemerals_for(OUTSIDER).len(), 1);

    let outcome = harness
        .actions
        .reject(&submission(OUTSIDER, "PT-1000", &ts, json!({})))
        .await
        .expect("reject");
    assert_eq!(outcome, ActionOutcome::Denied);
    assert_eq!(status_of(&harness, "PT-1000").await, RequestStatus::Pending);
}

#[tokio::test]
async fn test_non_admin_cannot_approve() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;

    let outcome = harness
        .actions
        .approve(&submission(OUTSIDER, "PT-1000", &ts, json!({})))
        .await
        .expect("approve");

    assert_eq!(outcome, ActionOutcome::Denied);
    assert!(harness.messenger.created_channels().is_empty());
}

// =============================================================================
// Reject
// =============================================================================

#[tokio::test]
async fn test_reject_stores_reason_and_tells_requester() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;
    harness.messenger.clear();

    let outcome = harness
        .actions
        .reject(&submission(
            ADMIN,
            "PT-1000",
            &ts,
            json!({"rejection_reason": {"reason_input": {"value": "Utenfor scope"}}}),
        ))
        .await
        .expect("reject");
    assert_eq!(outcome, ActionOutcome::Applied);

    let stored = harness
        .store
        .get_request(&request.request_id)
        .await
        .expect("read")
        .expect("exists");
    assert_eq!(stored.status, RequestStatus::Rejected);
    assert_eq!(stored.rejection_reason.as_deref(), Some("Utenfor scope"));
    assert_eq!(stored.rejected_by.as_ref().map(UserId::as_str), Some(ADMIN));

    let dms = harness.messenger.posts_to(REQUESTER);
    assert!(dms.iter().any(|(_, m)| rendered(m).contains("Utenfor scope")));
    assert!(harness.messenger.created_channels().is_empty());
}

#[tokio::test]
async fn test_reject_without_reason_uses_default() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;

    harness
        .actions
        .reject(&submission(ADMIN, "PT-1000", &ts, json!({})))
        .await
        .expect("reject");

    let stored = harness
        .store
        .get_request(&request.request_id)
        .await
        .expect("read")
        .expect("exists");
    assert!(stored.rejection_reason.is_some_and(|r| !r.is_empty()));
}

// =============================================================================
// Unknown requests
// =============================================================================

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let harness = Harness::with_list().await;

    let found = harness
        .store
        .get_request(&RequestId::parse("PT-9999").expect("request id"))
        .await
        .expect("read");
    assert!(found.is_none());

    let click = ButtonClick {
        user: ADMIN.to_string(),
        trigger_id: Some("trigger-1".to_string()),
        channel_id: Some(ADMIN_CHANNEL.to_string()),
        value: Some("PT-9999".to_string()),
        ..ButtonClick::default()
    };
    let outcome = harness
        .actions
        .begin_approve(&click)
        .await
        .expect("begin approve");

    assert_eq!(outcome, ActionOutcome::NotFound);
    assert!(harness.messenger.opened_views().is_empty());
    assert_eq!(harness.messenger.ephemerals_for(ADMIN).len(), 1);
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submission_notifies_admins_and_saves_row() {
    let harness = Harness::with_list().await;

    let request = harness
        .actions
        .submit_request(
            RequestKind::Pentest,
            REQUESTER,
            &state(json!({
                "project_name": {"project_name_input": {"value": "Min App"}},
                "target_scope": {"target_scope_input": {"value": "https://app.example"}},
                "urgency": {"urgency_select": {"selected_option": {"value": "high"}}}
            })),
        )
        .await
        .expect("submit");

    assert!(request.request_id.as_str().starts_with("PT-"));
    assert_eq!(request.status, RequestStatus::Pending);
    assert!(request.admin_message_ts.is_some());
    assert_eq!(harness.messenger.posts_to(ADMIN_CHANNEL).len(), 1);
    assert_eq!(harness.messenger.posts_to(REQUESTER).len(), 1);
    assert_eq!(harness.gateway.rows(LIST_ID).len(), 1);

    let stored = harness
        .store
        .get_request(&request.request_id)
        .await
        .expect("read")
        .expect("exists");
    assert_eq!(stored.project_name, "Min App");
    assert_eq!(stored.urgency.code, "high");
}

#[tokio::test]
async fn test_submission_without_list_is_kept_in_cache() {
    let harness = Harness::without_list();

    let request = harness
        .actions
        .submit_request(
            RequestKind::ThreatModeling,
            REQUESTER,
            &state(json!({
                "project_name": {"project_name_input": {"value": "Betaling"}}
            })),
        )
        .await
        .expect("submit");

    assert!(request.request_id.as_str().starts_with("TM-"));
    let stored = harness
        .store
        .get_request(&request.request_id)
        .await
        .expect("read")
        .expect("cached");
    assert_eq!(stored.project_name, "Betaling");
    assert_eq!(stored.status, RequestStatus::Pending);
}

// =============================================================================
// Reconstruction
// =============================================================================

#[tokio::test]
async fn test_lost_request_is_rebuilt_from_notification() {
    let first = Harness::without_list();
    let mut request = foo_request();
    let ts = announce(&first, &mut request).await;

    // A fresh process has neither a list nor the cached request.
    let harness = Harness::without_list();
    let outcome = harness
        .actions
        .begin_approve(&notification_click(ADMIN, &request, &ts))
        .await
        .expect("begin approve");
    assert_eq!(outcome, ActionOutcome::Applied);

    let rebuilt = harness
        .store
        .get_request(&request.request_id)
        .await
        .expect("read")
        .expect("rebuilt");
    assert_eq!(rebuilt.provenance, Provenance::Reconstructed);
    assert_eq!(rebuilt.project_name, "Foo");
    assert_eq!(rebuilt.requested_by.as_str(), REQUESTER);
    assert_eq!(rebuilt.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_restart_with_list_rebuilds_lost_row_once() {
    let first = Harness::with_list().await;
    let request = foo_request();
    // The notification went out but the row was never written.
    let posted = first
        .messenger
        .post_message(ADMIN_CHANNEL, build_admin_notification(&request))
        .await
        .expect("post notification");
    let harness = first.restarted().await;
    assert!(harness.gateway.rows(LIST_ID).is_empty());

    let outcome = harness
        .actions
        .begin_approve(&notification_click(ADMIN, &request, &posted.ts))
        .await
        .expect("begin approve");
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(harness.gateway.rows(LIST_ID).len(), 1);

    let outcome = harness
        .actions
        .approve(&submission(ADMIN, "PT-1000", &posted.ts, json!({})))
        .await
        .expect("approve");
    assert_eq!(outcome, ActionOutcome::Applied);

    assert_eq!(harness.gateway.rows(LIST_ID).len(), 1);
    assert_eq!(harness.messenger.created_channels().len(), 1);
    let stored = harness
        .store
        .get_request(&request.request_id)
        .await
        .expect("read")
        .expect("exists");
    assert_eq!(stored.status, RequestStatus::Approved);
    assert_eq!(stored.provenance, Provenance::Reconstructed);
}

#[tokio::test]
async fn test_restart_with_list_reads_existing_row() {
    let first = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&first, &mut request).await;
    let harness = first.restarted().await;

    harness
        .actions
        .begin_approve(&notification_click(ADMIN, &request, &ts))
        .await
        .expect("begin approve");
    harness
        .actions
        .approve(&submission(ADMIN, "PT-1000", &ts, json!({})))
        .await
        .expect("approve");

    assert_eq!(harness.gateway.rows(LIST_ID).len(), 1);
    assert_eq!(harness.messenger.created_channels().len(), 1);
    assert_eq!(status_of(&harness, "PT-1000").await, RequestStatus::Approved);
}

#[tokio::test]
async fn test_list_outage_does_not_rebuild_request() {
    let first = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&first, &mut request).await;
    let harness = first.restarted().await;
    harness.messenger.clear();
    harness.gateway.fail_reads(true);

    let err = harness
        .actions
        .begin_approve(&notification_click(ADMIN, &request, &ts))
        .await
        .expect_err("list unreachable");
    assert!(matches!(err, AppError::Store(_)));

    let err = harness
        .actions
        .approve(&submission(ADMIN, "PT-1000", &ts, json!({})))
        .await
        .expect_err("list unreachable");
    assert!(matches!(err, AppError::Store(_)));

    harness.gateway.fail_reads(false);
    assert_eq!(harness.gateway.rows(LIST_ID).len(), 1);
    assert!(harness.messenger.opened_views().is_empty());
    assert!(harness.messenger.updates().is_empty());
    assert!(harness.messenger.created_channels().is_empty());
    assert_eq!(status_of(&harness, "PT-1000").await, RequestStatus::Pending);
}

#[tokio::test]
async fn test_click_without_request_id_is_unidentified() {
    let harness = Harness::with_list().await;
    let click = ButtonClick {
        user: ADMIN.to_string(),
        trigger_id: Some("trigger-1".to_string()),
        channel_id: Some(ADMIN_CHANNEL.to_string()),
        ..ButtonClick::default()
    };

    let outcome = harness
        .actions
        .begin_approve(&click)
        .await
        .expect("begin approve");

    assert_eq!(outcome, ActionOutcome::NotFound);
    let notices = harness.messenger.ephemerals_for(ADMIN);
    assert_eq!(notices.len(), 1);
    assert!(rendered(&notices[0]).contains("identifisere"));
}

#[tokio::test]
async fn test_unrecoverable_notification_is_marked_unavailable() {
    let harness = Harness::with_list().await;
    let click = ButtonClick {
        user: ADMIN.to_string(),
        trigger_id: Some("trigger-1".to_string()),
        channel_id: Some(ADMIN_CHANNEL.to_string()),
        message: Some(sape_intake::slack::InteractionMessage {
            ts: "1700000000.000042".to_string(),
            text: "Ny pentest-forespørsel".to_string(),
            ..Default::default()
        }),
        value: Some("PT-4242".to_string()),
        ..ButtonClick::default()
    };

    let outcome = harness
        .actions
        .begin_approve(&click)
        .await
        .expect("begin approve");

    assert_eq!(outcome, ActionOutcome::NotFound);
    let updates = harness.messenger.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, "1700000000.000042");
}

// =============================================================================
// Status updates
// =============================================================================

#[tokio::test]
async fn test_status_update_after_approval() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;
    harness
        .actions
        .approve(&submission(ADMIN, "PT-1000", &ts, json!({})))
        .await
        .expect("approve");

    let outcome = harness
        .actions
        .update_status(&submission(
            ADMIN,
            "PT-1000",
            &ts,
            json!({
                "status_select": {"status_input": {"selected_option": {"value": "in_progress"}}},
                "status_note": {"note_input": {"value": "Testing startet"}}
            }),
        ))
        .await
        .expect("update status");
    assert_eq!(outcome, ActionOutcome::Applied);

    assert_eq!(status_of(&harness, "PT-1000").await, RequestStatus::InProgress);
    let history = harness.store.status_history(&request.request_id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].note.as_deref(), Some("Testing startet"));

    let in_progress = harness
        .store
        .requests_by_status(ListStatus::InProgress)
        .await
        .expect("list");
    assert_eq!(in_progress.len(), 1);
}

#[tokio::test]
async fn test_status_update_on_pending_request_is_refused() {
    let harness = Harness::with_list().await;
    let mut request = foo_request();
    let ts = announce(&harness, &mut request).await;

    let outcome = harness
        .actions
        .update_status(&submission(
            ADMIN,
            "PT-1000",
            &ts,
            json!({"status_select": {"status_input": {"selected_option": {"value": "in_progress"}}}}),
        ))
        .await
        .expect("update status");

    assert_eq!(outcome, ActionOutcome::AlreadyHandled(RequestStatus::Pending));
    assert_eq!(status_of(&harness, "PT-1000").await, RequestStatus::Pending);
}
