//! Integration tests for the moderation console.

mod common;

use serde_json::{Value, json};
use swiftkyc_app::{AppError, TimerEvent};
use swiftkyc_core::{KycStatus, SessionId};
use swiftkyc_remote::api::ModerationDecision;
use swiftkyc_remote::{HttpResponse, Method};
use swiftkyc_ui::{DismissTrigger, ModerationAction, NoticeKind, SessionTable, View, render_table};

const LIST: &str = "/admin/kyc/sessions";
const DETAIL: &str = "/admin/kyc/sessions/S1";

fn summary(status: &str) -> Value {
    json!({
        "session_id": "S1",
        "customer_id": "C1",
        "status": status,
        "current_step": "KYC_CHECK",
        "created_at": "2024-05-01T09:30:00Z",
        "primary_doc_type": "PAN"
    })
}

fn record(status: &str) -> Value {
    json!({
        "session_id": "S1",
        "customer_id": "C1",
        "status": status,
        "current_step": "KYC_CHECK",
        "retries_select": 0,
        "retries_scan": 1,
        "retries_upload": 2,
        "retries_selfie": 0,
        "failure_reason": null,
        "selfie_url": "uploads/S1/selfie.jpg",
        "face_match_score": 0.93,
        "created_at": "2024-05-01T09:30:00Z",
        "updated_at": "2024-05-01T09:45:00Z",
        "documents": [{
            "document_id": "D1",
            "doc_type": "PAN",
            "doc_number": "ABCDE1234F",
            "storage_url": "uploads/S1/doc.png",
            "is_valid": true,
            "quality_score": 0.88
        }]
    })
}

fn console_with_open_record(status: &str) -> common::Harness {
    let mut h = common::harness();
    h.transport
        .respond_json(Method::Get, LIST, 200, json!([summary(status)]));
    h.transport
        .respond_json(Method::Get, DETAIL, 200, record(status));
    h.app.open_admin(0).expect("console should load");
    h.app.open_detail("S1").expect("detail should load");
    h
}

#[test]
fn moderation_console_tests_open_loads_unfiltered_list() {
    let mut h = common::harness();
    h.transport.respond_json(
        Method::Get,
        LIST,
        200,
        json!([summary("KYC_CHECK"), summary("REJECTED")]),
    );

    h.app.open_admin(0).expect("console should load");
    assert_eq!(h.app.view(), View::Admin);
    assert_eq!(h.app.ui().console.table.len(), 2);
    assert_eq!(h.transport.calls(), vec!["GET /admin/kyc/sessions"]);
}

#[test]
fn moderation_console_tests_filters_become_query_pairs() {
    let mut h = common::harness();
    h.transport.respond_json(Method::Get, LIST, 200, json!([]));
    h.app.open_admin(0).expect("console should load");

    let shown = h
        .app
        .apply_filters("APPROVED", "PAN", "2024-05-01")
        .expect("filters should apply");
    assert_eq!(shown, 0);
    assert_eq!(h.app.ui().console.table, SessionTable::Empty);
    assert_eq!(
        render_table(&h.app.ui().console.table),
        vec!["No sessions match the selected filters."]
    );
    assert_eq!(
        h.transport.calls().last().map(String::as_str),
        Some(
            "GET /admin/kyc/sessions?status=APPROVED&doc_type=PAN&created_from=2024-05-01T00%3A00%3A00.000Z&created_to=2024-05-01T23%3A59%3A59.000Z"
        )
    );
}

#[test]
fn moderation_console_tests_bad_filter_date_sends_nothing() {
    let mut h = common::harness();
    h.transport.respond_json(Method::Get, LIST, 200, json!([]));
    h.app.open_admin(0).expect("console should load");
    let before = h.transport.request_count();

    let error = h
        .app
        .apply_filters("", "", "01/05/2024")
        .expect_err("malformed date must be rejected");
    assert!(matches!(error, AppError::Input(_)));
    assert_eq!(h.transport.request_count(), before);
}

#[test]
fn moderation_console_tests_list_failure_names_the_cause() {
    let mut h = common::harness();
    h.transport.respond(
        Method::Get,
        LIST,
        HttpResponse::json(503, &json!({ "detail": "database unavailable" })),
    );

    let error = h.app.open_admin(0).expect_err("list failure should surface");
    assert!(matches!(error, AppError::Remote(_)));
    assert_eq!(h.app.view(), View::Admin);
    assert_eq!(
        h.app.notice().map(|notice| notice.text.as_str()),
        Some("Failed to load sessions: database unavailable")
    );
}

#[test]
fn moderation_console_tests_approve_refreshes_detail_after_delay() {
    let mut h = console_with_open_record("KYC_CHECK");
    assert_eq!(
        h.app.ui().console.modal.actions(),
        &[ModerationAction::Approve, ModerationAction::Reject]
    );
    h.transport.respond_json(
        Method::Post,
        "/admin/kyc/sessions/S1/approve",
        200,
        json!({ "session_id": "S1", "status": "APPROVED", "current_step": "COMPLETE" }),
    );
    h.transport
        .replace_json(Method::Get, DETAIL, 200, record("APPROVED"));
    h.transport
        .replace_json(Method::Get, LIST, 200, json!([summary("APPROVED")]));

    let status = h
        .app
        .moderate(ModerationDecision::Approve, 1_000)
        .expect("approve should succeed");
    assert_eq!(status, KycStatus::Approved);
    let notice = h.app.notice().expect("success notice");
    assert_eq!(notice.kind, NoticeKind::Success);
    assert_eq!(notice.text, "Session approved.");
    assert!(h.app.timers().contains(&TimerEvent::RefreshDetail(
        SessionId::new("S1").expect("id should be valid")
    )));

    h.app.tick(1_399);
    let detail_loads = |h: &common::Harness| {
        h.transport
            .calls()
            .iter()
            .filter(|call| call.as_str() == "GET /admin/kyc/sessions/S1")
            .count()
    };
    assert_eq!(detail_loads(&h), 1);

    h.app.tick(1_400);
    assert_eq!(detail_loads(&h), 2);
    let modal = &h.app.ui().console.modal;
    assert_eq!(
        modal.record().map(|record| record.status.clone()),
        Some(KycStatus::Approved)
    );
    assert_eq!(
        modal.actions(),
        &[ModerationAction::AlreadyApprovedBadge, ModerationAction::Reject]
    );
    assert_eq!(modal.listener_count(), 3);

    let calls = h.transport.calls();
    assert_eq!(
        calls,
        vec![
            "GET /admin/kyc/sessions",
            "GET /admin/kyc/sessions/S1",
            "POST /admin/kyc/sessions/S1/approve",
            "GET /admin/kyc/sessions",
            "GET /admin/kyc/sessions/S1",
        ]
    );
}

#[test]
fn moderation_console_tests_rejected_record_offers_only_approve() {
    let mut h = console_with_open_record("REJECTED");
    assert_eq!(
        h.app.ui().console.modal.actions(),
        &[ModerationAction::Approve]
    );
    let before = h.transport.request_count();

    let error = h
        .app
        .moderate(ModerationDecision::Reject, 0)
        .expect_err("reject is not offered");
    assert!(matches!(error, AppError::ActionUnavailable(_)));
    assert_eq!(h.transport.request_count(), before);
}

#[test]
fn moderation_console_tests_moderate_without_open_record_is_refused() {
    let mut h = common::harness();
    h.transport.respond_json(Method::Get, LIST, 200, json!([]));
    h.app.open_admin(0).expect("console should load");

    let error = h
        .app
        .moderate(ModerationDecision::Approve, 0)
        .expect_err("nothing to approve");
    assert!(matches!(error, AppError::ActionUnavailable(_)));
}

#[test]
fn moderation_console_tests_dismissed_modal_skips_refresh() {
    let mut h = console_with_open_record("KYC_CHECK");
    h.transport.respond_json(
        Method::Post,
        "/admin/kyc/sessions/S1/reject",
        200,
        json!({ "session_id": "S1", "status": "REJECTED" }),
    );
    h.app
        .moderate(ModerationDecision::Reject, 0)
        .expect("reject should succeed");

    assert!(h.app.dismiss_detail(DismissTrigger::EscapeKey));
    assert!(!h.app.ui().console.modal.is_open());
    assert_eq!(h.app.ui().console.modal.listener_count(), 0);
    assert!(!h.app.dismiss_detail(DismissTrigger::Backdrop));
    let before = h.transport.request_count();

    h.app.tick(400);
    assert_eq!(h.transport.request_count(), before);
    assert!(!h.app.ui().console.modal.is_open());
}

#[test]
fn moderation_console_tests_reopening_detail_does_not_stack_listeners() {
    let mut h = console_with_open_record("IN_PROGRESS");
    for _ in 0..3 {
        h.app.open_detail("S1").expect("detail should reload");
    }
    assert_eq!(h.app.ui().console.modal.listener_count(), 3);

    assert!(h.app.dismiss_detail(DismissTrigger::CloseButton));
    assert_eq!(h.app.ui().console.modal.listener_count(), 0);
}

#[test]
fn moderation_console_tests_leaving_console_cancels_refresh() {
    let mut h = console_with_open_record("KYC_CHECK");
    h.transport.respond_json(
        Method::Post,
        "/admin/kyc/sessions/S1/approve",
        200,
        json!({ "session_id": "S1", "status": "APPROVED" }),
    );
    h.app
        .moderate(ModerationDecision::Approve, 0)
        .expect("approve should succeed");

    h.app.back(100).expect("back should work");
    assert_eq!(h.app.view(), View::Home);
    assert!(h.app.timers().is_empty());
    let before = h.transport.request_count();
    h.app.tick(1_000);
    assert_eq!(h.transport.request_count(), before);
}
