//! Integration tests for moderation console view state.

use serde_json::json;
use swiftkyc_core::KycStatus;
use swiftkyc_remote::api::{ModerationRecord, SessionSummary};
use swiftkyc_ui::{
    DetailModal, DismissTrigger, ModerationAction, SessionTable, action_set, render_detail,
    render_table,
};

fn record(status: &str) -> ModerationRecord {
    serde_json::from_value(json!({
        "session_id": "S1",
        "customer_id": "C1",
        "status": status,
        "current_step": "KYC_CHECK",
        "retries_upload": 2,
        "created_at": "2024-03-15T10:00:00Z",
        "updated_at": "2024-03-15T10:05:00Z",
        "documents": [{
            "document_id": "D1",
            "doc_type": "PAN",
            "doc_number": "ABCDE1234F",
            "is_valid": true,
            "quality_score": 0.82
        }]
    }))
    .expect("record fixture should decode")
}

#[test]
fn moderation_view_tests_action_set_covers_every_status() {
    use ModerationAction::{AlreadyApprovedBadge, Approve, Reject};

    assert_eq!(action_set(&KycStatus::Approved), &[AlreadyApprovedBadge, Reject]);
    assert_eq!(action_set(&KycStatus::Rejected), &[Approve]);
    assert_eq!(action_set(&KycStatus::InProgress), &[Approve, Reject]);
    assert_eq!(action_set(&KycStatus::KycCheck), &[Approve, Reject]);
    assert_eq!(
        action_set(&KycStatus::Unknown("ON_HOLD".to_string())),
        &[Approve, Reject]
    );
}

#[test]
fn moderation_view_tests_repeated_opens_do_not_stack_listeners() {
    let mut modal = DetailModal::default();
    for _ in 0..5 {
        modal.open(record("IN_PROGRESS"));
        assert_eq!(modal.listener_count(), 3);
    }

    assert!(modal.dismiss(DismissTrigger::EscapeKey));
    assert_eq!(modal.listener_count(), 0);
    assert!(!modal.is_open());
    assert!(!modal.dismiss(DismissTrigger::Backdrop));
}

#[test]
fn moderation_view_tests_every_trigger_closes_modal() {
    for trigger in [
        DismissTrigger::CloseButton,
        DismissTrigger::Backdrop,
        DismissTrigger::EscapeKey,
    ] {
        let mut modal = DetailModal::default();
        modal.open(record("REJECTED"));
        assert!(modal.dismiss(trigger));
        assert_eq!(modal.listener_count(), 0);
    }
}

#[test]
fn moderation_view_tests_refresh_updates_action_set() {
    let mut modal = DetailModal::default();
    modal.open(record("IN_PROGRESS"));
    assert!(modal.refresh(record("APPROVED")));

    assert_eq!(
        modal.actions(),
        &[ModerationAction::AlreadyApprovedBadge, ModerationAction::Reject]
    );
    let lines = render_detail(&modal);
    assert!(lines.iter().any(|line| line.contains("[already approved]")));
    assert!(lines.iter().any(|line| line.contains("ABCDE1234F")));
    assert!(lines.iter().any(|line| line.contains("upload=2")));
}

#[test]
fn moderation_view_tests_empty_result_renders_empty_state() {
    let table = SessionTable::from_rows(Vec::new());
    assert_eq!(table, SessionTable::Empty);
    assert_eq!(
        render_table(&table),
        vec!["No sessions match the selected filters.".to_string()]
    );

    let row: SessionSummary = serde_json::from_value(json!({
        "session_id": "S1",
        "customer_id": "C1",
        "status": "KYC_CHECK",
        "current_step": "KYC_CHECK",
        "created_at": "2024-03-15T10:00:00Z",
        "primary_doc_type": "PAN"
    }))
    .expect("summary fixture should decode");
    let table = SessionTable::from_rows(vec![row]);
    assert_eq!(table.len(), 1);
    assert!(render_table(&table)[0].contains("PAN"));
}
