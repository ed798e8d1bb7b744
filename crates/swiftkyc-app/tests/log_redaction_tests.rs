//! Integration tests for log redaction.

use swiftkyc_app::redact_sensitive;

#[test]
fn log_redaction_tests_masks_bearer_credentials() {
    let raw = "authorization=Bearer abc123";
    let redacted = redact_sensitive(raw);

    assert_eq!(redacted, "authorization=Bearer <redacted>");
    assert!(!redacted.contains("abc123"));
}

#[test]
fn log_redaction_tests_masks_validator_mismatch_details() {
    let raw = "Document number mismatch: entered=ABCDE1234F ocr=ABCDE1284F; token=t-42";
    let redacted = redact_sensitive(raw);

    for secret in ["ABCDE1234F", "ABCDE1284F", "t-42"] {
        assert!(!redacted.contains(secret), "{secret} leaked: {redacted}");
    }
    assert!(redacted.starts_with("Document number mismatch: entered=<redacted>"));
}

#[test]
fn log_redaction_tests_masks_json_request_fields() {
    let raw = r#"{"name": "A", "mobile": "9876543210", "doc_number": "X1234567"}"#;
    let redacted = redact_sensitive(raw);

    assert!(redacted.contains(r#""name": "A""#));
    assert!(!redacted.contains("9876543210"));
    assert!(!redacted.contains("X1234567"));
}
