//! Tests admin filter translation into query pairs.

use swiftkyc_core::{
    DocumentType, FilterCriteria, InputError, KycStatus, day_range_utc, parse_filter_date,
};

#[test]
fn filter_range_tests_maps_date_to_utc_day_bounds() {
    let date = parse_filter_date("2024-03-15").expect("date should parse");
    let range = day_range_utc(date).expect("range should format");
    assert_eq!(range.created_from, "2024-03-15T00:00:00.000Z");
    assert_eq!(range.created_to, "2024-03-15T23:59:59.000Z");
}

#[test]
fn filter_range_tests_builds_query_pairs_in_stable_order() {
    let criteria =
        FilterCriteria::from_form("approved", "pan", "2024-03-15").expect("form should parse");
    assert_eq!(criteria.status, Some(KycStatus::Approved));
    assert_eq!(criteria.doc_type, Some(DocumentType::Pan));

    let pairs = criteria.query_pairs().expect("pairs should build");
    assert_eq!(
        pairs,
        vec![
            ("status", "APPROVED".to_string()),
            ("doc_type", "PAN".to_string()),
            ("created_from", "2024-03-15T00:00:00.000Z".to_string()),
            ("created_to", "2024-03-15T23:59:59.000Z".to_string()),
        ]
    );
}

#[test]
fn filter_range_tests_blank_form_means_no_filters() {
    let criteria = FilterCriteria::from_form("", " ", "").expect("blank form is valid");
    assert!(criteria.query_pairs().expect("pairs should build").is_empty());
}

#[test]
fn filter_range_tests_rejects_malformed_dates() {
    assert_eq!(
        FilterCriteria::from_form("", "", "15/03/2024"),
        Err(InputError::InvalidDate("15/03/2024".to_string()))
    );
}
