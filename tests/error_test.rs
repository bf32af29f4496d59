//! Tests for torpedo::error: message formats and aggregation.

use std::time::Duration;

use anyhow::anyhow;

use torpedo::error::{debug_string, process_error, Error, CONDITION_NOT_MET};

#[test]
fn aggregate_of_nothing_is_ok() {
    assert!(Error::aggregate(vec![]).is_ok());
}

#[test]
fn aggregate_of_one_is_that_error() {
    let err = Error::aggregate(vec![Error::Cancelled]).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn aggregate_joins_messages() {
    let err = Error::aggregate(vec![
        Error::Timeout(Duration::from_secs(3)),
        Error::ConditionNotMet,
    ])
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("timed out after 3s : {CONDITION_NOT_MET}")
    );
    assert!(err.is_condition_not_met());
}

#[test]
fn process_error_records_caller_and_debug() {
    let err = process_error(anyhow!("apply failed"), Some("{\"app\":\"pg\"}".into()));
    let msg = err.to_string();
    assert!(msg.starts_with("apply failed\n  at "), "got: {msg}");
    assert!(msg.contains("error_test.rs:"), "location must be the caller: {msg}");
    assert!(msg.ends_with("<-> debug message: {\"app\":\"pg\"}"), "got: {msg}");
}

#[test]
fn process_error_without_debug() {
    let msg = process_error(Error::Cancelled, None).to_string();
    assert!(msg.ends_with("<-> no debug message"), "got: {msg}");
}

#[test]
fn processed_condition_not_met_is_still_detected() {
    let err = process_error(Error::ConditionNotMet, None);
    assert!(err.is_condition_not_met());
    assert!(!Error::Cancelled.is_condition_not_met());
}

#[test]
fn data_not_found_lists_queries() {
    let err = Error::DataNotFound(vec!["SELECT 1".into(), "SELECT 2".into()]);
    assert_eq!(
        err.to_string(),
        "Below results not found in the table:\n SELECT 1\nSELECT 2"
    );
}

#[test]
fn context_switch_keeps_source() {
    let err = Error::context_switch("/tmp/dst", anyhow!("no current-context"));
    assert_eq!(err.to_string(), "failed to switch context to '/tmp/dst'");
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "no current-context");
}

#[test]
fn debug_string_serialises_json() {
    assert_eq!(debug_string(&vec!["a", "b"]), "[\"a\",\"b\"]");
}
