//! Tests for torpedo::metadata: UID derivation.

use torpedo::metadata::{
    AppMetaData, ClusterMetaData, ClusterSpec, NamespaceMetaData, PodByNameMetaData, Uid,
    DEFAULT_SCHEDULER,
};

// ── app names ─────────────────────────────────────────────────────────────────

#[test]
fn app_without_identifier_is_bare_key() {
    let app = AppMetaData::new("postgres", vec![]);
    assert!(!app.has_identifier());
    assert_eq!(app.suffix(), "");
    assert_eq!(app.name(), "postgres");
    assert_eq!(app.uid(), "postgres");
}

#[test]
fn app_with_identifier_appends_first_identifier() {
    let app = AppMetaData::new("postgres", vec!["a".into(), "b".into()]);
    assert!(app.has_identifier());
    assert_eq!(app.suffix(), "-a");
    assert_eq!(app.name(), "postgres-a");
}

#[test]
fn uid_is_stable_across_calls() {
    let app = AppMetaData::new("mysql", vec!["1".into()]);
    assert_eq!(app.uid(), app.uid());
    assert_eq!(app.uid(), app.clone().uid());
}

// ── defaults ──────────────────────────────────────────────────────────────────

#[test]
fn in_cluster_uid_is_empty_path() {
    let md = ClusterMetaData::in_cluster();
    assert!(md.is_in_cluster());
    assert_eq!(md.uid(), "");
    assert_eq!(ClusterMetaData::default(), md);
}

#[test]
fn namespace_and_pod_defaults() {
    assert_eq!(NamespaceMetaData::default().uid(), "default");
    assert_eq!(PodByNameMetaData::default().uid(), "torpedo");
}

#[test]
fn cluster_spec_defaults() {
    let spec = ClusterSpec::with_defaults("/tmp/source-config");
    assert_eq!(spec.scheduler, DEFAULT_SCHEDULER);
    assert!(spec.hyperconverged);
    assert_eq!(spec.uid(), "/tmp/source-config");
    assert_eq!(spec.uid(), ClusterMetaData::new("/tmp/source-config").uid());
}

#[test]
fn metadata_round_trips_through_json() {
    let app = AppMetaData::new("redis", vec!["x".into()]);
    let json = serde_json::to_string(&app).unwrap();
    let back: AppMetaData = serde_json::from_str(&json).unwrap();
    assert_eq!(back, app);
}
