//! Error paths that need full persistence: missing or corrupted stores,
//! unknown IDs, and rejected state transitions.

use std::fs;
use tempfile::TempDir;

use profilekit::ops::{self, OpError};
use profilekit::profile::SectionKey;
use profilekit::store::{StoreError, load_store, store_path};
use profilekit::test_helpers::{MockAnalyzer, setup_project};

#[test]
fn every_op_requires_init() {
    let dir = TempDir::new().unwrap();
    let analyzer = MockAnalyzer::replying(vec![], "unused", None);

    assert!(matches!(
        ops::current_profile(dir.path()).unwrap_err(),
        OpError::NotInitialized
    ));
    assert!(matches!(
        ops::list_versions(dir.path()).unwrap_err(),
        OpError::NotInitialized
    ));
    assert!(matches!(
        ops::manual_edit(dir.path(), SectionKey::KeyFramings, "x").unwrap_err(),
        OpError::NotInitialized
    ));
    assert!(matches!(
        ops::generate_recommendations(dir.path(), &analyzer).unwrap_err(),
        OpError::NotInitialized
    ));
    assert!(matches!(
        ops::apply_all_recommendations(dir.path(), "set-x").unwrap_err(),
        OpError::NotInitialized
    ));
    assert!(matches!(
        ops::dismiss_recommendation(dir.path(), "rec-x").unwrap_err(),
        OpError::NotInitialized
    ));
    assert!(matches!(
        ops::rollback(dir.path(), 1).unwrap_err(),
        OpError::NotInitialized
    ));
}

#[test]
fn malformed_store_line_reports_line_number() {
    let dir = TempDir::new().unwrap();
    setup_project(dir.path());

    let path = store_path(dir.path());
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("{not json\n");
    fs::write(&path, content).unwrap();

    let err = load_store(&path).unwrap_err();
    assert!(matches!(err, StoreError::Json { line: 2, .. }));

    // Ops surface the same failure instead of silently resetting state.
    assert!(matches!(
        ops::current_profile(dir.path()).unwrap_err(),
        OpError::Store(StoreError::Json { .. })
    ));
}

#[test]
fn version_gap_is_detected_as_corrupt() {
    let dir = TempDir::new().unwrap();
    setup_project(dir.path());

    let path = store_path(dir.path());
    let content = fs::read_to_string(&path).unwrap();
    let skipped = content.replace("\"version\":1", "\"version\":3");
    assert_ne!(content, skipped, "fixture must actually rewrite the version");
    fs::write(&path, skipped).unwrap();

    let err = load_store(&path).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

#[test]
fn unknown_ids_are_reported_by_name() {
    let dir = TempDir::new().unwrap();
    setup_project(dir.path());

    let err = ops::apply_all_recommendations(dir.path(), "set-missing").unwrap_err();
    match err {
        OpError::SetNotFound(id) => assert_eq!(id, "set-missing"),
        other => panic!("expected SetNotFound, got {other:?}"),
    }

    let err = ops::dismiss_recommendation(dir.path(), "rec-missing").unwrap_err();
    match err {
        OpError::RecommendationNotFound(id) => assert_eq!(id, "rec-missing"),
        other => panic!("expected RecommendationNotFound, got {other:?}"),
    }

    let err = ops::rollback(dir.path(), 9).unwrap_err();
    assert!(matches!(err, OpError::VersionNotFound(9)));
}

#[test]
fn manual_edit_rejects_whitespace_only_difference() {
    let dir = TempDir::new().unwrap();
    setup_project(dir.path());

    let err = ops::manual_edit(
        dir.path(),
        SectionKey::CommunicationStyle,
        "  Direct   and concise. ",
    )
    .unwrap_err();
    assert!(matches!(err, OpError::NoChange));
    assert_eq!(ops::current_profile(dir.path()).unwrap().version, 1);
}

#[test]
fn init_refuses_existing_project() {
    let dir = TempDir::new().unwrap();
    setup_project(dir.path());
    let err = ops::init(dir.path(), "other", Default::default()).unwrap_err();
    assert!(matches!(err, OpError::AlreadyInitialized));
}
