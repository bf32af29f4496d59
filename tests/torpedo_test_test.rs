//! Tests for torpedo::torpedo_test: start/end bookkeeping and the conflict
//! rules between running tests.

use torpedo::error::Error;
use torpedo::torpedo_test::{TestController, TorpedoTest, APPS_TAG};

fn apps(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_string()).collect()
}

// ── start ─────────────────────────────────────────────────────────────────────

#[test]
fn start_records_test_with_apps_tag() {
    let tests = TestController::new();
    let cfg = tests.test("pg-backup");
    cfg.can_start(4512).unwrap();

    let test = cfg
        .start(
            TorpedoTest::new("PgBackup")
                .with_description("backup and restore postgres")
                .with_maintainer("qa-team")
                .with_testrail_id(4512)
                .with_tag("suite", "nightly"),
            &apps(&["postgres", "mysql"]),
        )
        .unwrap();

    assert!(cfg.is_running());
    assert_eq!(test.tags[APPS_TAG], "postgres,mysql");
    assert_eq!(test.tags["suite"], "nightly");
    assert_eq!(test.run_id, 0);
    assert_eq!(cfg.test().unwrap().maintainer, "qa-team");
    assert_eq!(tests.tests().uids(), vec!["pg-backup"]);
}

#[test]
fn start_without_apps_sets_empty_tag() {
    let tests = TestController::new();
    let test = tests
        .test("t")
        .start(TorpedoTest::new("T"), &[])
        .unwrap();
    assert_eq!(test.tags[APPS_TAG], "");
}

#[test]
fn same_uid_cannot_start_twice() {
    let tests = TestController::new();
    let cfg = tests.test("pg-backup");
    cfg.start(TorpedoTest::new("PgBackup"), &[]).unwrap();

    let err = cfg.can_start(0).unwrap_err();
    assert_eq!(
        err.to_string(),
        "torpedo-test [name: PgBackup] has the same test ID [pg-backup] and has already started"
    );
    assert!(matches!(
        cfg.start(TorpedoTest::new("Other"), &[]),
        Err(Error::TestAlreadyStarted { .. })
    ));
    assert_eq!(cfg.test().unwrap().name, "PgBackup");
}

#[test]
fn same_testrail_id_cannot_run_twice() {
    let tests = TestController::new();
    tests
        .test("first")
        .start(TorpedoTest::new("First").with_testrail_id(77), &[])
        .unwrap();

    let second = tests.test("second");
    let err = second.can_start(77).unwrap_err();
    assert!(
        matches!(err, Error::TestRailIdInUse { ref name, testrail_id: 77 } if name == "First"),
        "got {err:?}"
    );
    assert!(second.can_start(78).is_ok());
    assert!(!second.is_running());
}

#[test]
fn zero_testrail_id_never_conflicts() {
    let tests = TestController::new();
    tests.test("a").start(TorpedoTest::new("A"), &[]).unwrap();
    tests.test("b").start(TorpedoTest::new("B"), &[]).unwrap();
    assert_eq!(tests.tests().len(), 2);
}

// ── end ───────────────────────────────────────────────────────────────────────

#[test]
fn end_moves_test_to_history() {
    let tests = TestController::new();
    let cfg = tests.test("pg-backup");
    cfg.start(TorpedoTest::new("PgBackup").with_testrail_id(9), &[])
        .unwrap();
    cfg.can_end().unwrap();

    let ended = cfg.end().unwrap();
    assert_eq!(ended.name, "PgBackup");
    assert!(!cfg.is_running());
    assert!(tests.tests().is_removed("pg-backup"));
    assert_eq!(tests.tests().removed("pg-backup").len(), 1);

    // The UID and TestRail ID are free again.
    tests.test("other").can_start(9).unwrap();
    cfg.can_start(9).unwrap();
}

#[test]
fn end_before_start_fails() {
    let tests = TestController::new();
    let cfg = tests.test("never-started");
    let err = cfg.can_end().unwrap_err();
    assert_eq!(err.to_string(), "torpedo-test [never-started] has not started yet");
    assert!(matches!(cfg.end(), Err(Error::TestNotStarted(uid)) if uid == "never-started"));
    assert!(!tests.tests().is_recorded("never-started"));
}

#[test]
fn rerun_keeps_every_ended_run() {
    let tests = TestController::new();
    let cfg = tests.test("flaky");
    for _ in 0..2 {
        cfg.start(TorpedoTest::new("Flaky"), &[]).unwrap();
        cfg.end().unwrap();
    }
    assert_eq!(tests.tests().removed("flaky").len(), 2);
    assert!(tests.tests().is_empty());
}
