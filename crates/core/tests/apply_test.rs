#[path = "support/fake_conn.rs"]
mod fake_conn;
#[path = "support/fake_driver.rs"]
mod fake_driver;

use std::time::Duration;

use driftql_core::{
    Error,
    driver::Driver,
    migrate::{
        ApplyOptions, Applier, Dir, ExecutionState, MemDir, MemRevisions, RevisionReadWriter,
        TxMode, write_sum,
    },
};
use fake_conn::FakeConn;
use fake_driver::FakeDriver;

fn seeded_dir(name: &str) -> MemDir {
    let dir = MemDir::open(name);
    dir.write_file("1_init.sql", b"CREATE TABLE users (id int);\n")
        .expect("write");
    dir.write_file(
        "2_posts.sql",
        b"CREATE TABLE posts (id int);\nCREATE INDEX posts_idx ON posts (id);\n",
    )
    .expect("write");
    write_sum(&dir).expect("hash");
    dir
}

#[test]
fn applies_pending_files_and_records_revisions() {
    let dir = seeded_dir("apply-ok");
    let driver = FakeDriver::new();
    let revisions = MemRevisions::new();
    let mut conn = FakeConn::new();

    let report = Applier::new(&driver, &revisions)
        .apply(&mut conn, &dir, &ApplyOptions::default())
        .expect("apply succeeds");

    assert_eq!(report.applied, vec!["1", "2"]);
    assert!(conn.executed.contains(&"CREATE TABLE users (id int)".to_string()));

    let recorded = revisions.read(&mut conn).expect("read revisions");
    assert_eq!(recorded.len(), 2);
    assert!(recorded
        .iter()
        .all(|revision| revision.state == ExecutionState::Applied));
    assert!(!recorded[0].hash.is_empty());
    dir.close();
}

#[test]
fn tampered_directory_blocks_the_apply() {
    let dir = seeded_dir("apply-tamper");
    dir.write_file("1_init.sql", b"CREATE TABLE users (id bigint);\n")
        .expect("tamper");
    let driver = FakeDriver::new();
    let revisions = MemRevisions::new();
    let mut conn = FakeConn::new();

    let error = Applier::new(&driver, &revisions)
        .apply(&mut conn, &dir, &ApplyOptions::default())
        .expect_err("tamper must fail");
    assert!(matches!(error, Error::ChecksumMismatch));
    assert!(conn.executed.is_empty(), "no statements may run");
    dir.close();
}

#[test]
fn failing_statement_rolls_back_and_records_failure() {
    let dir = seeded_dir("apply-fail");
    let driver = FakeDriver::new();
    let revisions = MemRevisions::new();
    let mut conn = FakeConn::failing_on("CREATE INDEX posts_idx");

    let error = Applier::new(&driver, &revisions)
        .apply(&mut conn, &dir, &ApplyOptions::default())
        .expect_err("scripted failure");
    assert!(matches!(error.root(), Error::Exec { .. }));
    assert_eq!(conn.rolled_back, 1);

    let recorded = revisions.read(&mut conn).expect("read revisions");
    let failed = recorded
        .iter()
        .find(|revision| revision.version == "2")
        .expect("failed revision recorded");
    assert_eq!(failed.state, ExecutionState::Failed);
    assert_eq!(failed.meta.get("applied_stmts").map(String::as_str), Some("1"));
    assert!(failed.meta.contains_key("error"));
    dir.close();
}

#[test]
fn tx_mode_none_skips_transactions() {
    let dir = seeded_dir("apply-notx");
    let driver = FakeDriver::new();
    let revisions = MemRevisions::new();
    let mut conn = FakeConn::new();

    let opts = ApplyOptions {
        tx_mode: TxMode::None,
        ..ApplyOptions::default()
    };
    Applier::new(&driver, &revisions)
        .apply(&mut conn, &dir, &opts)
        .expect("apply succeeds");
    assert_eq!(conn.begun, 0);
    dir.close();
}

#[test]
fn txmode_directive_overrides_the_file_mode() {
    let dir = MemDir::open("apply-directive");
    dir.write_file(
        "1_init.sql",
        b"-- atlas:txmode none\n\nCREATE TABLE users (id int);\n",
    )
    .expect("write");
    write_sum(&dir).expect("hash");

    let driver = FakeDriver::new();
    let revisions = MemRevisions::new();
    let mut conn = FakeConn::new();
    Applier::new(&driver, &revisions)
        .apply(&mut conn, &dir, &ApplyOptions::default())
        .expect("apply succeeds");
    assert_eq!(conn.begun, 0, "directive must disable the file transaction");
    dir.close();
}

#[test]
fn contending_appliers_serialize_on_the_lock_name() {
    let dir = seeded_dir("apply-locked");
    let driver = FakeDriver::new();
    let revisions = MemRevisions::new();
    let mut conn = FakeConn::new();

    let opts = ApplyOptions {
        lock_timeout: Duration::from_millis(10),
        ..ApplyOptions::default()
    };

    let mut other_conn = FakeConn::new();
    let _held = driver
        .locker()
        .lock(&mut other_conn, &opts.lock_name, opts.lock_timeout)
        .expect("first lock");

    let error = Applier::new(&driver, &revisions)
        .apply(&mut conn, &dir, &opts)
        .expect_err("second applier must time out");
    assert!(matches!(error, Error::Locked { .. }));
    assert!(conn.executed.is_empty());
    dir.close();
}

#[test]
fn already_applied_versions_are_skipped() {
    let dir = seeded_dir("apply-skip");
    let driver = FakeDriver::new();
    let revisions = MemRevisions::new();
    let mut conn = FakeConn::new();
    let applier = Applier::new(&driver, &revisions);

    applier
        .apply(&mut conn, &dir, &ApplyOptions::default())
        .expect("first run");
    let executed_before = conn.executed.len();

    let report = applier
        .apply(&mut conn, &dir, &ApplyOptions::default())
        .expect("second run");
    assert!(report.applied.is_empty());
    assert_eq!(conn.executed.len(), executed_before);
    dir.close();
}
