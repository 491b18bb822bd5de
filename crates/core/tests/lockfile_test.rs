#[path = "support/fake_conn.rs"]
mod fake_conn;

use std::time::Duration;

use driftql_core::{
    Error,
    driver::{Lock as _, Locker as _},
    migrate::{FileLock, FlockLocker},
};
use fake_conn::FakeConn;

#[test]
fn second_acquire_times_out_while_held() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let held = FileLock::acquire(tmp.path(), "migrate", Duration::from_millis(10))
        .expect("first acquire");

    let error = FileLock::acquire(tmp.path(), "migrate", Duration::from_millis(50))
        .expect_err("second acquire must time out");
    assert!(matches!(error, Error::Locked { .. }));
    drop(held);

    // Released on drop: a fresh acquire succeeds immediately.
    FileLock::acquire(tmp.path(), "migrate", Duration::from_millis(10))
        .expect("reacquire after drop");
}

#[test]
fn lock_file_is_pid_stamped() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let _held = FileLock::acquire(tmp.path(), "migrate", Duration::from_millis(10))
        .expect("acquire");

    let content =
        std::fs::read_to_string(tmp.path().join("migrate.lock")).expect("lock file exists");
    assert_eq!(content.trim(), std::process::id().to_string());
}

#[test]
fn releasing_twice_surfaces_an_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut conn = FakeConn::new();
    let locker = FlockLocker::new(tmp.path());

    let mut lock = locker
        .lock(&mut conn, "migrate", Duration::from_millis(10))
        .expect("acquire");
    lock.release(&mut conn).expect("first release");
    assert!(lock.release(&mut conn).is_err(), "double release must fail");
}

#[test]
fn distinct_names_do_not_contend() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let _first = FileLock::acquire(tmp.path(), "alpha", Duration::from_millis(10))
        .expect("first name");
    FileLock::acquire(tmp.path(), "beta", Duration::from_millis(10)).expect("second name");
}
