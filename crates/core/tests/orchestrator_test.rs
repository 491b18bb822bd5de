#[path = "support/builders.rs"]
mod builders;
#[path = "support/fake_conn.rs"]
mod fake_conn;
#[path = "support/fake_driver.rs"]
mod fake_driver;

use builders::{realm_of, table_in};
use driftql_core::{
    Change, Error, Orchestrator,
    inspect::InspectOptions,
    migrate::{ApplyOptions, Dir, MemDir, MemRevisions, write_sum},
    schema::Schema,
    sqlcheck::default_analyzers,
};
use fake_conn::FakeConn;
use fake_driver::FakeDriver;

#[test]
fn diff_inspects_current_and_compares_against_desired() {
    let driver = FakeDriver::new();
    driver.queue_inspection(realm_of(vec![Schema::named("public")]));

    let mut desired_schema = Schema::named("public");
    desired_schema.tables.push(table_in("public", "users"));
    let desired = realm_of(vec![desired_schema]);

    let mut conn = FakeConn::new();
    let changes = Orchestrator::new(&driver)
        .diff(&mut conn, &desired, &InspectOptions::default())
        .expect("diff");

    assert_eq!(changes.len(), 1);
    assert!(matches!(changes[0], Change::AddTable(_)));
}

#[test]
fn plan_to_dir_writes_file_and_refreshes_the_sum() {
    let driver = FakeDriver::new();
    let dir = MemDir::open("orchestrator-plan");
    let changes = vec![Change::AddTable(table_in("public", "users"))];

    let file = Orchestrator::new(&driver)
        .plan_to_dir("add_users", &changes, &dir, Some("20240115"))
        .expect("plan");

    assert_eq!(file.name(), "20240115_add_users.sql");
    driftql_core::migrate::validate(&dir).expect("sum refreshed");
    let content = String::from_utf8(dir.read_file(file.name()).expect("file")).expect("utf8");
    assert!(content.contains("CREATE TABLE users"));
    dir.close();
}

#[test]
fn empty_plans_are_rejected() {
    let driver = FakeDriver::new();
    let dir = MemDir::open("orchestrator-empty");
    let error = Orchestrator::new(&driver)
        .plan_to_dir("noop", &[], &dir, None)
        .expect_err("empty plan");
    assert!(matches!(error, Error::Internal(_)));
    dir.close();
}

#[test]
fn status_lists_applied_and_pending_versions() {
    let driver = FakeDriver::new();
    let revisions = MemRevisions::new();
    let dir = MemDir::open("orchestrator-status");
    dir.write_file("1_init.sql", b"CREATE TABLE users (id int);\n")
        .expect("write");
    dir.write_file("2_posts.sql", b"CREATE TABLE posts (id int);\n")
        .expect("write");
    write_sum(&dir).expect("hash");

    let mut conn = FakeConn::new();
    let orchestrator = Orchestrator::new(&driver);

    let before = orchestrator
        .status(&mut conn, &dir, &revisions)
        .expect("status");
    assert!(before.applied.is_empty());
    assert_eq!(before.pending, vec!["1_init.sql", "2_posts.sql"]);
    assert_eq!(before.current, None);

    let opts = ApplyOptions {
        amount: Some(1),
        ..ApplyOptions::default()
    };
    orchestrator
        .apply(&mut conn, &dir, &revisions, &opts, None, &[], true)
        .expect("apply first");

    let after = orchestrator
        .status(&mut conn, &dir, &revisions)
        .expect("status");
    assert_eq!(after.current.as_deref(), Some("1"));
    assert_eq!(after.pending, vec!["2_posts.sql"]);
    dir.close();
}

#[test]
fn analyzer_gate_blocks_without_auto_approve() {
    let driver = FakeDriver {
        implicit_fill: Some("0".to_string()),
        ..FakeDriver::new()
    };
    let revisions = MemRevisions::new();
    let dir = MemDir::open("orchestrator-gate");
    dir.write_file("1_add.sql", b"ALTER TABLE users ADD COLUMN age int NOT NULL;\n")
        .expect("write");
    write_sum(&dir).expect("hash");

    // Replay on the dev database yields: empty realm, then a realm whose
    // users table gained a NOT NULL column without a default.
    let mut before_schema = Schema::named("public");
    before_schema.tables.push(table_in("public", "users"));
    driver.queue_inspection(realm_of(vec![before_schema.clone()]));
    let mut after_schema = Schema::named("public");
    let mut users = table_in("public", "users");
    users.columns.push(builders::int_column("age"));
    after_schema.tables.push(users);
    driver.queue_inspection(realm_of(vec![after_schema]));

    let mut conn = FakeConn::new();
    let mut dev = FakeConn::new();
    let analyzers = default_analyzers();
    let analyzer_refs: Vec<&dyn driftql_core::sqlcheck::Analyzer> =
        analyzers.iter().map(|a| a.as_ref()).collect();

    let orchestrator = Orchestrator::new(&driver);
    let error = orchestrator
        .apply(
            &mut conn,
            &dir,
            &revisions,
            &ApplyOptions::default(),
            Some(&mut dev),
            &analyzer_refs,
            false,
        )
        .expect_err("gate must block");
    assert!(matches!(error, Error::AnalysisBlocked { .. }));
    assert!(conn.executed.is_empty(), "target must stay untouched");
    dir.close();
}
