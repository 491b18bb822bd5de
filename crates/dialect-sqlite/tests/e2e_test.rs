use driftql_core::{
    Change, ConnectionConfig,
    diff::DiffEngine,
    driver::Driver as _,
    inspect::{InspectOptions, Inspector as _},
    migrate::{
        ApplyOptions, Applier, Dir, MemDir, PlanApplier as _, PlanOptions, write_sum,
    },
    schema::{Column, ColumnType, Index, IntegerType, PartKind, Schema, StringType, Table, Type},
};
use driftql_dialect_sqlite::{SQLite, SQLiteRevisions};

fn memory_config() -> ConnectionConfig {
    ConnectionConfig {
        database: ":memory:".to_string(),
        ..ConnectionConfig::default()
    }
}

fn desired_users() -> Table {
    let mut table = Table::named("users");
    table.schema = Some("main".to_string());
    let mut id = Column::new(
        "id",
        ColumnType::new(
            "integer",
            Type::Integer(IntegerType {
                t: "integer".to_string(),
                unsigned: false,
            }),
        ),
    );
    id.ty.nullable = false;
    table.columns.push(id);

    let mut email = Column::new(
        "email",
        ColumnType::new(
            "text",
            Type::String(StringType {
                t: "text".to_string(),
                size: None,
            }),
        ),
    );
    email.ty.nullable = false;
    table.columns.push(email);

    let mut pk = Index::named("PRIMARY").unique();
    pk.push_part(PartKind::Column("id".to_string()));
    table.primary_key = Some(pk);

    let mut unique_email = Index::named("users_email_key").unique();
    unique_email.push_part(PartKind::Column("email".to_string()));
    table.indexes.push(unique_email);
    table
}

#[test]
fn applied_plan_inspects_back_to_the_desired_model() {
    let (driver, mut conn) = SQLite::connect(&memory_config()).expect("connect");

    let plan = driver
        .plan_changes(
            "init",
            &[Change::AddTable(desired_users())],
            &PlanOptions::default(),
        )
        .expect("plan");
    for stmt in &plan.stmts {
        use driftql_core::ExecQuerier as _;
        conn.exec(&stmt.cmd, &[]).expect("execute");
    }

    let schema = driver
        .inspect_schema(&mut conn, None, &InspectOptions::default())
        .expect("inspect");
    let users = schema.table("users").expect("table");
    assert_eq!(users.columns.len(), 2);
    assert!(users.primary_key.is_some());
    assert_eq!(users.indexes.len(), 1);
    assert!(users.indexes[0].unique);

    // Re-diffing the live state against the desired model is a fixpoint.
    let mut desired = Schema::named("main");
    desired.tables.push(desired_users());
    let changes = DiffEngine::new(driver.diff_driver())
        .schema_diff(&schema, &desired)
        .expect("diff");
    assert!(changes.is_empty(), "unexpected drift: {changes:?}");
}

#[test]
fn migrate_apply_runs_files_and_records_revisions() {
    let (driver, mut conn) = SQLite::connect(&memory_config()).expect("connect");
    let revisions = SQLiteRevisions::new();

    let dir = MemDir::open("sqlite-e2e");
    dir.write_file(
        "1_init.sql",
        b"CREATE TABLE users (id integer NOT NULL PRIMARY KEY, email text NOT NULL);\n",
    )
    .expect("write");
    dir.write_file(
        "2_index.sql",
        b"CREATE UNIQUE INDEX users_email_key ON users (email);\n",
    )
    .expect("write");
    write_sum(&dir).expect("hash");

    let opts = ApplyOptions {
        lock_name: "sqlite-e2e".to_string(),
        ..ApplyOptions::default()
    };
    let report = Applier::new(&driver, &revisions)
        .apply(&mut conn, &dir, &opts)
        .expect("apply");
    assert_eq!(report.applied, vec!["1", "2"]);

    use driftql_core::migrate::RevisionReadWriter as _;
    let recorded = revisions.read(&mut conn).expect("read revisions");
    assert_eq!(recorded.len(), 2);
    assert!(recorded
        .iter()
        .all(|revision| revision.state == driftql_core::migrate::ExecutionState::Applied));

    // The revision table itself keeps the clean checker honest: with the
    // ident supplied the extra user table still violates cleanliness.
    use driftql_core::driver::CleanChecker as _;
    let error = driver
        .check_clean(&mut conn, Some(&revisions.ident()))
        .expect_err("user tables present");
    assert!(matches!(
        error.root(),
        driftql_core::Error::NotClean { .. }
    ));

    dir.close();
}

#[test]
fn snapshot_refuses_dirty_targets_and_restore_is_idempotent() {
    use driftql_core::ExecQuerier as _;
    use driftql_core::driver::Snapshoter as _;

    let (driver, mut conn) = SQLite::connect(&memory_config()).expect("connect");
    let restorer = driver.snapshot(&mut conn).expect("empty target is clean");

    conn.exec("CREATE TABLE scratch (id integer)", &[])
        .expect("create");
    assert!(
        driver.snapshot(&mut conn).is_err(),
        "snapshot must refuse a populated target"
    );

    restorer.restore(&mut conn).expect("first restore");
    restorer.restore(&mut conn).expect("second restore is a no-op");

    let schema = driver
        .inspect_schema(&mut conn, None, &InspectOptions::default())
        .expect("inspect");
    assert!(schema.tables.is_empty(), "restore returns to empty state");

    // A clean target snapshots again.
    driver.snapshot(&mut conn).expect("clean after restore");
}
