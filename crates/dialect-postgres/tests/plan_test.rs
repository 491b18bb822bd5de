use driftql_core::{
    Change, ColumnChange, TableChange, Version,
    diff::DiffEngine,
    migrate::{PlanApplier as _, PlanOptions},
    schema::{
        Column, ColumnType, EnumType, ForeignKey, IntegerType, Schema, StringType, Table,
        TableRef, Type,
    },
};
use driftql_dialect_postgres::Postgres;

fn int_column(name: &str) -> Column {
    Column::new(
        name,
        ColumnType::new(
            "integer",
            Type::Integer(IntegerType {
                t: "integer".to_string(),
                unsigned: false,
            }),
        ),
    )
}

fn varchar_column(name: &str, size: i64) -> Column {
    Column::new(
        name,
        ColumnType::new(
            format!("character varying({size})"),
            Type::String(StringType {
                t: "character varying".to_string(),
                size: Some(size),
            }),
        ),
    )
}

fn table_with_fk(name: &str, target: &str) -> Table {
    let mut table = Table::named(name);
    table.schema = Some("public".to_string());
    table.columns.push(int_column("id"));
    let mut fk_column = int_column(&format!("{target}_id"));
    fk_column.ty.nullable = true;
    table.columns.push(fk_column);
    table.foreign_keys.push(ForeignKey {
        symbol: format!("{name}_{target}_fk"),
        columns: vec![format!("{target}_id")],
        ref_table: TableRef::new(Some("public"), target),
        ref_columns: vec!["id".to_string()],
        on_update: None,
        on_delete: None,
        attrs: Vec::new(),
    });
    table
}

#[test]
fn mutually_referencing_new_tables_defer_their_foreign_keys() {
    let driver = Postgres::new(Version::new(15, 0, 0));
    let from = Schema::named("public");
    let mut to = Schema::named("public");
    to.tables.push(table_with_fk("a", "b"));
    to.tables.push(table_with_fk("b", "a"));

    let changes = DiffEngine::new(driftql_core::driver::Driver::diff_driver(&driver))
        .schema_diff(&from, &to)
        .expect("diff");
    let plan = driver
        .plan_changes("cycle", &changes, &PlanOptions::default())
        .expect("plan");

    let cmds: Vec<&str> = plan.stmts.iter().map(|stmt| stmt.cmd.as_str()).collect();
    assert!(cmds[0].starts_with("CREATE TABLE \"public\".\"a\""));
    assert!(cmds[1].starts_with("CREATE TABLE \"public\".\"b\""));
    let alters: Vec<&&str> = cmds
        .iter()
        .filter(|cmd| cmd.contains("ADD CONSTRAINT"))
        .collect();
    assert_eq!(alters.len(), 2, "both constraints deferred: {cmds:?}");
    assert!(
        cmds.iter()
            .position(|cmd| cmd.contains("ADD CONSTRAINT"))
            .expect("alter present")
            >= 2,
        "constraints come after both creations: {cmds:?}"
    );
    assert!(plan.transactional, "postgres plans run in one transaction");
}

#[test]
fn enum_objects_are_created_before_use_and_alterable() {
    let driver = Postgres::new(Version::new(15, 0, 0));
    let status = EnumType {
        name: "ticket_status".to_string(),
        schema: Some("public".to_string()),
        values: vec!["open".to_string(), "closed".to_string()],
    };

    let plan = driver
        .plan_changes(
            "enums",
            &[Change::AddObject(status.clone())],
            &PlanOptions::default(),
        )
        .expect("plan");
    assert_eq!(
        plan.stmts[0].cmd,
        "CREATE TYPE \"public\".\"ticket_status\" AS ENUM ('open', 'closed')"
    );
    assert_eq!(
        plan.stmts[0].reverse.as_deref(),
        Some("DROP TYPE \"public\".\"ticket_status\"")
    );

    let mut widened = status.clone();
    widened.values.push("archived".to_string());
    let plan = driver
        .plan_changes(
            "widen",
            &[Change::ModifyObject {
                from: status.clone(),
                to: widened,
            }],
            &PlanOptions::default(),
        )
        .expect("plan");
    assert_eq!(
        plan.stmts[0].cmd,
        "ALTER TYPE \"public\".\"ticket_status\" ADD VALUE 'archived'"
    );

    let mut reordered = status.clone();
    reordered.values.reverse();
    assert!(
        driver
            .plan_changes(
                "reorder",
                &[Change::ModifyObject {
                    from: status,
                    to: reordered,
                }],
                &PlanOptions::default(),
            )
            .is_err(),
        "label reordering requires a rebuild and must be refused"
    );
}

#[test]
fn modify_column_lowers_to_alter_column_clauses() {
    let driver = Postgres::new(Version::new(15, 0, 0));
    let mut table = Table::named("users");
    table.schema = Some("public".to_string());
    table.columns.push(varchar_column("email", 255));

    let from = varchar_column("email", 128);
    let mut to = varchar_column("email", 255);
    to.ty.nullable = true;

    let plan = driver
        .plan_changes(
            "widen_email",
            &[Change::ModifyTable {
                table,
                changes: vec![TableChange::ModifyColumn {
                    from,
                    to,
                    kinds: ColumnChange::Type | ColumnChange::Null,
                }],
            }],
            &PlanOptions::default(),
        )
        .expect("plan");

    assert_eq!(
        plan.stmts[0].cmd,
        "ALTER TABLE \"public\".\"users\" \
         ALTER COLUMN \"email\" TYPE character varying(255), \
         ALTER COLUMN \"email\" DROP NOT NULL"
    );
    assert_eq!(
        plan.stmts[0].reverse.as_deref(),
        Some(
            "ALTER TABLE \"public\".\"users\" \
             ALTER COLUMN \"email\" SET NOT NULL, \
             ALTER COLUMN \"email\" TYPE character varying(128)"
        )
    );
}

#[test]
fn add_index_is_a_standalone_statement_after_the_alter() {
    let driver = Postgres::new(Version::new(15, 0, 0));
    let mut table = Table::named("users");
    table.schema = Some("public".to_string());
    table.columns.push(int_column("id"));

    let mut index = driftql_core::schema::Index::named("users_email_idx");
    index.push_part(driftql_core::schema::PartKind::Column("email".to_string()));

    let plan = driver
        .plan_changes(
            "add_bits",
            &[Change::ModifyTable {
                table,
                changes: vec![
                    TableChange::AddColumn(varchar_column("email", 255)),
                    TableChange::AddIndex(index),
                ],
            }],
            &PlanOptions::default(),
        )
        .expect("plan");

    assert_eq!(plan.stmts.len(), 2);
    assert!(plan.stmts[0].cmd.starts_with("ALTER TABLE \"public\".\"users\" ADD COLUMN"));
    assert_eq!(
        plan.stmts[1].cmd,
        "CREATE INDEX \"users_email_idx\" ON \"public\".\"users\" (\"email\")"
    );
}
