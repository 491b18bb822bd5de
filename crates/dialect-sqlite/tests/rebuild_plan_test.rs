use driftql_core::{
    Change, ColumnChange, TableChange,
    migrate::{PlanApplier as _, PlanOptions},
    schema::{Column, ColumnType, IntegerType, StringType, Table, Type},
};
use driftql_dialect_sqlite::SQLite;

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

fn text_column(name: &str) -> Column {
    let mut column = Column::new(
        name,
        ColumnType::new(
            "text",
            Type::String(StringType {
                t: "text".to_string(),
                size: None,
            }),
        ),
    );
    column.ty.nullable = true;
    column
}

fn users(columns: Vec<Column>) -> Table {
    let mut table = Table::named("users");
    table.schema = Some("main".to_string());
    table.columns = columns;
    table
}

#[test]
fn add_column_stays_a_plain_alter() {
    let driver = SQLite::new(std::env::temp_dir());
    let plan = driver
        .plan_changes(
            "add_name",
            &[Change::ModifyTable {
                table: users(vec![int_column("id"), text_column("name")]),
                changes: vec![TableChange::AddColumn(text_column("name"))],
            }],
            &PlanOptions::default(),
        )
        .expect("plan");
    assert_eq!(plan.stmts.len(), 1);
    assert_eq!(
        plan.stmts[0].cmd,
        "ALTER TABLE \"users\" ADD COLUMN \"name\" text"
    );
}

#[test]
fn column_modifications_rebuild_the_table() {
    let driver = SQLite::new(std::env::temp_dir());
    let desired = users(vec![int_column("id"), text_column("name")]);
    let plan = driver
        .plan_changes(
            "retype",
            &[Change::ModifyTable {
                table: desired,
                changes: vec![TableChange::ModifyColumn {
                    from: int_column("name"),
                    to: text_column("name"),
                    kinds: ColumnChange::Type.into(),
                }],
            }],
            &PlanOptions::default(),
        )
        .expect("plan");

    let cmds: Vec<&str> = plan.stmts.iter().map(|stmt| stmt.cmd.as_str()).collect();
    assert_eq!(cmds[0], "PRAGMA foreign_keys = off");
    assert!(cmds[1].starts_with("CREATE TABLE \"new_users\""));
    assert_eq!(
        cmds[2],
        "INSERT INTO \"new_users\" (\"id\", \"name\") SELECT \"id\", \"name\" FROM \"users\""
    );
    assert_eq!(cmds[3], "DROP TABLE \"users\"");
    assert_eq!(cmds[4], "ALTER TABLE \"new_users\" RENAME TO \"users\"");
    assert_eq!(cmds[5], "PRAGMA foreign_keys = on");
}

#[test]
fn dropped_columns_are_not_copied() {
    let driver = SQLite::new(std::env::temp_dir());
    let desired = users(vec![int_column("id")]);
    let plan = driver
        .plan_changes(
            "drop_name",
            &[Change::ModifyTable {
                table: desired,
                changes: vec![TableChange::DropColumn {
                    name: "name".to_string(),
                }],
            }],
            &PlanOptions::default(),
        )
        .expect("plan");

    let insert = plan
        .stmts
        .iter()
        .find(|stmt| stmt.cmd.starts_with("INSERT INTO"))
        .expect("copy statement");
    assert_eq!(
        insert.cmd,
        "INSERT INTO \"new_users\" (\"id\") SELECT \"id\" FROM \"users\""
    );
}
