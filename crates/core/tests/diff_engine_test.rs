#[path = "support/builders.rs"]
mod builders;

use builders::{column_index, int_column, realm_of, table_in, varchar_column};
use driftql_core::{
    Change, ColumnChange, Error, TableChange,
    diff::{DiffDriver, DiffEngine},
    schema::{Attr, Schema, replace_or_append},
};

struct DefaultDriver;

impl DiffDriver for DefaultDriver {}

fn engine() -> DiffEngine<'static> {
    static DRIVER: DefaultDriver = DefaultDriver;
    DiffEngine::new(&DRIVER)
}

fn schema_with_users() -> Schema {
    let mut schema = Schema::named("public");
    let mut users = table_in("public", "users");
    users.columns.push(varchar_column("email", 255));
    users.indexes.push(column_index("users_email_idx", "email"));
    schema.tables.push(users);
    schema
}

#[test]
fn identical_models_produce_no_changes() {
    let schema = schema_with_users();
    let changes = engine()
        .schema_diff(&schema, &schema.clone())
        .expect("diff must succeed");
    assert!(changes.is_empty(), "expected empty diff, got {changes:?}");
}

#[test]
fn mismatched_schema_names_fail_fast() {
    let from = Schema::named("public");
    let to = Schema::named("app");
    let error = engine().schema_diff(&from, &to).expect_err("names differ");
    assert!(matches!(error, Error::MismatchedNames { .. }));
}

#[test]
fn added_table_is_emitted_with_owning_schema() {
    let from = Schema::named("public");
    let to = schema_with_users();
    let changes = engine().schema_diff(&from, &to).expect("diff must succeed");

    assert_eq!(changes.len(), 1);
    let Change::AddTable(table) = &changes[0] else {
        panic!("expected AddTable, got {changes:?}");
    };
    assert_eq!(table.schema.as_deref(), Some("public"));
}

#[test]
fn dropped_and_added_columns_keep_drop_before_add() {
    let mut from = table_in("public", "users");
    from.columns.push(varchar_column("legacy", 64));
    let mut to = table_in("public", "users");
    to.columns.push(varchar_column("email", 255));

    let changes = engine().table_diff(&from, &to).expect("diff must succeed");
    let tags: Vec<&str> = changes.iter().map(TableChange::tag).collect();
    assert_eq!(tags, vec!["DropColumn", "AddColumn"]);
}

#[test]
fn column_modification_carries_change_kinds() {
    let mut from = table_in("public", "users");
    from.columns.push(varchar_column("email", 128));
    let mut to = table_in("public", "users");
    let mut email = varchar_column("email", 255);
    email.ty.nullable = true;
    replace_or_append(&mut email.attrs, Attr::Comment("contact".to_string()));
    to.columns.push(email);

    let changes = engine().table_diff(&from, &to).expect("diff must succeed");
    assert_eq!(changes.len(), 1);
    let TableChange::ModifyColumn { kinds, .. } = &changes[0] else {
        panic!("expected ModifyColumn, got {changes:?}");
    };
    assert!(kinds.contains(ColumnChange::Type));
    assert!(kinds.contains(ColumnChange::Null));
    assert!(kinds.contains(ColumnChange::Comment));
    assert!(!kinds.contains(ColumnChange::Default));
}

#[test]
fn primary_key_structural_change_is_rejected() {
    let mut from = table_in("public", "users");
    from.primary_key = Some(column_index("users_pkey", "id"));
    let mut to = table_in("public", "users");
    to.columns.push(varchar_column("email", 255));
    to.primary_key = Some(column_index("users_pkey", "email"));

    let error = engine().table_diff(&from, &to).expect_err("pk change");
    assert!(matches!(error, Error::Unsupported(_)));
}

#[test]
fn table_drops_and_modifies_precede_adds_in_schema_diff() {
    let mut from = Schema::named("public");
    from.tables.push(table_in("public", "legacy"));
    let mut kept = table_in("public", "kept");
    kept.columns.push(varchar_column("name", 64));
    from.tables.push(kept.clone());

    let mut to = Schema::named("public");
    kept.columns.push(varchar_column("extra", 32));
    to.tables.push(kept);
    to.tables.push(table_in("public", "brand_new"));

    let changes = engine().schema_diff(&from, &to).expect("diff must succeed");
    let tags: Vec<&str> = changes.iter().map(Change::tag).collect();
    assert_eq!(tags, vec!["DropTable", "ModifyTable", "AddTable"]);
}

#[test]
fn check_changes_come_before_column_changes() {
    let mut from = table_in("public", "orders");
    from.checks.push(driftql_core::schema::Check::new(
        "orders_total_chk",
        "total >= 0",
    ));
    from.columns.push(int_column("total"));

    let mut to = table_in("public", "orders");
    to.columns.push(int_column("total"));

    let changes = engine().table_diff(&from, &to).expect("diff must succeed");
    let tags: Vec<&str> = changes.iter().map(TableChange::tag).collect();
    assert_eq!(tags, vec!["DropCheck"]);
}

#[test]
fn realm_diff_emits_schema_lifecycle() {
    let from = realm_of(vec![Schema::named("legacy")]);
    let to = realm_of(vec![schema_with_users()]);

    let changes = engine().realm_diff(&from, &to).expect("diff must succeed");
    let tags: Vec<&str> = changes.iter().map(Change::tag).collect();
    assert_eq!(tags, vec!["DropSchema", "AddSchema", "AddTable"]);
}
