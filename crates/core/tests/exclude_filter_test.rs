#[path = "support/builders.rs"]
mod builders;

use builders::{column_index, realm_of, table_in, varchar_column};
use driftql_core::inspect::exclude_from_realm;
use driftql_core::schema::{Schema, View};

fn sample_realm() -> driftql_core::schema::Realm {
    let mut public = Schema::named("public");
    let mut users = table_in("public", "users");
    users.columns.push(varchar_column("email", 255));
    users.indexes.push(column_index("users_email_idx", "email"));
    public.tables.push(users);
    public.tables.push(table_in("public", "posts"));
    public.views.push(View {
        name: "active_users".to_string(),
        schema: Some("public".to_string()),
        def: "SELECT * FROM users".to_string(),
        attrs: Vec::new(),
    });

    let mut audit = Schema::named("audit");
    audit.tables.push(table_in("audit", "events"));

    realm_of(vec![public, audit])
}

#[test]
fn schema_pattern_removes_whole_schemas() {
    let mut realm = sample_realm();
    exclude_from_realm(&mut realm, &["audit".to_string()]).expect("exclude");
    assert_eq!(realm.schemas.len(), 1);
    assert_eq!(realm.schemas[0].name, "public");
}

#[test]
fn glob_component_matches_multiple_tables() {
    let mut realm = sample_realm();
    exclude_from_realm(&mut realm, &["public.*".to_string()]).expect("exclude");
    let public = realm.schema("public").expect("schema kept");
    assert!(public.tables.is_empty());
    assert!(public.views.is_empty());
}

#[test]
fn type_selector_restricts_the_element_kind() {
    let mut realm = sample_realm();
    exclude_from_realm(&mut realm, &["public.*[type=view]".to_string()]).expect("exclude");
    let public = realm.schema("public").expect("schema kept");
    assert_eq!(public.tables.len(), 2, "tables must survive a view selector");
    assert!(public.views.is_empty());
}

#[test]
fn three_component_patterns_prune_table_elements() {
    let mut realm = sample_realm();
    exclude_from_realm(&mut realm, &["public.users.email".to_string()]).expect("exclude");
    let users = realm
        .schema("public")
        .and_then(|schema| schema.table("users"))
        .expect("table kept");
    assert!(users.column("email").is_none());
    // The index shares the element name only when it matches the glob.
    assert!(users.index("users_email_idx").is_some());
}

#[test]
fn element_selector_with_kind_keeps_other_kinds() {
    let mut realm = sample_realm();
    exclude_from_realm(
        &mut realm,
        &["public.users.*[type=index]".to_string()],
    )
    .expect("exclude");
    let users = realm
        .schema("public")
        .and_then(|schema| schema.table("users"))
        .expect("table kept");
    assert!(users.indexes.is_empty());
    assert!(users.column("email").is_some());
}

#[test]
fn malformed_patterns_error() {
    let mut realm = sample_realm();
    assert!(exclude_from_realm(&mut realm, &["a.b.c.d".to_string()]).is_err());
    assert!(exclude_from_realm(&mut realm, &["t[type=]".to_string()]).is_err());
    assert!(exclude_from_realm(&mut realm, &["t[oops]".to_string()]).is_err());
}
