#[path = "support/builders.rs"]
mod builders;

use builders::{column_index, fk, int_column, table_in};
use driftql_core::schema::{
    Attr, AttrKind, EnumRef, EnumType, Realm, Schema, Type, attr, replace_or_append,
    validate_realm,
};

#[test]
fn replace_or_append_keeps_one_attr_per_kind() {
    let mut attrs = Vec::new();
    replace_or_append(&mut attrs, Attr::Comment("first".to_string()));
    replace_or_append(&mut attrs, Attr::Charset("utf8mb4".to_string()));
    replace_or_append(&mut attrs, Attr::Comment("second".to_string()));

    assert_eq!(attrs.len(), 2);
    assert_eq!(attr::comment(&attrs), Some("second"));
    assert_eq!(attr::charset(&attrs), Some("utf8mb4"));
}

#[test]
fn replace_or_append_allows_distinct_unknown_attrs() {
    let mut attrs = Vec::new();
    replace_or_append(&mut attrs, Attr::Unknown { raw: "WITH OIDS".to_string() });
    replace_or_append(&mut attrs, Attr::Unknown { raw: "FILLFACTOR=70".to_string() });
    replace_or_append(&mut attrs, Attr::Unknown { raw: "WITH OIDS".to_string() });

    assert_eq!(attrs.len(), 2);
    assert_eq!(attr::find(&attrs, AttrKind::Unknown).is_some(), true);
}

#[test]
fn indexes_of_includes_primary_key() {
    let mut table = table_in("public", "users");
    table.columns.push(int_column("tenant"));
    table.primary_key = Some(column_index("users_pkey", "id"));
    table.indexes.push(column_index("users_tenant_idx", "tenant"));

    let on_id = table.indexes_of("id");
    assert_eq!(on_id.len(), 1);
    assert_eq!(on_id[0].name, "users_pkey");

    let on_tenant = table.indexes_of("tenant");
    assert_eq!(on_tenant.len(), 1);
    assert_eq!(on_tenant[0].name, "users_tenant_idx");
}

#[test]
fn validate_rejects_fk_with_unknown_local_column() {
    let mut schema = Schema::named("public");
    let mut table = table_in("public", "posts");
    table
        .foreign_keys
        .push(fk("posts_author_fk", "author_id", "public", "users"));
    schema.tables.push(table);
    schema.tables.push(table_in("public", "users"));

    let realm = Realm {
        schemas: vec![schema],
        attrs: Vec::new(),
    };
    let error = validate_realm(&realm).expect_err("missing local column must fail");
    assert!(error.to_string().contains("author_id"));
}

#[test]
fn validate_rejects_mismatched_fk_column_counts() {
    let mut schema = Schema::named("public");
    let mut table = table_in("public", "posts");
    table.columns.push(int_column("author_id"));
    let mut bad_fk = fk("posts_author_fk", "author_id", "public", "users");
    bad_fk.ref_columns.push("tenant".to_string());
    table.foreign_keys.push(bad_fk);
    schema.tables.push(table);
    schema.tables.push(table_in("public", "users"));

    let realm = Realm {
        schemas: vec![schema],
        attrs: Vec::new(),
    };
    assert!(validate_realm(&realm).is_err());
}

#[test]
fn validate_resolves_enum_references_through_the_realm() {
    let mut schema = Schema::named("public");
    let mut table = table_in("public", "tickets");
    let mut status = int_column("status");
    status.ty.raw = "ticket_status".to_string();
    status.ty.ty = Type::Enum(EnumRef {
        name: Some("ticket_status".to_string()),
        schema: None,
        values: Vec::new(),
    });
    table.columns.push(status);
    schema.tables.push(table);

    let mut realm = Realm {
        schemas: vec![schema],
        attrs: Vec::new(),
    };
    assert!(validate_realm(&realm).is_err());

    realm.schemas[0].enums.push(EnumType {
        name: "ticket_status".to_string(),
        schema: Some("public".to_string()),
        values: vec!["open".to_string(), "closed".to_string()],
    });
    validate_realm(&realm).expect("resolved enum reference must pass");
}

#[test]
fn validate_rejects_drifted_index_part_positions() {
    let mut table = table_in("public", "users");
    let mut index = column_index("users_idx", "id");
    index.parts[0].seq_no = 3;
    table.indexes.push(index);

    let realm = Realm {
        schemas: vec![Schema {
            name: "public".to_string(),
            tables: vec![table],
            ..Schema::default()
        }],
        attrs: Vec::new(),
    };
    assert!(validate_realm(&realm).is_err());
}
