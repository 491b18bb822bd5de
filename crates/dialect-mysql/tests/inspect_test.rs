use driftql_core::{
    Value, Version,
    inspect::{InspectOptions, Inspector as _},
    schema::{Attr, AttrKind, DefaultValue, PartKind, Type, attr},
};
use driftql_dialect_mysql::{MySql, queries};
use driftql_testkit::ScriptedConn;

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn conn_with_users_table() -> ScriptedConn {
    let mut conn = ScriptedConn::new();
    conn.script(
        queries::SELECT_SCHEMAS,
        vec![ScriptedConn::row(&[
            ("schema_name", text("app")),
            ("charset", text("utf8mb4")),
            ("collation", text("utf8mb4_0900_ai_ci")),
        ])],
    );
    conn.script(
        queries::SELECT_TABLES,
        vec![ScriptedConn::row(&[
            ("table_name", text("users")),
            ("engine", text("InnoDB")),
            ("collation", text("utf8mb4_0900_ai_ci")),
            ("comment", text("")),
            ("auto_increment", Value::Int(5)),
            ("create_options", text("")),
        ])],
    );
    conn.script(
        queries::SELECT_COLUMNS,
        vec![
            ScriptedConn::row(&[
                ("column_name", text("id")),
                ("column_type", text("int")),
                ("is_nullable", text("NO")),
                ("column_default", Value::Null),
                ("extra", text("auto_increment")),
                ("comment", text("")),
                ("charset", Value::Null),
                ("collation", Value::Null),
                ("generation_expression", Value::Null),
                ("column_key", text("PRI")),
            ]),
            ScriptedConn::row(&[
                ("column_name", text("email")),
                ("column_type", text("varchar(255)")),
                ("is_nullable", text("NO")),
                ("column_default", text("nobody@example.com")),
                ("extra", text("")),
                ("comment", text("contact address")),
                ("charset", text("utf8mb4")),
                ("collation", text("utf8mb4_0900_ai_ci")),
                ("generation_expression", Value::Null),
                ("column_key", text("")),
            ]),
            ScriptedConn::row(&[
                ("column_name", text("created_at")),
                ("column_type", text("timestamp")),
                ("is_nullable", text("NO")),
                ("column_default", text("CURRENT_TIMESTAMP")),
                ("extra", text("DEFAULT_GENERATED on update CURRENT_TIMESTAMP")),
                ("comment", text("")),
                ("charset", Value::Null),
                ("collation", Value::Null),
                ("generation_expression", Value::Null),
                ("column_key", text("")),
            ]),
        ],
    );
    conn.script(
        queries::SELECT_INDEXES,
        vec![
            ScriptedConn::row(&[
                ("index_name", text("PRIMARY")),
                ("non_unique", Value::Int(0)),
                ("seq_in_index", Value::Int(1)),
                ("column_name", text("id")),
                ("sub_part", Value::Null),
                ("expression", Value::Null),
                ("collation", text("A")),
                ("index_type", text("BTREE")),
                ("comment", text("")),
            ]),
            ScriptedConn::row(&[
                ("index_name", text("users_email_key")),
                ("non_unique", Value::Int(0)),
                ("seq_in_index", Value::Int(1)),
                ("column_name", text("email")),
                ("sub_part", Value::Int(10)),
                ("expression", Value::Null),
                ("collation", text("D")),
                ("index_type", text("BTREE")),
                ("comment", text("")),
            ]),
        ],
    );
    conn.script(
        &queries::show_create_table("app", "users"),
        vec![ScriptedConn::row(&[
            ("Table", text("users")),
            (
                "Create Table",
                text("CREATE TABLE `users` (\n  `id` int NOT NULL AUTO_INCREMENT\n) ENGINE=InnoDB AUTO_INCREMENT=5"),
            ),
        ])],
    );
    conn
}

#[test]
fn inspects_columns_indexes_and_table_attrs() {
    let driver = MySql::new(Version::new(8, 0, 33));
    let mut conn = conn_with_users_table();

    let realm = driver
        .inspect_realm(&mut conn, &InspectOptions::default())
        .expect("inspect");
    let schema = realm.schema("app").expect("schema");
    assert_eq!(attr::charset(&schema.attrs), Some("utf8mb4"));

    let users = schema.table("users").expect("table");
    assert_eq!(users.schema.as_deref(), Some("app"));
    assert!(matches!(
        attr::find(&users.attrs, AttrKind::AutoIncrement),
        Some(Attr::AutoIncrement(Some(5)))
    ));

    let id = users.column("id").expect("id column");
    assert!(!id.ty.nullable);
    assert!(attr::find(&id.attrs, AttrKind::AutoIncrement).is_some());

    let email = users.column("email").expect("email column");
    assert!(matches!(email.ty.ty, Type::String(_)));
    assert_eq!(
        email.default,
        Some(DefaultValue::Literal("'nobody@example.com'".to_string()))
    );
    assert_eq!(attr::comment(&email.attrs), Some("contact address"));

    let created = users.column("created_at").expect("created_at column");
    assert_eq!(
        created.default,
        Some(DefaultValue::RawExpr("CURRENT_TIMESTAMP".to_string()))
    );
    assert!(matches!(
        attr::find(&created.attrs, AttrKind::OnUpdate),
        Some(Attr::OnUpdate(expr)) if expr == "CURRENT_TIMESTAMP"
    ));

    // PRIMARY becomes the distinguished primary key, not a regular index.
    let pk = users.primary_key.as_ref().expect("primary key");
    assert_eq!(pk.parts.len(), 1);
    assert_eq!(users.indexes.len(), 1);
    let email_index = &users.indexes[0];
    assert!(email_index.unique);
    assert_eq!(email_index.parts[0].prefix, Some(10));
    assert!(email_index.parts[0].desc);
    assert!(matches!(
        email_index.parts[0].kind,
        PartKind::Column(ref column) if column == "email"
    ));
}

#[test]
fn schema_filter_limits_inspection() {
    let driver = MySql::new(Version::new(8, 0, 33));
    let mut conn = conn_with_users_table();
    let opts = InspectOptions {
        schemas: vec!["other".to_string()],
        ..InspectOptions::default()
    };
    let realm = driver.inspect_realm(&mut conn, &opts).expect("inspect");
    assert!(realm.schemas.is_empty());
}

#[test]
fn exclude_patterns_apply_to_inspection() {
    let driver = MySql::new(Version::new(8, 0, 33));
    let mut conn = conn_with_users_table();
    let opts = InspectOptions {
        exclude: vec!["app.users".to_string()],
        ..InspectOptions::default()
    };
    let realm = driver.inspect_realm(&mut conn, &opts).expect("inspect");
    assert!(realm.schema("app").expect("schema").tables.is_empty());
}

#[test]
fn missing_schema_is_not_exist() {
    let driver = MySql::new(Version::new(8, 0, 33));
    let mut conn = ScriptedConn::new();
    let error = driver
        .inspect_schema(&mut conn, Some("ghost"), &InspectOptions::default())
        .expect_err("missing schema");
    assert!(matches!(
        error.root(),
        driftql_core::Error::NotExist { .. }
    ));
}

#[test]
fn tidb_auto_random_is_detected_only_from_the_sentinel() {
    let driver = MySql::tidb(Version::new(6, 5, 0));
    let mut conn = conn_with_users_table();
    conn.script(
        &queries::show_create_table("app", "users"),
        vec![ScriptedConn::row(&[
            ("Table", text("users")),
            (
                "Create Table",
                text(
                    "CREATE TABLE `users` (\n  `id` int NOT NULL /*T![auto_rand] AUTO_RANDOM(5, 64) */\n)",
                ),
            ),
        ])],
    );

    let realm = driver
        .inspect_realm(&mut conn, &InspectOptions::default())
        .expect("inspect");
    let id = realm
        .schema("app")
        .and_then(|schema| schema.table("users"))
        .and_then(|table| table.column("id"))
        .expect("id column");

    // Range 64 normalizes to 0 for a lossless round-trip.
    assert!(matches!(
        attr::find(&id.attrs, AttrKind::AutoRandom),
        Some(Attr::AutoRandom {
            shard_bits: 5,
            range: 0
        })
    ));
}

#[test]
fn plain_comments_do_not_trigger_auto_random() {
    let driver = MySql::tidb(Version::new(6, 5, 0));
    let mut conn = conn_with_users_table();
    conn.script(
        &queries::show_create_table("app", "users"),
        vec![ScriptedConn::row(&[
            ("Table", text("users")),
            (
                "Create Table",
                text("CREATE TABLE `users` (\n  `id` int NOT NULL COMMENT 'AUTO_RANDOM(5)'\n)"),
            ),
        ])],
    );

    let realm = driver
        .inspect_realm(&mut conn, &InspectOptions::default())
        .expect("inspect");
    let id = realm
        .schema("app")
        .and_then(|schema| schema.table("users"))
        .and_then(|table| table.column("id"))
        .expect("id column");
    assert!(attr::find(&id.attrs, AttrKind::AutoRandom).is_none());
}
