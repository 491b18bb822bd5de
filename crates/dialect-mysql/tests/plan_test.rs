use driftql_core::{
    Change, Error, TableChange, Version,
    migrate::{PlanApplier as _, PlanOptions},
    schema::{
        Attr, Check, Column, ColumnType, ForeignKey, Index, IntegerType, PartKind, StringType,
        Table, TableRef, Type, replace_or_append,
    },
};
use driftql_dialect_mysql::MySql;

fn int_column(name: &str) -> Column {
    Column::new(
        name,
        ColumnType::new(
            "int",
            Type::Integer(IntegerType {
                t: "int".to_string(),
                unsigned: false,
            }),
        ),
    )
}

fn bigint_column(name: &str) -> Column {
    Column::new(
        name,
        ColumnType::new(
            "bigint",
            Type::Integer(IntegerType {
                t: "bigint".to_string(),
                unsigned: false,
            }),
        ),
    )
}

fn varchar_column(name: &str, size: i64) -> Column {
    Column::new(
        name,
        ColumnType::new(
            format!("varchar({size})"),
            Type::String(StringType {
                t: "varchar".to_string(),
                size: Some(size),
            }),
        ),
    )
}

fn users_table() -> Table {
    let mut table = Table::named("users");
    table.schema = Some("app".to_string());
    table.columns.push(int_column("id"));
    let mut email = varchar_column("email", 255);
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
fn fresh_create_emits_create_table_then_unique_index() {
    let driver = MySql::new(Version::new(8, 0, 33));
    let plan = driver
        .plan_changes(
            "add_users",
            &[Change::AddTable(users_table())],
            &PlanOptions::default(),
        )
        .expect("plan");

    assert!(!plan.transactional, "mysql ddl is not transactional");
    assert!(plan.reversible);
    assert_eq!(plan.stmts.len(), 2);
    assert_eq!(
        plan.stmts[0].cmd,
        "CREATE TABLE `app`.`users` (`id` int NOT NULL, `email` varchar(255) NOT NULL, PRIMARY KEY (`id`))"
    );
    assert_eq!(
        plan.stmts[1].cmd,
        "CREATE UNIQUE INDEX `users_email_key` ON `app`.`users` (`email`)"
    );
    assert_eq!(plan.stmts[0].reverse.as_deref(), Some("DROP TABLE `app`.`users`"));
}

#[test]
fn modify_table_merges_clauses_into_one_alter() {
    let driver = MySql::new(Version::new(8, 0, 33));
    let mut age = int_column("age");
    age.ty.nullable = true;
    let change = Change::ModifyTable {
        table: users_table(),
        changes: vec![
            TableChange::AddColumn(age),
            TableChange::DropColumn {
                name: "legacy".to_string(),
            },
        ],
    };
    let plan = driver
        .plan_changes("alter_users", &[change], &PlanOptions::default())
        .expect("plan");

    assert_eq!(plan.stmts.len(), 1);
    assert_eq!(
        plan.stmts[0].cmd,
        "ALTER TABLE `app`.`users` ADD COLUMN `age` int, DROP COLUMN `legacy`"
    );
    // The drop has no safe inverse, so neither does the statement.
    assert_eq!(plan.stmts[0].reverse, None);
}

#[test]
fn tidb_splits_modify_table_into_priority_ordered_alters() {
    let driver = MySql::tidb(Version::new(6, 5, 0));
    let change = Change::ModifyTable {
        table: users_table(),
        changes: vec![
            TableChange::DropIndex {
                name: "ix1".to_string(),
            },
            TableChange::AddColumn(int_column("c1")),
            TableChange::DropForeignKey {
                symbol: "fk1".to_string(),
            },
        ],
    };
    let plan = driver
        .plan_changes("split", &[change], &PlanOptions::default())
        .expect("plan");

    let cmds: Vec<&str> = plan.stmts.iter().map(|stmt| stmt.cmd.as_str()).collect();
    assert_eq!(
        cmds,
        vec![
            "ALTER TABLE `app`.`users` ADD COLUMN `c1` int NOT NULL",
            "ALTER TABLE `app`.`users` DROP INDEX `ix1`",
            "ALTER TABLE `app`.`users` DROP FOREIGN KEY `fk1`",
        ],
        "added columns come first, then equal-priority drops in input order"
    );
}

#[test]
fn check_constraints_are_version_gated() {
    let old = MySql::new(Version::new(5, 6, 35));
    let change = Change::ModifyTable {
        table: users_table(),
        changes: vec![TableChange::AddCheck(Check::new("users_chk", "id > 0"))],
    };
    let error = old
        .plan_changes("add_check", &[change.clone()], &PlanOptions::default())
        .expect_err("5.6 has no check constraints");
    assert!(matches!(error.root(), Error::UnsupportedVersion { .. }));

    let modern = MySql::new(Version::new(8, 0, 16));
    let plan = modern
        .plan_changes("add_check", &[change], &PlanOptions::default())
        .expect("8.0.16 supports checks");
    assert_eq!(
        plan.stmts[0].cmd,
        "ALTER TABLE `app`.`users` ADD CONSTRAINT `users_chk` CHECK (id > 0)"
    );
}

#[test]
fn mariadb_drops_checks_with_drop_constraint() {
    let driver = MySql::mariadb(Version::new(10, 6, 0));
    let change = Change::ModifyTable {
        table: users_table(),
        changes: vec![TableChange::DropCheck {
            name: "users_chk".to_string(),
        }],
    };
    let plan = driver
        .plan_changes("drop_check", &[change], &PlanOptions::default())
        .expect("plan");
    assert_eq!(
        plan.stmts[0].cmd,
        "ALTER TABLE `app`.`users` DROP CONSTRAINT `users_chk`"
    );
}

#[test]
fn auto_random_removal_is_rejected() {
    let driver = MySql::tidb(Version::new(6, 5, 0));
    let mut from = bigint_column("id");
    replace_or_append(
        &mut from.attrs,
        Attr::AutoRandom {
            shard_bits: 5,
            range: 0,
        },
    );
    let to = bigint_column("id");

    let change = Change::ModifyTable {
        table: users_table(),
        changes: vec![TableChange::ModifyColumn {
            from,
            to,
            kinds: driftql_core::ColumnChange::Attr.into(),
        }],
    };
    let error = driver
        .plan_changes("remove_auto_random", &[change], &PlanOptions::default())
        .expect_err("auto_random cannot be removed");
    assert!(matches!(error.root(), Error::Unsupported(_)));
}

#[test]
fn auto_random_requires_tidb_and_bigint() {
    let mut column = bigint_column("id");
    replace_or_append(
        &mut column.attrs,
        Attr::AutoRandom {
            shard_bits: 5,
            range: 0,
        },
    );
    let mut table = Table::named("events");
    table.schema = Some("app".to_string());
    table.columns.push(column.clone());

    let mysql = MySql::new(Version::new(8, 0, 33));
    assert!(
        mysql
            .plan_changes(
                "add",
                &[Change::AddTable(table.clone())],
                &PlanOptions::default()
            )
            .is_err(),
        "auto_random outside tidb must fail"
    );

    let tidb = MySql::tidb(Version::new(6, 5, 0));
    let plan = tidb
        .plan_changes("add", &[Change::AddTable(table)], &PlanOptions::default())
        .expect("tidb accepts bigint auto_random");
    assert!(plan.stmts[0]
        .cmd
        .contains("/*T![auto_rand] AUTO_RANDOM(5) */"));

    let mut narrow = int_column("id");
    replace_or_append(
        &mut narrow.attrs,
        Attr::AutoRandom {
            shard_bits: 5,
            range: 0,
        },
    );
    let mut narrow_table = Table::named("events");
    narrow_table.schema = Some("app".to_string());
    narrow_table.columns.push(narrow);
    assert!(
        tidb.plan_changes(
            "add",
            &[Change::AddTable(narrow_table)],
            &PlanOptions::default()
        )
        .is_err(),
        "auto_random requires a bigint column"
    );
}

#[test]
fn foreign_key_clause_renders_actions_and_cross_schema_targets() {
    let driver = MySql::new(Version::new(8, 0, 33));
    let fk = ForeignKey {
        symbol: "orders_user_fk".to_string(),
        columns: vec!["user_id".to_string()],
        ref_table: TableRef::new(Some("auth"), "users"),
        ref_columns: vec!["id".to_string()],
        on_update: Some(driftql_core::schema::RefAction::Cascade),
        on_delete: Some(driftql_core::schema::RefAction::SetNull),
        attrs: Vec::new(),
    };
    let change = Change::ModifyTable {
        table: users_table(),
        changes: vec![TableChange::AddForeignKey(fk)],
    };
    let plan = driver
        .plan_changes("add_fk", &[change], &PlanOptions::default())
        .expect("plan");
    assert_eq!(
        plan.stmts[0].cmd,
        "ALTER TABLE `app`.`users` ADD CONSTRAINT `orders_user_fk` FOREIGN KEY (`user_id`) \
         REFERENCES `auth`.`users` (`id`) ON UPDATE CASCADE ON DELETE SET NULL"
    );
    assert_eq!(
        plan.stmts[0].reverse.as_deref(),
        Some("ALTER TABLE `app`.`users` DROP FOREIGN KEY `orders_user_fk`")
    );
}
