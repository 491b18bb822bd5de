use driftql_core::{
    Error, ExecQuerier, Result,
    inspect::{InspectMode, InspectOptions, exclude_from_realm},
    schema::{
        Attr, Column, ColumnType, DefaultValue, ForeignKey, Index, PartKind, Realm, RefAction,
        Schema, Table, TableRef, Trigger, View, replace_or_append,
    },
};

use crate::{SQLite, types};

pub(crate) const MAIN_SCHEMA: &str = "main";

const SELECT_TABLES: &str = "\
SELECT name, sql FROM sqlite_master \
WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

const SELECT_VIEWS: &str =
    "SELECT name, sql FROM sqlite_master WHERE type = 'view' ORDER BY name";

const SELECT_TRIGGERS: &str =
    "SELECT name, tbl_name, sql FROM sqlite_master WHERE type = 'trigger' ORDER BY name";

pub(crate) fn inspect_realm(
    driver: &SQLite,
    conn: &mut dyn ExecQuerier,
    opts: &InspectOptions,
) -> Result<Realm> {
    let mut realm = Realm::new();
    realm.schemas.push(inspect_main(driver, conn, opts)?);
    exclude_from_realm(&mut realm, &opts.exclude)?;
    Ok(realm)
}

pub(crate) fn inspect_schema(
    driver: &SQLite,
    conn: &mut dyn ExecQuerier,
    name: Option<&str>,
    opts: &InspectOptions,
) -> Result<Schema> {
    // SQLite has exactly one schema per connection file.
    if let Some(name) = name
        && name != MAIN_SCHEMA
    {
        return Err(Error::NotExist {
            kind: "schema",
            name: name.to_string(),
        });
    }
    let mut realm = Realm {
        schemas: vec![inspect_main(driver, conn, opts)?],
        attrs: Vec::new(),
    };
    exclude_from_realm(&mut realm, &opts.exclude)?;
    realm.schemas.pop().ok_or(Error::NotExist {
        kind: "schema",
        name: MAIN_SCHEMA.to_string(),
    })
}

fn inspect_main(
    _driver: &SQLite,
    conn: &mut dyn ExecQuerier,
    opts: &InspectOptions,
) -> Result<Schema> {
    let mut schema = Schema::named(MAIN_SCHEMA);

    if opts.is_inspected(InspectMode::Tables) {
        for row in conn.query(SELECT_TABLES, &[])? {
            let name = row.text("name")?;
            if !opts.tables.is_empty() && !opts.tables.iter().any(|wanted| wanted == &name) {
                continue;
            }
            schema.tables.push(inspect_table(conn, name)?);
        }
    }

    if opts.is_inspected(InspectMode::Views) {
        for row in conn.query(SELECT_VIEWS, &[])? {
            schema.views.push(View {
                name: row.text("name")?,
                schema: Some(MAIN_SCHEMA.to_string()),
                def: row.opt_text("sql")?.unwrap_or_default(),
                attrs: Vec::new(),
            });
        }
    }

    if opts.is_inspected(InspectMode::Triggers) {
        for row in conn.query(SELECT_TRIGGERS, &[])? {
            schema.triggers.push(Trigger {
                name: row.text("name")?,
                table: row.text("tbl_name")?,
                def: row.opt_text("sql")?.unwrap_or_default(),
                attrs: Vec::new(),
            });
        }
    }

    Ok(schema)
}

fn inspect_table(conn: &mut dyn ExecQuerier, name: String) -> Result<Table> {
    let mut table = Table::named(name);
    table.schema = Some(MAIN_SCHEMA.to_string());

    let mut pk_columns: Vec<(i64, String)> = Vec::new();
    for row in conn.query(&format!("PRAGMA table_info({})", quote(&table.name)), &[])? {
        let raw_type = row.opt_text("type")?.unwrap_or_default();
        let mut column_type = ColumnType::new(raw_type.clone(), types::parse_type(&raw_type)?);
        column_type.nullable = row.int("notnull")? == 0;

        let mut column = Column::new(row.text("name")?, column_type);
        column.default = row.opt_text("dflt_value")?.map(|raw| {
            if raw.starts_with('(') {
                DefaultValue::RawExpr(raw)
            } else if raw.starts_with('\'') || raw.parse::<f64>().is_ok() {
                DefaultValue::Literal(raw)
            } else {
                DefaultValue::RawExpr(raw)
            }
        });

        let pk_position = row.int("pk")?;
        if pk_position > 0 {
            pk_columns.push((pk_position, column.name.clone()));
        }
        table.columns.push(column);
    }

    if !pk_columns.is_empty() {
        pk_columns.sort();
        let mut pk = Index::named("PRIMARY").unique();
        for (_, column) in pk_columns {
            pk.push_part(PartKind::Column(column));
        }
        table.primary_key = Some(pk);
    }

    inspect_indexes(conn, &mut table)?;
    inspect_foreign_keys(conn, &mut table)?;
    Ok(table)
}

fn inspect_indexes(conn: &mut dyn ExecQuerier, table: &mut Table) -> Result<()> {
    for row in conn.query(&format!("PRAGMA index_list({})", quote(&table.name)), &[])? {
        // Autoindexes back primary keys and inline UNIQUE constraints.
        let origin = row.opt_text("origin")?.unwrap_or_default();
        if origin == "pk" {
            continue;
        }
        let name = row.text("name")?;
        if name.starts_with("sqlite_autoindex_") {
            continue;
        }

        let mut index = Index::named(name.clone());
        index.unique = row.int("unique")? != 0;
        for part_row in conn.query(&format!("PRAGMA index_info({})", quote(&name)), &[])? {
            let column = part_row.opt_text("name")?;
            index.push_part(match column {
                Some(column) => PartKind::Column(column),
                None => PartKind::Expr(String::new()),
            });
        }
        if row.opt_int("partial")?.unwrap_or(0) == 1 {
            replace_or_append(&mut index.attrs, Attr::IndexPredicate(String::new()));
        }
        table.indexes.push(index);
    }
    Ok(())
}

fn inspect_foreign_keys(conn: &mut dyn ExecQuerier, table: &mut Table) -> Result<()> {
    let mut current: Option<(i64, ForeignKey)> = None;
    for row in conn.query(
        &format!("PRAGMA foreign_key_list({})", quote(&table.name)),
        &[],
    )? {
        let id = row.int("id")?;
        if current.as_ref().is_none_or(|(held, _)| *held != id) {
            if let Some((_, fk)) = current.take() {
                table.foreign_keys.push(fk);
            }
            current = Some((
                id,
                ForeignKey {
                    symbol: format!("{}_fk_{id}", table.name),
                    ref_table: TableRef::new(None, row.text("table")?),
                    on_update: row
                        .opt_text("on_update")?
                        .as_deref()
                        .and_then(RefAction::parse),
                    on_delete: row
                        .opt_text("on_delete")?
                        .as_deref()
                        .and_then(RefAction::parse),
                    ..ForeignKey::default()
                },
            ));
        }
        if let Some((_, fk)) = current.as_mut() {
            fk.columns.push(row.text("from")?);
            fk.ref_columns.push(row.text("to")?);
        }
    }
    if let Some((_, fk)) = current {
        table.foreign_keys.push(fk);
    }
    Ok(())
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
