use std::collections::BTreeMap;

use driftql_core::{
    Error, ExecQuerier, Result, Value,
    inspect::{InspectMode, InspectOptions, exclude_from_realm},
    schema::{
        Column, ColumnType, ForeignKey, Index, IndexPart, PartKind, Realm, Schema, Table,
        TableRef,
    },
};

use crate::{Spanner, types};

pub(crate) const SELECT_TABLES: &str = "\
SELECT table_name FROM information_schema.tables \
WHERE table_schema = '' AND table_type = 'BASE TABLE' ORDER BY table_name";

const SELECT_COLUMNS: &str = "\
SELECT column_name, spanner_type, is_nullable FROM information_schema.columns \
WHERE table_schema = '' AND table_name = @table ORDER BY ordinal_position";

const SELECT_INDEXES: &str = "\
SELECT i.index_name, i.index_type, i.is_unique, c.column_name, c.column_ordering \
FROM information_schema.indexes AS i \
JOIN information_schema.index_columns AS c \
  ON c.table_name = i.table_name AND c.index_name = i.index_name \
WHERE i.table_schema = '' AND i.table_name = @table AND i.spanner_is_managed = false \
ORDER BY i.index_name, c.ordinal_position";

const SELECT_FOREIGN_KEYS: &str = "\
SELECT tc.constraint_name, kcu.column_name, ccu.table_name AS ref_table, \
       ccu.column_name AS ref_column \
FROM information_schema.table_constraints AS tc \
JOIN information_schema.key_column_usage AS kcu \
  ON kcu.constraint_name = tc.constraint_name \
JOIN information_schema.constraint_column_usage AS ccu \
  ON ccu.constraint_name = tc.constraint_name \
WHERE tc.table_schema = '' AND tc.table_name = @table AND tc.constraint_type = 'FOREIGN KEY' \
ORDER BY tc.constraint_name, kcu.ordinal_position";

/// Spanner's default schema is the empty string; it surfaces here under the
/// stable name `default` so exclusion patterns have something to match.
const DEFAULT_SCHEMA: &str = "default";

pub(crate) fn inspect_realm(
    driver: &Spanner,
    conn: &mut dyn ExecQuerier,
    opts: &InspectOptions,
) -> Result<Realm> {
    let mut realm = Realm::new();
    realm.schemas.push(inspect_default(driver, conn, opts)?);
    exclude_from_realm(&mut realm, &opts.exclude)?;
    Ok(realm)
}

pub(crate) fn inspect_schema(
    driver: &Spanner,
    conn: &mut dyn ExecQuerier,
    name: Option<&str>,
    opts: &InspectOptions,
) -> Result<Schema> {
    if let Some(name) = name
        && name != DEFAULT_SCHEMA
        && !name.is_empty()
    {
        return Err(Error::NotExist {
            kind: "schema",
            name: name.to_string(),
        });
    }
    let mut realm = Realm {
        schemas: vec![inspect_default(driver, conn, opts)?],
        attrs: Vec::new(),
    };
    exclude_from_realm(&mut realm, &opts.exclude)?;
    realm.schemas.pop().ok_or(Error::NotExist {
        kind: "schema",
        name: DEFAULT_SCHEMA.to_string(),
    })
}

fn inspect_default(
    _driver: &Spanner,
    conn: &mut dyn ExecQuerier,
    opts: &InspectOptions,
) -> Result<Schema> {
    let mut schema = Schema::named(DEFAULT_SCHEMA);
    if !opts.is_inspected(InspectMode::Tables) {
        return Ok(schema);
    }

    for row in conn.query(SELECT_TABLES, &[])? {
        let name = row.text("table_name")?;
        if !opts.tables.is_empty() && !opts.tables.iter().any(|wanted| wanted == &name) {
            continue;
        }
        schema.tables.push(inspect_table(conn, name)?);
    }
    Ok(schema)
}

fn inspect_table(conn: &mut dyn ExecQuerier, name: String) -> Result<Table> {
    let mut table = Table::named(name);
    table.schema = Some(DEFAULT_SCHEMA.to_string());
    let param = [Value::Text(table.name.clone())];

    for row in conn.query(SELECT_COLUMNS, &param)? {
        let raw = row.text("spanner_type")?;
        let mut column_type = ColumnType::new(raw.clone(), types::parse_type(&raw)?);
        column_type.nullable = row.text("is_nullable")? == "YES";
        table
            .columns
            .push(Column::new(row.text("column_name")?, column_type));
    }

    let mut indexes: BTreeMap<String, (bool, Index)> = BTreeMap::new();
    let mut order = Vec::new();
    for row in conn.query(SELECT_INDEXES, &param)? {
        let index_name = row.text("index_name")?;
        let primary = row.text("index_type")? == "PRIMARY_KEY";
        let (_, index) = indexes.entry(index_name.clone()).or_insert_with(|| {
            order.push(index_name.clone());
            (primary, Index::named(index_name))
        });
        if row.bool("is_unique").unwrap_or(false) {
            index.unique = true;
        }
        let seq_no = index.parts.len();
        index.parts.push(IndexPart {
            seq_no,
            desc: row.opt_text("column_ordering")?.as_deref() == Some("DESC"),
            prefix: None,
            kind: PartKind::Column(row.text("column_name")?),
        });
    }
    for index_name in order {
        let (primary, index) = indexes.remove(&index_name).expect("grouped");
        if primary {
            table.primary_key = Some(index);
        } else {
            table.indexes.push(index);
        }
    }

    let mut fks: BTreeMap<String, ForeignKey> = BTreeMap::new();
    let mut fk_order = Vec::new();
    for row in conn.query(SELECT_FOREIGN_KEYS, &param)? {
        let symbol = row.text("constraint_name")?;
        let fk = fks.entry(symbol.clone()).or_insert_with(|| {
            fk_order.push(symbol.clone());
            ForeignKey {
                symbol,
                ..ForeignKey::default()
            }
        });
        fk.columns.push(row.text("column_name")?);
        fk.ref_columns.push(row.text("ref_column")?);
        fk.ref_table = TableRef::new(None, row.text("ref_table")?);
    }
    for symbol in fk_order {
        table
            .foreign_keys
            .push(fks.remove(&symbol).expect("grouped"));
    }

    Ok(table)
}
