use std::collections::BTreeMap;

use driftql_core::{
    Error, ExecQuerier, Result, Value,
    inspect::{InspectMode, InspectOptions, exclude_from_realm},
    schema::{
        Attr, Check, Column, ColumnType, DefaultValue, ForeignKey, Index, IndexPart, PartKind,
        Realm, RefAction, Schema, Table, TableRef, View, replace_or_append,
    },
};

use crate::{Mssql, queries, types};

pub(crate) fn inspect_realm(
    driver: &Mssql,
    conn: &mut dyn ExecQuerier,
    opts: &InspectOptions,
) -> Result<Realm> {
    let mut realm = Realm::new();
    for row in conn.query(queries::SELECT_SCHEMAS, &[])? {
        let name = row.text("schema_name")?;
        if !opts.schemas.is_empty() && !opts.schemas.iter().any(|wanted| wanted == &name) {
            continue;
        }
        realm.schemas.push(inspect_named_schema(driver, conn, &name, opts)?);
    }
    exclude_from_realm(&mut realm, &opts.exclude)?;
    Ok(realm)
}

pub(crate) fn inspect_schema(
    driver: &Mssql,
    conn: &mut dyn ExecQuerier,
    name: Option<&str>,
    opts: &InspectOptions,
) -> Result<Schema> {
    let name = match name {
        Some(name) => name.to_string(),
        None => conn
            .query(queries::SELECT_CURRENT_SCHEMA, &[])?
            .first()
            .and_then(|row| row.opt_text("schema_name").ok().flatten())
            .unwrap_or_else(|| "dbo".to_string()),
    };
    let known = conn
        .query(queries::SELECT_SCHEMAS, &[])?
        .iter()
        .any(|row| row.text("schema_name").is_ok_and(|found| found == name));
    if !known {
        return Err(Error::NotExist {
            kind: "schema",
            name,
        });
    }

    let mut realm = Realm {
        schemas: vec![inspect_named_schema(driver, conn, &name, opts)?],
        attrs: Vec::new(),
    };
    exclude_from_realm(&mut realm, &opts.exclude)?;
    realm.schemas.pop().ok_or(Error::NotExist {
        kind: "schema",
        name,
    })
}

fn inspect_named_schema(
    _driver: &Mssql,
    conn: &mut dyn ExecQuerier,
    name: &str,
    opts: &InspectOptions,
) -> Result<Schema> {
    let mut schema = Schema::named(name);
    let schema_param = [Value::Text(name.to_string())];

    if opts.is_inspected(InspectMode::Tables) {
        for table_row in conn.query(queries::SELECT_TABLES, &schema_param)? {
            let table_name = table_row.text("table_name")?;
            if !opts.tables.is_empty() && !opts.tables.iter().any(|wanted| wanted == &table_name) {
                continue;
            }
            schema.tables.push(inspect_table(conn, name, table_name)?);
        }
    }

    if opts.is_inspected(InspectMode::Views) {
        for view_row in conn.query(queries::SELECT_VIEWS, &schema_param)? {
            schema.views.push(View {
                name: view_row.text("view_name")?,
                schema: Some(name.to_string()),
                def: view_row.opt_text("definition")?.unwrap_or_default(),
                attrs: Vec::new(),
            });
        }
    }

    Ok(schema)
}

fn inspect_table(conn: &mut dyn ExecQuerier, schema: &str, name: String) -> Result<Table> {
    let mut table = Table::named(name);
    table.schema = Some(schema.to_string());
    let params = [
        Value::Text(schema.to_string()),
        Value::Text(table.name.clone()),
    ];

    for row in conn.query(queries::SELECT_COLUMNS, &params)? {
        let raw = raw_type(&row)?;
        let mut column_type = ColumnType::new(raw.clone(), types::parse_type(&raw)?);
        column_type.nullable = row.text("is_nullable")? == "YES";

        let mut column = Column::new(row.text("column_name")?, column_type);
        column.default = row.opt_text("column_default")?.map(|raw| {
            // Defaults arrive wrapped in parentheses; constants keep one
            // more layer: ((0)), ('x'), (getdate()).
            let unwrapped = unwrap_parens(&raw);
            if unwrapped.starts_with('\'') || unwrapped.parse::<f64>().is_ok() {
                DefaultValue::Literal(unwrapped.to_string())
            } else {
                DefaultValue::RawExpr(unwrapped.to_string())
            }
        });
        if row.opt_int("is_identity")?.unwrap_or(0) == 1 {
            replace_or_append(&mut column.attrs, Attr::AutoIncrement(None));
        }
        if let Some(collation) = row.opt_text("collation")? {
            replace_or_append(&mut column.attrs, Attr::Collation(collation));
        }
        table.columns.push(column);
    }

    inspect_indexes(conn, &mut table, &params)?;
    inspect_foreign_keys(conn, &mut table, &params)?;
    for check_row in conn.query(queries::SELECT_CHECKS, &params)? {
        table.checks.push(Check::new(
            check_row.text("constraint_name")?,
            check_row.opt_text("definition")?.unwrap_or_default(),
        ));
    }
    Ok(table)
}

fn inspect_indexes(conn: &mut dyn ExecQuerier, table: &mut Table, params: &[Value]) -> Result<()> {
    let mut indexes: BTreeMap<String, (bool, Index)> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();

    for row in conn.query(queries::SELECT_INDEXES, params)? {
        let name = row.text("index_name")?;
        let primary = row.bool("is_primary").unwrap_or(false);
        let (_, index) = indexes.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            (primary, Index::named(name))
        });
        if row.bool("is_unique").unwrap_or(false) {
            index.unique = true;
        }
        let seq_no = index.parts.len();
        index.parts.push(IndexPart {
            seq_no,
            desc: row.bool("is_descending").unwrap_or(false),
            prefix: None,
            kind: PartKind::Column(row.text("column_name")?),
        });
        if let Some(predicate) = row.opt_text("predicate")? {
            replace_or_append(&mut index.attrs, Attr::IndexPredicate(predicate));
        }
    }

    for name in order {
        let (primary, index) = indexes.remove(&name).expect("index grouped by name");
        if primary {
            table.primary_key = Some(index);
        } else {
            table.indexes.push(index);
        }
    }
    Ok(())
}

fn inspect_foreign_keys(
    conn: &mut dyn ExecQuerier,
    table: &mut Table,
    params: &[Value],
) -> Result<()> {
    let mut fks: BTreeMap<String, ForeignKey> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();

    for row in conn.query(queries::SELECT_FOREIGN_KEYS, params)? {
        let symbol = row.text("constraint_name")?;
        let fk = fks.entry(symbol.clone()).or_insert_with(|| {
            order.push(symbol.clone());
            ForeignKey {
                symbol,
                ..ForeignKey::default()
            }
        });
        fk.columns.push(row.text("column_name")?);
        fk.ref_columns.push(row.text("ref_column")?);
        fk.ref_table = TableRef {
            schema: row.opt_text("ref_schema")?,
            name: row.text("ref_table")?,
        };
        fk.on_update = row
            .opt_text("update_rule")?
            .as_deref()
            .map(|rule| rule.replace('_', " "))
            .as_deref()
            .and_then(RefAction::parse);
        fk.on_delete = row
            .opt_text("delete_rule")?
            .as_deref()
            .map(|rule| rule.replace('_', " "))
            .as_deref()
            .and_then(RefAction::parse);
    }

    for symbol in order {
        let mut fk = fks.remove(&symbol).expect("fk grouped by symbol");
        if fk.ref_table.schema.as_deref() == table.schema.as_deref() {
            fk.ref_table.schema = None;
        }
        table.foreign_keys.push(fk);
    }
    Ok(())
}

/// Reassembles the declared spelling from the catalog columns:
/// `nvarchar` + length 50 becomes `nvarchar(50)`, length -1 becomes `MAX`.
fn raw_type(row: &driftql_core::Row) -> Result<String> {
    let name = row.text("data_type")?;
    if let Some(length) = row.opt_int("char_length")? {
        if matches!(
            name.as_str(),
            "char" | "varchar" | "nchar" | "nvarchar" | "binary" | "varbinary"
        ) {
            if length == -1 {
                return Ok(format!("{name}(MAX)"));
            }
            return Ok(format!("{name}({length})"));
        }
    }
    if matches!(name.as_str(), "decimal" | "numeric") {
        let precision = row.opt_int("num_precision")?.unwrap_or(18);
        let scale = row.opt_int("num_scale")?.unwrap_or(0);
        return Ok(format!("{name}({precision},{scale})"));
    }
    if matches!(name.as_str(), "datetime2" | "datetimeoffset" | "time")
        && let Some(precision) = row.opt_int("dt_precision")?
    {
        return Ok(format!("{name}({precision})"));
    }
    Ok(name)
}

fn unwrap_parens(raw: &str) -> &str {
    let mut out = raw.trim();
    while out.starts_with('(') && out.ends_with(')') && out.len() >= 2 {
        out = &out[1..out.len() - 1];
    }
    out
}
