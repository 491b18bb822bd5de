use std::collections::BTreeMap;

use driftql_core::{
    Error, ExecQuerier, Result, Row, Value,
    inspect::{InspectMode, InspectOptions, exclude_from_realm},
    schema::{
        Attr, Check, Column, ColumnType, ForeignKey, Func, GeneratedExpr, GeneratedKind, Index,
        IndexType, PartKind, Proc, Realm, RefAction, Schema, Table, TableRef, Trigger, Type, View,
        replace_or_append,
    },
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{Flavor, MySql, queries, types};

static AUTO_INCREMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AUTO_INCREMENT=(\d+)").expect("auto_increment regex"));

/// Only TiDB's sentinel comment announces AUTO_RANDOM; a bare
/// `AUTO_RANDOM(...)` in a comment must not match.
static AUTO_RANDOM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/\*T!\[auto_rand\] AUTO_RANDOM\((\d+)(?:\s*,\s*(\d+))?\) \*/")
        .expect("auto_random regex")
});

pub(crate) fn inspect_realm(
    driver: &MySql,
    conn: &mut dyn ExecQuerier,
    opts: &InspectOptions,
) -> Result<Realm> {
    let mut realm = Realm::new();
    for row in conn.query(queries::SELECT_SCHEMAS, &[])? {
        let name = row.text("schema_name")?;
        if !opts.schemas.is_empty() && !opts.schemas.iter().any(|wanted| wanted == &name) {
            continue;
        }
        realm
            .schemas
            .push(inspect_named_schema(driver, conn, &row, opts)?);
    }
    exclude_from_realm(&mut realm, &opts.exclude)?;
    Ok(realm)
}

pub(crate) fn inspect_schema(
    driver: &MySql,
    conn: &mut dyn ExecQuerier,
    name: Option<&str>,
    opts: &InspectOptions,
) -> Result<Schema> {
    let name = match name {
        Some(name) => name.to_string(),
        None => {
            let rows = conn.query(queries::SELECT_CURRENT_SCHEMA, &[])?;
            rows.first()
                .and_then(|row| row.opt_text("schema_name").ok().flatten())
                .ok_or_else(|| Error::NotExist {
                    kind: "schema",
                    name: "(current)".to_string(),
                })?
        }
    };

    let rows = conn.query(queries::SELECT_SCHEMA, &[Value::Text(name.clone())])?;
    let row = rows.first().ok_or_else(|| Error::NotExist {
        kind: "schema",
        name: name.clone(),
    })?;

    let mut schema = inspect_named_schema(driver, conn, row, opts)?;
    let mut realm = Realm {
        schemas: vec![std::mem::take(&mut schema)],
        attrs: Vec::new(),
    };
    exclude_from_realm(&mut realm, &opts.exclude)?;
    realm.schemas.pop().ok_or_else(|| Error::NotExist {
        kind: "schema",
        name,
    })
}

fn inspect_named_schema(
    driver: &MySql,
    conn: &mut dyn ExecQuerier,
    row: &Row,
    opts: &InspectOptions,
) -> Result<Schema> {
    let mut schema = Schema::named(row.text("schema_name")?);
    if let Some(charset) = row.opt_text("charset")? {
        replace_or_append(&mut schema.attrs, Attr::Charset(charset));
    }
    if let Some(collation) = row.opt_text("collation")? {
        replace_or_append(&mut schema.attrs, Attr::Collation(collation));
    }
    debug!(schema = %schema.name, "inspecting schema");

    if opts.is_inspected(InspectMode::Tables) {
        let schema_param = Value::Text(schema.name.clone());
        for table_row in conn.query(queries::SELECT_TABLES, &[schema_param.clone()])? {
            let name = table_row.text("table_name")?;
            if !opts.tables.is_empty() && !opts.tables.iter().any(|wanted| wanted == &name) {
                continue;
            }
            schema
                .tables
                .push(inspect_table(driver, conn, &schema.name, &table_row)?);
        }
    }

    if opts.is_inspected(InspectMode::Views) {
        for view_row in conn.query(queries::SELECT_VIEWS, &[Value::Text(schema.name.clone())])? {
            schema.views.push(View {
                name: view_row.text("view_name")?,
                schema: Some(schema.name.clone()),
                def: view_row.opt_text("definition")?.unwrap_or_default(),
                attrs: Vec::new(),
            });
        }
    }

    if opts.is_inspected(InspectMode::Funcs) {
        for routine_row in
            conn.query(queries::SELECT_ROUTINES, &[Value::Text(schema.name.clone())])?
        {
            let name = routine_row.text("routine_name")?;
            let def = routine_row.opt_text("definition")?.unwrap_or_default();
            match routine_row.text("routine_type")?.as_str() {
                "PROCEDURE" => schema.procs.push(Proc {
                    name,
                    schema: Some(schema.name.clone()),
                    def,
                    attrs: Vec::new(),
                }),
                _ => schema.funcs.push(Func {
                    name,
                    schema: Some(schema.name.clone()),
                    def,
                    attrs: Vec::new(),
                }),
            }
        }
    }

    if opts.is_inspected(InspectMode::Triggers) {
        for trigger_row in
            conn.query(queries::SELECT_TRIGGERS, &[Value::Text(schema.name.clone())])?
        {
            schema.triggers.push(Trigger {
                name: trigger_row.text("trigger_name")?,
                table: trigger_row.text("table_name")?,
                def: trigger_row.opt_text("definition")?.unwrap_or_default(),
                attrs: Vec::new(),
            });
        }
    }

    Ok(schema)
}

fn inspect_table(
    driver: &MySql,
    conn: &mut dyn ExecQuerier,
    schema: &str,
    row: &Row,
) -> Result<Table> {
    let mut table = Table::named(row.text("table_name")?);
    table.schema = Some(schema.to_string());

    if let Some(engine) = row.opt_text("engine")? {
        replace_or_append(&mut table.attrs, Attr::Engine(engine));
    }
    if let Some(collation) = row.opt_text("collation")? {
        if let Some(charset) = collation.split('_').next() {
            replace_or_append(&mut table.attrs, Attr::Charset(charset.to_string()));
        }
        replace_or_append(&mut table.attrs, Attr::Collation(collation));
    }
    if let Some(comment) = row.opt_text("comment")?.filter(|c| !c.is_empty()) {
        replace_or_append(&mut table.attrs, Attr::Comment(comment));
    }
    if let Some(create_options) = row.opt_text("create_options")?.filter(|c| !c.is_empty()) {
        replace_or_append(&mut table.attrs, Attr::CreateOptions(create_options));
    }

    let params = [Value::Text(schema.to_string()), Value::Text(table.name.clone())];
    inspect_columns(driver, conn, &mut table, &params)?;
    inspect_indexes(conn, &mut table, &params)?;
    inspect_foreign_keys(conn, &mut table, &params)?;
    if driver.supports_check_constraints() {
        inspect_checks(conn, &mut table, &params)?;
    }
    apply_create_stmt_attrs(driver, conn, schema, &mut table)?;

    Ok(table)
}

fn inspect_columns(
    driver: &MySql,
    conn: &mut dyn ExecQuerier,
    table: &mut Table,
    params: &[Value],
) -> Result<()> {
    for row in conn.query(queries::SELECT_COLUMNS, params)? {
        let raw_type = row.text("column_type")?;
        let ty = types::parse_type(&raw_type)?;
        let mut column_type = ColumnType::new(raw_type, ty);
        column_type.nullable = row.text("is_nullable")? == "YES";

        let mut column = Column::new(row.text("column_name")?, column_type);
        let extra = row.opt_text("extra")?.unwrap_or_default();

        column.default = normalize_default(
            row.opt_text("column_default")?.as_deref(),
            &extra,
            &column.ty.ty,
            driver.flavor,
        );

        if let Some(expr) = row
            .opt_text("generation_expression")?
            .filter(|expr| !expr.is_empty())
        {
            column.generated = Some(GeneratedExpr {
                expr,
                kind: if extra.to_ascii_uppercase().contains("STORED") {
                    GeneratedKind::Stored
                } else {
                    GeneratedKind::Virtual
                },
            });
            // The catalogs repeat the expression as a default; it is not one.
            column.default = None;
        }

        if extra.to_ascii_lowercase().contains("auto_increment") {
            replace_or_append(&mut column.attrs, Attr::AutoIncrement(None));
        }
        if let Some(on_update) = extract_on_update(&extra) {
            replace_or_append(&mut column.attrs, Attr::OnUpdate(on_update));
        }
        if let Some(comment) = row.opt_text("comment")?.filter(|c| !c.is_empty()) {
            replace_or_append(&mut column.attrs, Attr::Comment(comment));
        }
        if let Some(charset) = row.opt_text("charset")? {
            replace_or_append(&mut column.attrs, Attr::Charset(charset));
        }
        if let Some(collation) = row.opt_text("collation")? {
            replace_or_append(&mut column.attrs, Attr::Collation(collation));
        }

        table.columns.push(column);
    }
    Ok(())
}

fn inspect_indexes(
    conn: &mut dyn ExecQuerier,
    table: &mut Table,
    params: &[Value],
) -> Result<()> {
    let mut indexes: BTreeMap<String, Index> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();

    for row in conn.query(queries::SELECT_INDEXES, params)? {
        let name = row.text("index_name")?;
        let index = indexes.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            let mut index = Index::named(name.clone());
            index.unique = false;
            index
        });
        if row.int("non_unique")? == 0 {
            index.unique = true;
        }

        let kind = match row.opt_text("column_name")? {
            Some(column) => PartKind::Column(column),
            None => PartKind::Expr(
                row.opt_text("expression")?
                    .unwrap_or_default()
                    .trim_matches(|c| c == '(' || c == ')')
                    .to_string(),
            ),
        };
        let seq_no = index.parts.len();
        index.parts.push(driftql_core::schema::IndexPart {
            seq_no,
            desc: row.opt_text("collation")?.as_deref() == Some("D"),
            prefix: row.opt_int("sub_part")?.map(|sub| sub as u32),
            kind,
        });

        if let Some(index_type) = row.opt_text("index_type")? {
            let parsed = match index_type.as_str() {
                "HASH" => Some(IndexType::Hash),
                "FULLTEXT" => Some(IndexType::FullText),
                "SPATIAL" => Some(IndexType::Spatial),
                "BTREE" => Some(IndexType::BTree),
                _ => None,
            };
            if let Some(parsed) = parsed {
                replace_or_append(&mut index.attrs, Attr::IndexType(parsed));
            }
        }
        if let Some(comment) = row.opt_text("comment")?.filter(|c| !c.is_empty()) {
            replace_or_append(&mut index.attrs, Attr::Comment(comment));
        }
    }

    for name in order {
        let index = indexes.remove(&name).expect("index grouped by name");
        if name == "PRIMARY" {
            table.primary_key = Some(Index {
                name: "PRIMARY".to_string(),
                unique: true,
                ..index
            });
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
            .and_then(RefAction::parse);
        fk.on_delete = row
            .opt_text("delete_rule")?
            .as_deref()
            .and_then(RefAction::parse);
    }

    for symbol in order {
        // Same-schema references stay unqualified, matching the model the
        // declarative loader produces.
        let mut fk = fks.remove(&symbol).expect("fk grouped by symbol");
        if fk.ref_table.schema.as_deref() == table.schema.as_deref() {
            fk.ref_table.schema = None;
        }
        table.foreign_keys.push(fk);
    }
    Ok(())
}

fn inspect_checks(conn: &mut dyn ExecQuerier, table: &mut Table, params: &[Value]) -> Result<()> {
    for row in conn.query(queries::SELECT_CHECKS, params)? {
        let mut check = Check::new(
            row.text("constraint_name")?,
            row.opt_text("check_clause")?.unwrap_or_default(),
        );
        if row.opt_text("enforced")?.as_deref() == Some("NO") {
            replace_or_append(&mut check.attrs, Attr::Enforced(false));
        }
        table.checks.push(check);
    }
    Ok(())
}

/// Attributes only visible in `SHOW CREATE TABLE` output: the
/// AUTO_INCREMENT high-water mark and TiDB's AUTO_RANDOM sentinel.
fn apply_create_stmt_attrs(
    driver: &MySql,
    conn: &mut dyn ExecQuerier,
    schema: &str,
    table: &mut Table,
) -> Result<()> {
    let needs_auto_increment = table.columns.iter().any(|column| {
        column
            .attrs
            .iter()
            .any(|attr| matches!(attr, Attr::AutoIncrement(_)))
    });
    if !needs_auto_increment && driver.flavor != Flavor::TiDb {
        return Ok(());
    }

    let rows = conn.query(&queries::show_create_table(schema, &table.name), &[])?;
    let Some(create_stmt) = rows
        .first()
        .and_then(|row| row.opt_text("Create Table").ok().flatten())
    else {
        return Ok(());
    };

    if needs_auto_increment
        && let Some(captures) = AUTO_INCREMENT_RE.captures(&create_stmt)
        && let Ok(value) = captures[1].parse::<u64>()
    {
        replace_or_append(&mut table.attrs, Attr::AutoIncrement(Some(value)));
    }

    if driver.flavor == Flavor::TiDb
        && let Some(captures) = AUTO_RANDOM_RE.captures(&create_stmt)
    {
        let shard_bits: u32 = captures[1].parse().unwrap_or(5);
        let range: u32 = captures
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(64);
        // Range 64 covers the whole column; store 0 so formatting does not
        // re-emit the redundant argument.
        let range = if range == 64 { 0 } else { range };
        if let Some(column) = auto_random_column(table, &create_stmt) {
            let column_name = column.to_string();
            if let Some(column) = table
                .columns
                .iter_mut()
                .find(|column| column.name == column_name)
            {
                replace_or_append(&mut column.attrs, Attr::AutoRandom { shard_bits, range });
            }
        }
    }

    Ok(())
}

fn auto_random_column<'a>(table: &'a Table, create_stmt: &str) -> Option<&'a str> {
    // The sentinel sits on the column definition line.
    for line in create_stmt.lines() {
        if AUTO_RANDOM_RE.is_match(line) {
            for column in &table.columns {
                if line.trim_start().starts_with(&format!("`{}`", column.name)) {
                    return Some(column.name.as_str());
                }
            }
        }
    }
    None
}

/// Normalizes a catalog default into a `Literal` or `RawExpr`.
///
/// Expression defaults are marked by `DEFAULT_GENERATED` in `EXTRA` (MySQL
/// 8.0.13+). Bit (`b'...'`) and hex (`0x...`) literals pass through; string
/// family defaults gain their quotes; everything else is kept verbatim.
fn normalize_default(
    raw: Option<&str>,
    extra: &str,
    ty: &Type,
    flavor: Flavor,
) -> Option<driftql_core::schema::DefaultValue> {
    use driftql_core::schema::DefaultValue;

    let raw = raw?;
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }
    if extra.to_ascii_uppercase().contains("DEFAULT_GENERATED") {
        return Some(DefaultValue::RawExpr(raw.to_string()));
    }
    // MariaDB stores defaults already quoted and expressions verbatim.
    if flavor == Flavor::MariaDb {
        if raw.starts_with('\'') || raw.parse::<f64>().is_ok() || raw.starts_with("b'") {
            return Some(DefaultValue::Literal(raw.to_string()));
        }
        return Some(DefaultValue::RawExpr(raw.to_string()));
    }
    if raw.starts_with("b'") || raw.starts_with("0x") {
        return Some(DefaultValue::Literal(raw.to_string()));
    }
    if raw.eq_ignore_ascii_case("current_timestamp")
        || raw.to_ascii_lowercase().starts_with("current_timestamp(")
    {
        return Some(DefaultValue::RawExpr(raw.to_string()));
    }
    match ty {
        Type::String(_) | Type::Enum(_) | Type::Set(_) | Type::Time(_) => Some(
            DefaultValue::Literal(format!("'{}'", raw.replace('\'', "''"))),
        ),
        _ => Some(DefaultValue::Literal(raw.to_string())),
    }
}

fn extract_on_update(extra: &str) -> Option<String> {
    let lowered = extra.to_ascii_lowercase();
    let position = lowered.find("on update ")?;
    Some(extra[position + "on update ".len()..].trim().to_string())
}
