use std::collections::BTreeMap;

use driftql_core::{
    Error, ExecQuerier, Result, Row, Value,
    inspect::{InspectMode, InspectOptions, exclude_from_realm},
    schema::{
        Attr, Check, Column, ColumnType, DefaultValue, EnumRef, EnumType, ForeignKey, Func,
        GeneratedExpr, GeneratedKind, Index, IndexPart, PartKind, Proc, Realm, RefAction, Schema,
        SequenceAttr, Table, TableRef, Trigger, Type, View, replace_or_append,
    },
};
use tracing::debug;

use crate::{Postgres, queries, types};

pub(crate) fn inspect_realm(
    driver: &Postgres,
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
    driver: &Postgres,
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
            .unwrap_or_else(|| "public".to_string()),
    };
    let exists = !conn
        .query(queries::SELECT_SCHEMA, &[Value::Text(name.clone())])?
        .is_empty();
    if !exists {
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
    driver: &Postgres,
    conn: &mut dyn ExecQuerier,
    name: &str,
    opts: &InspectOptions,
) -> Result<Schema> {
    let mut schema = Schema::named(name);
    let schema_param = [Value::Text(name.to_string())];
    debug!(schema = %name, "inspecting schema");

    if opts.is_inspected(InspectMode::Types) {
        let mut enums: BTreeMap<String, EnumType> = BTreeMap::new();
        for row in conn.query(queries::SELECT_ENUMS, &schema_param)? {
            let enum_name = row.text("enum_name")?;
            enums
                .entry(enum_name.clone())
                .or_insert_with(|| EnumType {
                    name: enum_name,
                    schema: Some(name.to_string()),
                    values: Vec::new(),
                })
                .values
                .push(row.text("label")?);
        }
        schema.enums = enums.into_values().collect();
    }

    if opts.is_inspected(InspectMode::Tables) {
        for table_row in conn.query(queries::SELECT_TABLES, &schema_param)? {
            let table_name = table_row.text("table_name")?;
            if !opts.tables.is_empty() && !opts.tables.iter().any(|wanted| wanted == &table_name) {
                continue;
            }
            schema.tables.push(inspect_table(
                driver,
                conn,
                &schema,
                &table_row,
                table_name,
            )?);
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

    if opts.is_inspected(InspectMode::Funcs) {
        for routine_row in conn.query(queries::SELECT_FUNCTIONS, &schema_param)? {
            let routine_name = routine_row.text("function_name")?;
            let def = routine_row.opt_text("definition")?.unwrap_or_default();
            match routine_row.opt_text("kind")?.as_deref() {
                Some("p") => schema.procs.push(Proc {
                    name: routine_name,
                    schema: Some(name.to_string()),
                    def,
                    attrs: Vec::new(),
                }),
                _ => schema.funcs.push(Func {
                    name: routine_name,
                    schema: Some(name.to_string()),
                    def,
                    attrs: Vec::new(),
                }),
            }
        }
    }

    if opts.is_inspected(InspectMode::Triggers) {
        for trigger_row in conn.query(queries::SELECT_TRIGGERS, &schema_param)? {
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
    _driver: &Postgres,
    conn: &mut dyn ExecQuerier,
    schema: &Schema,
    row: &Row,
    table_name: String,
) -> Result<Table> {
    let mut table = Table::named(table_name);
    table.schema = Some(schema.name.clone());
    if let Some(comment) = row.opt_text("comment")?.filter(|c| !c.is_empty()) {
        replace_or_append(&mut table.attrs, Attr::Comment(comment));
    }

    let params = [
        Value::Text(schema.name.clone()),
        Value::Text(table.name.clone()),
    ];
    inspect_columns(conn, schema, &mut table, &params)?;
    inspect_indexes(conn, &mut table, &params)?;
    inspect_foreign_keys(conn, &mut table, &params)?;
    for check_row in conn.query(queries::SELECT_CHECKS, &params)? {
        table.checks.push(Check::new(
            check_row.text("constraint_name")?,
            check_row.opt_text("expression")?.unwrap_or_default(),
        ));
    }
    Ok(table)
}

fn inspect_columns(
    conn: &mut dyn ExecQuerier,
    schema: &Schema,
    table: &mut Table,
    params: &[Value],
) -> Result<()> {
    for row in conn.query(queries::SELECT_COLUMNS, params)? {
        let raw_type = row.text("data_type")?;
        let mut ty = types::parse_type(&raw_type)?;

        // User-defined spellings resolve to enum references through the
        // catalog's type kind.
        if row.opt_text("type_kind")?.as_deref() == Some("e") {
            let type_name = row.text("type_name")?;
            let type_schema = row.opt_text("type_schema")?;
            let values = schema
                .enums
                .iter()
                .find(|e| e.name == type_name)
                .map(|e| e.values.clone())
                .unwrap_or_default();
            ty = Type::Enum(EnumRef {
                name: Some(type_name),
                schema: type_schema.filter(|s| s != &schema.name),
                values,
            });
        }

        let mut column_type = ColumnType::new(raw_type, ty);
        column_type.nullable = row.bool("nullable")?;
        let mut column = Column::new(row.text("column_name")?, column_type);

        column.default = row
            .opt_text("default_expr")?
            .map(|expr| normalize_default(&expr));

        match row.opt_text("identity")?.as_deref() {
            Some("a") | Some("d") => {
                let sequence = SequenceAttr {
                    start: row.opt_int("seq_start")?.unwrap_or(1),
                    increment: row.opt_int("seq_increment")?.unwrap_or(1),
                    cache: row.opt_int("seq_cache")?.unwrap_or(1),
                    min_value: row.opt_int("seq_min")?,
                    max_value: row.opt_int("seq_max")?,
                    cycle: row
                        .opt_text("seq_cycle")?
                        .is_some_and(|cycle| cycle == "t" || cycle == "true"),
                };
                replace_or_append(
                    &mut column.attrs,
                    Attr::Identity {
                        always: row.opt_text("identity")?.as_deref() == Some("a"),
                        sequence,
                    },
                );
                column.default = None;
            }
            _ => {}
        }

        if row.opt_text("generated")?.as_deref() == Some("s") {
            if let Some(DefaultValue::RawExpr(expr) | DefaultValue::Literal(expr)) =
                column.default.take()
            {
                column.generated = Some(GeneratedExpr {
                    expr,
                    kind: GeneratedKind::Stored,
                });
            }
        }

        if let Some(comment) = row.opt_text("comment")?.filter(|c| !c.is_empty()) {
            replace_or_append(&mut column.attrs, Attr::Comment(comment));
        }
        if let Some(collation) = row.opt_text("collation")? {
            replace_or_append(&mut column.attrs, Attr::Collation(collation));
        }

        table.columns.push(column);
    }
    Ok(())
}

fn inspect_indexes(conn: &mut dyn ExecQuerier, table: &mut Table, params: &[Value]) -> Result<()> {
    let mut indexes: BTreeMap<String, (bool, Index)> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();

    for row in conn.query(queries::SELECT_INDEXES, params)? {
        let name = row.text("index_name")?;
        let (_, index) = indexes.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            (false, Index::named(name))
        });
        if row.bool("is_unique").unwrap_or(false) {
            index.unique = true;
        }

        let part_expr = row.opt_text("part_expr")?.unwrap_or_default();
        let attnum = row.opt_int("attnum")?.unwrap_or(0);
        let kind = if attnum == 0 {
            PartKind::Expr(part_expr)
        } else {
            PartKind::Column(part_expr.trim_matches('"').to_string())
        };
        let seq_no = index.parts.len();
        index.parts.push(IndexPart {
            seq_no,
            desc: row.opt_int("descending")?.unwrap_or(0) == 1,
            prefix: None,
            kind,
        });

        if let Some(method) = row.opt_text("method")? {
            let parsed = match method.as_str() {
                "hash" => Some(driftql_core::schema::IndexType::Hash),
                "btree" => Some(driftql_core::schema::IndexType::BTree),
                _ => None,
            };
            if let Some(parsed) = parsed {
                replace_or_append(&mut index.attrs, Attr::IndexType(parsed));
            }
        }
        if let Some(predicate) = row.opt_text("predicate")? {
            replace_or_append(&mut index.attrs, Attr::IndexPredicate(predicate));
        }
        if let Some(comment) = row.opt_text("comment")?.filter(|c| !c.is_empty()) {
            replace_or_append(&mut index.attrs, Attr::Comment(comment));
        }

        if row.bool("is_primary").unwrap_or(false) {
            indexes.get_mut(&row.text("index_name")?).expect("grouped").0 = true;
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
            .and_then(parse_ref_action);
        fk.on_delete = row
            .opt_text("delete_rule")?
            .as_deref()
            .and_then(parse_ref_action);
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

fn parse_ref_action(code: &str) -> Option<RefAction> {
    match code {
        "a" => Some(RefAction::NoAction),
        "r" => Some(RefAction::Restrict),
        "c" => Some(RefAction::Cascade),
        "n" => Some(RefAction::SetNull),
        "d" => Some(RefAction::SetDefault),
        _ => None,
    }
}

/// A default is a `Literal` when it is a (possibly cast) constant, and a
/// `RawExpr` otherwise. `nextval(...)` defaults are how serial columns
/// surface; they stay expressions.
fn normalize_default(expr: &str) -> DefaultValue {
    let trimmed = expr.trim();
    if trimmed.starts_with('\'') {
        return DefaultValue::Literal(trimmed.to_string());
    }
    let without_cast = trimmed.split("::").next().unwrap_or(trimmed).trim();
    if without_cast.parse::<f64>().is_ok()
        || without_cast.eq_ignore_ascii_case("true")
        || without_cast.eq_ignore_ascii_case("false")
    {
        return DefaultValue::Literal(without_cast.to_string());
    }
    DefaultValue::RawExpr(trimmed.to_string())
}
