use std::fmt::Write as _;

use driftql_core::{
    AttrChange, Change, ColumnChange, Error, Result, TableChange,
    migrate::{Plan, PlanOptions, PlanStmt},
    schema::{
        Attr, AttrKind, Check, Column, DefaultValue, EnumType, ForeignKey, GeneratedKind, Index,
        PartKind, Table, TableRef, attr,
    },
};

use crate::{Postgres, types};

pub(crate) fn plan_changes(
    _driver: &Postgres,
    name: &str,
    changes: &[Change],
    opts: &PlanOptions,
) -> Result<Plan> {
    let mut stmts = Vec::new();
    for change in changes {
        lower_change(change, opts, &mut stmts)?;
    }
    // Postgres DDL is transactional; the whole plan runs in one transaction.
    Ok(Plan::from_stmts(name, true, stmts))
}

fn lower_change(change: &Change, opts: &PlanOptions, out: &mut Vec<PlanStmt>) -> Result<()> {
    match change {
        Change::AddSchema(schema) => out.push(
            PlanStmt::new(format!("CREATE SCHEMA {}", ident(&schema.name)))
                .reversible(format!("DROP SCHEMA {}", ident(&schema.name)))
                .commented(format!("add new schema named {:?}", schema.name)),
        ),
        Change::DropSchema { name } => out.push(
            PlanStmt::new(format!("DROP SCHEMA {} CASCADE", ident(name)))
                .commented(format!("drop schema named {name:?}")),
        ),
        Change::ModifySchema { name, changes } => {
            for attr_change in changes {
                let (AttrChange::Add(Attr::Comment(comment))
                | AttrChange::Modify {
                    to: Attr::Comment(comment),
                    ..
                }) = attr_change
                else {
                    return Err(Error::Unsupported(format!(
                        "schema attribute change on {name:?}"
                    )));
                };
                out.push(PlanStmt::new(format!(
                    "COMMENT ON SCHEMA {} IS '{}'",
                    ident(name),
                    escape(comment)
                )));
            }
        }
        Change::AddObject(enum_type) => out.push(
            PlanStmt::new(create_enum(enum_type, opts))
                .reversible(format!("DROP TYPE {}", enum_ref(enum_type, opts)))
                .commented(format!("create enum type {:?}", enum_type.name)),
        ),
        Change::DropObject { schema, name } => out.push(
            PlanStmt::new(format!(
                "DROP TYPE {}",
                qualified(opts, schema.as_deref(), name)
            ))
            .commented(format!("drop enum type {name:?}")),
        ),
        Change::ModifyObject { from, to } => lower_modify_enum(from, to, opts, out)?,
        Change::AddTable(table) => lower_add_table(table, opts, out)?,
        Change::DropTable { schema, name } => out.push(
            PlanStmt::new(format!(
                "DROP TABLE {}",
                qualified(opts, schema.as_deref(), name)
            ))
            .commented(format!("drop table named {name:?}")),
        ),
        Change::ModifyTable { table, changes } => lower_modify_table(table, changes, opts, out)?,
        Change::RenameTable { schema, from, to } => out.push(
            PlanStmt::new(format!(
                "ALTER TABLE {} RENAME TO {}",
                qualified(opts, schema.as_deref(), from),
                ident(to)
            ))
            .reversible(format!(
                "ALTER TABLE {} RENAME TO {}",
                qualified(opts, schema.as_deref(), to),
                ident(from)
            ))
            .commented(format!("rename table {from:?} to {to:?}")),
        ),
        Change::AddView(view) => out.push(
            PlanStmt::new(format!(
                "CREATE VIEW {} AS {}",
                qualified(opts, view.schema.as_deref(), &view.name),
                view.def
            ))
            .reversible(format!(
                "DROP VIEW {}",
                qualified(opts, view.schema.as_deref(), &view.name)
            ))
            .commented(format!("add new view named {:?}", view.name)),
        ),
        Change::DropView { schema, name } => out.push(
            PlanStmt::new(format!(
                "DROP VIEW {}",
                qualified(opts, schema.as_deref(), name)
            ))
            .commented(format!("drop view named {name:?}")),
        ),
        Change::ModifyView { to, .. } => out.push(
            PlanStmt::new(format!(
                "CREATE OR REPLACE VIEW {} AS {}",
                qualified(opts, to.schema.as_deref(), &to.name),
                to.def
            ))
            .commented(format!("modify view named {:?}", to.name)),
        ),
        Change::RenameView { schema, from, to } => out.push(
            PlanStmt::new(format!(
                "ALTER VIEW {} RENAME TO {}",
                qualified(opts, schema.as_deref(), from),
                ident(to)
            ))
            .reversible(format!(
                "ALTER VIEW {} RENAME TO {}",
                qualified(opts, schema.as_deref(), to),
                ident(from)
            ))
            .commented(format!("rename view {from:?} to {to:?}")),
        ),
        Change::AddFunc(func) => out.push(
            PlanStmt::new(func.def.clone())
                .commented(format!("add new function named {:?}", func.name)),
        ),
        Change::DropFunc { schema, name } => out.push(
            PlanStmt::new(format!(
                "DROP FUNCTION {}",
                qualified(opts, schema.as_deref(), name)
            ))
            .commented(format!("drop function named {name:?}")),
        ),
        Change::ModifyFunc { to, .. } => out.push(
            PlanStmt::new(to.def.clone())
                .commented(format!("modify function named {:?}", to.name)),
        ),
        Change::AddProc(proc) => out.push(
            PlanStmt::new(proc.def.clone())
                .commented(format!("add new procedure named {:?}", proc.name)),
        ),
        Change::DropProc { schema, name } => out.push(
            PlanStmt::new(format!(
                "DROP PROCEDURE {}",
                qualified(opts, schema.as_deref(), name)
            ))
            .commented(format!("drop procedure named {name:?}")),
        ),
        Change::ModifyProc { to, .. } => out.push(
            PlanStmt::new(to.def.clone())
                .commented(format!("modify procedure named {:?}", to.name)),
        ),
        Change::AddTrigger(trigger) => out.push(
            PlanStmt::new(trigger.def.clone())
                .commented(format!("add new trigger named {:?}", trigger.name)),
        ),
        Change::DropTrigger { schema, table, name } => out.push(
            PlanStmt::new(format!(
                "DROP TRIGGER {} ON {}",
                ident(name),
                qualified(opts, schema.as_deref(), table)
            ))
            .commented(format!("drop trigger named {name:?}")),
        ),
        Change::ModifyTrigger { to, .. } => out.push(
            PlanStmt::new(to.def.clone())
                .commented(format!("modify trigger named {:?}", to.name)),
        ),
        Change::RenameFunc { schema, from, to } => out.push(PlanStmt::new(format!(
            "ALTER FUNCTION {} RENAME TO {}",
            qualified(opts, schema.as_deref(), from),
            ident(to)
        ))),
        Change::RenameProc { schema, from, to } => out.push(PlanStmt::new(format!(
            "ALTER PROCEDURE {} RENAME TO {}",
            qualified(opts, schema.as_deref(), from),
            ident(to)
        ))),
        Change::RenameTrigger { .. } => {
            return Err(Error::Unsupported(
                "renaming triggers requires the owning table".to_string(),
            ));
        }
    }
    Ok(())
}

/// Enum alterations support appended values only; label removal or
/// reordering would require a type rebuild.
fn lower_modify_enum(
    from: &EnumType,
    to: &EnumType,
    opts: &PlanOptions,
    out: &mut Vec<PlanStmt>,
) -> Result<()> {
    if to.values.len() < from.values.len() || to.values[..from.values.len()] != from.values[..] {
        return Err(Error::Unsupported(format!(
            "enum type {:?} changes existing values",
            from.name
        )));
    }
    for value in &to.values[from.values.len()..] {
        out.push(
            PlanStmt::new(format!(
                "ALTER TYPE {} ADD VALUE '{}'",
                enum_ref(to, opts),
                escape(value)
            ))
            .commented(format!("add value to enum type {:?}", to.name)),
        );
    }
    Ok(())
}

fn lower_add_table(table: &Table, opts: &PlanOptions, out: &mut Vec<PlanStmt>) -> Result<()> {
    let target = qualified(opts, table.schema.as_deref(), &table.name);
    let mut parts = Vec::new();
    for column in &table.columns {
        parts.push(column_def(column)?);
    }
    if let Some(pk) = &table.primary_key {
        parts.push(format!("PRIMARY KEY ({})", index_columns(pk)));
    }
    for fk in &table.foreign_keys {
        parts.push(fk_def(opts, fk));
    }
    for check in &table.checks {
        parts.push(check_def(check));
    }

    out.push(
        PlanStmt::new(format!("CREATE TABLE {target} ({})", parts.join(", ")))
            .reversible(format!("DROP TABLE {target}"))
            .commented(format!("create {:?} table", table.name)),
    );

    for index in &table.indexes {
        out.push(
            PlanStmt::new(create_index(&target, index))
                .reversible(format!("DROP INDEX {}", ident(&index.name)))
                .commented(format!(
                    "create index {:?} to table: {:?}",
                    index.name, table.name
                )),
        );
    }

    if let Some(comment) = attr::comment(&table.attrs) {
        out.push(PlanStmt::new(format!(
            "COMMENT ON TABLE {target} IS '{}'",
            escape(comment)
        )));
    }
    Ok(())
}

fn lower_modify_table(
    table: &Table,
    changes: &[TableChange],
    opts: &PlanOptions,
    final_out: &mut Vec<PlanStmt>,
) -> Result<()> {
    let target = qualified(opts, table.schema.as_deref(), &table.name);
    let mut clauses: Vec<(String, Option<String>)> = Vec::new();
    // Standalone statements (indexes, comments) trail the ALTER that carries
    // the column and constraint clauses.
    let mut tail: Vec<PlanStmt> = Vec::new();
    let out = &mut tail;

    for change in changes {
        match change {
            TableChange::AddColumn(column) => clauses.push((
                format!("ADD COLUMN {}", column_def(column)?),
                Some(format!("DROP COLUMN {}", ident(&column.name))),
            )),
            TableChange::DropColumn { name } => {
                clauses.push((format!("DROP COLUMN {}", ident(name)), None));
            }
            TableChange::ModifyColumn { from, to, kinds } => {
                lower_modify_column(from, to, *kinds, &mut clauses)?;
            }
            TableChange::AddIndex(index) => out.push(
                PlanStmt::new(create_index(&target, index))
                    .reversible(format!("DROP INDEX {}", ident(&index.name)))
                    .commented(format!(
                        "create index {:?} to table: {:?}",
                        index.name, table.name
                    )),
            ),
            TableChange::DropIndex { name } => out.push(
                PlanStmt::new(format!("DROP INDEX {}", ident(name)))
                    .commented(format!("drop index {name:?}")),
            ),
            TableChange::ModifyIndex { from, to, .. } => {
                out.push(PlanStmt::new(format!("DROP INDEX {}", ident(&from.name))));
                out.push(
                    PlanStmt::new(create_index(&target, to))
                        .commented(format!("modify index {:?}", to.name)),
                );
            }
            TableChange::AddForeignKey(fk) => clauses.push((
                format!("ADD {}", fk_def(opts, fk)),
                Some(format!("DROP CONSTRAINT {}", ident(&fk.symbol))),
            )),
            TableChange::DropForeignKey { symbol } => {
                clauses.push((format!("DROP CONSTRAINT {}", ident(symbol)), None));
            }
            TableChange::ModifyForeignKey { from, to, .. } => {
                clauses.push((format!("DROP CONSTRAINT {}", ident(&from.symbol)), None));
                clauses.push((
                    format!("ADD {}", fk_def(opts, to)),
                    Some(format!("DROP CONSTRAINT {}", ident(&to.symbol))),
                ));
            }
            TableChange::AddCheck(check) => clauses.push((
                format!("ADD {}", check_def(check)),
                Some(format!("DROP CONSTRAINT {}", ident(&check.name))),
            )),
            TableChange::DropCheck { name } => {
                clauses.push((format!("DROP CONSTRAINT {}", ident(name)), None));
            }
            TableChange::ModifyCheck { from, to } => {
                clauses.push((format!("DROP CONSTRAINT {}", ident(&from.name)), None));
                clauses.push((
                    format!("ADD {}", check_def(to)),
                    Some(format!("DROP CONSTRAINT {}", ident(&to.name))),
                ));
            }
            TableChange::AddAttr(Attr::Comment(comment))
            | TableChange::ModifyAttr {
                to: Attr::Comment(comment),
                ..
            } => out.push(PlanStmt::new(format!(
                "COMMENT ON TABLE {target} IS '{}'",
                escape(comment)
            ))),
            TableChange::DropAttr(AttrKind::Comment) => out.push(PlanStmt::new(format!(
                "COMMENT ON TABLE {target} IS NULL"
            ))),
            TableChange::AddAttr(other) | TableChange::ModifyAttr { to: other, .. } => {
                return Err(Error::Unsupported(format!(
                    "table attribute {:?}",
                    other.kind()
                )));
            }
            TableChange::DropAttr(other) => {
                return Err(Error::Unsupported(format!("table attribute {other:?}")));
            }
        }
    }

    if !clauses.is_empty() {
        let reversible = clauses.iter().all(|(_, reverse)| reverse.is_some());
        let mut stmt = PlanStmt::new(format!(
            "ALTER TABLE {target} {}",
            clauses
                .iter()
                .map(|(clause, _)| clause.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .commented(format!("modify {:?} table", table.name));
        if reversible {
            let mut reverses: Vec<String> = clauses
                .into_iter()
                .filter_map(|(_, reverse)| reverse)
                .collect();
            reverses.reverse();
            stmt = stmt.reversible(format!("ALTER TABLE {target} {}", reverses.join(", ")));
        }
        final_out.push(stmt);
    }
    final_out.extend(tail);
    Ok(())
}

fn lower_modify_column(
    from: &Column,
    to: &Column,
    kinds: driftql_core::BitFlags<ColumnChange>,
    clauses: &mut Vec<(String, Option<String>)>,
) -> Result<()> {
    let column = ident(&to.name);
    if kinds.contains(ColumnChange::Type) {
        clauses.push((
            format!(
                "ALTER COLUMN {column} TYPE {}",
                types::format_type(&to.ty.ty).unwrap_or_else(|_| to.ty.raw.clone())
            ),
            Some(format!(
                "ALTER COLUMN {column} TYPE {}",
                types::format_type(&from.ty.ty).unwrap_or_else(|_| from.ty.raw.clone())
            )),
        ));
    }
    if kinds.contains(ColumnChange::Null) {
        if to.ty.nullable {
            clauses.push((
                format!("ALTER COLUMN {column} DROP NOT NULL"),
                Some(format!("ALTER COLUMN {column} SET NOT NULL")),
            ));
        } else {
            clauses.push((
                format!("ALTER COLUMN {column} SET NOT NULL"),
                Some(format!("ALTER COLUMN {column} DROP NOT NULL")),
            ));
        }
    }
    if kinds.contains(ColumnChange::Default) {
        match &to.default {
            Some(default) => clauses.push((
                format!("ALTER COLUMN {column} SET DEFAULT {}", default_sql(default)),
                reverse_default(&column, &from.default),
            )),
            None => clauses.push((
                format!("ALTER COLUMN {column} DROP DEFAULT"),
                reverse_default(&column, &from.default),
            )),
        }
    }
    if kinds.contains(ColumnChange::Comment) {
        // COMMENT ON is a standalone statement; handled by callers that care.
    }
    if kinds.contains(ColumnChange::Generated) {
        return Err(Error::Unsupported(format!(
            "changing the generation expression of column {:?}",
            to.name
        )));
    }
    Ok(())
}

fn reverse_default(column: &str, previous: &Option<DefaultValue>) -> Option<String> {
    Some(match previous {
        Some(default) => format!("ALTER COLUMN {column} SET DEFAULT {}", default_sql(default)),
        None => format!("ALTER COLUMN {column} DROP DEFAULT"),
    })
}

fn default_sql(default: &DefaultValue) -> String {
    match default {
        DefaultValue::Literal(literal) => literal.clone(),
        DefaultValue::RawExpr(expr) => expr.clone(),
    }
}

fn column_def(column: &Column) -> Result<String> {
    let mut sql = format!(
        "{} {}",
        ident(&column.name),
        types::format_type(&column.ty.ty).unwrap_or_else(|_| column.ty.raw.clone())
    );
    if let Some(Attr::Collation(collation)) = attr::find(&column.attrs, AttrKind::Collation) {
        write!(sql, " COLLATE \"{collation}\"").expect("write to string");
    }
    if let Some(generated) = &column.generated {
        if generated.kind != GeneratedKind::Stored {
            return Err(Error::Unsupported(format!(
                "virtual generated column {:?}",
                column.name
            )));
        }
        write!(sql, " GENERATED ALWAYS AS ({}) STORED", generated.expr)
            .expect("write to string");
    }
    if let Some(Attr::Identity { always, sequence }) =
        attr::find(&column.attrs, AttrKind::Identity)
    {
        let kind = if *always { "ALWAYS" } else { "BY DEFAULT" };
        write!(sql, " GENERATED {kind} AS IDENTITY").expect("write to string");
        if sequence.start != 1 || sequence.increment != 1 {
            write!(
                sql,
                " (START WITH {} INCREMENT BY {})",
                sequence.start, sequence.increment
            )
            .expect("write to string");
        }
    }
    if !column.ty.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        write!(sql, " DEFAULT {}", default_sql(default)).expect("write to string");
    }
    Ok(sql)
}

fn create_index(target: &str, index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let mut sql = format!(
        "CREATE {unique}INDEX {} ON {target} ({})",
        ident(&index.name),
        index_columns(index)
    );
    if let Some(Attr::IndexPredicate(predicate)) =
        attr::find(&index.attrs, AttrKind::IndexPredicate)
    {
        write!(sql, " WHERE {predicate}").expect("write to string");
    }
    sql
}

fn index_columns(index: &Index) -> String {
    index
        .parts
        .iter()
        .map(|part| {
            let mut rendered = match &part.kind {
                PartKind::Column(column) => ident(column),
                PartKind::Expr(expr) => format!("({expr})"),
            };
            if part.desc {
                rendered.push_str(" DESC");
            }
            rendered
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn fk_def(opts: &PlanOptions, fk: &ForeignKey) -> String {
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        ident(&fk.symbol),
        idents(&fk.columns),
        table_ref(opts, &fk.ref_table),
        idents(&fk.ref_columns)
    );
    if let Some(action) = fk.on_update {
        write!(sql, " ON UPDATE {}", action.as_sql()).expect("write to string");
    }
    if let Some(action) = fk.on_delete {
        write!(sql, " ON DELETE {}", action.as_sql()).expect("write to string");
    }
    sql
}

fn check_def(check: &Check) -> String {
    let expr = if check.expr.starts_with('(') {
        check.expr.clone()
    } else {
        format!("({})", check.expr)
    };
    format!("CONSTRAINT {} CHECK {expr}", ident(&check.name))
}

fn create_enum(enum_type: &EnumType, opts: &PlanOptions) -> String {
    let values = enum_type
        .values
        .iter()
        .map(|value| format!("'{}'", escape(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TYPE {} AS ENUM ({values})", enum_ref(enum_type, opts))
}

fn enum_ref(enum_type: &EnumType, opts: &PlanOptions) -> String {
    qualified(opts, enum_type.schema.as_deref(), &enum_type.name)
}

fn table_ref(opts: &PlanOptions, reference: &TableRef) -> String {
    qualified(opts, reference.schema.as_deref(), &reference.name)
}

fn qualified(opts: &PlanOptions, schema: Option<&str>, name: &str) -> String {
    let schema = match &opts.schema_qualifier {
        Some(qualifier) if qualifier.is_empty() => None,
        Some(qualifier) => Some(qualifier.as_str()),
        None => schema,
    };
    match schema {
        Some(schema) => format!("{}.{}", ident(schema), ident(name)),
        None => ident(name),
    }
}

fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn idents(names: &[String]) -> String {
    names
        .iter()
        .map(|name| ident(name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape(text: &str) -> String {
    text.replace('\'', "''")
}
