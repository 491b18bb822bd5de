use std::fmt::Write as _;

use driftql_core::{
    Change, Error, Result, TableChange,
    migrate::{Plan, PlanOptions, PlanStmt},
    schema::{Attr, AttrKind, Check, Column, DefaultValue, ForeignKey, Index, PartKind, Table, attr},
};

use crate::{SQLite, types};

pub(crate) fn plan_changes(
    _driver: &SQLite,
    name: &str,
    changes: &[Change],
    _opts: &PlanOptions,
) -> Result<Plan> {
    let mut stmts = Vec::new();
    for change in changes {
        lower_change(change, &mut stmts)?;
    }
    Ok(Plan::from_stmts(name, true, stmts))
}

fn lower_change(change: &Change, out: &mut Vec<PlanStmt>) -> Result<()> {
    match change {
        Change::AddTable(table) => lower_add_table(table, out),
        Change::DropTable { name, .. } => {
            out.push(
                PlanStmt::new(format!("DROP TABLE {}", ident(name)))
                    .commented(format!("drop table named {name:?}")),
            );
            Ok(())
        }
        Change::ModifyTable { table, changes } => lower_modify_table(table, changes, out),
        Change::RenameTable { from, to, .. } => {
            out.push(
                PlanStmt::new(format!(
                    "ALTER TABLE {} RENAME TO {}",
                    ident(from),
                    ident(to)
                ))
                .reversible(format!(
                    "ALTER TABLE {} RENAME TO {}",
                    ident(to),
                    ident(from)
                ))
                .commented(format!("rename table {from:?} to {to:?}")),
            );
            Ok(())
        }
        Change::AddView(view) => {
            out.push(
                PlanStmt::new(view_create_sql(&view.name, &view.def))
                    .reversible(format!("DROP VIEW {}", ident(&view.name)))
                    .commented(format!("add new view named {:?}", view.name)),
            );
            Ok(())
        }
        Change::DropView { name, .. } => {
            out.push(
                PlanStmt::new(format!("DROP VIEW {}", ident(name)))
                    .commented(format!("drop view named {name:?}")),
            );
            Ok(())
        }
        Change::ModifyView { from, to } => {
            out.push(PlanStmt::new(format!("DROP VIEW {}", ident(&from.name))));
            out.push(
                PlanStmt::new(view_create_sql(&to.name, &to.def))
                    .commented(format!("modify view named {:?}", to.name)),
            );
            Ok(())
        }
        Change::AddTrigger(trigger) => {
            out.push(
                PlanStmt::new(trigger.def.clone())
                    .reversible(format!("DROP TRIGGER {}", ident(&trigger.name)))
                    .commented(format!("add new trigger named {:?}", trigger.name)),
            );
            Ok(())
        }
        Change::DropTrigger { name, .. } => {
            out.push(
                PlanStmt::new(format!("DROP TRIGGER {}", ident(name)))
                    .commented(format!("drop trigger named {name:?}")),
            );
            Ok(())
        }
        Change::ModifyTrigger { from, to } => {
            out.push(PlanStmt::new(format!("DROP TRIGGER {}", ident(&from.name))));
            out.push(
                PlanStmt::new(to.def.clone())
                    .commented(format!("modify trigger named {:?}", to.name)),
            );
            Ok(())
        }
        other => Err(Error::Unsupported(format!(
            "sqlite cannot apply {} changes",
            other.tag()
        ))),
    }
}

fn lower_add_table(table: &Table, out: &mut Vec<PlanStmt>) -> Result<()> {
    out.push(
        PlanStmt::new(create_table_sql(table, &table.name)?)
            .reversible(format!("DROP TABLE {}", ident(&table.name)))
            .commented(format!("create {:?} table", table.name)),
    );
    for index in &table.indexes {
        out.push(
            PlanStmt::new(create_index_sql(&table.name, index))
                .reversible(format!("DROP INDEX {}", ident(&index.name)))
                .commented(format!(
                    "create index {:?} to table: {:?}",
                    index.name, table.name
                )),
        );
    }
    Ok(())
}

/// SQLite's ALTER TABLE only adds columns and renames; every other table
/// modification rebuilds the table under a scratch name and swaps it in.
fn lower_modify_table(table: &Table, changes: &[TableChange], out: &mut Vec<PlanStmt>) -> Result<()> {
    let simple = changes.iter().all(|change| {
        matches!(
            change,
            TableChange::AddColumn(_) | TableChange::AddIndex(_) | TableChange::DropIndex { .. }
        )
    });

    if simple {
        for change in changes {
            match change {
                TableChange::AddColumn(column) => out.push(
                    PlanStmt::new(format!(
                        "ALTER TABLE {} ADD COLUMN {}",
                        ident(&table.name),
                        column_def(column)?
                    ))
                    .commented(format!("modify {:?} table", table.name)),
                ),
                TableChange::AddIndex(index) => out.push(
                    PlanStmt::new(create_index_sql(&table.name, index))
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
                _ => unreachable!("guarded by the simple-change scan"),
            }
        }
        return Ok(());
    }

    // Rebuild: the desired table definition is in hand, so create it under
    // a scratch name, copy the surviving columns, and swap.
    let scratch = format!("new_{}", table.name);
    out.push(
        PlanStmt::new("PRAGMA foreign_keys = off".to_string())
            .reversible("PRAGMA foreign_keys = on".to_string()),
    );
    out.push(
        PlanStmt::new(create_table_sql(table, &scratch)?)
            .commented(format!("rebuild {:?} table", table.name)),
    );

    let copied = copied_columns(table, changes);
    if !copied.is_empty() {
        out.push(PlanStmt::new(format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            ident(&scratch),
            idents(&copied),
            idents(&copied),
            ident(&table.name)
        )));
    }
    out.push(PlanStmt::new(format!("DROP TABLE {}", ident(&table.name))));
    out.push(PlanStmt::new(format!(
        "ALTER TABLE {} RENAME TO {}",
        ident(&scratch),
        ident(&table.name)
    )));
    for index in &table.indexes {
        out.push(PlanStmt::new(create_index_sql(&table.name, index)));
    }
    out.push(
        PlanStmt::new("PRAGMA foreign_keys = on".to_string())
            .reversible("PRAGMA foreign_keys = off".to_string()),
    );
    Ok(())
}

/// Columns present in the rebuilt definition that also existed before the
/// change, i.e. everything desired except additions and renames.
fn copied_columns(table: &Table, changes: &[TableChange]) -> Vec<String> {
    table
        .columns
        .iter()
        .map(|column| column.name.clone())
        .filter(|name| {
            !changes.iter().any(|change| {
                matches!(change, TableChange::AddColumn(added) if &added.name == name)
            })
        })
        .collect()
}

fn create_table_sql(table: &Table, name: &str) -> Result<String> {
    let mut parts = Vec::new();
    for column in &table.columns {
        parts.push(column_def(column)?);
    }
    if let Some(pk) = &table.primary_key {
        parts.push(format!("PRIMARY KEY ({})", index_columns(pk)));
    }
    for fk in &table.foreign_keys {
        parts.push(fk_def(fk));
    }
    for check in &table.checks {
        parts.push(check_def(check));
    }
    Ok(format!("CREATE TABLE {} ({})", ident(name), parts.join(", ")))
}

fn column_def(column: &Column) -> Result<String> {
    let mut sql = format!(
        "{} {}",
        ident(&column.name),
        types::format_type(&column.ty.ty).unwrap_or_else(|_| column.ty.raw.clone())
    );
    if !column.ty.nullable {
        sql.push_str(" NOT NULL");
    }
    match &column.default {
        Some(DefaultValue::Literal(literal)) => {
            write!(sql, " DEFAULT {literal}").expect("write to string");
        }
        Some(DefaultValue::RawExpr(expr)) => {
            if expr.starts_with('(') {
                write!(sql, " DEFAULT {expr}").expect("write to string");
            } else {
                write!(sql, " DEFAULT ({expr})").expect("write to string");
            }
        }
        None => {}
    }
    if attr::find(&column.attrs, AttrKind::AutoIncrement).is_some() {
        sql.push_str(" AUTOINCREMENT");
    }
    Ok(sql)
}

fn create_index_sql(table: &str, index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let mut sql = format!(
        "CREATE {unique}INDEX {} ON {} ({})",
        ident(&index.name),
        ident(table),
        index_columns(index)
    );
    if let Some(Attr::IndexPredicate(predicate)) =
        attr::find(&index.attrs, AttrKind::IndexPredicate)
        && !predicate.is_empty()
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

fn fk_def(fk: &ForeignKey) -> String {
    let mut sql = format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        idents(&fk.columns),
        ident(&fk.ref_table.name),
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

fn view_create_sql(name: &str, def: &str) -> String {
    // Inspected view definitions are complete CREATE statements; declared
    // ones may be the bare query.
    if def.trim_start().to_ascii_uppercase().starts_with("CREATE") {
        def.to_string()
    } else {
        format!("CREATE VIEW {} AS {}", ident(name), def)
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
