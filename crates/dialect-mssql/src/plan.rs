use std::fmt::Write as _;

use driftql_core::{
    Change, ColumnChange, Error, Result, TableChange,
    migrate::{Plan, PlanOptions, PlanStmt},
    schema::{
        Attr, AttrKind, Check, Column, DefaultValue, ForeignKey, Index, PartKind, Table, TableRef,
        attr,
    },
};

use crate::{Mssql, types};

pub(crate) fn plan_changes(
    _driver: &Mssql,
    name: &str,
    changes: &[Change],
    opts: &PlanOptions,
) -> Result<Plan> {
    let mut stmts = Vec::new();
    for change in changes {
        lower_change(change, opts, &mut stmts)?;
    }
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
            PlanStmt::new(format!("DROP SCHEMA {}", ident(name)))
                .commented(format!("drop schema named {name:?}")),
        ),
        Change::ModifySchema { name, .. } => {
            return Err(Error::Unsupported(format!(
                "schema attribute changes on {name:?}"
            )));
        }
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
                "EXEC sp_rename '{}', '{}'",
                plain(opts, schema.as_deref(), from),
                to
            ))
            .reversible(format!(
                "EXEC sp_rename '{}', '{}'",
                plain(opts, schema.as_deref(), to),
                from
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
                "CREATE OR ALTER VIEW {} AS {}",
                qualified(opts, to.schema.as_deref(), &to.name),
                to.def
            ))
            .commented(format!("modify view named {:?}", to.name)),
        ),
        other => {
            return Err(Error::Unsupported(format!(
                "sql server planner does not lower {} changes",
                other.tag()
            )));
        }
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
                .reversible(format!("DROP INDEX {} ON {target}", ident(&index.name)))
                .commented(format!(
                    "create index {:?} to table: {:?}",
                    index.name, table.name
                )),
        );
    }
    Ok(())
}

fn lower_modify_table(
    table: &Table,
    changes: &[TableChange],
    opts: &PlanOptions,
    out: &mut Vec<PlanStmt>,
) -> Result<()> {
    let target = qualified(opts, table.schema.as_deref(), &table.name);

    // T-SQL ALTER TABLE takes one action per statement.
    for change in changes {
        match change {
            TableChange::AddColumn(column) => out.push(
                PlanStmt::new(format!("ALTER TABLE {target} ADD {}", column_def(column)?))
                    .reversible(format!(
                        "ALTER TABLE {target} DROP COLUMN {}",
                        ident(&column.name)
                    ))
                    .commented(format!("modify {:?} table", table.name)),
            ),
            TableChange::DropColumn { name } => out.push(
                PlanStmt::new(format!("ALTER TABLE {target} DROP COLUMN {}", ident(name)))
                    .commented(format!("modify {:?} table", table.name)),
            ),
            TableChange::ModifyColumn { from, to, kinds } => {
                if kinds.contains(ColumnChange::Default) {
                    return Err(Error::Unsupported(format!(
                        "changing the default of column {:?} requires its constraint name",
                        to.name
                    )));
                }
                out.push(
                    PlanStmt::new(format!(
                        "ALTER TABLE {target} ALTER COLUMN {}",
                        alter_column_def(to)?
                    ))
                    .reversible(format!(
                        "ALTER TABLE {target} ALTER COLUMN {}",
                        alter_column_def(from)?
                    ))
                    .commented(format!("modify {:?} table", table.name)),
                );
            }
            TableChange::AddIndex(index) => out.push(
                PlanStmt::new(create_index(&target, index))
                    .reversible(format!("DROP INDEX {} ON {target}", ident(&index.name)))
                    .commented(format!(
                        "create index {:?} to table: {:?}",
                        index.name, table.name
                    )),
            ),
            TableChange::DropIndex { name } => out.push(
                PlanStmt::new(format!("DROP INDEX {} ON {target}", ident(name)))
                    .commented(format!("drop index {name:?}")),
            ),
            TableChange::ModifyIndex { from, to, .. } => {
                out.push(PlanStmt::new(format!(
                    "DROP INDEX {} ON {target}",
                    ident(&from.name)
                )));
                out.push(
                    PlanStmt::new(create_index(&target, to))
                        .commented(format!("modify index {:?}", to.name)),
                );
            }
            TableChange::AddForeignKey(fk) => out.push(
                PlanStmt::new(format!("ALTER TABLE {target} ADD {}", fk_def(opts, fk)))
                    .reversible(format!(
                        "ALTER TABLE {target} DROP CONSTRAINT {}",
                        ident(&fk.symbol)
                    ))
                    .commented(format!("modify {:?} table", table.name)),
            ),
            TableChange::DropForeignKey { symbol } => out.push(
                PlanStmt::new(format!(
                    "ALTER TABLE {target} DROP CONSTRAINT {}",
                    ident(symbol)
                ))
                .commented(format!("modify {:?} table", table.name)),
            ),
            TableChange::ModifyForeignKey { from, to, .. } => {
                out.push(PlanStmt::new(format!(
                    "ALTER TABLE {target} DROP CONSTRAINT {}",
                    ident(&from.symbol)
                )));
                out.push(PlanStmt::new(format!(
                    "ALTER TABLE {target} ADD {}",
                    fk_def(opts, to)
                )));
            }
            TableChange::AddCheck(check) => out.push(
                PlanStmt::new(format!("ALTER TABLE {target} ADD {}", check_def(check)))
                    .reversible(format!(
                        "ALTER TABLE {target} DROP CONSTRAINT {}",
                        ident(&check.name)
                    ))
                    .commented(format!("modify {:?} table", table.name)),
            ),
            TableChange::DropCheck { name } => out.push(
                PlanStmt::new(format!(
                    "ALTER TABLE {target} DROP CONSTRAINT {}",
                    ident(name)
                ))
                .commented(format!("modify {:?} table", table.name)),
            ),
            TableChange::ModifyCheck { from, to } => {
                out.push(PlanStmt::new(format!(
                    "ALTER TABLE {target} DROP CONSTRAINT {}",
                    ident(&from.name)
                )));
                out.push(PlanStmt::new(format!(
                    "ALTER TABLE {target} ADD {}",
                    check_def(to)
                )));
            }
            TableChange::AddAttr(attr) | TableChange::ModifyAttr { to: attr, .. } => {
                return Err(Error::Unsupported(format!(
                    "table attribute {:?}",
                    attr.kind()
                )));
            }
            TableChange::DropAttr(kind) => {
                return Err(Error::Unsupported(format!("table attribute {kind:?}")));
            }
        }
    }
    Ok(())
}

fn column_def(column: &Column) -> Result<String> {
    let mut sql = alter_column_def(column)?;
    if attr::find(&column.attrs, AttrKind::AutoIncrement).is_some() {
        sql.push_str(" IDENTITY(1,1)");
    }
    if let Some(default) = &column.default {
        let rendered = match default {
            DefaultValue::Literal(literal) => literal.clone(),
            DefaultValue::RawExpr(expr) => expr.clone(),
        };
        write!(sql, " DEFAULT {rendered}").expect("write to string");
    }
    Ok(sql)
}

/// The column shape valid inside `ALTER COLUMN`: name, type, collation,
/// nullability. Identity and defaults are not alterable in place.
fn alter_column_def(column: &Column) -> Result<String> {
    let mut sql = format!(
        "{} {}",
        ident(&column.name),
        types::format_type(&column.ty.ty).unwrap_or_else(|_| column.ty.raw.clone())
    );
    if let Some(Attr::Collation(collation)) = attr::find(&column.attrs, AttrKind::Collation) {
        write!(sql, " COLLATE {collation}").expect("write to string");
    }
    if !column.ty.nullable {
        sql.push_str(" NOT NULL");
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

fn table_ref(opts: &PlanOptions, reference: &TableRef) -> String {
    qualified(opts, reference.schema.as_deref(), &reference.name)
}

fn qualified(opts: &PlanOptions, schema: Option<&str>, name: &str) -> String {
    let schema = resolved_schema(opts, schema);
    match schema {
        Some(schema) => format!("{}.{}", ident(schema), ident(name)),
        None => ident(name),
    }
}

fn plain(opts: &PlanOptions, schema: Option<&str>, name: &str) -> String {
    match resolved_schema(opts, schema) {
        Some(schema) => format!("{schema}.{name}"),
        None => name.to_string(),
    }
}

fn resolved_schema<'a>(opts: &'a PlanOptions, schema: Option<&'a str>) -> Option<&'a str> {
    match &opts.schema_qualifier {
        Some(qualifier) if qualifier.is_empty() => None,
        Some(qualifier) => Some(qualifier.as_str()),
        None => schema,
    }
}

fn ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn idents(names: &[String]) -> String {
    names
        .iter()
        .map(|name| ident(name))
        .collect::<Vec<_>>()
        .join(", ")
}
