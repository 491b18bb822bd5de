use driftql_core::{
    Change, Error, Result, TableChange,
    migrate::{Plan, PlanOptions, PlanStmt},
    schema::{Column, ForeignKey, Index, PartKind, Table},
};

use crate::{Spanner, types};

pub(crate) fn plan_changes(
    _driver: &Spanner,
    name: &str,
    changes: &[Change],
    _opts: &PlanOptions,
) -> Result<Plan> {
    let mut stmts = Vec::new();
    for change in changes {
        lower_change(change, &mut stmts)?;
    }
    // Spanner DDL runs as asynchronous batches, never inside a transaction.
    Ok(Plan::from_stmts(name, false, stmts))
}

fn lower_change(change: &Change, out: &mut Vec<PlanStmt>) -> Result<()> {
    match change {
        Change::AddTable(table) => lower_add_table(table, out),
        Change::DropTable { name, .. } => {
            out.push(
                PlanStmt::new(format!("DROP TABLE {name}"))
                    .commented(format!("drop table named {name:?}")),
            );
            Ok(())
        }
        Change::ModifyTable { table, changes } => {
            // One atomic ALTER per change, matching the DDL batch model.
            for table_change in changes {
                lower_table_change(&table.name, table_change, out)?;
            }
            Ok(())
        }
        other => Err(Error::Unsupported(format!(
            "spanner planner does not lower {} changes",
            other.tag()
        ))),
    }
}

fn lower_add_table(table: &Table, out: &mut Vec<PlanStmt>) -> Result<()> {
    let mut parts = Vec::new();
    for column in &table.columns {
        parts.push(column_def(column)?);
    }
    for fk in &table.foreign_keys {
        parts.push(fk_def(fk));
    }

    let pk = table
        .primary_key
        .as_ref()
        .ok_or_else(|| Error::Unsupported(format!("table {:?} without a primary key", table.name)))?;

    out.push(
        PlanStmt::new(format!(
            "CREATE TABLE {} ({}) PRIMARY KEY ({})",
            table.name,
            parts.join(", "),
            index_columns(pk)
        ))
        .reversible(format!("DROP TABLE {}", table.name))
        .commented(format!("create {:?} table", table.name)),
    );

    for index in &table.indexes {
        out.push(
            PlanStmt::new(create_index(&table.name, index))
                .reversible(format!("DROP INDEX {}", index.name))
                .commented(format!(
                    "create index {:?} to table: {:?}",
                    index.name, table.name
                )),
        );
    }
    Ok(())
}

fn lower_table_change(table: &str, change: &TableChange, out: &mut Vec<PlanStmt>) -> Result<()> {
    match change {
        TableChange::AddColumn(column) => out.push(
            PlanStmt::new(format!(
                "ALTER TABLE {table} ADD COLUMN {}",
                column_def(column)?
            ))
            .reversible(format!("ALTER TABLE {table} DROP COLUMN {}", column.name))
            .commented(format!("modify {table:?} table")),
        ),
        TableChange::DropColumn { name } => out.push(
            PlanStmt::new(format!("ALTER TABLE {table} DROP COLUMN {name}"))
                .commented(format!("modify {table:?} table")),
        ),
        TableChange::ModifyColumn { from, to, .. } => out.push(
            PlanStmt::new(format!(
                "ALTER TABLE {table} ALTER COLUMN {}",
                column_def(to)?
            ))
            .reversible(format!(
                "ALTER TABLE {table} ALTER COLUMN {}",
                column_def(from)?
            ))
            .commented(format!("modify {table:?} table")),
        ),
        TableChange::AddIndex(index) => out.push(
            PlanStmt::new(create_index(table, index))
                .reversible(format!("DROP INDEX {}", index.name))
                .commented(format!("create index {:?} to table: {table:?}", index.name)),
        ),
        TableChange::DropIndex { name } => out.push(
            PlanStmt::new(format!("DROP INDEX {name}"))
                .commented(format!("drop index {name:?}")),
        ),
        TableChange::AddForeignKey(fk) => out.push(
            PlanStmt::new(format!("ALTER TABLE {table} ADD {}", fk_def(fk)))
                .reversible(format!("ALTER TABLE {table} DROP CONSTRAINT {}", fk.symbol))
                .commented(format!("modify {table:?} table")),
        ),
        TableChange::DropForeignKey { symbol } => out.push(
            PlanStmt::new(format!("ALTER TABLE {table} DROP CONSTRAINT {symbol}"))
                .commented(format!("modify {table:?} table")),
        ),
        other => {
            return Err(Error::Unsupported(format!(
                "spanner planner does not lower {} table changes",
                other.tag()
            )));
        }
    }
    Ok(())
}

fn column_def(column: &Column) -> Result<String> {
    let mut sql = format!(
        "{} {}",
        column.name,
        types::format_type(&column.ty.ty).unwrap_or_else(|_| column.ty.raw.clone())
    );
    if !column.ty.nullable {
        sql.push_str(" NOT NULL");
    }
    Ok(sql)
}

fn create_index(table: &str, index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    format!(
        "CREATE {unique}INDEX {} ON {table} ({})",
        index.name,
        index_columns(index)
    )
}

fn index_columns(index: &Index) -> String {
    index
        .parts
        .iter()
        .map(|part| {
            let mut rendered = match &part.kind {
                PartKind::Column(column) => column.clone(),
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
    format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        fk.symbol,
        fk.columns.join(", "),
        fk.ref_table.name,
        fk.ref_columns.join(", ")
    )
}
