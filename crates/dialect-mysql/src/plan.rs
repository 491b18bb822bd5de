use std::fmt::Write as _;

use driftql_core::{
    AttrChange, Change, Error, Result, TableChange,
    migrate::{Plan, PlanOptions, PlanStmt},
    schema::{
        Attr, AttrKind, Check, Column, DefaultValue, ForeignKey, GeneratedKind, Index, IndexType,
        PartKind, Table, TableRef, Type, attr,
    },
};

use crate::{Flavor, MySql, types};

pub(crate) fn plan_changes(
    driver: &MySql,
    name: &str,
    changes: &[Change],
    opts: &PlanOptions,
) -> Result<Plan> {
    let mut stmts = Vec::new();
    for change in changes {
        lower_change(driver, change, opts, &mut stmts)?;
    }
    // MySQL DDL commits implicitly; plans are never transactional.
    Ok(Plan::from_stmts(name, false, stmts))
}

fn lower_change(
    driver: &MySql,
    change: &Change,
    opts: &PlanOptions,
    out: &mut Vec<PlanStmt>,
) -> Result<()> {
    match change {
        Change::AddSchema(schema) => {
            let mut sql = format!("CREATE DATABASE {}", ident(&schema.name));
            if let Some(charset) = attr::charset(&schema.attrs) {
                write!(sql, " CHARACTER SET {charset}").expect("write to string");
            }
            if let Some(collation) = attr::collation(&schema.attrs) {
                write!(sql, " COLLATE {collation}").expect("write to string");
            }
            out.push(
                PlanStmt::new(sql)
                    .reversible(format!("DROP DATABASE {}", ident(&schema.name)))
                    .commented(format!("add new schema named {:?}", schema.name)),
            );
        }
        Change::DropSchema { name } => {
            out.push(
                PlanStmt::new(format!("DROP DATABASE {}", ident(name)))
                    .commented(format!("drop schema named {name:?}")),
            );
        }
        Change::ModifySchema { name, changes } => {
            let mut sql = format!("ALTER DATABASE {}", ident(name));
            for change in changes {
                let applied = match change {
                    AttrChange::Add(attr) | AttrChange::Modify { to: attr, .. } => attr.clone(),
                    AttrChange::Drop(kind) => {
                        return Err(Error::Unsupported(format!(
                            "dropping schema attribute {kind:?}"
                        )));
                    }
                };
                match applied {
                    Attr::Charset(charset) => {
                        write!(sql, " CHARACTER SET {charset}").expect("write to string");
                    }
                    Attr::Collation(collation) => {
                        write!(sql, " COLLATE {collation}").expect("write to string");
                    }
                    other => {
                        return Err(Error::Unsupported(format!(
                            "schema attribute {:?}",
                            other.kind()
                        )));
                    }
                }
            }
            out.push(PlanStmt::new(sql).commented(format!("modify schema named {name:?}")));
        }
        Change::AddTable(table) => lower_add_table(driver, table, opts, out)?,
        Change::DropTable { schema, name } => {
            out.push(
                PlanStmt::new(format!(
                    "DROP TABLE {}",
                    qualified(opts, schema.as_deref(), name)
                ))
                .commented(format!("drop table named {name:?}")),
            );
        }
        Change::ModifyTable { table, changes } => lower_modify_table(driver, table, changes, opts, out)?,
        Change::RenameTable { schema, from, to } => {
            out.push(
                PlanStmt::new(format!(
                    "RENAME TABLE {} TO {}",
                    qualified(opts, schema.as_deref(), from),
                    qualified(opts, schema.as_deref(), to)
                ))
                .reversible(format!(
                    "RENAME TABLE {} TO {}",
                    qualified(opts, schema.as_deref(), to),
                    qualified(opts, schema.as_deref(), from)
                ))
                .commented(format!("rename table {from:?} to {to:?}")),
            );
        }
        Change::AddView(view) => {
            out.push(
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
            );
        }
        Change::DropView { schema, name } => {
            out.push(
                PlanStmt::new(format!(
                    "DROP VIEW {}",
                    qualified(opts, schema.as_deref(), name)
                ))
                .commented(format!("drop view named {name:?}")),
            );
        }
        Change::ModifyView { to, .. } => {
            out.push(
                PlanStmt::new(format!(
                    "CREATE OR REPLACE VIEW {} AS {}",
                    qualified(opts, to.schema.as_deref(), &to.name),
                    to.def
                ))
                .commented(format!("modify view named {:?}", to.name)),
            );
        }
        Change::RenameView { schema, from, to } => {
            out.push(
                PlanStmt::new(format!(
                    "RENAME TABLE {} TO {}",
                    qualified(opts, schema.as_deref(), from),
                    qualified(opts, schema.as_deref(), to)
                ))
                .reversible(format!(
                    "RENAME TABLE {} TO {}",
                    qualified(opts, schema.as_deref(), to),
                    qualified(opts, schema.as_deref(), from)
                ))
                .commented(format!("rename view {from:?} to {to:?}")),
            );
        }
        Change::AddFunc(func) => out.push(
            PlanStmt::new(func.def.clone())
                .reversible(format!(
                    "DROP FUNCTION {}",
                    qualified(opts, func.schema.as_deref(), &func.name)
                ))
                .commented(format!("add new function named {:?}", func.name)),
        ),
        Change::DropFunc { schema, name } => out.push(
            PlanStmt::new(format!(
                "DROP FUNCTION {}",
                qualified(opts, schema.as_deref(), name)
            ))
            .commented(format!("drop function named {name:?}")),
        ),
        Change::ModifyFunc { from, to } => {
            out.push(PlanStmt::new(format!(
                "DROP FUNCTION {}",
                qualified(opts, from.schema.as_deref(), &from.name)
            )));
            out.push(
                PlanStmt::new(to.def.clone())
                    .commented(format!("modify function named {:?}", to.name)),
            );
        }
        Change::AddProc(proc) => out.push(
            PlanStmt::new(proc.def.clone())
                .reversible(format!(
                    "DROP PROCEDURE {}",
                    qualified(opts, proc.schema.as_deref(), &proc.name)
                ))
                .commented(format!("add new procedure named {:?}", proc.name)),
        ),
        Change::DropProc { schema, name } => out.push(
            PlanStmt::new(format!(
                "DROP PROCEDURE {}",
                qualified(opts, schema.as_deref(), name)
            ))
            .commented(format!("drop procedure named {name:?}")),
        ),
        Change::ModifyProc { from, to } => {
            out.push(PlanStmt::new(format!(
                "DROP PROCEDURE {}",
                qualified(opts, from.schema.as_deref(), &from.name)
            )));
            out.push(
                PlanStmt::new(to.def.clone())
                    .commented(format!("modify procedure named {:?}", to.name)),
            );
        }
        Change::AddTrigger(trigger) => out.push(
            PlanStmt::new(trigger.def.clone())
                .reversible(format!("DROP TRIGGER {}", ident(&trigger.name)))
                .commented(format!("add new trigger named {:?}", trigger.name)),
        ),
        Change::DropTrigger { name, .. } => out.push(
            PlanStmt::new(format!("DROP TRIGGER {}", ident(name)))
                .commented(format!("drop trigger named {name:?}")),
        ),
        Change::ModifyTrigger { from, to } => {
            out.push(PlanStmt::new(format!("DROP TRIGGER {}", ident(&from.name))));
            out.push(
                PlanStmt::new(to.def.clone())
                    .commented(format!("modify trigger named {:?}", to.name)),
            );
        }
        Change::RenameFunc { .. }
        | Change::RenameProc { .. }
        | Change::RenameTrigger { .. } => {
            return Err(Error::Unsupported(
                "mysql cannot rename routines or triggers in place".to_string(),
            ));
        }
        Change::AddObject(_) | Change::DropObject { .. } | Change::ModifyObject { .. } => {
            return Err(Error::Unsupported(
                "mysql has no schema-owned type objects".to_string(),
            ));
        }
    }
    Ok(())
}

fn lower_add_table(
    driver: &MySql,
    table: &Table,
    opts: &PlanOptions,
    out: &mut Vec<PlanStmt>,
) -> Result<()> {
    let target = qualified(opts, table.schema.as_deref(), &table.name);
    let mut parts = Vec::new();
    for column in &table.columns {
        guard_column(driver, column)?;
        parts.push(column_def(driver, column)?);
    }
    if let Some(pk) = &table.primary_key {
        parts.push(format!("PRIMARY KEY ({})", index_parts(pk)));
    }
    for fk in &table.foreign_keys {
        parts.push(fk_def(opts, fk));
    }
    for check in &table.checks {
        guard_check(driver)?;
        parts.push(check_def(check));
    }

    let mut sql = format!("CREATE TABLE {target} ({})", parts.join(", "));
    append_table_options(&mut sql, &table.attrs);
    out.push(
        PlanStmt::new(sql)
            .reversible(format!("DROP TABLE {target}"))
            .commented(format!("create {:?} table", table.name)),
    );

    for index in &table.indexes {
        guard_index(driver, index)?;
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
    driver: &MySql,
    table: &Table,
    changes: &[TableChange],
    opts: &PlanOptions,
    out: &mut Vec<PlanStmt>,
) -> Result<()> {
    let target = qualified(opts, table.schema.as_deref(), &table.name);

    if driver.flavor == Flavor::TiDb {
        // TiDB refuses multi-schema ALTER statements: one atomic ALTER per
        // change, stably ordered by priority.
        let mut ordered: Vec<&TableChange> = changes.iter().collect();
        ordered.sort_by_key(|change| tidb_priority(change));
        for change in ordered {
            let (clause, reverse) = alter_clause(driver, change)?;
            let mut stmt = PlanStmt::new(format!("ALTER TABLE {target} {clause}"))
                .commented(format!("modify {:?} table", table.name));
            if let Some(reverse) = reverse {
                stmt = stmt.reversible(format!("ALTER TABLE {target} {reverse}"));
            }
            out.push(stmt);
        }
        return Ok(());
    }

    let mut clauses = Vec::new();
    let mut reverses = Vec::new();
    let mut reversible = true;
    for change in changes {
        let (clause, reverse) = alter_clause(driver, change)?;
        clauses.push(clause);
        match reverse {
            Some(reverse) => reverses.push(reverse),
            None => reversible = false,
        }
    }

    let mut stmt = PlanStmt::new(format!("ALTER TABLE {target} {}", clauses.join(", ")))
        .commented(format!("modify {:?} table", table.name));
    if reversible && !reverses.is_empty() {
        reverses.reverse();
        stmt = stmt.reversible(format!("ALTER TABLE {target} {}", reverses.join(", ")));
    }
    out.push(stmt);
    Ok(())
}

/// TiDB atomic-ALTER ordering: added columns first so later clauses can
/// reference them, then constraint drops, index and key modifications, and
/// everything else. Equal priorities keep their input order.
fn tidb_priority(change: &TableChange) -> u8 {
    match change {
        TableChange::AddColumn(_) => 1,
        TableChange::DropIndex { .. }
        | TableChange::DropForeignKey { .. }
        | TableChange::DropAttr(_)
        | TableChange::DropCheck { .. } => 2,
        TableChange::ModifyIndex { .. } | TableChange::ModifyForeignKey { .. } => 3,
        _ => 4,
    }
}

/// One ALTER TABLE clause and its reverse, when a safe inverse exists.
fn alter_clause(driver: &MySql, change: &TableChange) -> Result<(String, Option<String>)> {
    Ok(match change {
        TableChange::AddColumn(column) => {
            guard_column(driver, column)?;
            (
                format!("ADD COLUMN {}", column_def(driver, column)?),
                Some(format!("DROP COLUMN {}", ident(&column.name))),
            )
        }
        TableChange::DropColumn { name } => (format!("DROP COLUMN {}", ident(name)), None),
        TableChange::ModifyColumn { from, to, .. } => {
            guard_column(driver, to)?;
            guard_auto_random_transition(driver, from, to)?;
            (
                format!("MODIFY COLUMN {}", column_def(driver, to)?),
                Some(format!("MODIFY COLUMN {}", column_def(driver, from)?)),
            )
        }
        TableChange::AddIndex(index) => {
            guard_index(driver, index)?;
            (
                format!("ADD {}", index_def(index)),
                Some(format!("DROP INDEX {}", ident(&index.name))),
            )
        }
        TableChange::DropIndex { name } => (format!("DROP INDEX {}", ident(name)), None),
        TableChange::ModifyIndex { from, to, .. } => {
            guard_index(driver, to)?;
            (
                format!("DROP INDEX {}, ADD {}", ident(&from.name), index_def(to)),
                Some(format!(
                    "DROP INDEX {}, ADD {}",
                    ident(&to.name),
                    index_def(from)
                )),
            )
        }
        TableChange::AddForeignKey(fk) => (
            format!("ADD {}", fk_def(&PlanOptions::default(), fk)),
            Some(format!("DROP FOREIGN KEY {}", ident(&fk.symbol))),
        ),
        TableChange::DropForeignKey { symbol } => {
            (format!("DROP FOREIGN KEY {}", ident(symbol)), None)
        }
        TableChange::ModifyForeignKey { from, to, .. } => (
            format!(
                "DROP FOREIGN KEY {}, ADD {}",
                ident(&from.symbol),
                fk_def(&PlanOptions::default(), to)
            ),
            Some(format!(
                "DROP FOREIGN KEY {}, ADD {}",
                ident(&to.symbol),
                fk_def(&PlanOptions::default(), from)
            )),
        ),
        TableChange::AddCheck(check) => {
            guard_check(driver)?;
            (
                format!("ADD {}", check_def(check)),
                Some(drop_check_clause(driver, &check.name)),
            )
        }
        TableChange::DropCheck { name } => (drop_check_clause(driver, name), None),
        TableChange::ModifyCheck { from, to } => {
            guard_check(driver)?;
            (
                format!(
                    "{}, ADD {}",
                    drop_check_clause(driver, &from.name),
                    check_def(to)
                ),
                Some(format!(
                    "{}, ADD {}",
                    drop_check_clause(driver, &to.name),
                    check_def(from)
                )),
            )
        }
        TableChange::AddAttr(attr) | TableChange::ModifyAttr { to: attr, .. } => {
            (table_attr_clause(attr)?, None)
        }
        TableChange::DropAttr(kind) => match kind {
            AttrKind::Comment => ("COMMENT ''".to_string(), None),
            other => {
                return Err(Error::Unsupported(format!(
                    "dropping table attribute {other:?}"
                )));
            }
        },
    })
}

fn table_attr_clause(attr: &Attr) -> Result<String> {
    Ok(match attr {
        Attr::Comment(comment) => format!("COMMENT '{}'", escape(comment)),
        Attr::AutoIncrement(Some(value)) => format!("AUTO_INCREMENT = {value}"),
        Attr::AutoIncrement(None) => {
            return Err(Error::Unsupported(
                "auto_increment table attribute without a value".to_string(),
            ));
        }
        Attr::Charset(charset) => format!("CHARACTER SET {charset}"),
        Attr::Collation(collation) => format!("COLLATE {collation}"),
        Attr::Engine(engine) => format!("ENGINE = {engine}"),
        other => {
            return Err(Error::Unsupported(format!(
                "table attribute {:?}",
                other.kind()
            )));
        }
    })
}

fn guard_column(driver: &MySql, column: &Column) -> Result<()> {
    if matches!(column.default, Some(DefaultValue::RawExpr(_)))
        && !driver.supports_expr_default()
        && !matches!(&column.ty.ty, Type::Time(_))
    {
        return Err(Error::UnsupportedVersion {
            feature: "expression column defaults".to_string(),
            version: driver.version.to_string(),
        });
    }
    if column
        .attrs
        .iter()
        .any(|attr| matches!(attr, Attr::AutoRandom { .. }))
    {
        if driver.flavor != Flavor::TiDb {
            return Err(Error::Unsupported(
                "auto_random columns require tidb".to_string(),
            ));
        }
        if !matches!(&column.ty.ty, Type::Integer(integer) if integer.t == "bigint") {
            return Err(Error::Unsupported(format!(
                "auto_random column {:?} must be bigint",
                column.name
            )));
        }
    }
    Ok(())
}

/// AUTO_RANDOM can be widened but never removed; upstream rejects the
/// removal, so the planner does too.
fn guard_auto_random_transition(_driver: &MySql, from: &Column, to: &Column) -> Result<()> {
    let had = attr::find(&from.attrs, AttrKind::AutoRandom).is_some();
    let has = attr::find(&to.attrs, AttrKind::AutoRandom).is_some();
    if had && !has {
        return Err(Error::Unsupported(format!(
            "removing auto_random from column {:?}",
            from.name
        )));
    }
    Ok(())
}

fn guard_check(driver: &MySql) -> Result<()> {
    if !driver.supports_check_constraints() {
        return Err(Error::UnsupportedVersion {
            feature: "check constraints".to_string(),
            version: driver.version.to_string(),
        });
    }
    Ok(())
}

fn guard_index(driver: &MySql, index: &Index) -> Result<()> {
    let functional = index
        .parts
        .iter()
        .any(|part| matches!(part.kind, PartKind::Expr(_)));
    if functional && !driver.supports_functional_indexes() {
        return Err(Error::UnsupportedVersion {
            feature: "functional indexes".to_string(),
            version: driver.version.to_string(),
        });
    }
    Ok(())
}

fn column_def(driver: &MySql, column: &Column) -> Result<String> {
    let mut sql = format!(
        "{} {}",
        ident(&column.name),
        types::format_type(&column.ty.ty)
            .unwrap_or_else(|_| column.ty.raw.clone())
    );

    if let Some(charset) = attr::charset(&column.attrs) {
        write!(sql, " CHARACTER SET {charset}").expect("write to string");
    }
    if let Some(collation) = attr::collation(&column.attrs) {
        write!(sql, " COLLATE {collation}").expect("write to string");
    }
    if let Some(generated) = &column.generated {
        let kind = match generated.kind {
            GeneratedKind::Stored => "STORED",
            GeneratedKind::Virtual => "VIRTUAL",
        };
        write!(sql, " GENERATED ALWAYS AS ({}) {kind}", generated.expr)
            .expect("write to string");
    }
    if !column.ty.nullable {
        sql.push_str(" NOT NULL");
    } else if matches!(&column.ty.ty, Type::Time(time) if time.t == "timestamp") {
        // Nullable timestamps need the explicit NULL to defeat the legacy
        // implicit NOT NULL behavior.
        sql.push_str(" NULL");
    }
    match &column.default {
        Some(DefaultValue::Literal(literal)) => {
            write!(sql, " DEFAULT {literal}").expect("write to string");
        }
        Some(DefaultValue::RawExpr(expr)) => {
            let needs_parens = driver.flavor != Flavor::MariaDb
                && !expr.to_ascii_lowercase().starts_with("current_timestamp")
                && !expr.starts_with('(');
            if needs_parens {
                write!(sql, " DEFAULT ({expr})").expect("write to string");
            } else {
                write!(sql, " DEFAULT {expr}").expect("write to string");
            }
        }
        None => {}
    }
    if let Some(Attr::OnUpdate(expr)) = attr::find(&column.attrs, AttrKind::OnUpdate) {
        write!(sql, " ON UPDATE {expr}").expect("write to string");
    }
    if attr::find(&column.attrs, AttrKind::AutoIncrement).is_some() {
        sql.push_str(" AUTO_INCREMENT");
    }
    if let Some(Attr::AutoRandom { shard_bits, range }) =
        attr::find(&column.attrs, AttrKind::AutoRandom)
    {
        if *range == 0 {
            write!(sql, " /*T![auto_rand] AUTO_RANDOM({shard_bits}) */")
                .expect("write to string");
        } else {
            write!(sql, " /*T![auto_rand] AUTO_RANDOM({shard_bits}, {range}) */")
                .expect("write to string");
        }
    }
    if let Some(comment) = attr::comment(&column.attrs) {
        write!(sql, " COMMENT '{}'", escape(comment)).expect("write to string");
    }

    Ok(sql)
}

fn index_def(index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let mut sql = format!(
        "{unique}INDEX {} ({})",
        ident(&index.name),
        index_parts(index)
    );
    if let Some(Attr::IndexType(IndexType::Hash)) = attr::find(&index.attrs, AttrKind::IndexType) {
        sql.push_str(" USING HASH");
    }
    if let Some(comment) = attr::comment(&index.attrs) {
        write!(sql, " COMMENT '{}'", escape(comment)).expect("write to string");
    }
    sql
}

fn create_index(target: &str, index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let mut sql = format!(
        "CREATE {unique}INDEX {} ON {target} ({})",
        ident(&index.name),
        index_parts(index)
    );
    if let Some(Attr::IndexType(IndexType::Hash)) = attr::find(&index.attrs, AttrKind::IndexType) {
        sql.push_str(" USING HASH");
    }
    sql
}

fn index_parts(index: &Index) -> String {
    index
        .parts
        .iter()
        .map(|part| {
            let mut rendered = match &part.kind {
                PartKind::Column(column) => ident(column),
                PartKind::Expr(expr) => format!("({expr})"),
            };
            if let Some(prefix) = part.prefix {
                rendered.push_str(&format!("({prefix})"));
            }
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
    let mut sql = format!("CONSTRAINT {} CHECK {expr}", ident(&check.name));
    if matches!(
        attr::find(&check.attrs, AttrKind::Enforced),
        Some(Attr::Enforced(false))
    ) {
        sql.push_str(" NOT ENFORCED");
    }
    sql
}

fn drop_check_clause(driver: &MySql, name: &str) -> String {
    // MariaDB predates the DROP CHECK spelling.
    if driver.flavor == Flavor::MariaDb {
        format!("DROP CONSTRAINT {}", ident(name))
    } else {
        format!("DROP CHECK {}", ident(name))
    }
}

fn append_table_options(sql: &mut String, attrs: &[Attr]) {
    if let Some(charset) = attr::charset(attrs) {
        write!(sql, " CHARACTER SET {charset}").expect("write to string");
    }
    if let Some(collation) = attr::collation(attrs) {
        write!(sql, " COLLATE {collation}").expect("write to string");
    }
    if let Some(Attr::Engine(engine)) = attr::find(attrs, AttrKind::Engine) {
        write!(sql, " ENGINE = {engine}").expect("write to string");
    }
    if let Some(Attr::AutoIncrement(Some(value))) = attr::find(attrs, AttrKind::AutoIncrement) {
        write!(sql, " AUTO_INCREMENT = {value}").expect("write to string");
    }
    if let Some(comment) = attr::comment(attrs) {
        write!(sql, " COMMENT '{}'", escape(comment)).expect("write to string");
    }
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
    format!("`{}`", name.replace('`', "``"))
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
