use super::{Analyzer, Pass, Severity};
use crate::{
    Change, ColumnChange, Result, TableChange,
    schema::{Column, Type},
};

/// Flags changes whose effect depends on the rows already present:
/// required columns added without a default, narrowing size or precision
/// modifications, and type family changes.
pub struct DataDependent;

impl Analyzer for DataDependent {
    fn name(&self) -> &'static str {
        "data-dependent"
    }

    fn analyze(&self, pass: &mut Pass<'_>) -> Result<()> {
        let mut findings = Vec::new();

        for stmt in &pass.file.stmts {
            for change in &stmt.changes {
                let Change::ModifyTable { table, changes } = change else {
                    continue;
                };
                for table_change in changes {
                    match table_change {
                        TableChange::AddColumn(column) => {
                            if let Some(message) = self.added_column_finding(pass, table.name.as_str(), column) {
                                findings.push((stmt.pos, message));
                            }
                        }
                        TableChange::ModifyColumn { from, to, kinds } => {
                            if kinds.contains(ColumnChange::Type) {
                                if let Some(message) = modified_type_finding(&table.name, from, to) {
                                    findings.push((stmt.pos, message));
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        for (pos, message) in findings {
            pass.report.push(pos, Severity::Warning, message);
        }
        Ok(())
    }
}

impl DataDependent {
    fn added_column_finding(
        &self,
        pass: &Pass<'_>,
        table: &str,
        column: &Column,
    ) -> Option<String> {
        if column.ty.nullable || column.default.is_some() || column.generated.is_some() {
            return None;
        }
        match pass.driver.implicit_default(column) {
            Some(fill) => Some(format!(
                "adding NOT NULL column {:?} to table {table:?} implicitly sets existing rows with {fill}",
                column.name
            )),
            None => Some(format!(
                "adding NOT NULL column {:?} to table {table:?} without a default fails when rows exist",
                column.name
            )),
        }
    }
}

fn modified_type_finding(table: &str, from: &Column, to: &Column) -> Option<String> {
    if from.ty.ty.family_differs(&to.ty.ty) {
        return Some(format!(
            "changing type of column {:?} on table {table:?} from {:?} to {:?} may alter or reject existing rows",
            from.name, from.ty.raw, to.ty.raw
        ));
    }

    match (&from.ty.ty, &to.ty.ty) {
        (Type::String(before), Type::String(after)) => {
            if narrowed(before.size, after.size) {
                return Some(format!(
                    "narrowing column {:?} on table {table:?} from {:?} to {:?} may truncate values",
                    from.name, from.ty.raw, to.ty.raw
                ));
            }
        }
        (Type::Decimal(before), Type::Decimal(after)) => {
            if after.precision < before.precision || after.scale < before.scale {
                return Some(format!(
                    "reducing precision of column {:?} on table {table:?} from {:?} to {:?} may overflow existing values",
                    from.name, from.ty.raw, to.ty.raw
                ));
            }
        }
        (Type::Integer(before), Type::Integer(after)) => {
            if integer_rank(&after.t) < integer_rank(&before.t)
                || (before.unsigned && !after.unsigned)
            {
                return Some(format!(
                    "shrinking integer column {:?} on table {table:?} from {:?} to {:?} may overflow existing values",
                    from.name, from.ty.raw, to.ty.raw
                ));
            }
        }
        _ => {}
    }
    None
}

fn narrowed(before: Option<i64>, after: Option<i64>) -> bool {
    match (before, after) {
        // MAX (-1) never narrows; shrinking to a bounded size from MAX does.
        (Some(-1), Some(after)) => after != -1,
        (Some(before), Some(after)) => after != -1 && after < before,
        (None, Some(_)) => false,
        _ => false,
    }
}

fn integer_rank(t: &str) -> u8 {
    match t.to_ascii_lowercase().as_str() {
        "tinyint" | "int1" => 1,
        "smallint" | "int2" => 2,
        "mediumint" | "int3" => 3,
        "int" | "integer" | "int4" => 4,
        "bigint" | "int8" => 5,
        _ => 4,
    }
}
