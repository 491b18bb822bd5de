use super::{Analyzer, Pass, Severity, table_rows};
use crate::{Change, Result, TableChange};

/// Flags schema, table, column, and index drops that would discard data.
/// With a dev connection the analyzer only reports drops on non-empty
/// tables; without one every drop is reported.
pub struct Destructive;

impl Analyzer for Destructive {
    fn name(&self) -> &'static str {
        "destructive"
    }

    fn analyze(&self, pass: &mut Pass<'_>) -> Result<()> {
        let mut findings = Vec::new();

        for stmt in &pass.file.stmts {
            for change in &stmt.changes {
                match change {
                    Change::DropSchema { name } => {
                        findings.push((stmt.pos, format!("dropping schema {name:?}")));
                    }
                    Change::DropTable { schema, name } => {
                        if occupied(pass, schema.as_deref(), name) {
                            findings.push((
                                stmt.pos,
                                format!("dropping non-empty table {name:?}"),
                            ));
                        }
                    }
                    Change::ModifyTable { table, changes } => {
                        for table_change in changes {
                            match table_change {
                                TableChange::DropColumn { name } => {
                                    if occupied(pass, table.schema.as_deref(), &table.name) {
                                        findings.push((
                                            stmt.pos,
                                            format!(
                                                "dropping column {name:?} from non-empty table {:?}",
                                                table.name
                                            ),
                                        ));
                                    }
                                }
                                TableChange::DropIndex { name } => {
                                    if occupied(pass, table.schema.as_deref(), &table.name) {
                                        findings.push((
                                            stmt.pos,
                                            format!(
                                                "dropping index {name:?} on non-empty table {:?}",
                                                table.name
                                            ),
                                        ));
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        for (pos, message) in findings {
            pass.report.push(pos, Severity::Error, message);
        }
        Ok(())
    }
}

fn occupied(pass: &mut Pass<'_>, schema: Option<&str>, table: &str) -> bool {
    match pass.dev.as_deref_mut() {
        Some(dev) => table_rows(dev, schema, table) > 0,
        // No dev database to emulate against: assume the worst.
        None => true,
    }
}
