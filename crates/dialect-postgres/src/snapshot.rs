use driftql_core::{
    Error, ExecQuerier, Result,
    driver::{CleanChecker, Restorer, Snapshoter},
    inspect::{InspectOptions, Inspector as _},
    migrate::RevisionIdent,
    schema::Schema,
};

use crate::Postgres;

/// Clean-state policy: every visible schema must be empty modulo the
/// revision table, and only `public` or the revision schema may exist at
/// all.
impl CleanChecker for Postgres {
    fn check_clean(
        &self,
        conn: &mut dyn ExecQuerier,
        revision_ident: Option<&RevisionIdent>,
    ) -> Result<()> {
        let realm = self.inspect_realm(conn, &InspectOptions::default())?;
        for schema in &realm.schemas {
            let revision_schema =
                revision_ident.is_some_and(|ident| ident.schema == schema.name);
            if schema.name != "public" && !revision_schema {
                return Err(Error::NotClean {
                    state: "database".to_string(),
                    reason: format!("found schema {:?}", schema.name),
                });
            }
            check_schema_clean(schema, revision_ident)?;
        }
        Ok(())
    }
}

fn check_schema_clean(schema: &Schema, revision_ident: Option<&RevisionIdent>) -> Result<()> {
    for table in &schema.tables {
        if !revision_ident.is_some_and(|ident| ident.name == table.name) {
            return Err(Error::NotClean {
                state: format!("schema {:?}", schema.name),
                reason: format!("found table {:?}", table.name),
            });
        }
    }
    let offender = schema
        .views
        .first()
        .map(|view| format!("view {:?}", view.name))
        .or_else(|| {
            schema
                .enums
                .first()
                .map(|enum_type| format!("enum type {:?}", enum_type.name))
        })
        .or_else(|| {
            schema
                .funcs
                .first()
                .map(|func| format!("function {:?}", func.name))
        });
    if let Some(reason) = offender {
        return Err(Error::NotClean {
            state: format!("schema {:?}", schema.name),
            reason: format!("found {reason}"),
        });
    }
    Ok(())
}

impl Snapshoter for Postgres {
    fn snapshot(&self, conn: &mut dyn ExecQuerier) -> Result<Box<dyn Restorer>> {
        self.check_clean(conn, None)?;
        Ok(Box::new(DropRestorer {
            driver: self.clone(),
        }))
    }
}

struct DropRestorer {
    driver: Postgres,
}

impl Restorer for DropRestorer {
    /// Recomputes the drops from a fresh inspection, so repeated restores
    /// converge on the same empty state.
    fn restore(&self, conn: &mut dyn ExecQuerier) -> Result<()> {
        let realm = self.driver.inspect_realm(conn, &InspectOptions::default())?;
        for schema in &realm.schemas {
            if schema.name == "public" {
                for table in &schema.tables {
                    conn.exec(
                        &format!("DROP TABLE \"public\".\"{}\" CASCADE", table.name),
                        &[],
                    )?;
                }
                for view in &schema.views {
                    conn.exec(
                        &format!("DROP VIEW IF EXISTS \"public\".\"{}\" CASCADE", view.name),
                        &[],
                    )?;
                }
                for enum_type in &schema.enums {
                    conn.exec(
                        &format!("DROP TYPE \"public\".\"{}\"", enum_type.name),
                        &[],
                    )?;
                }
            } else {
                conn.exec(&format!("DROP SCHEMA \"{}\" CASCADE", schema.name), &[])?;
            }
        }
        Ok(())
    }
}
