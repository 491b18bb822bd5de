use driftql_core::{
    Error, ExecQuerier, Result,
    driver::{CleanChecker, Restorer, Snapshoter},
    inspect::{InspectOptions, Inspector as _},
    migrate::RevisionIdent,
    schema::Schema,
};
use tracing::debug;

use crate::{MySql, queries};

/// Clean-state policy: the connected schema (or, without a current schema,
/// the whole realm) may contain nothing but the revision table.
impl CleanChecker for MySql {
    fn check_clean(
        &self,
        conn: &mut dyn ExecQuerier,
        revision_ident: Option<&RevisionIdent>,
    ) -> Result<()> {
        match current_schema(conn)? {
            Some(name) => {
                let schema = self.inspect_schema(conn, Some(&name), &InspectOptions::default())?;
                check_schema_clean(&schema, revision_ident)
            }
            None => {
                let realm = self.inspect_realm(conn, &InspectOptions::default())?;
                for schema in &realm.schemas {
                    if revision_ident.is_some_and(|ident| ident.schema == schema.name) {
                        check_schema_clean(schema, revision_ident)?;
                        continue;
                    }
                    return Err(Error::NotClean {
                        state: "database".to_string(),
                        reason: format!("found schema {:?}", schema.name),
                    });
                }
                Ok(())
            }
        }
    }
}

fn check_schema_clean(schema: &Schema, revision_ident: Option<&RevisionIdent>) -> Result<()> {
    for table in &schema.tables {
        let exempt = revision_ident.is_some_and(|ident| ident.name == table.name);
        if !exempt {
            return Err(Error::NotClean {
                state: format!("schema {:?}", schema.name),
                reason: format!("found table {:?}", table.name),
            });
        }
    }
    if let Some(view) = schema.views.first() {
        return Err(Error::NotClean {
            state: format!("schema {:?}", schema.name),
            reason: format!("found view {:?}", view.name),
        });
    }
    if let Some(func) = schema.funcs.first() {
        return Err(Error::NotClean {
            state: format!("schema {:?}", schema.name),
            reason: format!("found function {:?}", func.name),
        });
    }
    if let Some(proc) = schema.procs.first() {
        return Err(Error::NotClean {
            state: format!("schema {:?}", schema.name),
            reason: format!("found procedure {:?}", proc.name),
        });
    }
    Ok(())
}

impl Snapshoter for MySql {
    /// Refuses unless the target is clean, then hands back a restorer that
    /// drops whatever has been created since. Restoring twice is a no-op by
    /// construction: the drops are recomputed from a fresh inspection.
    fn snapshot(&self, conn: &mut dyn ExecQuerier) -> Result<Box<dyn Restorer>> {
        self.check_clean(conn, None)?;
        Ok(Box::new(DropRestorer {
            driver: self.clone(),
            schema: current_schema(conn)?,
        }))
    }
}

struct DropRestorer {
    driver: MySql,
    schema: Option<String>,
}

impl Restorer for DropRestorer {
    fn restore(&self, conn: &mut dyn ExecQuerier) -> Result<()> {
        match &self.schema {
            Some(name) => {
                let schema =
                    self.driver
                        .inspect_schema(conn, Some(name), &InspectOptions::default())?;
                drop_schema_objects(conn, &schema)
            }
            None => {
                let realm = self.driver.inspect_realm(conn, &InspectOptions::default())?;
                for schema in &realm.schemas {
                    debug!(schema = %schema.name, "dropping schema during restore");
                    conn.exec(&format!("DROP DATABASE `{}`", schema.name), &[])?;
                }
                Ok(())
            }
        }
    }
}

fn drop_schema_objects(conn: &mut dyn ExecQuerier, schema: &Schema) -> Result<()> {
    for view in &schema.views {
        conn.exec(
            &format!("DROP VIEW `{}`.`{}`", schema.name, view.name),
            &[],
        )?;
    }
    for trigger in &schema.triggers {
        conn.exec(&format!("DROP TRIGGER `{}`", trigger.name), &[])?;
    }
    if !schema.tables.is_empty() {
        // Foreign keys between doomed tables do not matter once the checks
        // are off for the session.
        conn.exec("SET FOREIGN_KEY_CHECKS = 0", &[])?;
        for table in &schema.tables {
            conn.exec(
                &format!("DROP TABLE `{}`.`{}`", schema.name, table.name),
                &[],
            )?;
        }
        conn.exec("SET FOREIGN_KEY_CHECKS = 1", &[])?;
    }
    for func in &schema.funcs {
        conn.exec(&format!("DROP FUNCTION `{}`", func.name), &[])?;
    }
    for proc in &schema.procs {
        conn.exec(&format!("DROP PROCEDURE `{}`", proc.name), &[])?;
    }
    Ok(())
}

fn current_schema(conn: &mut dyn ExecQuerier) -> Result<Option<String>> {
    let rows = conn.query(queries::SELECT_CURRENT_SCHEMA, &[])?;
    Ok(rows
        .first()
        .and_then(|row| row.opt_text("schema_name").ok().flatten()))
}
