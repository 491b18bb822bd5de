//! Cloud Spanner driver. The dialect logic (types, inspection over
//! INFORMATION_SCHEMA, DDL planning) is written purely against the
//! `ExecQuerier` capability; a concrete wire client is supplied by the
//! caller, the same way the revision store receives its connection.

mod inspect;
mod plan;
mod types;

use std::path::PathBuf;
use std::time::Duration;

use driftql_core::{
    Change, ExecQuerier, Result,
    diff::DiffDriver,
    driver::{CleanChecker, Driver, Lock, Locker, Restorer, Snapshoter, TypeParseFormatter},
    inspect::{InspectOptions, Inspector},
    migrate::{FlockLocker, Plan, PlanApplier, PlanOptions, RevisionIdent, ScanOptions},
    schema::{Column, Realm, Schema, Type},
};

const PREFIX: &str = "spanner";

/// The Spanner driver bundle. Spanner has no advisory locks; callers point
/// the driver at a directory for the PID-stamped lock file, the same
/// arrangement as SQLite.
#[derive(Debug)]
pub struct Spanner {
    locker: FlockLocker,
}

impl Spanner {
    #[must_use]
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            locker: FlockLocker::new(lock_dir),
        }
    }
}

impl Inspector for Spanner {
    fn inspect_realm(&self, conn: &mut dyn ExecQuerier, opts: &InspectOptions) -> Result<Realm> {
        inspect::inspect_realm(self, conn, opts).map_err(|error| error.prefixed(PREFIX))
    }

    fn inspect_schema(
        &self,
        conn: &mut dyn ExecQuerier,
        name: Option<&str>,
        opts: &InspectOptions,
    ) -> Result<Schema> {
        inspect::inspect_schema(self, conn, name, opts).map_err(|error| error.prefixed(PREFIX))
    }
}

impl DiffDriver for Spanner {
    fn column_type_changed(&self, from: &Column, to: &Column) -> Result<bool> {
        if from.ty.raw.eq_ignore_ascii_case(&to.ty.raw) {
            return Ok(false);
        }
        Ok(types::parse_type(&from.ty.raw)? != types::parse_type(&to.ty.raw)?)
    }
}

impl PlanApplier for Spanner {
    fn plan_changes(&self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan> {
        plan::plan_changes(self, name, changes, opts).map_err(|error| error.prefixed(PREFIX))
    }
}

impl Locker for Spanner {
    fn lock(
        &self,
        conn: &mut dyn ExecQuerier,
        name: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Lock>> {
        self.locker
            .lock(conn, name, timeout)
            .map_err(|error| error.prefixed(PREFIX))
    }
}

impl CleanChecker for Spanner {
    fn check_clean(
        &self,
        conn: &mut dyn ExecQuerier,
        revision_ident: Option<&RevisionIdent>,
    ) -> Result<()> {
        let schema = self.inspect_schema(conn, None, &InspectOptions::default())?;
        for table in &schema.tables {
            if !revision_ident.is_some_and(|ident| ident.name == table.name) {
                return Err(driftql_core::Error::NotClean {
                    state: "database".to_string(),
                    reason: format!("found table {:?}", table.name),
                }
                .prefixed(PREFIX));
            }
        }
        Ok(())
    }
}

impl Snapshoter for Spanner {
    fn snapshot(&self, conn: &mut dyn ExecQuerier) -> Result<Box<dyn Restorer>> {
        self.check_clean(conn, None)?;
        Ok(Box::new(DropTables))
    }
}

struct DropTables;

impl Restorer for DropTables {
    fn restore(&self, conn: &mut dyn ExecQuerier) -> Result<()> {
        let rows = conn.query(inspect::SELECT_TABLES, &[])?;
        for row in rows {
            let name = row.text("table_name")?;
            conn.exec(&format!("DROP TABLE {name}"), &[])?;
        }
        Ok(())
    }
}

impl TypeParseFormatter for Spanner {
    fn parse_type(&self, raw: &str) -> Result<Type> {
        types::parse_type(raw).map_err(|error| error.prefixed(PREFIX))
    }

    fn format_type(&self, ty: &Type) -> Result<String> {
        types::format_type(ty).map_err(|error| error.prefixed(PREFIX))
    }
}

impl Driver for Spanner {
    fn name(&self) -> &'static str {
        PREFIX
    }

    fn inspector(&self) -> &dyn Inspector {
        self
    }

    fn diff_driver(&self) -> &dyn DiffDriver {
        self
    }

    fn plan_applier(&self) -> &dyn PlanApplier {
        self
    }

    fn locker(&self) -> &dyn Locker {
        self
    }

    fn snapshoter(&self) -> &dyn Snapshoter {
        self
    }

    fn clean_checker(&self) -> &dyn CleanChecker {
        self
    }

    fn types(&self) -> &dyn TypeParseFormatter {
        self
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions::default()
    }
}
