mod adapter;
mod inspect;
mod plan;
mod revision;
mod types;

pub use adapter::SQLiteConn;
pub use revision::SQLiteRevisions;

use std::path::PathBuf;
use std::time::Duration;

use driftql_core::{
    Change, ConnectionConfig, Error, ExecQuerier, Result,
    diff::DiffDriver,
    driver::{CleanChecker, Driver, Lock, Locker, Restorer, Snapshoter, TypeParseFormatter},
    inspect::{InspectOptions, Inspector},
    migrate::{FlockLocker, Plan, PlanApplier, PlanOptions, RevisionIdent, ScanOptions},
    schema::{Realm, Schema, Type},
};

const PREFIX: &str = "sqlite";

/// The SQLite driver bundle. The engine has no advisory locks, so locking
/// goes through a PID-stamped lock file next to the database.
#[derive(Debug)]
pub struct SQLite {
    locker: FlockLocker,
}

impl SQLite {
    #[must_use]
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            locker: FlockLocker::new(lock_dir),
        }
    }

    pub fn connect(config: &ConnectionConfig) -> Result<(Self, SQLiteConn)> {
        let conn = adapter::connect(config)?;
        Ok((Self::new(conn.lock_dir()), conn))
    }
}

impl Inspector for SQLite {
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

impl DiffDriver for SQLite {
    /// Affinity comparison: spellings that parse to the same affinity class
    /// are not a type change.
    fn column_type_changed(
        &self,
        from: &driftql_core::schema::Column,
        to: &driftql_core::schema::Column,
    ) -> Result<bool> {
        if from.ty.raw.eq_ignore_ascii_case(&to.ty.raw) {
            return Ok(false);
        }
        Ok(types::parse_type(&from.ty.raw)? != types::parse_type(&to.ty.raw)?)
    }
}

impl PlanApplier for SQLite {
    fn plan_changes(&self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan> {
        plan::plan_changes(self, name, changes, opts).map_err(|error| error.prefixed(PREFIX))
    }
}

impl Locker for SQLite {
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

impl CleanChecker for SQLite {
    fn check_clean(
        &self,
        conn: &mut dyn ExecQuerier,
        revision_ident: Option<&RevisionIdent>,
    ) -> Result<()> {
        let schema = self.inspect_schema(conn, None, &InspectOptions::default())?;
        for table in &schema.tables {
            if !revision_ident.is_some_and(|ident| ident.name == table.name) {
                return Err(Error::NotClean {
                    state: "database".to_string(),
                    reason: format!("found table {:?}", table.name),
                }
                .prefixed(PREFIX));
            }
        }
        if let Some(view) = schema.views.first() {
            return Err(Error::NotClean {
                state: "database".to_string(),
                reason: format!("found view {:?}", view.name),
            }
            .prefixed(PREFIX));
        }
        Ok(())
    }
}

impl Snapshoter for SQLite {
    fn snapshot(&self, conn: &mut dyn ExecQuerier) -> Result<Box<dyn Restorer>> {
        self.check_clean(conn, None)?;
        Ok(Box::new(DropEverything))
    }
}

struct DropEverything;

impl Restorer for DropEverything {
    fn restore(&self, conn: &mut dyn ExecQuerier) -> Result<()> {
        let rows = conn.query(
            "SELECT name, type FROM sqlite_master \
             WHERE type IN ('table', 'view', 'trigger', 'index') AND name NOT LIKE 'sqlite_%' \
             ORDER BY CASE type WHEN 'trigger' THEN 0 WHEN 'view' THEN 1 WHEN 'index' THEN 2 ELSE 3 END",
            &[],
        )?;
        for row in rows {
            let name = row.text("name")?;
            let kind = row.text("type")?.to_ascii_uppercase();
            conn.exec(&format!("DROP {kind} IF EXISTS \"{name}\""), &[])?;
        }
        Ok(())
    }
}

impl TypeParseFormatter for SQLite {
    fn parse_type(&self, raw: &str) -> Result<Type> {
        types::parse_type(raw).map_err(|error| error.prefixed(PREFIX))
    }

    fn format_type(&self, ty: &Type) -> Result<String> {
        types::format_type(ty).map_err(|error| error.prefixed(PREFIX))
    }
}

impl Driver for SQLite {
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
        ScanOptions {
            match_begin: true,
            ..ScanOptions::default()
        }
    }
}
