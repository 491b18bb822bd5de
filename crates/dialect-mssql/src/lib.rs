mod adapter;
mod inspect;
mod lock;
mod plan;
pub mod queries;
mod revision;
mod types;

pub use adapter::MssqlConn;
pub use revision::MssqlRevisions;

use driftql_core::{
    Change, ConnectionConfig, Error, ExecQuerier, Result, Version,
    diff::DiffDriver,
    driver::{CleanChecker, Driver, Locker, Restorer, Snapshoter, TypeParseFormatter},
    inspect::{InspectOptions, Inspector},
    migrate::{Plan, PlanApplier, PlanOptions, RevisionIdent, ScanOptions},
    schema::{Column, DefaultValue, Realm, Schema, Type},
};

const PREFIX: &str = "mssql";

/// The SQL Server driver bundle.
#[derive(Debug, Clone)]
pub struct Mssql {
    version: Version,
}

impl Mssql {
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    pub fn connect(config: &ConnectionConfig) -> Result<(Self, MssqlConn)> {
        let mut conn = adapter::connect(config)?;
        let raw = conn
            .query(queries::SELECT_VERSION, &[])?
            .first()
            .and_then(|row| row.opt_text("version").ok().flatten())
            .unwrap_or_default();
        let version = parse_server_version(&raw).unwrap_or(Version::new(15, 0, 0));
        Ok((Self::new(version), conn))
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }
}

impl Inspector for Mssql {
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

impl DiffDriver for Mssql {
    fn column_type_changed(&self, from: &Column, to: &Column) -> Result<bool> {
        if from.ty.raw.eq_ignore_ascii_case(&to.ty.raw) {
            return Ok(false);
        }
        Ok(types::parse_type(&from.ty.raw)? != types::parse_type(&to.ty.raw)?)
    }

    fn defaults_equal(&self, from: Option<&DefaultValue>, to: Option<&DefaultValue>) -> bool {
        fn shape(default: &DefaultValue) -> (bool, String) {
            match default {
                DefaultValue::Literal(literal) => (false, literal.trim().to_string()),
                DefaultValue::RawExpr(expr) => (true, expr.trim().to_ascii_lowercase()),
            }
        }
        match (from, to) {
            (None, None) => true,
            (Some(before), Some(after)) => shape(before) == shape(after),
            _ => false,
        }
    }
}

impl PlanApplier for Mssql {
    fn plan_changes(&self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan> {
        plan::plan_changes(self, name, changes, opts).map_err(|error| error.prefixed(PREFIX))
    }
}

impl CleanChecker for Mssql {
    fn check_clean(
        &self,
        conn: &mut dyn ExecQuerier,
        revision_ident: Option<&RevisionIdent>,
    ) -> Result<()> {
        let realm = self.inspect_realm(conn, &InspectOptions::default())?;
        for schema in &realm.schemas {
            let revision_schema =
                revision_ident.is_some_and(|ident| ident.schema == schema.name);
            if schema.name != "dbo" && !revision_schema {
                return Err(Error::NotClean {
                    state: "database".to_string(),
                    reason: format!("found schema {:?}", schema.name),
                }
                .prefixed(PREFIX));
            }
            for table in &schema.tables {
                if !revision_ident.is_some_and(|ident| ident.name == table.name) {
                    return Err(Error::NotClean {
                        state: format!("schema {:?}", schema.name),
                        reason: format!("found table {:?}", table.name),
                    }
                    .prefixed(PREFIX));
                }
            }
            if let Some(view) = schema.views.first() {
                return Err(Error::NotClean {
                    state: format!("schema {:?}", schema.name),
                    reason: format!("found view {:?}", view.name),
                }
                .prefixed(PREFIX));
            }
        }
        Ok(())
    }
}

impl Snapshoter for Mssql {
    fn snapshot(&self, conn: &mut dyn ExecQuerier) -> Result<Box<dyn Restorer>> {
        self.check_clean(conn, None)?;
        Ok(Box::new(DropRestorer {
            driver: self.clone(),
        }))
    }
}

struct DropRestorer {
    driver: Mssql,
}

impl Restorer for DropRestorer {
    fn restore(&self, conn: &mut dyn ExecQuerier) -> Result<()> {
        let realm = self.driver.inspect_realm(conn, &InspectOptions::default())?;
        for schema in &realm.schemas {
            for view in &schema.views {
                conn.exec(
                    &format!("DROP VIEW [{}].[{}]", schema.name, view.name),
                    &[],
                )?;
            }
            for table in &schema.tables {
                conn.exec(
                    &format!("DROP TABLE [{}].[{}]", schema.name, table.name),
                    &[],
                )?;
            }
            if schema.name != "dbo" {
                conn.exec(&format!("DROP SCHEMA [{}]", schema.name), &[])?;
            }
        }
        Ok(())
    }
}

impl TypeParseFormatter for Mssql {
    fn parse_type(&self, raw: &str) -> Result<Type> {
        types::parse_type(raw).map_err(|error| error.prefixed(PREFIX))
    }

    fn format_type(&self, ty: &Type) -> Result<String> {
        types::format_type(ty).map_err(|error| error.prefixed(PREFIX))
    }
}

impl Driver for Mssql {
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

fn parse_server_version(raw: &str) -> Option<Version> {
    let mut parts = raw.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some(Version::new(major, minor, patch))
}
