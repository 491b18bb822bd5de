mod adapter;
mod diff;
mod inspect;
mod lock;
mod normalize;
mod plan;
pub mod queries;
mod revision;
mod snapshot;
mod types;

pub use adapter::PostgresConn;
pub use revision::PostgresRevisions;

use driftql_core::{
    Change, ConnectionConfig, Error, ExecQuerier, Result, Version,
    diff::DiffDriver,
    driver::{CleanChecker, Driver, Locker, Normalizer, Snapshoter, TypeParseFormatter},
    inspect::{InspectOptions, Inspector},
    migrate::{Plan, PlanApplier, PlanOptions, ScanOptions},
    schema::{Realm, Schema, Type},
};

const PREFIX: &str = "postgres";

/// The PostgreSQL driver bundle.
#[derive(Debug, Clone)]
pub struct Postgres {
    version: Version,
}

impl Postgres {
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// Connects and reads `server_version` for version-gated behavior.
    pub fn connect(config: &ConnectionConfig) -> Result<(Self, PostgresConn)> {
        let mut conn = adapter::connect(config)?;
        let raw = conn
            .query(queries::SELECT_VERSION, &[])?
            .first()
            .and_then(|row| row.opt_text("server_version").ok().flatten())
            .ok_or_else(|| {
                Error::Internal("server returned no version".to_string()).prefixed(PREFIX)
            })?;
        let version = parse_server_version(&raw).ok_or_else(|| {
            Error::Internal(format!("unparsable server version {raw:?}")).prefixed(PREFIX)
        })?;
        Ok((Self::new(version), conn))
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }
}

impl Inspector for Postgres {
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

impl PlanApplier for Postgres {
    fn plan_changes(&self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan> {
        plan::plan_changes(self, name, changes, opts).map_err(|error| error.prefixed(PREFIX))
    }
}

impl TypeParseFormatter for Postgres {
    fn parse_type(&self, raw: &str) -> Result<Type> {
        types::parse_type(raw).map_err(|error| error.prefixed(PREFIX))
    }

    fn format_type(&self, ty: &Type) -> Result<String> {
        types::format_type(ty).map_err(|error| error.prefixed(PREFIX))
    }
}

impl Driver for Postgres {
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
            match_begin_atomic: true,
            match_dollar_quote: true,
            ..ScanOptions::default()
        }
    }

    fn normalizer(&self) -> Option<&dyn Normalizer> {
        Some(self)
    }

    // Postgres rejects adding a NOT NULL column without a default when rows
    // exist; there is no implicit fill, so the default `implicit_default`
    // (None) is correct.
}

fn parse_server_version(raw: &str) -> Option<Version> {
    let numeric = raw
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .find(|part| !part.is_empty())?;
    let mut parts = numeric.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some(Version::new(major, minor, 0))
}
