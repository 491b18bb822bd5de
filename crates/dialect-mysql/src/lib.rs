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

pub use adapter::MySqlConn;
pub use revision::MySqlRevisions;

use driftql_core::{
    Change, ConnectionConfig, Error, ExecQuerier, Result, Version,
    diff::DiffDriver,
    driver::{CleanChecker, Driver, Locker, Normalizer, Snapshoter, TypeParseFormatter},
    inspect::{InspectOptions, Inspector},
    migrate::{Plan, PlanApplier, PlanOptions, ScanOptions},
    schema::{Column, Realm, Schema, Type},
};

/// Server family behind the MySQL wire protocol. Version gates and DDL
/// spellings differ across the three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    MySql,
    MariaDb,
    TiDb,
}

/// The MySQL/MariaDB/TiDB driver bundle.
#[derive(Debug, Clone)]
pub struct MySql {
    pub(crate) flavor: Flavor,
    pub(crate) version: Version,
    pub(crate) explicit_defaults_for_timestamp: bool,
}

impl MySql {
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self {
            flavor: Flavor::MySql,
            version,
            explicit_defaults_for_timestamp: true,
        }
    }

    #[must_use]
    pub fn mariadb(version: Version) -> Self {
        Self {
            flavor: Flavor::MariaDb,
            version,
            explicit_defaults_for_timestamp: false,
        }
    }

    #[must_use]
    pub fn tidb(version: Version) -> Self {
        Self {
            flavor: Flavor::TiDb,
            version,
            explicit_defaults_for_timestamp: true,
        }
    }

    /// Connects and sniffs the server: flavor and version from
    /// `SELECT VERSION()`, timestamp-default behavior from the server
    /// variable rather than the version string.
    pub fn connect(config: &ConnectionConfig) -> Result<(Self, MySqlConn)> {
        let mut conn = adapter::connect(config)?;
        let raw_version = conn
            .query(queries::SELECT_VERSION, &[])?
            .first()
            .and_then(|row| row.opt_text("version").ok().flatten())
            .ok_or_else(|| Error::Internal("server returned no version".to_string()).prefixed("mysql"))?;

        let flavor = sniff_flavor(&raw_version);
        let version = parse_server_version(&raw_version).ok_or_else(|| {
            Error::Internal(format!("unparsable server version {raw_version:?}")).prefixed("mysql")
        })?;

        let mut driver = match flavor {
            Flavor::MySql => Self::new(version),
            Flavor::MariaDb => Self::mariadb(version),
            Flavor::TiDb => Self::tidb(version),
        };
        if let Ok(rows) = conn.query(queries::SELECT_VARIABLES, &[])
            && let Some(row) = rows.first()
            && let Ok(explicit) = row.bool("explicit_defaults")
        {
            driver.explicit_defaults_for_timestamp = explicit;
        }
        Ok((driver, conn))
    }

    #[must_use]
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    pub(crate) fn supports_check_constraints(&self) -> bool {
        match self.flavor {
            Flavor::MySql => self.version.at_least(8, 0, 16),
            Flavor::MariaDb => self.version.at_least(10, 2, 1),
            Flavor::TiDb => false,
        }
    }

    pub(crate) fn supports_expr_default(&self) -> bool {
        match self.flavor {
            Flavor::MySql => self.version.at_least(8, 0, 13),
            Flavor::MariaDb => self.version.at_least(10, 2, 1),
            Flavor::TiDb => false,
        }
    }

    pub(crate) fn supports_functional_indexes(&self) -> bool {
        match self.flavor {
            Flavor::MySql => self.version.at_least(8, 0, 13),
            Flavor::MariaDb | Flavor::TiDb => false,
        }
    }

    fn prefix(&self) -> &'static str {
        match self.flavor {
            Flavor::MySql => "mysql",
            Flavor::MariaDb => "mariadb",
            Flavor::TiDb => "tidb",
        }
    }
}

impl Inspector for MySql {
    fn inspect_realm(&self, conn: &mut dyn ExecQuerier, opts: &InspectOptions) -> Result<Realm> {
        inspect::inspect_realm(self, conn, opts).map_err(|error| error.prefixed(self.prefix()))
    }

    fn inspect_schema(
        &self,
        conn: &mut dyn ExecQuerier,
        name: Option<&str>,
        opts: &InspectOptions,
    ) -> Result<Schema> {
        inspect::inspect_schema(self, conn, name, opts)
            .map_err(|error| error.prefixed(self.prefix()))
    }
}

impl PlanApplier for MySql {
    fn plan_changes(&self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan> {
        plan::plan_changes(self, name, changes, opts)
            .map_err(|error| error.prefixed(self.prefix()))
    }
}

impl TypeParseFormatter for MySql {
    fn parse_type(&self, raw: &str) -> Result<Type> {
        types::parse_type(raw).map_err(|error| error.prefixed(self.prefix()))
    }

    fn format_type(&self, ty: &Type) -> Result<String> {
        types::format_type(ty).map_err(|error| error.prefixed(self.prefix()))
    }
}

impl Driver for MySql {
    fn name(&self) -> &'static str {
        self.prefix()
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
            backslash_escapes: true,
            ..ScanOptions::default()
        }
    }

    fn normalizer(&self) -> Option<&dyn Normalizer> {
        Some(self)
    }

    /// The value the server writes into existing rows when a NOT NULL
    /// column arrives without a default: empty string for character data,
    /// zero for numbers, the first value for enums, and for timestamps
    /// either `CURRENT_TIMESTAMP` or the zero timestamp depending on
    /// `explicit_defaults_for_timestamp`.
    fn implicit_default(&self, column: &Column) -> Option<String> {
        match &column.ty.ty {
            Type::String(_) | Type::Binary(_) | Type::Set(_) => Some("''".to_string()),
            Type::Integer(_) | Type::Decimal(_) | Type::Float(_) | Type::Bit(_) | Type::Bool => {
                Some("0".to_string())
            }
            Type::Enum(enum_ref) => enum_ref
                .values
                .first()
                .map(|value| format!("'{value}'")),
            Type::Time(time) if time.t == "timestamp" => {
                if self.explicit_defaults_for_timestamp {
                    Some("'0000-00-00 00:00:00'".to_string())
                } else {
                    Some("CURRENT_TIMESTAMP".to_string())
                }
            }
            Type::Time(time) if time.t == "date" => Some("'0000-00-00'".to_string()),
            Type::Time(time) if time.t == "datetime" => {
                Some("'0000-00-00 00:00:00'".to_string())
            }
            Type::Time(time) if time.t == "year" => Some("0".to_string()),
            Type::Time(_) => Some("'00:00:00'".to_string()),
            _ => None,
        }
    }
}

fn sniff_flavor(raw: &str) -> Flavor {
    let lowered = raw.to_ascii_lowercase();
    if lowered.contains("tidb") {
        Flavor::TiDb
    } else if lowered.contains("mariadb") {
        Flavor::MariaDb
    } else {
        Flavor::MySql
    }
}

/// Parses `8.0.33`, `10.6.12-MariaDB`, or `5.7.25-TiDB-v6.5.0` into the
/// leading dotted triple.
fn parse_server_version(raw: &str) -> Option<Version> {
    // TiDB embeds its own version after the protocol version.
    if let Some(position) = raw.to_ascii_lowercase().find("tidb-v") {
        let tail = &raw[position + "tidb-v".len()..];
        if let Some(version) = parse_dotted(tail) {
            return Some(version);
        }
    }
    parse_dotted(raw)
}

fn parse_dotted(raw: &str) -> Option<Version> {
    let numeric = raw
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .find(|part| !part.is_empty())?;
    let mut parts = numeric.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some(Version::new(major, minor, patch))
}
