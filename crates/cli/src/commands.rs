use std::path::PathBuf;
use std::time::Duration;

use driftql_core::{
    Change, ExecQuerier, Orchestrator,
    driver::Driver,
    inspect::InspectOptions,
    migrate::{ApplyOptions, LocalDir, RevisionReadWriter, TxMode},
    schema::Realm,
    sqlcheck::default_analyzers,
};

use crate::error_presentation::{CliError, CliResult};
use crate::url::{ParsedUrl, parse};
use crate::{MigrateCommand, SchemaCommand};

/// A connected dialect bundle: the driver, its live connection, and the
/// revision store persisted on that connection.
struct Target {
    driver: Box<dyn Driver>,
    conn: Box<dyn ExecQuerier>,
    revisions: Box<dyn RevisionReadWriter>,
}

fn connect(url: &str) -> CliResult<Target> {
    let ParsedUrl { scheme, config } = parse(url)?;
    match scheme.as_str() {
        #[cfg(feature = "mysql")]
        "mysql" | "mariadb" | "tidb" => {
            let (driver, conn) = driftql_dialect_mysql::MySql::connect(&config)?;
            Ok(Target {
                driver: Box::new(driver),
                conn: Box::new(conn),
                revisions: Box::new(driftql_dialect_mysql::MySqlRevisions::new(None)),
            })
        }
        #[cfg(feature = "postgres")]
        "postgres" | "postgresql" => {
            let (driver, conn) = driftql_dialect_postgres::Postgres::connect(&config)?;
            Ok(Target {
                driver: Box::new(driver),
                conn: Box::new(conn),
                revisions: Box::new(driftql_dialect_postgres::PostgresRevisions::new(None)),
            })
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let (driver, conn) = driftql_dialect_sqlite::SQLite::connect(&config)?;
            Ok(Target {
                driver: Box::new(driver),
                conn: Box::new(conn),
                revisions: Box::new(driftql_dialect_sqlite::SQLiteRevisions::new()),
            })
        }
        #[cfg(feature = "mssql")]
        "sqlserver" | "mssql" => {
            let (driver, conn) = driftql_dialect_mssql::Mssql::connect(&config)?;
            Ok(Target {
                driver: Box::new(driver),
                conn: Box::new(conn),
                revisions: Box::new(driftql_dialect_mssql::MssqlRevisions::new(None)),
            })
        }
        other => Err(CliError::UnknownDialect(other.to_string())),
    }
}

fn inspect_options(schemas: &[String], exclude: &[String]) -> InspectOptions {
    InspectOptions {
        schemas: schemas.to_vec(),
        exclude: exclude.to_vec(),
        ..InspectOptions::default()
    }
}

/// The desired state comes from a second database holding the target
/// schema. Declarative file formats are evaluated by external loaders that
/// hand over a ready realm.
fn desired_realm(to: &str, opts: &InspectOptions) -> CliResult<Realm> {
    let mut target = connect(to)?;
    Ok(target
        .driver
        .inspector()
        .inspect_realm(target.conn.as_mut(), opts)?)
}

/// Roundtrips the desired realm through the dev database so dialect-chosen
/// defaults compare equal during the diff. The dev target must be distinct
/// from the one being migrated.
fn normalize_desired(driver: &dyn Driver, dev_url: Option<&str>, realm: Realm) -> CliResult<Realm> {
    let (Some(dev_url), Some(normalizer)) = (dev_url, driver.normalizer()) else {
        return Ok(realm);
    };
    let mut dev = connect(dev_url)?;
    Ok(normalizer.normalize_realm(dev.conn.as_mut(), &realm)?)
}

fn open_dir(dir: &str) -> CliResult<LocalDir> {
    LocalDir::open(dir).map_err(|_| CliError::ReadDir {
        path: PathBuf::from(dir),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
    })
}

fn parse_lock_timeout(raw: &str) -> Duration {
    let trimmed = raw.trim();
    if let Some(seconds) = trimmed.strip_suffix('s') {
        if let Ok(seconds) = seconds.parse::<u64>() {
            return Duration::from_secs(seconds);
        }
    }
    trimmed
        .parse::<u64>()
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(10))
}

fn render_plan(driver: &dyn Driver, changes: &[Change]) -> CliResult<String> {
    let plan = Orchestrator::new(driver).plan("diff", changes)?;
    let mut out = String::new();
    for stmt in &plan.stmts {
        if let Some(comment) = &stmt.comment {
            out.push_str("-- ");
            out.push_str(comment);
            out.push('\n');
        }
        out.push_str(&stmt.cmd);
        out.push_str(";\n");
    }
    Ok(out)
}

pub(crate) fn run_schema(command: SchemaCommand) -> CliResult<()> {
    match command {
        SchemaCommand::Inspect {
            url,
            schema,
            exclude,
            format,
        } => {
            if format != "sql" {
                return Err(CliError::UnknownDialect(format!(
                    "output format {format:?}"
                )));
            }
            let mut target = connect(&url)?;
            let opts = inspect_options(&schema, &exclude);
            let realm = Orchestrator::new(target.driver.as_ref())
                .inspect(target.conn.as_mut(), &opts)?;

            // Rendering as SQL is the diff from nothing to the inspected
            // state.
            let empty = Realm::new();
            let engine =
                driftql_core::diff::DiffEngine::new(target.driver.diff_driver());
            let changes = engine.realm_diff(&empty, &realm)?;
            print!("{}", render_plan(target.driver.as_ref(), &changes)?);
            Ok(())
        }
        SchemaCommand::Diff {
            url,
            to,
            from,
            dev_url,
            schema,
            exclude,
            vars: _,
        } => {
            let opts = inspect_options(&schema, &exclude);
            let desired = desired_realm(&to, &opts)?;
            let mut target = connect(from.as_deref().unwrap_or(&url))?;
            let desired =
                normalize_desired(target.driver.as_ref(), dev_url.as_deref(), desired)?;
            let changes = Orchestrator::new(target.driver.as_ref()).diff(
                target.conn.as_mut(),
                &desired,
                &opts,
            )?;
            print!("{}", render_plan(target.driver.as_ref(), &changes)?);
            Ok(())
        }
        SchemaCommand::Apply {
            url,
            to,
            dev_url,
            schema,
            exclude,
            dry_run,
            auto_approve: _,
            lock_timeout,
            vars: _,
        } => {
            let opts = inspect_options(&schema, &exclude);
            let desired = desired_realm(&to, &opts)?;
            let mut target = connect(&url)?;
            let desired =
                normalize_desired(target.driver.as_ref(), dev_url.as_deref(), desired)?;
            let changes = Orchestrator::new(target.driver.as_ref()).diff(
                target.conn.as_mut(),
                &desired,
                &opts,
            )?;
            if changes.is_empty() {
                println!("schema is in sync, no changes to apply");
                return Ok(());
            }
            if dry_run {
                print!("{}", render_plan(target.driver.as_ref(), &changes)?);
                return Ok(());
            }

            let mut lock = target.driver.locker().lock(
                target.conn.as_mut(),
                "schema_apply",
                parse_lock_timeout(&lock_timeout),
            )?;
            let applied = target
                .driver
                .plan_applier()
                .apply_changes(target.conn.as_mut(), &changes);
            let released = lock.release(target.conn.as_mut());
            applied?;
            released?;
            println!("applied {} change(s)", changes.len());
            Ok(())
        }
    }
}

pub(crate) fn run_migrate(command: MigrateCommand) -> CliResult<()> {
    match command {
        MigrateCommand::Diff {
            name,
            dir,
            url,
            to,
            dev_url,
        } => {
            let dir = open_dir(&dir)?;
            let opts = InspectOptions::default();
            let desired = desired_realm(&to, &opts)?;
            let mut target = connect(&url)?;
            let desired =
                normalize_desired(target.driver.as_ref(), dev_url.as_deref(), desired)?;
            let orchestrator = Orchestrator::new(target.driver.as_ref());
            let changes = orchestrator.diff(target.conn.as_mut(), &desired, &opts)?;
            if changes.is_empty() {
                println!("migration directory is in sync with the desired state");
                return Ok(());
            }
            let file = orchestrator.plan_to_dir(&name, &changes, &dir, None)?;
            println!("wrote {}", file.name());
            Ok(())
        }
        MigrateCommand::Apply {
            dir,
            url,
            dev_url,
            lock_timeout,
            tx_mode,
            auto_approve,
            dry_run,
        } => {
            let dir = open_dir(&dir)?;
            let mut target = connect(&url)?;
            let orchestrator = Orchestrator::new(target.driver.as_ref());

            if dry_run {
                let status = orchestrator.status(
                    target.conn.as_mut(),
                    &dir,
                    target.revisions.as_ref(),
                )?;
                for pending in &status.pending {
                    println!("pending: {pending}");
                }
                if let Some(dev_url) = dev_url {
                    let mut dev = connect(&dev_url)?;
                    let analyzers = default_analyzers();
                    let refs: Vec<&dyn driftql_core::sqlcheck::Analyzer> =
                        analyzers.iter().map(|a| a.as_ref()).collect();
                    let report = orchestrator.analyze_dir(dev.conn.as_mut(), &dir, &refs)?;
                    for diagnostic in &report.diagnostics {
                        println!(
                            "{}: byte {}: {}",
                            match diagnostic.severity {
                                driftql_core::sqlcheck::Severity::Error => "error",
                                driftql_core::sqlcheck::Severity::Warning => "warning",
                            },
                            diagnostic.pos,
                            diagnostic.message
                        );
                    }
                    if report.has_errors() {
                        return Err(CliError::Core(
                            driftql_core::Error::AnalysisBlocked {
                                errors: report.diagnostics.len(),
                            },
                        ));
                    }
                }
                return Ok(());
            }

            let opts = ApplyOptions {
                lock_timeout: parse_lock_timeout(&lock_timeout),
                tx_mode: TxMode::parse(&tx_mode)?,
                ..ApplyOptions::default()
            };
            let mut dev_target = match dev_url {
                Some(dev_url) => Some(connect(&dev_url)?),
                None => None,
            };
            let analyzers = default_analyzers();
            let refs: Vec<&dyn driftql_core::sqlcheck::Analyzer> =
                analyzers.iter().map(|a| a.as_ref()).collect();

            let report = orchestrator.apply(
                target.conn.as_mut(),
                &dir,
                target.revisions.as_ref(),
                &opts,
                dev_target
                    .as_mut()
                    .map(|target| target.conn.as_mut() as &mut dyn ExecQuerier),
                &refs,
                auto_approve,
            )?;
            for version in &report.applied {
                println!("applied {version}");
            }
            if report.applied.is_empty() {
                println!("nothing to apply");
            }
            Ok(())
        }
        MigrateCommand::Validate { dir } => {
            let dir = open_dir(&dir)?;
            Orchestrator::new(&NoDriver).validate(&dir)?;
            println!("migration directory is valid");
            Ok(())
        }
        MigrateCommand::Status { dir, url } => {
            let dir = open_dir(&dir)?;
            let mut target = connect(&url)?;
            let status = Orchestrator::new(target.driver.as_ref()).status(
                target.conn.as_mut(),
                &dir,
                target.revisions.as_ref(),
            )?;
            match &status.current {
                Some(version) => println!("current version: {version}"),
                None => println!("no migrations applied yet"),
            }
            for pending in &status.pending {
                println!("pending: {pending}");
            }
            Ok(())
        }
        MigrateCommand::Hash { dir } => {
            let dir = open_dir(&dir)?;
            Orchestrator::new(&NoDriver).hash(&dir)?;
            println!("updated checksum file");
            Ok(())
        }
    }
}

/// Directory-only operations (validate, hash) need no dialect; this stub
/// satisfies the orchestrator without ever being exercised.
struct NoDriver;

impl driftql_core::inspect::Inspector for NoDriver {
    fn inspect_realm(
        &self,
        _conn: &mut dyn ExecQuerier,
        _opts: &InspectOptions,
    ) -> driftql_core::Result<Realm> {
        Err(driftql_core::Error::Unsupported(
            "no database connection".to_string(),
        ))
    }

    fn inspect_schema(
        &self,
        _conn: &mut dyn ExecQuerier,
        _name: Option<&str>,
        _opts: &InspectOptions,
    ) -> driftql_core::Result<driftql_core::schema::Schema> {
        Err(driftql_core::Error::Unsupported(
            "no database connection".to_string(),
        ))
    }
}

impl driftql_core::diff::DiffDriver for NoDriver {}

impl driftql_core::migrate::PlanApplier for NoDriver {
    fn plan_changes(
        &self,
        _name: &str,
        _changes: &[Change],
        _opts: &driftql_core::migrate::PlanOptions,
    ) -> driftql_core::Result<driftql_core::migrate::Plan> {
        Err(driftql_core::Error::Unsupported(
            "no database connection".to_string(),
        ))
    }
}

impl driftql_core::driver::Locker for NoDriver {
    fn lock(
        &self,
        _conn: &mut dyn ExecQuerier,
        name: &str,
        timeout: Duration,
    ) -> driftql_core::Result<Box<dyn driftql_core::driver::Lock>> {
        Err(driftql_core::Error::Locked {
            name: name.to_string(),
            timeout,
        })
    }
}

impl driftql_core::driver::Snapshoter for NoDriver {
    fn snapshot(
        &self,
        _conn: &mut dyn ExecQuerier,
    ) -> driftql_core::Result<Box<dyn driftql_core::driver::Restorer>> {
        Err(driftql_core::Error::Unsupported(
            "no database connection".to_string(),
        ))
    }
}

impl driftql_core::driver::CleanChecker for NoDriver {
    fn check_clean(
        &self,
        _conn: &mut dyn ExecQuerier,
        _revision_ident: Option<&driftql_core::migrate::RevisionIdent>,
    ) -> driftql_core::Result<()> {
        Err(driftql_core::Error::Unsupported(
            "no database connection".to_string(),
        ))
    }
}

impl driftql_core::driver::TypeParseFormatter for NoDriver {
    fn parse_type(&self, raw: &str) -> driftql_core::Result<driftql_core::schema::Type> {
        Ok(driftql_core::schema::Type::Unsupported(raw.to_string()))
    }

    fn format_type(&self, ty: &driftql_core::schema::Type) -> driftql_core::Result<String> {
        match ty {
            driftql_core::schema::Type::Unsupported(raw) => Ok(raw.clone()),
            other => Err(driftql_core::Error::Unsupported(format!("{other:?}"))),
        }
    }
}

impl Driver for NoDriver {
    fn name(&self) -> &'static str {
        "none"
    }

    fn inspector(&self) -> &dyn driftql_core::inspect::Inspector {
        self
    }

    fn diff_driver(&self) -> &dyn driftql_core::diff::DiffDriver {
        self
    }

    fn plan_applier(&self) -> &dyn driftql_core::migrate::PlanApplier {
        self
    }

    fn locker(&self) -> &dyn driftql_core::driver::Locker {
        self
    }

    fn snapshoter(&self) -> &dyn driftql_core::driver::Snapshoter {
        self
    }

    fn clean_checker(&self) -> &dyn driftql_core::driver::CleanChecker {
        self
    }

    fn types(&self) -> &dyn driftql_core::driver::TypeParseFormatter {
        self
    }

    fn scan_options(&self) -> driftql_core::migrate::ScanOptions {
        driftql_core::migrate::ScanOptions::default()
    }
}
