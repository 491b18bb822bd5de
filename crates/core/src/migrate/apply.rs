use std::{collections::BTreeSet, time::Duration};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{
    dir::{Dir, MigrationFile},
    revision::{ExecutionState, Revision, RevisionReadWriter},
    sum,
};
use crate::{Error, ExecQuerier, Result, driver::Driver};

pub const DEFAULT_LOCK_NAME: &str = "migrate_apply";

/// How statements are grouped into transactions. `File` is the default;
/// a file-level `atlas:txmode` directive overrides it per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxMode {
    None,
    #[default]
    File,
    All,
}

impl TxMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "none" => Ok(Self::None),
            "file" => Ok(Self::File),
            "all" => Ok(Self::All),
            other => Err(Error::Internal(format!("unknown tx-mode {other:?}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub lock_name: String,
    pub lock_timeout: Duration,
    pub tx_mode: TxMode,
    /// Recorded on every revision row, semver plus commit.
    pub operator_version: String,
    /// Apply at most this many pending files.
    pub amount: Option<usize>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            lock_name: DEFAULT_LOCK_NAME.to_string(),
            lock_timeout: Duration::from_secs(10),
            tx_mode: TxMode::default(),
            operator_version: env!("CARGO_PKG_VERSION").to_string(),
            amount: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Versions applied by this run, in order.
    pub applied: Vec<String>,
    /// Versions that remain pending (when `amount` stopped the run early).
    pub pending: Vec<String>,
}

/// Executes pending migration files against a live database under the
/// driver's advisory lock, recording a revision row around every file.
pub struct Applier<'a> {
    driver: &'a dyn Driver,
    revisions: &'a dyn RevisionReadWriter,
}

impl<'a> Applier<'a> {
    #[must_use]
    pub fn new(driver: &'a dyn Driver, revisions: &'a dyn RevisionReadWriter) -> Self {
        Self { driver, revisions }
    }

    pub fn apply(
        &self,
        conn: &mut dyn ExecQuerier,
        dir: &dyn Dir,
        opts: &ApplyOptions,
    ) -> Result<ApplyReport> {
        sum::validate(dir)?;

        let pending = self.pending_files(conn, dir)?;
        if pending.is_empty() {
            debug!("no pending migration files");
            return Ok(ApplyReport::default());
        }

        let mut lock = self
            .driver
            .locker()
            .lock(conn, &opts.lock_name, opts.lock_timeout)?;
        debug!(name = %opts.lock_name, "acquired advisory lock");

        let result = self.apply_locked(conn, &pending, opts);

        // Surface the run error over a release error, but do not lose the
        // release failure silently.
        match lock.release(conn) {
            Ok(()) => result,
            Err(release_error) => match result {
                Ok(report) => {
                    warn!(error = %release_error, "lock release failed after successful apply");
                    Ok(report)
                }
                Err(run_error) => Err(run_error),
            },
        }
    }

    fn apply_locked(
        &self,
        conn: &mut dyn ExecQuerier,
        pending: &[MigrationFile],
        opts: &ApplyOptions,
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        let limit = opts.amount.unwrap_or(pending.len());

        if opts.tx_mode == TxMode::All {
            conn.begin()?;
        }

        for (index, file) in pending.iter().enumerate() {
            if index >= limit {
                report.pending.push(file.version().to_string());
                continue;
            }

            if let Err(error) = self.apply_file(conn, file, opts) {
                if opts.tx_mode == TxMode::All {
                    let _ = conn.rollback();
                }
                return Err(error);
            }
            report.applied.push(file.version().to_string());
        }

        if opts.tx_mode == TxMode::All {
            conn.commit()?;
        }
        Ok(report)
    }

    fn apply_file(
        &self,
        conn: &mut dyn ExecQuerier,
        file: &MigrationFile,
        opts: &ApplyOptions,
    ) -> Result<()> {
        let file_mode = file_tx_mode(file, opts.tx_mode)?;
        let stmts = file.stmts(&self.driver.scan_options())?;
        info!(file = file.name(), statements = stmts.len(), "applying");

        let started = Utc::now();
        let mut revision = Revision {
            version: file.version().to_string(),
            description: file.desc().to_string(),
            state: ExecutionState::Pending,
            executed_at: started,
            execution_time: Duration::ZERO,
            hash: sum::file_hash(file),
            operator_version: opts.operator_version.clone(),
            meta: Default::default(),
        };
        // The pending row lands before the file's first statement so a
        // crashed run is visible in the log.
        self.revisions.write(conn, std::slice::from_ref(&revision))?;

        let in_tx = file_mode == TxMode::File;
        if in_tx {
            conn.begin()?;
        }

        let mut executed = 0usize;
        for stmt in &stmts {
            match conn.exec(stmt, &[]) {
                Ok(_) => executed += 1,
                Err(error) => {
                    if in_tx {
                        let _ = conn.rollback();
                    }
                    revision.state = ExecutionState::Failed;
                    revision.execution_time = elapsed_since(started);
                    revision
                        .meta
                        .insert("applied_stmts".to_string(), executed.to_string());
                    revision
                        .meta
                        .insert("error".to_string(), error.to_string());
                    // Best effort: the revision write must not mask the
                    // statement error.
                    let _ = self.revisions.write(conn, std::slice::from_ref(&revision));
                    return Err(error);
                }
            }
        }

        if in_tx {
            conn.commit()?;
        }

        revision.state = ExecutionState::Applied;
        revision.execution_time = elapsed_since(started);
        self.revisions.write(conn, std::slice::from_ref(&revision))
    }

    fn pending_files(
        &self,
        conn: &mut dyn ExecQuerier,
        dir: &dyn Dir,
    ) -> Result<Vec<MigrationFile>> {
        let applied: BTreeSet<String> = self
            .revisions
            .read(conn)?
            .into_iter()
            .filter(|revision| revision.state == ExecutionState::Applied)
            .map(|revision| revision.version)
            .collect();

        Ok(dir
            .files()?
            .into_iter()
            .filter(|file| !applied.contains(file.version()))
            .collect())
    }
}

fn file_tx_mode(file: &MigrationFile, global: TxMode) -> Result<TxMode> {
    for (name, args) in file.directives() {
        if name == "txmode" {
            return TxMode::parse(&args);
        }
    }
    Ok(match global {
        // Under `All` the surrounding transaction owns the statements.
        TxMode::All => TxMode::None,
        other => other,
    })
}

fn elapsed_since(started: chrono::DateTime<Utc>) -> Duration {
    (Utc::now() - started).to_std().unwrap_or(Duration::ZERO)
}
