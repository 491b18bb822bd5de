use tracing::{debug, info};

use crate::{
    Change, Error, ExecQuerier, Result,
    diff::DiffEngine,
    driver::Driver,
    inspect::InspectOptions,
    migrate::{
        ApplyOptions, ApplyReport, Applier, Dir, ExecutionState, Formatter, MigrationFile, Plan,
        PlanOptions, Revision, RevisionReadWriter, validate, write_sum,
    },
    schema::Realm,
    sqlcheck::{Analyzer, CheckFile, CheckStmt, Pass, Report, analyze},
};

/// Composes the inspectors, differ, planner, analyzers, applier, and
/// revision store into the toolkit's top-level operations.
pub struct Orchestrator<'a> {
    driver: &'a dyn Driver,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(driver: &'a dyn Driver) -> Self {
        Self { driver }
    }

    pub fn inspect(&self, conn: &mut dyn ExecQuerier, opts: &InspectOptions) -> Result<Realm> {
        self.driver.inspector().inspect_realm(conn, opts)
    }

    /// Inspects the current state and diffs it against the desired model.
    pub fn diff(
        &self,
        conn: &mut dyn ExecQuerier,
        desired: &Realm,
        opts: &InspectOptions,
    ) -> Result<Vec<Change>> {
        let current = self.inspect(conn, opts)?;
        let engine = DiffEngine::new(self.driver.diff_driver());
        let changes = engine.realm_diff(&current, desired)?;
        debug!(changes = changes.len(), "computed diff");
        Ok(changes)
    }

    pub fn plan(&self, name: &str, changes: &[Change]) -> Result<Plan> {
        self.driver
            .plan_applier()
            .plan_changes(name, changes, &PlanOptions::default())
    }

    /// Plans the changes, writes the migration file into the directory, and
    /// refreshes the sum file. Returns the written file.
    pub fn plan_to_dir(
        &self,
        name: &str,
        changes: &[Change],
        dir: &dyn Dir,
        version: Option<&str>,
    ) -> Result<MigrationFile> {
        validate(dir)?;
        let plan = self.plan(name, changes)?;
        if plan.stmts.is_empty() {
            return Err(Error::Internal(format!(
                "plan {name:?} contains no statements"
            )));
        }
        let file = Formatter::default().format(&plan, version);
        dir.write_file(file.name(), file.bytes())?;
        write_sum(dir)?;
        info!(file = file.name(), "wrote migration file");
        Ok(file)
    }

    pub fn validate(&self, dir: &dyn Dir) -> Result<()> {
        validate(dir)
    }

    /// Recomputes and rewrites the directory's sum file.
    pub fn hash(&self, dir: &dyn Dir) -> Result<()> {
        write_sum(dir).map(|_| ())
    }

    pub fn status(
        &self,
        conn: &mut dyn ExecQuerier,
        dir: &dyn Dir,
        revisions: &dyn RevisionReadWriter,
    ) -> Result<Status> {
        validate(dir)?;
        let applied = revisions.read(conn)?;
        let applied_versions: Vec<&str> = applied
            .iter()
            .filter(|revision| revision.state == ExecutionState::Applied)
            .map(|revision| revision.version.as_str())
            .collect();

        let pending = dir
            .files()?
            .iter()
            .filter(|file| !applied_versions.contains(&file.version()))
            .map(|file| file.name().to_string())
            .collect();

        Ok(Status {
            current: applied_versions.last().map(|version| (*version).to_string()),
            applied,
            pending,
        })
    }

    /// Applies pending files: checksum validation, analyzer gate when a dev
    /// connection is supplied, then locked execution with revision records.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &self,
        conn: &mut dyn ExecQuerier,
        dir: &dyn Dir,
        revisions: &dyn RevisionReadWriter,
        opts: &ApplyOptions,
        dev: Option<&mut dyn ExecQuerier>,
        analyzers: &[&dyn Analyzer],
        auto_approve: bool,
    ) -> Result<ApplyReport> {
        validate(dir)?;

        if let Some(dev) = dev
            && !analyzers.is_empty()
        {
            let report = self.analyze_dir(dev, dir, analyzers)?;
            if !report.is_empty() && !auto_approve {
                return Err(Error::AnalysisBlocked {
                    errors: report.diagnostics.len(),
                });
            }
        }

        Applier::new(self.driver, revisions).apply(conn, dir, opts)
    }

    /// Runs the analyzers over every file in the directory, deriving each
    /// statement's semantic changes by replaying it on the dev database and
    /// re-diffing the inspected state around it.
    pub fn analyze_dir(
        &self,
        dev: &mut dyn ExecQuerier,
        dir: &dyn Dir,
        analyzers: &[&dyn Analyzer],
    ) -> Result<Report> {
        let mut report = Report::default();
        for file in dir.files()? {
            let check_file = self.replay_file(&mut *dev, &file)?;
            let mut pass = Pass {
                file: &check_file,
                driver: self.driver,
                dev: Some(&mut *dev),
                report: &mut report,
            };
            analyze(analyzers, &mut pass)?;
        }
        Ok(report)
    }

    fn replay_file(
        &self,
        dev: &mut dyn ExecQuerier,
        file: &MigrationFile,
    ) -> Result<CheckFile> {
        let opts = InspectOptions::default();
        let engine = DiffEngine::new(self.driver.diff_driver());
        let mut before = self.driver.inspector().inspect_realm(dev, &opts)?;
        let mut stmts = Vec::new();

        for stmt in file.stmt_decls(&self.driver.scan_options())? {
            dev.exec(&stmt.text, &[])?;
            let after = self.driver.inspector().inspect_realm(dev, &opts)?;
            let changes = engine.realm_diff(&before, &after)?;
            stmts.push(CheckStmt {
                pos: stmt.pos,
                text: stmt.text,
                changes,
            });
            before = after;
        }

        Ok(CheckFile {
            name: file.name().to_string(),
            stmts,
        })
    }

    /// Fails with [`Error::NotClean`] unless the target is empty modulo the
    /// revision table.
    pub fn clean_check(
        &self,
        conn: &mut dyn ExecQuerier,
        revisions: Option<&dyn RevisionReadWriter>,
    ) -> Result<()> {
        let ident = revisions.map(|store| store.ident());
        self.driver.clean_checker().check_clean(conn, ident.as_ref())
    }
}

#[derive(Debug)]
pub struct Status {
    pub applied: Vec<Revision>,
    /// File names in the directory not yet applied, in name order.
    pub pending: Vec<String>,
    /// Most recently applied version.
    pub current: Option<String>,
}
