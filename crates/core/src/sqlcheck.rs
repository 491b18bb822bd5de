mod datadepend;
mod destructive;

pub use datadepend::DataDependent;
pub use destructive::Destructive;

use crate::{Change, ExecQuerier, Result, driver::Driver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// One finding, anchored to the byte position of the statement that caused
/// it within the analyzed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub pos: usize,
    pub message: String,
    pub severity: Severity,
}

/// Diagnostic sink shared by the analyzers of one pass.
#[derive(Debug, Default)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn push(&mut self, pos: usize, severity: Severity, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            pos,
            message: message.into(),
            severity,
        });
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Error)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// One statement of the analyzed file with the semantic changes derived by
/// re-diffing it against the pre-statement state.
#[derive(Debug, Clone)]
pub struct CheckStmt {
    pub pos: usize,
    pub text: String,
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone)]
pub struct CheckFile {
    pub name: String,
    pub stmts: Vec<CheckStmt>,
}

/// Everything an analyzer sees: the parsed file, the driver for dialect
/// judgement calls, an optional dev connection for what-if probes, and the
/// diagnostic sink.
pub struct Pass<'a> {
    pub file: &'a CheckFile,
    pub driver: &'a dyn Driver,
    pub dev: Option<&'a mut dyn ExecQuerier>,
    pub report: &'a mut Report,
}

pub trait Analyzer {
    fn name(&self) -> &'static str;

    fn analyze(&self, pass: &mut Pass<'_>) -> Result<()>;
}

/// Runs analyzers in sequence over one pass; the first hard failure aborts.
pub fn analyze(analyzers: &[&dyn Analyzer], pass: &mut Pass<'_>) -> Result<()> {
    for analyzer in analyzers {
        tracing::debug!(analyzer = analyzer.name(), file = %pass.file.name, "analyzing");
        analyzer.analyze(pass)?;
    }
    Ok(())
}

/// The built-in analyzer sequence.
#[must_use]
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![Box::new(Destructive), Box::new(DataDependent)]
}

/// Row-count probe used for "is this object empty" questions. Probes are
/// best-effort: a failing query (e.g. the table does not exist on the dev
/// database yet) reads as empty.
fn table_rows(dev: &mut dyn ExecQuerier, schema: Option<&str>, table: &str) -> u64 {
    let target = match schema {
        Some(schema) => format!("{schema}.{table}"),
        None => table.to_string(),
    };
    let sql = format!("SELECT COUNT(*) AS n FROM {target}");
    match dev.query(&sql, &[]) {
        Ok(rows) => rows
            .first()
            .and_then(|row| row.uint("n").ok())
            .unwrap_or(0),
        Err(_) => 0,
    }
}
