use chrono::Utc;

use super::dir::MigrationFile;
use crate::{Change, ExecQuerier, Result};

/// One planned SQL statement. `reverse` is populated only when a safe
/// inverse is known; drops without cached DDL stay irreversible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStmt {
    pub cmd: String,
    pub reverse: Option<String>,
    pub comment: Option<String>,
}

impl PlanStmt {
    #[must_use]
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            reverse: None,
            comment: None,
        }
    }

    #[must_use]
    pub fn reversible(mut self, reverse: impl Into<String>) -> Self {
        self.reverse = Some(reverse.into());
        self
    }

    #[must_use]
    pub fn commented(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// An ordered list of SQL statements lowered from a change list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub name: String,
    /// True iff every statement carries a reverse.
    pub reversible: bool,
    /// Whether the driver executes the plan inside one transaction.
    pub transactional: bool,
    pub stmts: Vec<PlanStmt>,
}

impl Plan {
    #[must_use]
    pub fn from_stmts(name: impl Into<String>, transactional: bool, stmts: Vec<PlanStmt>) -> Self {
        let reversible = stmts.iter().all(|stmt| stmt.reverse.is_some());
        Self {
            name: name.into(),
            reversible,
            transactional,
            stmts,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Qualify object names with this schema instead of the one recorded on
    /// the model (empty string strips qualification).
    pub schema_qualifier: Option<String>,
}

/// Driver capability that lowers semantic changes to dialect SQL and can
/// execute them directly against a connection.
pub trait PlanApplier {
    fn plan_changes(&self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan>;

    /// Plans and executes in one step, in plan order. Drivers with
    /// non-transactional DDL override the default to stop at the failing
    /// statement instead of rolling back.
    fn apply_changes(&self, conn: &mut dyn ExecQuerier, changes: &[Change]) -> Result<()> {
        let plan = self.plan_changes("apply", changes, &PlanOptions::default())?;
        if plan.transactional {
            conn.begin()?;
        }
        for stmt in &plan.stmts {
            if let Err(error) = conn.exec(&stmt.cmd, &[]) {
                if plan.transactional {
                    let _ = conn.rollback();
                }
                return Err(error);
            }
        }
        if plan.transactional {
            conn.commit()?;
        }
        Ok(())
    }
}

/// Renders plans into migration files via a filename template. The content
/// format is one `-- comment\ncmd;` block per statement.
#[derive(Debug, Clone)]
pub struct Formatter {
    name_template: String,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            name_template: "{version}_{name}.sql".to_string(),
        }
    }
}

impl Formatter {
    #[must_use]
    pub fn new(name_template: impl Into<String>) -> Self {
        Self {
            name_template: name_template.into(),
        }
    }

    /// Formats a plan into a single migration file. When `version` is not
    /// given, the current UTC timestamp is used, matching the default
    /// `{version}_{name}.sql` naming.
    #[must_use]
    pub fn format(&self, plan: &Plan, version: Option<&str>) -> MigrationFile {
        let version = match version {
            Some(version) => version.to_string(),
            None => Utc::now().format("%Y%m%d%H%M%S").to_string(),
        };
        let name = self
            .name_template
            .replace("{version}", &version)
            .replace("{name}", &plan.name);

        let mut content = String::new();
        for stmt in &plan.stmts {
            if let Some(comment) = &stmt.comment {
                content.push_str("-- ");
                content.push_str(comment);
                content.push('\n');
            }
            content.push_str(&stmt.cmd);
            if !stmt.cmd.trim_end().ends_with(';') {
                content.push(';');
            }
            content.push('\n');
        }

        MigrationFile::new(name, content.into_bytes())
    }
}
