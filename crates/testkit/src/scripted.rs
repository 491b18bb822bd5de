use std::collections::HashMap;

use driftql_core::{Error, ExecQuerier, Result, Row, Value};

/// A scripted `ExecQuerier` for dialect tests: canned rows per SQL text, a
/// log of everything executed, and an optional substring that fails the
/// statement carrying it.
#[derive(Debug, Default)]
pub struct ScriptedConn {
    results: HashMap<String, Vec<Row>>,
    pub executed: Vec<String>,
    pub fail_on: Option<String>,
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,
}

impl ScriptedConn {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers rows for an exact SQL text. Unregistered queries return no
    /// rows, matching an empty catalog.
    #[must_use]
    pub fn with_rows(mut self, sql: &str, rows: Vec<Row>) -> Self {
        self.results.insert(sql.to_string(), rows);
        self
    }

    pub fn script(&mut self, sql: &str, rows: Vec<Row>) {
        self.results.insert(sql.to_string(), rows);
    }

    /// Builds a row from `(column, value)` pairs.
    #[must_use]
    pub fn row(pairs: &[(&str, Value)]) -> Row {
        Row::new(
            pairs.iter().map(|(name, _)| (*name).to_string()).collect(),
            pairs.iter().map(|(_, value)| value.clone()).collect(),
        )
    }

    fn guard(&self, sql: &str) -> Result<()> {
        if let Some(needle) = &self.fail_on
            && sql.contains(needle.as_str())
        {
            return Err(Error::exec(sql, std::io::Error::other("scripted failure")));
        }
        Ok(())
    }
}

impl ExecQuerier for ScriptedConn {
    fn query(&mut self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        self.guard(sql)?;
        self.executed.push(sql.to_string());
        Ok(self.results.get(sql).cloned().unwrap_or_default())
    }

    fn exec(&mut self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.guard(sql)?;
        self.executed.push(sql.to_string());
        Ok(0)
    }

    fn begin(&mut self) -> Result<()> {
        self.begun += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.committed += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.rolled_back += 1;
        Ok(())
    }
}
