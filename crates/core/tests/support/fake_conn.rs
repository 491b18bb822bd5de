#![allow(dead_code)]

use std::collections::HashMap;

use driftql_core::{Error, ExecQuerier, Result, Row, Value};

/// Scripted connection for core tests: records executed SQL, can fail on a
/// substring, and replays canned query results.
#[derive(Debug, Default)]
pub struct FakeConn {
    pub executed: Vec<String>,
    pub fail_on: Option<String>,
    pub results: HashMap<String, Vec<Row>>,
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,
}

impl FakeConn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(substring: &str) -> Self {
        Self {
            fail_on: Some(substring.to_string()),
            ..Self::default()
        }
    }

    pub fn with_result(mut self, sql: &str, rows: Vec<Row>) -> Self {
        self.results.insert(sql.to_string(), rows);
        self
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        if let Some(needle) = &self.fail_on
            && sql.contains(needle.as_str())
        {
            return Err(Error::exec(
                sql,
                std::io::Error::other("scripted failure"),
            ));
        }
        Ok(())
    }
}

impl ExecQuerier for FakeConn {
    fn query(&mut self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        self.check_failure(sql)?;
        self.executed.push(sql.to_string());
        Ok(self.results.get(sql).cloned().unwrap_or_default())
    }

    fn exec(&mut self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.check_failure(sql)?;
        self.executed.push(sql.to_string());
        Ok(0)
    }

    fn begin(&mut self) -> Result<()> {
        self.begun += 1;
        self.executed.push("BEGIN".to_string());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.committed += 1;
        self.executed.push("COMMIT".to_string());
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.rolled_back += 1;
        self.executed.push("ROLLBACK".to_string());
        Ok(())
    }
}
