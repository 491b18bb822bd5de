use std::{collections::BTreeMap, sync::Mutex, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, ExecQuerier, Result};

/// Schema and table name holding the revision log. Created lazily on first
/// use; the clean checker exempts it.
pub const DEFAULT_REVISION_SCHEMA: &str = "atlas_schema_revisions";
pub const REVISION_TABLE: &str = "atlas_schema_revisions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionState {
    Pending,
    Applied,
    Failed,
    RolledBack,
}

impl ExecutionState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Failed => "failed",
            Self::RolledBack => "rolled-back",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "pending" => Ok(Self::Pending),
            "applied" => Ok(Self::Applied),
            "failed" => Ok(Self::Failed),
            "rolled-back" => Ok(Self::RolledBack),
            other => Err(Error::Internal(format!(
                "unknown revision execution state {other:?}"
            ))),
        }
    }
}

/// A record that a named migration file was (or is being) applied.
/// The column layout is fixed for compatibility across implementations.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub version: String,
    pub description: String,
    pub state: ExecutionState,
    pub executed_at: DateTime<Utc>,
    pub execution_time: Duration,
    /// Hash of the file content at the time of application.
    pub hash: String,
    pub operator_version: String,
    pub meta: BTreeMap<String, String>,
}

impl Revision {
    /// Meta map encoded as JSON, the on-disk dialect encoding.
    pub fn meta_json(&self) -> Result<String> {
        serde_json::to_string(&self.meta)
            .map_err(|source| Error::Internal(format!("encode revision meta: {source}")))
    }

    pub fn meta_from_json(raw: &str) -> Result<BTreeMap<String, String>> {
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(raw)
            .map_err(|source| Error::Internal(format!("decode revision meta: {source}")))
    }
}

/// Identifier of the persisted revision table, used by the clean checker to
/// exempt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionIdent {
    pub schema: String,
    pub name: String,
}

impl Default for RevisionIdent {
    fn default() -> Self {
        Self {
            schema: DEFAULT_REVISION_SCHEMA.to_string(),
            name: REVISION_TABLE.to_string(),
        }
    }
}

/// Append-only revision log keyed by version. `write` upserts by version;
/// `read` returns revisions ordered by version ascending.
pub trait RevisionReadWriter {
    fn ident(&self) -> RevisionIdent;

    fn read(&self, conn: &mut dyn ExecQuerier) -> Result<Vec<Revision>>;

    fn write(&self, conn: &mut dyn ExecQuerier, revisions: &[Revision]) -> Result<()>;
}

/// In-memory store for tests and ephemeral runs; ignores the connection.
#[derive(Debug, Default)]
pub struct MemRevisions {
    inner: Mutex<BTreeMap<String, Revision>>,
}

impl MemRevisions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RevisionReadWriter for MemRevisions {
    fn ident(&self) -> RevisionIdent {
        RevisionIdent::default()
    }

    fn read(&self, _conn: &mut dyn ExecQuerier) -> Result<Vec<Revision>> {
        let inner = self.inner.lock().expect("revision store poisoned");
        Ok(inner.values().cloned().collect())
    }

    fn write(&self, _conn: &mut dyn ExecQuerier, revisions: &[Revision]) -> Result<()> {
        let mut inner = self.inner.lock().expect("revision store poisoned");
        for revision in revisions {
            inner.insert(revision.version.clone(), revision.clone());
        }
        Ok(())
    }
}
