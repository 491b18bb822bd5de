use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use driftql_core::{
    Error, ExecQuerier, Result, Value,
    migrate::{
        ExecutionState, REVISION_TABLE, Revision, RevisionIdent, RevisionReadWriter,
    },
};

use crate::inspect::MAIN_SCHEMA;

/// Revision log persisted in the database file itself; SQLite has no
/// schemas, so the table lives in `main` under the shared name.
pub struct SQLiteRevisions {
    ident: RevisionIdent,
    ensured: AtomicBool,
}

impl Default for SQLiteRevisions {
    fn default() -> Self {
        Self::new()
    }
}

impl SQLiteRevisions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ident: RevisionIdent {
                schema: MAIN_SCHEMA.to_string(),
                name: REVISION_TABLE.to_string(),
            },
            ensured: AtomicBool::new(false),
        }
    }

    fn ensure(&self, conn: &mut dyn ExecQuerier) -> Result<()> {
        if self.ensured.load(Ordering::Relaxed) {
            return Ok(());
        }
        conn.exec(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (\
                 \"version\" text NOT NULL PRIMARY KEY, \
                 \"description\" text NOT NULL, \
                 \"execution_state\" text NOT NULL, \
                 \"executed_at\" text NOT NULL, \
                 \"execution_time\" integer NOT NULL, \
                 \"hash\" text NOT NULL, \
                 \"operator_version\" text NOT NULL, \
                 \"meta\" text NOT NULL)",
                self.ident.name
            ),
            &[],
        )?;
        self.ensured.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl RevisionReadWriter for SQLiteRevisions {
    fn ident(&self) -> RevisionIdent {
        self.ident.clone()
    }

    fn read(&self, conn: &mut dyn ExecQuerier) -> Result<Vec<Revision>> {
        self.ensure(conn)?;
        let rows = conn.query(
            &format!(
                "SELECT \"version\", \"description\", \"execution_state\", \"executed_at\", \
                 \"execution_time\", \"hash\", \"operator_version\", \"meta\" \
                 FROM \"{}\" ORDER BY \"version\"",
                self.ident.name
            ),
            &[],
        )?;

        let mut revisions = Vec::with_capacity(rows.len());
        for row in rows {
            revisions.push(Revision {
                version: row.text("version")?,
                description: row.text("description")?,
                state: ExecutionState::parse(&row.text("execution_state")?)?,
                executed_at: parse_ts(&row.text("executed_at")?)?,
                execution_time: Duration::from_nanos(row.int("execution_time")?.max(0) as u64),
                hash: row.text("hash")?,
                operator_version: row.text("operator_version")?,
                meta: Revision::meta_from_json(&row.text("meta")?)?,
            });
        }
        Ok(revisions)
    }

    fn write(&self, conn: &mut dyn ExecQuerier, revisions: &[Revision]) -> Result<()> {
        self.ensure(conn)?;
        let sql = format!(
            "INSERT INTO \"{}\" \
             (\"version\", \"description\", \"execution_state\", \"executed_at\", \
              \"execution_time\", \"hash\", \"operator_version\", \"meta\") \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(\"version\") DO UPDATE SET \
             \"description\" = excluded.\"description\", \
             \"execution_state\" = excluded.\"execution_state\", \
             \"executed_at\" = excluded.\"executed_at\", \
             \"execution_time\" = excluded.\"execution_time\", \
             \"hash\" = excluded.\"hash\", \
             \"operator_version\" = excluded.\"operator_version\", \
             \"meta\" = excluded.\"meta\"",
            self.ident.name
        );

        for revision in revisions {
            conn.exec(
                &sql,
                &[
                    Value::Text(revision.version.clone()),
                    Value::Text(revision.description.clone()),
                    Value::Text(revision.state.as_str().to_string()),
                    Value::Text(
                        revision
                            .executed_at
                            .format("%Y-%m-%d %H:%M:%S%.6f")
                            .to_string(),
                    ),
                    Value::Int(revision.execution_time.as_nanos().min(i64::MAX as u128) as i64),
                    Value::Text(revision.hash.clone()),
                    Value::Text(revision.operator_version.clone()),
                    Value::Text(revision.meta_json()?),
                ],
            )?;
        }
        Ok(())
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|source| Error::Internal(format!("parse revision timestamp {raw:?}: {source}")))
}
