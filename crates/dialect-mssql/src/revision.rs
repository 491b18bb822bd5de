use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use driftql_core::{
    Error, ExecQuerier, Result, Value,
    migrate::{
        DEFAULT_REVISION_SCHEMA, ExecutionState, REVISION_TABLE, Revision, RevisionIdent,
        RevisionReadWriter,
    },
};

/// Revision log persisted in a SQL Server table, created lazily in the
/// chosen schema on first use.
pub struct MssqlRevisions {
    ident: RevisionIdent,
    ensured: AtomicBool,
}

impl MssqlRevisions {
    #[must_use]
    pub fn new(schema: Option<&str>) -> Self {
        Self {
            ident: RevisionIdent {
                schema: schema.unwrap_or(DEFAULT_REVISION_SCHEMA).to_string(),
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
                "IF SCHEMA_ID('{0}') IS NULL EXEC('CREATE SCHEMA [{0}]')",
                self.ident.schema
            ),
            &[],
        )?;
        conn.exec(
            &format!(
                "IF OBJECT_ID('[{0}].[{1}]') IS NULL \
                 CREATE TABLE [{0}].[{1}] (\
                 [version] nvarchar(255) NOT NULL PRIMARY KEY, \
                 [description] nvarchar(255) NOT NULL, \
                 [execution_state] nvarchar(16) NOT NULL, \
                 [executed_at] datetime2(6) NOT NULL, \
                 [execution_time] bigint NOT NULL, \
                 [hash] nvarchar(255) NOT NULL, \
                 [operator_version] nvarchar(255) NOT NULL, \
                 [meta] nvarchar(MAX) NOT NULL)",
                self.ident.schema, self.ident.name
            ),
            &[],
        )?;
        self.ensured.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl RevisionReadWriter for MssqlRevisions {
    fn ident(&self) -> RevisionIdent {
        self.ident.clone()
    }

    fn read(&self, conn: &mut dyn ExecQuerier) -> Result<Vec<Revision>> {
        self.ensure(conn)?;
        let rows = conn.query(
            &format!(
                "SELECT [version], [description], [execution_state], \
                 CONVERT(nvarchar(32), [executed_at], 121) AS [executed_at], \
                 [execution_time], [hash], [operator_version], [meta] \
                 FROM [{}].[{}] ORDER BY [version]",
                self.ident.schema, self.ident.name
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
        let update = format!(
            "UPDATE [{}].[{}] SET [description] = @P2, [execution_state] = @P3, \
             [executed_at] = @P4, [execution_time] = @P5, [hash] = @P6, \
             [operator_version] = @P7, [meta] = @P8 WHERE [version] = @P1",
            self.ident.schema, self.ident.name
        );
        let insert = format!(
            "INSERT INTO [{}].[{}] \
             ([version], [description], [execution_state], [executed_at], \
              [execution_time], [hash], [operator_version], [meta]) \
             VALUES (@P1, @P2, @P3, @P4, @P5, @P6, @P7, @P8)",
            self.ident.schema, self.ident.name
        );

        for revision in revisions {
            let params = [
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
            ];
            if conn.exec(&update, &params)? == 0 {
                conn.exec(&insert, &params)?;
            }
        }
        Ok(())
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|source| Error::Internal(format!("parse revision timestamp {raw:?}: {source}")))
}
