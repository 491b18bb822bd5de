use std::{sync::atomic::{AtomicBool, Ordering}, time::Duration};

use chrono_compat::{format_ts, parse_ts};
use driftql_core::{
    ExecQuerier, Result, Value,
    migrate::{
        DEFAULT_REVISION_SCHEMA, ExecutionState, REVISION_TABLE, Revision, RevisionIdent,
        RevisionReadWriter,
    },
};

/// Revision log persisted in a MySQL table, created lazily in the chosen
/// schema on first use.
pub struct MySqlRevisions {
    ident: RevisionIdent,
    ensured: AtomicBool,
}

impl MySqlRevisions {
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
            &format!("CREATE DATABASE IF NOT EXISTS `{}`", self.ident.schema),
            &[],
        )?;
        conn.exec(
            &format!(
                "CREATE TABLE IF NOT EXISTS `{}`.`{}` (\
                 `version` varchar(255) NOT NULL, \
                 `description` varchar(255) NOT NULL, \
                 `execution_state` varchar(16) NOT NULL, \
                 `executed_at` timestamp(6) NOT NULL, \
                 `execution_time` bigint NOT NULL, \
                 `hash` varchar(255) NOT NULL, \
                 `operator_version` varchar(255) NOT NULL, \
                 `meta` json NOT NULL, \
                 PRIMARY KEY (`version`))",
                self.ident.schema, self.ident.name
            ),
            &[],
        )?;
        self.ensured.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl RevisionReadWriter for MySqlRevisions {
    fn ident(&self) -> RevisionIdent {
        self.ident.clone()
    }

    fn read(&self, conn: &mut dyn ExecQuerier) -> Result<Vec<Revision>> {
        self.ensure(conn)?;
        let rows = conn.query(
            &format!(
                "SELECT `version`, `description`, `execution_state`, \
                 CAST(`executed_at` AS char) AS `executed_at`, `execution_time`, \
                 `hash`, `operator_version`, CAST(`meta` AS char) AS `meta` \
                 FROM `{}`.`{}` ORDER BY `version`",
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
        let sql = format!(
            "INSERT INTO `{}`.`{}` \
             (`version`, `description`, `execution_state`, `executed_at`, `execution_time`, \
              `hash`, `operator_version`, `meta`) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE \
             `description` = VALUES(`description`), \
             `execution_state` = VALUES(`execution_state`), \
             `executed_at` = VALUES(`executed_at`), \
             `execution_time` = VALUES(`execution_time`), \
             `hash` = VALUES(`hash`), \
             `operator_version` = VALUES(`operator_version`), \
             `meta` = VALUES(`meta`)",
            self.ident.schema, self.ident.name
        );

        for revision in revisions {
            conn.exec(
                &sql,
                &[
                    Value::Text(revision.version.clone()),
                    Value::Text(revision.description.clone()),
                    Value::Text(revision.state.as_str().to_string()),
                    Value::Text(format_ts(revision.executed_at)),
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

mod chrono_compat {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use driftql_core::{Error, Result};

    pub fn format_ts(ts: DateTime<Utc>) -> String {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }

    pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|source| Error::Internal(format!("parse revision timestamp {raw:?}: {source}")))
    }
}
