use std::path::PathBuf;

use driftql_core::{ConnectionConfig, Error, ExecQuerier, Result, Row, Value};
use rusqlite::{Connection, types::ValueRef};

/// Wire adapter over `rusqlite`. `database` is the file path, or
/// `:memory:` for an in-process database.
pub struct SQLiteConn {
    conn: Connection,
    path: Option<PathBuf>,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<SQLiteConn> {
    if config.database == ":memory:" || config.database.is_empty() {
        let conn = Connection::open_in_memory()
            .map_err(|source| execution_error("CONNECT sqlite", source))?;
        return Ok(SQLiteConn { conn, path: None });
    }
    let path = PathBuf::from(&config.database);
    let conn =
        Connection::open(&path).map_err(|source| execution_error("CONNECT sqlite", source))?;
    Ok(SQLiteConn {
        conn,
        path: Some(path),
    })
}

impl SQLiteConn {
    /// Directory holding the database file, where the advisory lock file
    /// lives. In-memory databases fall back to the system temp directory.
    #[must_use]
    pub fn lock_dir(&self) -> PathBuf {
        self.path
            .as_ref()
            .and_then(|path| path.parent().map(PathBuf::from))
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl ExecQuerier for SQLiteConn {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|source| execution_error(sql, source))?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| (*name).to_string())
            .collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(to_sqlite)))
            .map_err(|source| execution_error(sql, source))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|source| execution_error(sql, source))? {
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                let value = row
                    .get_ref(index)
                    .map_err(|source| execution_error(sql, source))?;
                values.push(decode_value(value));
            }
            out.push(Row::new(columns.clone(), values));
        }
        Ok(out)
    }

    fn exec(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        if params.is_empty() {
            self.conn
                .execute_batch(sql)
                .map_err(|source| execution_error(sql, source))?;
            return Ok(self.conn.changes());
        }
        self.conn
            .execute(sql, rusqlite::params_from_iter(params.iter().map(to_sqlite)))
            .map(|changed| changed as u64)
            .map_err(|source| execution_error(sql, source))
    }

    fn begin(&mut self) -> Result<()> {
        self.exec("BEGIN", &[]).map(|_| ())
    }

    fn commit(&mut self) -> Result<()> {
        self.exec("COMMIT", &[]).map(|_| ())
    }

    fn rollback(&mut self) -> Result<()> {
        self.exec("ROLLBACK", &[]).map(|_| ())
    }
}

fn decode_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Int(value),
        ValueRef::Real(value) => Value::Float(value),
        ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::Bytes(blob.to_vec()),
    }
}

fn to_sqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sq;
    match value {
        Value::Null => Sq::Null,
        Value::Bool(value) => Sq::Integer(i64::from(*value)),
        Value::Int(value) => Sq::Integer(*value),
        Value::UInt(value) => Sq::Integer(*value as i64),
        Value::Float(value) => Sq::Real(*value),
        Value::Text(value) => Sq::Text(value.clone()),
        Value::Bytes(value) => Sq::Blob(value.clone()),
    }
}

fn execution_error(sql: &str, source: rusqlite::Error) -> Error {
    let transient = matches!(
        &source,
        rusqlite::Error::SqliteFailure(error, _)
            if error.code == rusqlite::ErrorCode::DatabaseBusy
                || error.code == rusqlite::ErrorCode::DatabaseLocked
    );
    if transient {
        Error::exec_transient(sql, source).prefixed("sqlite")
    } else {
        Error::exec(sql, source).prefixed("sqlite")
    }
}
