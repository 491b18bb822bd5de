use driftql_core::{ConnectionConfig, Error, ExecQuerier, Result, Row, Value};
use mysql::{OptsBuilder, Pool, PooledConn, prelude::Queryable};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3306;

// Server errors an operator can retry: lock wait timeout and deadlock victim.
const TRANSIENT_SERVER_ERRORS: &[u16] = &[1205, 1213];

/// Wire adapter over the `mysql` crate. One adapter owns one pooled
/// connection; session state (advisory locks, transactions) stays on it.
pub struct MySqlConn {
    conn: PooledConn,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<MySqlConn> {
    let mut opts = OptsBuilder::new()
        .ip_or_hostname(Some(
            config.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
        ))
        .tcp_port(config.port.unwrap_or(DEFAULT_PORT))
        .user(config.user.clone())
        .pass(config.password.clone());
    if !config.database.is_empty() {
        opts = opts.db_name(Some(config.database.clone()));
    }
    if let Some(socket) = &config.socket {
        opts = opts.socket(Some(socket.clone()));
    }

    let pool = Pool::new(opts).map_err(|source| execution_error("CONNECT mysql", source))?;
    let conn = pool
        .get_conn()
        .map_err(|source| execution_error("CONNECT mysql", source))?;
    Ok(MySqlConn { conn })
}

impl ExecQuerier for MySqlConn {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let result: Vec<mysql::Row> = if params.is_empty() {
            self.conn
                .query(sql)
                .map_err(|source| execution_error(sql, source))?
        } else {
            self.conn
                .exec(sql, to_mysql_params(params))
                .map_err(|source| execution_error(sql, source))?
        };

        Ok(result.into_iter().map(decode_row).collect())
    }

    fn exec(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        if params.is_empty() {
            self.conn
                .query_drop(sql)
                .map_err(|source| execution_error(sql, source))?;
        } else {
            self.conn
                .exec_drop(sql, to_mysql_params(params))
                .map_err(|source| execution_error(sql, source))?;
        }
        Ok(self.conn.affected_rows())
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

fn decode_row(row: mysql::Row) -> Row {
    let columns = row
        .columns_ref()
        .iter()
        .map(|column| column.name_str().into_owned())
        .collect::<Vec<_>>();
    let values = row
        .unwrap()
        .into_iter()
        .map(decode_value)
        .collect::<Vec<_>>();
    Row::new(columns, values)
}

fn decode_value(value: mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(error) => Value::Bytes(error.into_bytes()),
        },
        mysql::Value::Int(value) => Value::Int(value),
        mysql::Value::UInt(value) => Value::UInt(value),
        mysql::Value::Float(value) => Value::Float(f64::from(value)),
        mysql::Value::Double(value) => Value::Float(value),
        date @ mysql::Value::Date(..) | date @ mysql::Value::Time(..) => {
            Value::Text(date.as_sql(true).trim_matches('\'').to_string())
        }
    }
}

fn to_mysql_params(params: &[Value]) -> mysql::Params {
    mysql::Params::Positional(params.iter().map(to_mysql_value).collect())
}

fn to_mysql_value(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Bool(value) => mysql::Value::Int(i64::from(*value)),
        Value::Int(value) => mysql::Value::Int(*value),
        Value::UInt(value) => mysql::Value::UInt(*value),
        Value::Float(value) => mysql::Value::Double(*value),
        Value::Text(value) => mysql::Value::Bytes(value.clone().into_bytes()),
        Value::Bytes(value) => mysql::Value::Bytes(value.clone()),
    }
}

fn execution_error(sql: &str, source: mysql::Error) -> Error {
    if is_transient(&source) {
        Error::exec_transient(sql, source).prefixed("mysql")
    } else {
        Error::exec(sql, source).prefixed("mysql")
    }
}

fn is_transient(error: &mysql::Error) -> bool {
    match error {
        mysql::Error::MySqlError(server) => TRANSIENT_SERVER_ERRORS.contains(&server.code),
        mysql::Error::IoError(_) => true,
        _ => false,
    }
}
