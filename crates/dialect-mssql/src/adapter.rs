use std::borrow::Cow;

use driftql_core::{ConnectionConfig, Error, ExecQuerier, Result, Row, Value};
use futures_util::TryStreamExt as _;
use tiberius::{AuthMethod, Client, ColumnData, Config, ToSql};
use tokio::{net::TcpStream, runtime::Runtime};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt as _};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 1433;

// Deadlock victim and lock timeout are retryable.
const TRANSIENT_SERVER_ERRORS: &[u32] = &[1205, 1222];

/// Wire adapter over `tiberius`. The async client is driven by a private
/// current-thread runtime so the capability surface stays synchronous.
pub struct MssqlConn {
    runtime: Runtime,
    client: Client<Compat<TcpStream>>,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<MssqlConn> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| Error::exec("CONNECT mssql", source).prefixed("mssql"))?;

    let mut tds = Config::new();
    tds.host(config.host.as_deref().unwrap_or(DEFAULT_HOST));
    tds.port(config.port.unwrap_or(DEFAULT_PORT));
    if !config.database.is_empty() {
        tds.database(&config.database);
    }
    if let Some(user) = &config.user {
        tds.authentication(AuthMethod::sql_server(
            user,
            config.password.as_deref().unwrap_or_default(),
        ));
    }
    tds.trust_cert();

    let client = runtime
        .block_on(async {
            let tcp = TcpStream::connect(tds.get_addr()).await?;
            tcp.set_nodelay(true)?;
            Client::connect(tds, tcp.compat_write())
                .await
                .map_err(std::io::Error::other)
        })
        .map_err(|source| Error::exec("CONNECT mssql", source).prefixed("mssql"))?;

    Ok(MssqlConn { runtime, client })
}

impl ExecQuerier for MssqlConn {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let bound = bind(params);
        let refs: Vec<&dyn ToSql> = bound.iter().map(|param| param as &dyn ToSql).collect();
        let client = &mut self.client;
        self.runtime
            .block_on(async {
                let stream = client.query(sql, &refs).await?;
                let rows: Vec<tiberius::Row> = stream
                    .into_row_stream()
                    .try_collect()
                    .await?;
                Ok::<_, tiberius::error::Error>(rows)
            })
            .map(|rows| rows.into_iter().map(decode_row).collect())
            .map_err(|source| execution_error(sql, source))
    }

    fn exec(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let bound = bind(params);
        let refs: Vec<&dyn ToSql> = bound.iter().map(|param| param as &dyn ToSql).collect();
        let client = &mut self.client;
        self.runtime
            .block_on(async { client.execute(sql, &refs).await })
            .map(|result| result.total())
            .map_err(|source| execution_error(sql, source))
    }

    fn begin(&mut self) -> Result<()> {
        self.exec("BEGIN TRANSACTION", &[]).map(|_| ())
    }

    fn commit(&mut self) -> Result<()> {
        self.exec("COMMIT TRANSACTION", &[]).map(|_| ())
    }

    fn rollback(&mut self) -> Result<()> {
        self.exec("ROLLBACK TRANSACTION", &[]).map(|_| ())
    }
}

struct Bound(Value);

impl ToSql for Bound {
    fn to_sql(&self) -> ColumnData<'_> {
        match &self.0 {
            Value::Null => ColumnData::String(None),
            Value::Bool(value) => ColumnData::Bit(Some(*value)),
            Value::Int(value) => ColumnData::I64(Some(*value)),
            Value::UInt(value) => ColumnData::I64(Some(*value as i64)),
            Value::Float(value) => ColumnData::F64(Some(*value)),
            Value::Text(value) => ColumnData::String(Some(Cow::from(value.as_str()))),
            Value::Bytes(value) => ColumnData::Binary(Some(Cow::from(value.as_slice()))),
        }
    }
}

fn bind(params: &[Value]) -> Vec<Bound> {
    params.iter().cloned().map(Bound).collect()
}

fn decode_row(row: tiberius::Row) -> Row {
    let columns: Vec<String> = row
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();
    let values = row.into_iter().map(decode_value).collect();
    Row::new(columns, values)
}

fn decode_value(data: ColumnData<'static>) -> Value {
    match data {
        ColumnData::U8(value) => opt(value.map(|v| Value::UInt(u64::from(v)))),
        ColumnData::I16(value) => opt(value.map(|v| Value::Int(i64::from(v)))),
        ColumnData::I32(value) => opt(value.map(|v| Value::Int(i64::from(v)))),
        ColumnData::I64(value) => opt(value.map(Value::Int)),
        ColumnData::F32(value) => opt(value.map(|v| Value::Float(f64::from(v)))),
        ColumnData::F64(value) => opt(value.map(Value::Float)),
        ColumnData::Bit(value) => opt(value.map(Value::Bool)),
        ColumnData::String(value) => opt(value.map(|v| Value::Text(v.into_owned()))),
        ColumnData::Binary(value) => opt(value.map(|v| Value::Bytes(v.into_owned()))),
        _ => Value::Null,
    }
}

fn opt(value: Option<Value>) -> Value {
    value.unwrap_or(Value::Null)
}

fn execution_error(sql: &str, source: tiberius::error::Error) -> Error {
    let transient = match &source {
        tiberius::error::Error::Io { .. } => true,
        tiberius::error::Error::Server(token) => {
            TRANSIENT_SERVER_ERRORS.contains(&token.code())
        }
        _ => false,
    };
    if transient {
        Error::exec_transient(sql, source).prefixed("mssql")
    } else {
        Error::exec(sql, source).prefixed("mssql")
    }
}
