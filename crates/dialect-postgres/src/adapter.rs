use driftql_core::{ConnectionConfig, Error, ExecQuerier, Result, Row, Value};
use postgres::{
    Client, NoTls,
    types::{ToSql, Type as PgType},
};

const DEFAULT_HOST: &str = "127.0.0.1";

// SQLSTATEs worth retrying besides the 08xxx connection class:
// deadlock_detected and lock_not_available.
const TRANSIENT_STATES: &[&str] = &["40P01", "55P03"];

/// Wire adapter over the `postgres` crate. One adapter owns one client;
/// session state (advisory locks, transactions) stays on it.
pub struct PostgresConn {
    client: Client,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<PostgresConn> {
    let mut pg = postgres::Config::new();
    if let Some(socket) = &config.socket {
        pg.host_path(socket);
    } else {
        pg.host(config.host.as_deref().unwrap_or(DEFAULT_HOST));
    }
    if let Some(port) = config.port {
        pg.port(port);
    }
    if let Some(user) = &config.user {
        pg.user(user);
    }
    if let Some(password) = &config.password {
        pg.password(password);
    }
    pg.dbname(&config.database);

    let client = pg
        .connect(NoTls)
        .map_err(|source| execution_error("CONNECT postgres", source))?;
    Ok(PostgresConn { client })
}

impl ExecQuerier for PostgresConn {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let owned = to_pg_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> = owned
            .iter()
            .map(|param| param.as_ref() as &(dyn ToSql + Sync))
            .collect();
        let rows = self
            .client
            .query(sql, &refs)
            .map_err(|source| execution_error(sql, source))?;
        rows.iter().map(|row| decode_row(sql, row)).collect()
    }

    fn exec(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        if params.is_empty() {
            // batch_execute handles multi-statement strings the planner may
            // hand over verbatim.
            self.client
                .batch_execute(sql)
                .map_err(|source| execution_error(sql, source))?;
            return Ok(0);
        }
        let owned = to_pg_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> = owned
            .iter()
            .map(|param| param.as_ref() as &(dyn ToSql + Sync))
            .collect();
        self.client
            .execute(sql, &refs)
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

fn decode_row(sql: &str, row: &postgres::Row) -> Result<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(decode_value(sql, row, index, column.type_())?);
    }
    Ok(Row::new(columns, values))
}

fn decode_value(sql: &str, row: &postgres::Row, index: usize, ty: &PgType) -> Result<Value> {
    let decoded = if *ty == PgType::BOOL {
        row.try_get::<_, Option<bool>>(index)
            .map(|opt| opt.map(Value::Bool))
    } else if *ty == PgType::INT2 {
        row.try_get::<_, Option<i16>>(index)
            .map(|opt| opt.map(|v| Value::Int(i64::from(v))))
    } else if *ty == PgType::INT4 {
        row.try_get::<_, Option<i32>>(index)
            .map(|opt| opt.map(|v| Value::Int(i64::from(v))))
    } else if *ty == PgType::INT8 {
        row.try_get::<_, Option<i64>>(index)
            .map(|opt| opt.map(Value::Int))
    } else if *ty == PgType::OID {
        row.try_get::<_, Option<u32>>(index)
            .map(|opt| opt.map(|v| Value::UInt(u64::from(v))))
    } else if *ty == PgType::FLOAT4 {
        row.try_get::<_, Option<f32>>(index)
            .map(|opt| opt.map(|v| Value::Float(f64::from(v))))
    } else if *ty == PgType::FLOAT8 {
        row.try_get::<_, Option<f64>>(index)
            .map(|opt| opt.map(Value::Float))
    } else if *ty == PgType::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(index)
            .map(|opt| opt.map(Value::Bytes))
    } else if *ty == PgType::CHAR {
        // pg_catalog "char" columns (typtype, contype) arrive as one byte.
        row.try_get::<_, Option<i8>>(index)
            .map(|opt| opt.map(|v| Value::Text((v as u8 as char).to_string())))
    } else {
        row.try_get::<_, Option<String>>(index)
            .map(|opt| opt.map(Value::Text))
    };

    Ok(decoded
        .map_err(|source| execution_error(sql, source))?
        .unwrap_or(Value::Null))
}

fn to_pg_params(params: &[Value]) -> Vec<Box<dyn ToSql + Sync>> {
    params
        .iter()
        .map(|param| -> Box<dyn ToSql + Sync> {
            match param {
                Value::Null => Box::new(Option::<String>::None),
                Value::Bool(value) => Box::new(*value),
                Value::Int(value) => Box::new(*value),
                Value::UInt(value) => Box::new(*value as i64),
                Value::Float(value) => Box::new(*value),
                Value::Text(value) => Box::new(value.clone()),
                Value::Bytes(value) => Box::new(value.clone()),
            }
        })
        .collect()
}

fn execution_error(sql: &str, source: postgres::Error) -> Error {
    let transient = source.code().is_some_and(|state| {
        state.code().starts_with("08") || TRANSIENT_STATES.contains(&state.code())
    });
    if transient {
        Error::exec_transient(sql, source).prefixed("postgres")
    } else {
        Error::exec(sql, source).prefixed("postgres")
    }
}
