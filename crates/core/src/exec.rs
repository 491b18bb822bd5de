use std::collections::BTreeMap;

use crate::{Error, Result};

/// A single dialect-decoded SQL value. Drivers decode their wire formats
/// into this closed set before rows cross the capability boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// A row keyed by column name, as returned by [`ExecQuerier::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|name| name == column)?;
        self.values.get(index)
    }

    pub fn text(&self, column: &str) -> Result<String> {
        match self.get(column) {
            Some(Value::Text(value)) => Ok(value.clone()),
            Some(Value::Bytes(bytes)) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            _ => Err(decode_error(column, "text")),
        }
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>> {
        match self.get(column) {
            Some(Value::Null) | None => Ok(None),
            _ => self.text(column).map(Some),
        }
    }

    pub fn int(&self, column: &str) -> Result<i64> {
        match self.get(column) {
            Some(Value::Int(value)) => Ok(*value),
            Some(Value::UInt(value)) => i64::try_from(*value)
                .map_err(|_| decode_error(column, "64-bit signed integer")),
            Some(Value::Text(value)) => value
                .parse()
                .map_err(|_| decode_error(column, "64-bit signed integer")),
            _ => Err(decode_error(column, "64-bit signed integer")),
        }
    }

    pub fn opt_int(&self, column: &str) -> Result<Option<i64>> {
        match self.get(column) {
            Some(Value::Null) | None => Ok(None),
            _ => self.int(column).map(Some),
        }
    }

    pub fn uint(&self, column: &str) -> Result<u64> {
        match self.get(column) {
            Some(Value::UInt(value)) => Ok(*value),
            Some(Value::Int(value)) => u64::try_from(*value)
                .map_err(|_| decode_error(column, "64-bit unsigned integer")),
            Some(Value::Text(value)) => value
                .parse()
                .map_err(|_| decode_error(column, "64-bit unsigned integer")),
            _ => Err(decode_error(column, "64-bit unsigned integer")),
        }
    }

    /// Booleans arrive as native bools, integers, or `YES`/`NO` strings
    /// depending on the catalog queried.
    pub fn bool(&self, column: &str) -> Result<bool> {
        match self.get(column) {
            Some(Value::Bool(value)) => Ok(*value),
            Some(Value::Int(value)) => Ok(*value != 0),
            Some(Value::UInt(value)) => Ok(*value != 0),
            Some(Value::Text(value)) => match value.as_str() {
                "YES" | "yes" | "1" | "true" | "t" => Ok(true),
                "NO" | "no" | "0" | "false" | "f" => Ok(false),
                _ => Err(decode_error(column, "boolean")),
            },
            _ => Err(decode_error(column, "boolean")),
        }
    }
}

fn decode_error(column: &str, expected: &'static str) -> Error {
    Error::Decode {
        column: column.to_string(),
        expected,
    }
}

/// Wire capability every dialect adapter provides. Inspection, application,
/// locking, and revision persistence all run through this one seam; the
/// concrete client crate never leaks past the dialect crate that owns it.
pub trait ExecQuerier {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    fn exec(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

/// Connection parameters handed to a dialect's `connect`. URL parsing is the
/// caller's concern; dialect-specific knobs ride in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub socket: Option<String>,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    #[must_use]
    pub fn at_least(&self, major: u16, minor: u16, patch: u16) -> bool {
        *self >= Self::new(major, minor, patch)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
