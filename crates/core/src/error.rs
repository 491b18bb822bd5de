use std::{io, time::Duration};

use thiserror::Error as ThisError;

/// Errors surfaced by the core and by dialect drivers.
///
/// Variants map one-to-one onto caller-visible failure classes: callers
/// dispatch on the variant (the CLI turns them into exit codes), so drivers
/// must not collapse distinct classes into `Internal`.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{kind} {name:?} does not exist")]
    NotExist { kind: &'static str, name: String },

    #[error("advisory lock {name:?} not acquired within {timeout:?}")]
    Locked { name: String, timeout: Duration },

    #[error("connected {state} is not clean: {reason}")]
    NotClean { state: String, reason: String },

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("malformed checksum file: {0}")]
    ChecksumFormat(String),

    #[error("checksum file not found")]
    ChecksumNotFound,

    #[error("mismatched element names: {from:?} != {to:?}")]
    MismatchedNames { from: String, to: String },

    #[error("{feature} is not supported by the connected server version {version}")]
    UnsupportedVersion { feature: String, version: String },

    #[error("unsupported change: {0}")]
    Unsupported(String),

    #[error("analysis reported {errors} blocking diagnostic(s)")]
    AnalysisBlocked { errors: usize },

    #[error("execute {statement:?} failed")]
    Exec {
        statement: String,
        transient: bool,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("decode column {column:?}: expected {expected}")]
    Decode {
        column: String,
        expected: &'static str,
    },

    #[error("{prefix}: {source}")]
    Dialect {
        prefix: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Wraps an error with a dialect prefix, e.g. `mysql: ...`. Already
    /// prefixed errors are returned unchanged so nested driver calls do not
    /// stack prefixes.
    #[must_use]
    pub fn prefixed(self, prefix: &'static str) -> Self {
        match self {
            Self::Dialect { .. } => self,
            other => Self::Dialect {
                prefix,
                source: Box::new(other),
            },
        }
    }

    /// The error beneath any dialect prefix. Callers classifying failures
    /// (exit codes, retry policy) dispatch on this, not on `self`.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Dialect { source, .. } => source.root(),
            other => other,
        }
    }

    #[must_use]
    pub fn exec<E>(statement: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Exec {
            statement: statement.into(),
            transient: false,
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn exec_transient<E>(statement: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Exec {
            statement: statement.into(),
            transient: true,
            source: Box::new(source),
        }
    }

    /// Transient failures (lost connection, deadlock victim) may be retried
    /// by the operator; permanent ones (syntax, constraint) must not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self.root(), Self::Exec { transient: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
