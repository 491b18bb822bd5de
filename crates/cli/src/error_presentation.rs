use std::{io, path::PathBuf};

use anyhow::Context;
use driftql_core::Error as CoreError;
use miette::Report;

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

/// Exit codes surfaced to scripting callers.
pub(crate) const EXIT_USER_ERROR: i32 = 1;
pub(crate) const EXIT_NOT_CLEAN: i32 = 2;
pub(crate) const EXIT_CHECKSUM_MISMATCH: i32 = 3;
pub(crate) const EXIT_LOCK_TIMEOUT: i32 = 4;
pub(crate) const EXIT_ANALYSIS_BLOCKED: i32 = 5;

#[derive(Debug)]
pub(crate) enum CliError {
    InvalidUrl(String),
    UnknownDialect(String),
    ReadDir { path: PathBuf, source: io::Error },
    Core(CoreError),
}

impl From<CoreError> for CliError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}

impl CliError {
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Self::Core(error) => match error.root() {
                CoreError::NotClean { .. } => EXIT_NOT_CLEAN,
                CoreError::ChecksumMismatch
                | CoreError::ChecksumFormat(_)
                | CoreError::ChecksumNotFound => EXIT_CHECKSUM_MISMATCH,
                CoreError::Locked { .. } => EXIT_LOCK_TIMEOUT,
                CoreError::AnalysisBlocked { .. } => EXIT_ANALYSIS_BLOCKED,
                _ => EXIT_USER_ERROR,
            },
            _ => EXIT_USER_ERROR,
        }
    }
}

pub(crate) fn render_runtime_error(error: CliError) -> String {
    match error {
        CliError::InvalidUrl(url) => format!("[usage] cannot parse connection url {url:?}"),
        CliError::UnknownDialect(scheme) => {
            format!("[usage] no dialect is built for scheme {scheme:?}")
        }
        CliError::ReadDir { path, source } => {
            let context = format!("while opening migration directory `{}`", path.display());
            format!("[io] {}", report_with_context(source, context))
        }
        CliError::Core(source) => {
            let category = core_category(&source);
            format!(
                "[{category}] {}",
                report_with_context(source, "while running the requested operation")
            )
        }
    }
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let context = context.into();
    let anyhow_error = std::result::Result::<(), E>::Err(source)
        .context(context)
        .expect_err("context wrapping must produce an error");
    miette::miette!("{anyhow_error:#}")
}

fn core_category(error: &CoreError) -> &'static str {
    match error.root() {
        CoreError::NotExist { .. } => "inspect",
        CoreError::Locked { .. } => "lock",
        CoreError::NotClean { .. } => "clean",
        CoreError::ChecksumMismatch
        | CoreError::ChecksumFormat(_)
        | CoreError::ChecksumNotFound => "checksum",
        CoreError::MismatchedNames { .. } => "diff",
        CoreError::UnsupportedVersion { .. } | CoreError::Unsupported(_) => "unsupported",
        CoreError::AnalysisBlocked { .. } => "analysis",
        CoreError::Exec { .. } => "execute",
        _ => "internal",
    }
}

