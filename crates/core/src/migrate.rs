mod apply;
mod archive;
mod dir;
mod lockfile;
mod plan;
mod revision;
mod scan;
mod sum;

pub use apply::{ApplyOptions, ApplyReport, Applier, DEFAULT_LOCK_NAME, TxMode};
pub use archive::{archive_dir, unarchive_dir};
pub use dir::{Dir, LocalDir, MemDir, MigrationFile};
pub use lockfile::{FileLock, FlockLocker};
pub use plan::{Formatter, Plan, PlanApplier, PlanOptions, PlanStmt};
pub use revision::{
    DEFAULT_REVISION_SCHEMA, ExecutionState, MemRevisions, REVISION_TABLE, Revision,
    RevisionIdent, RevisionReadWriter,
};
pub use scan::{ScanOptions, Stmt, directive, file_directives, scan, stmts};
pub use sum::{HashEntry, HashFile, SUM_FILENAME, file_hash, validate, write_sum};
