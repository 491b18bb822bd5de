use std::time::Duration;

use crate::{
    ExecQuerier, Result,
    diff::DiffDriver,
    inspect::Inspector,
    migrate::{PlanApplier, RevisionIdent, ScanOptions},
    schema::{Column, Realm, Schema, Type},
};

/// Named, cooperative cross-process mutex provided by the database engine
/// (or a lock file where the engine has none). Two appliers contending for
/// the same name serialize on it.
pub trait Locker {
    /// Fails with [`crate::Error::Locked`] when the lock cannot be acquired
    /// within the timeout.
    fn lock(
        &self,
        conn: &mut dyn ExecQuerier,
        name: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Lock>>;
}

/// A held advisory lock. `release` surfaces an error when the lock is no
/// longer held; releasing twice is such a case.
pub trait Lock {
    fn release(&mut self, conn: &mut dyn ExecQuerier) -> Result<()>;
}

/// Captures the target's clean state and hands back a restorer that drops
/// whatever was created since. Refuses with [`crate::Error::NotClean`] when
/// user objects beyond the revision table already exist.
pub trait Snapshoter {
    fn snapshot(&self, conn: &mut dyn ExecQuerier) -> Result<Box<dyn Restorer>>;
}

/// Returns the target to its captured empty state. Idempotent: restoring an
/// already-restored target is a no-op.
pub trait Restorer {
    fn restore(&self, conn: &mut dyn ExecQuerier) -> Result<()>;
}

pub trait CleanChecker {
    /// Succeeds only when the connected schema or realm is empty modulo the
    /// given revision table.
    fn check_clean(
        &self,
        conn: &mut dyn ExecQuerier,
        revision_ident: Option<&RevisionIdent>,
    ) -> Result<()>;
}

/// Column type codec. `parse_type(format_type(t)) == t` must hold for every
/// supported type, modulo each dialect's documented normalizations.
pub trait TypeParseFormatter {
    fn parse_type(&self, raw: &str) -> Result<Type>;

    fn format_type(&self, ty: &Type) -> Result<String>;
}

/// Canonicalizes a desired model by roundtripping it through a scratch
/// schema on a dev connection, capturing dialect-chosen defaults the way the
/// server itself spells them. The dev database must be distinct from the
/// target.
pub trait Normalizer {
    fn normalize_schema(&self, dev: &mut dyn ExecQuerier, schema: &Schema) -> Result<Schema>;

    fn normalize_realm(&self, dev: &mut dyn ExecQuerier, realm: &Realm) -> Result<Realm>;
}

/// A per-RDBMS driver bundle. The orchestrator and applier consume dialects
/// exclusively through this surface.
pub trait Driver {
    /// Dialect name used as error prefix, e.g. `mysql`.
    fn name(&self) -> &'static str;

    fn inspector(&self) -> &dyn Inspector;

    fn diff_driver(&self) -> &dyn DiffDriver;

    fn plan_applier(&self) -> &dyn PlanApplier;

    fn locker(&self) -> &dyn Locker;

    fn snapshoter(&self) -> &dyn Snapshoter;

    fn clean_checker(&self) -> &dyn CleanChecker;

    fn types(&self) -> &dyn TypeParseFormatter;

    fn scan_options(&self) -> ScanOptions;

    fn normalizer(&self) -> Option<&dyn Normalizer> {
        None
    }

    /// The value the server implicitly fills into existing rows when a NOT
    /// NULL column is added without a default, when the dialect does that at
    /// all. Consumed by the data-dependent analyzer.
    fn implicit_default(&self, _column: &Column) -> Option<String> {
        None
    }
}
