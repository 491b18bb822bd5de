#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use driftql_core::{
    Change, Error, ExecQuerier, Result,
    diff::DiffDriver,
    driver::{CleanChecker, Driver, Lock, Locker, Restorer, Snapshoter, TypeParseFormatter},
    inspect::{InspectOptions, Inspector},
    migrate::{Plan, PlanApplier, PlanOptions, PlanStmt, RevisionIdent, ScanOptions},
    schema::{Column, Realm, Schema, Type},
};

/// A scripted dialect bundle for exercising the dialect-agnostic layers.
/// Inspection replays queued realms, planning lowers changes to trivial
/// SQL, and locking is an in-process name set.
#[derive(Default)]
pub struct FakeDriver {
    pub inspections: Mutex<VecDeque<Realm>>,
    pub locks: Arc<Mutex<Vec<String>>>,
    pub implicit_fill: Option<String>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_inspection(&self, realm: Realm) {
        self.inspections
            .lock()
            .expect("inspections poisoned")
            .push_back(realm);
    }
}

impl Inspector for FakeDriver {
    fn inspect_realm(&self, _conn: &mut dyn ExecQuerier, _opts: &InspectOptions) -> Result<Realm> {
        Ok(self
            .inspections
            .lock()
            .expect("inspections poisoned")
            .pop_front()
            .unwrap_or_default())
    }

    fn inspect_schema(
        &self,
        conn: &mut dyn ExecQuerier,
        name: Option<&str>,
        opts: &InspectOptions,
    ) -> Result<Schema> {
        let realm = self.inspect_realm(conn, opts)?;
        let wanted = name.unwrap_or("main");
        realm
            .schemas
            .into_iter()
            .find(|schema| schema.name == wanted)
            .ok_or_else(|| Error::NotExist {
                kind: "schema",
                name: wanted.to_string(),
            })
    }
}

impl DiffDriver for FakeDriver {}

impl PlanApplier for FakeDriver {
    fn plan_changes(&self, name: &str, changes: &[Change], _opts: &PlanOptions) -> Result<Plan> {
        let mut stmts = Vec::new();
        for change in changes {
            match change {
                Change::AddSchema(schema) => stmts.push(
                    PlanStmt::new(format!("CREATE SCHEMA {}", schema.name))
                        .reversible(format!("DROP SCHEMA {}", schema.name)),
                ),
                Change::DropSchema { name } => {
                    stmts.push(PlanStmt::new(format!("DROP SCHEMA {name}")));
                }
                Change::AddTable(table) => stmts.push(
                    PlanStmt::new(format!("CREATE TABLE {}", table.name))
                        .reversible(format!("DROP TABLE {}", table.name))
                        .commented(format!("create {:?}", table.name)),
                ),
                Change::DropTable { name, .. } => {
                    stmts.push(PlanStmt::new(format!("DROP TABLE {name}")));
                }
                Change::ModifyTable { table, changes } => {
                    for table_change in changes {
                        stmts.push(PlanStmt::new(format!(
                            "ALTER TABLE {} /* {} */",
                            table.name,
                            table_change.tag()
                        )));
                    }
                }
                other => stmts.push(PlanStmt::new(format!("-- {}", other.tag()))),
            }
        }
        Ok(Plan::from_stmts(name, true, stmts))
    }
}

struct HeldLock {
    name: String,
    released: bool,
    locks: Arc<Mutex<Vec<String>>>,
}

impl Lock for HeldLock {
    fn release(&mut self, _conn: &mut dyn ExecQuerier) -> Result<()> {
        if self.released {
            return Err(Error::Internal(format!(
                "lock {:?} already released",
                self.name
            )));
        }
        self.released = true;
        self.locks
            .lock()
            .expect("locks poisoned")
            .retain(|held| held != &self.name);
        Ok(())
    }
}

impl Locker for FakeDriver {
    fn lock(
        &self,
        _conn: &mut dyn ExecQuerier,
        name: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Lock>> {
        let mut locks = self.locks.lock().expect("locks poisoned");
        if locks.iter().any(|held| held == name) {
            return Err(Error::Locked {
                name: name.to_string(),
                timeout,
            });
        }
        locks.push(name.to_string());
        Ok(Box::new(HeldLock {
            name: name.to_string(),
            released: false,
            locks: Arc::clone(&self.locks),
        }))
    }
}

struct NoopRestorer;

impl Restorer for NoopRestorer {
    fn restore(&self, _conn: &mut dyn ExecQuerier) -> Result<()> {
        Ok(())
    }
}

impl Snapshoter for FakeDriver {
    fn snapshot(&self, _conn: &mut dyn ExecQuerier) -> Result<Box<dyn Restorer>> {
        Ok(Box::new(NoopRestorer))
    }
}

impl CleanChecker for FakeDriver {
    fn check_clean(
        &self,
        _conn: &mut dyn ExecQuerier,
        _revision_ident: Option<&RevisionIdent>,
    ) -> Result<()> {
        Ok(())
    }
}

impl TypeParseFormatter for FakeDriver {
    fn parse_type(&self, raw: &str) -> Result<Type> {
        Ok(Type::Unsupported(raw.to_string()))
    }

    fn format_type(&self, ty: &Type) -> Result<String> {
        match ty {
            Type::Unsupported(raw) => Ok(raw.clone()),
            other => Err(Error::Unsupported(format!("format {other:?}"))),
        }
    }
}

impl Driver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn inspector(&self) -> &dyn Inspector {
        self
    }

    fn diff_driver(&self) -> &dyn DiffDriver {
        self
    }

    fn plan_applier(&self) -> &dyn PlanApplier {
        self
    }

    fn locker(&self) -> &dyn Locker {
        self
    }

    fn snapshoter(&self) -> &dyn Snapshoter {
        self
    }

    fn clean_checker(&self) -> &dyn CleanChecker {
        self
    }

    fn types(&self) -> &dyn TypeParseFormatter {
        self
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions::default()
    }

    fn implicit_default(&self, _column: &Column) -> Option<String> {
        self.implicit_fill.clone()
    }
}
