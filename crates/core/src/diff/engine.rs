use enumflags2::BitFlags;

use super::break_add_cycles;
use crate::{
    AttrChange, Change, ColumnChange, Error, ForeignKeyChange, IndexChange, Result, TableChange,
    schema::{
        Attr, AttrKind, Check, Column, DefaultValue, ForeignKey, Index, Realm, Schema, Table, attr,
    },
};

/// Element-level comparison hooks a dialect installs into the shared
/// [`DiffEngine`] skeleton. Defaults implement the dialect-agnostic
/// semantics; drivers override where server behavior deviates (float
/// subtype normalization, populated decimal defaults, version gates).
pub trait DiffDriver {
    /// A type change triggers iff the typed variants differ structurally or
    /// the raw strings differ.
    fn column_type_changed(&self, from: &Column, to: &Column) -> Result<bool> {
        Ok(from.ty.ty != to.ty.ty || from.ty.raw != to.ty.raw)
    }

    fn defaults_equal(&self, from: Option<&DefaultValue>, to: Option<&DefaultValue>) -> bool {
        from == to
    }

    /// Table attribute diff beyond the generic comment/charset/collation
    /// handling, e.g. engine or create options.
    fn table_attr_changes(&self, from: &Table, to: &Table) -> Vec<TableChange> {
        let mut changes = Vec::new();
        for kind in [AttrKind::Charset, AttrKind::Collation, AttrKind::Comment] {
            push_attr_change(&mut changes, &from.attrs, &to.attrs, kind);
        }
        changes
    }

    fn schema_attr_changes(&self, from: &Schema, to: &Schema) -> Vec<AttrChange> {
        let mut changes = Vec::new();
        for kind in [AttrKind::Charset, AttrKind::Collation, AttrKind::Comment] {
            match (attr::find(&from.attrs, kind), attr::find(&to.attrs, kind)) {
                (None, Some(added)) => changes.push(AttrChange::Add(added.clone())),
                (Some(_), None) => changes.push(AttrChange::Drop(kind)),
                (Some(before), Some(after)) if before != after => {
                    changes.push(AttrChange::Modify {
                        from: before.clone(),
                        to: after.clone(),
                    });
                }
                _ => {}
            }
        }
        changes
    }

    /// Whether non-comment index attributes (type, parser, predicate) differ.
    fn index_attrs_changed(&self, from: &Index, to: &Index) -> bool {
        non_comment_attrs(&from.attrs) != non_comment_attrs(&to.attrs)
    }
}

fn push_attr_change(
    changes: &mut Vec<TableChange>,
    from: &[Attr],
    to: &[Attr],
    kind: AttrKind,
) {
    match (attr::find(from, kind), attr::find(to, kind)) {
        (None, Some(added)) => changes.push(TableChange::AddAttr(added.clone())),
        (Some(_), None) => changes.push(TableChange::DropAttr(kind)),
        (Some(before), Some(after)) if before != after => changes.push(TableChange::ModifyAttr {
            from: before.clone(),
            to: after.clone(),
        }),
        _ => {}
    }
}

fn non_comment_attrs(attrs: &[Attr]) -> Vec<&Attr> {
    attrs
        .iter()
        .filter(|a| a.kind() != AttrKind::Comment)
        .collect()
}

/// Dialect-agnostic differ skeleton. Child elements are compared in
/// `from` order for drops and modifies and in `to` order for adds, so the
/// emitted change list is deterministic and stable.
pub struct DiffEngine<'a> {
    driver: &'a dyn DiffDriver,
}

impl<'a> DiffEngine<'a> {
    #[must_use]
    pub fn new(driver: &'a dyn DiffDriver) -> Self {
        Self { driver }
    }

    pub fn realm_diff(&self, from: &Realm, to: &Realm) -> Result<Vec<Change>> {
        let mut changes = Vec::new();

        for current in &from.schemas {
            match to.schema(&current.name) {
                Some(desired) => changes.extend(self.schema_changes(current, desired)?),
                None => changes.push(Change::DropSchema {
                    name: current.name.clone(),
                }),
            }
        }

        for desired in &to.schemas {
            if from.schema(&desired.name).is_none() {
                changes.extend(added_schema_changes(desired));
            }
        }

        Ok(break_add_cycles(changes))
    }

    pub fn schema_diff(&self, from: &Schema, to: &Schema) -> Result<Vec<Change>> {
        if from.name != to.name {
            return Err(Error::MismatchedNames {
                from: from.name.clone(),
                to: to.name.clone(),
            });
        }
        Ok(break_add_cycles(self.schema_changes(from, to)?))
    }

    pub fn table_diff(&self, from: &Table, to: &Table) -> Result<Vec<TableChange>> {
        if from.name != to.name {
            return Err(Error::MismatchedNames {
                from: from.name.clone(),
                to: to.name.clone(),
            });
        }

        self.reject_pk_change(from, to)?;

        let mut changes = self.driver.table_attr_changes(from, to);

        // Pass one: drops and in-place modifications, walked in from-order
        // per kind so referential validity holds within a statement.
        self.check_drops_and_modifies(from, to, &mut changes);
        self.column_drops_and_modifies(from, to, &mut changes)?;
        self.index_drops_and_modifies(from, to, &mut changes);
        self.fk_drops_and_modifies(from, to, &mut changes);

        // Pass two: additions in to-order.
        for check in &to.checks {
            if from.check(&check.name).is_none() {
                changes.push(TableChange::AddCheck(check.clone()));
            }
        }
        for column in &to.columns {
            if from.column(&column.name).is_none() {
                changes.push(TableChange::AddColumn(column.clone()));
            }
        }
        for index in &to.indexes {
            if from.index(&index.name).is_none() {
                changes.push(TableChange::AddIndex(index.clone()));
            }
        }
        for fk in &to.foreign_keys {
            if from.foreign_key(&fk.symbol).is_none() {
                changes.push(TableChange::AddForeignKey(fk.clone()));
            }
        }

        Ok(changes)
    }

    fn schema_changes(&self, from: &Schema, to: &Schema) -> Result<Vec<Change>> {
        let mut changes = Vec::new();

        let attr_changes = self.driver.schema_attr_changes(from, to);
        if !attr_changes.is_empty() {
            changes.push(Change::ModifySchema {
                name: to.name.clone(),
                changes: attr_changes,
            });
        }

        // Definition-carrying dependents: drops and modifies go first so they
        // precede the table changes they may reference; their additions are
        // deferred until after the tables they may reference exist.
        let mut dependent_adds = Vec::new();
        for current in &from.triggers {
            match to.triggers.iter().find(|t| t.name == current.name) {
                Some(desired) => {
                    if current.def.trim() != desired.def.trim() {
                        changes.push(Change::ModifyTrigger {
                            from: current.clone(),
                            to: desired.clone(),
                        });
                    }
                }
                None => changes.push(Change::DropTrigger {
                    schema: Some(from.name.clone()),
                    table: current.table.clone(),
                    name: current.name.clone(),
                }),
            }
        }
        diff_defined(
            &from.views,
            &to.views,
            &mut changes,
            &mut dependent_adds,
            |v| v.name.clone(),
            |v| v.def.clone(),
            |v| Change::AddView(v.clone()),
            |schema, name| Change::DropView { schema, name },
            |a, b| Change::ModifyView { from: a.clone(), to: b.clone() },
            Some(to.name.clone()),
        );
        diff_defined(
            &from.funcs,
            &to.funcs,
            &mut changes,
            &mut dependent_adds,
            |f| f.name.clone(),
            |f| f.def.clone(),
            |f| Change::AddFunc(f.clone()),
            |schema, name| Change::DropFunc { schema, name },
            |a, b| Change::ModifyFunc { from: a.clone(), to: b.clone() },
            Some(to.name.clone()),
        );
        diff_defined(
            &from.procs,
            &to.procs,
            &mut changes,
            &mut dependent_adds,
            |p| p.name.clone(),
            |p| p.def.clone(),
            |p| Change::AddProc(p.clone()),
            |schema, name| Change::DropProc { schema, name },
            |a, b| Change::ModifyProc { from: a.clone(), to: b.clone() },
            Some(to.name.clone()),
        );
        for desired in &to.triggers {
            if !from.triggers.iter().any(|t| t.name == desired.name) {
                dependent_adds.push(Change::AddTrigger(desired.clone()));
            }
        }

        let mut table_adds = Vec::new();
        for current in &from.tables {
            match to.table(&current.name) {
                Some(desired) => {
                    let table_changes = self.table_diff(current, desired)?;
                    if !table_changes.is_empty() {
                        changes.push(Change::ModifyTable {
                            table: desired.clone(),
                            changes: table_changes,
                        });
                    }
                }
                None => changes.push(Change::DropTable {
                    schema: Some(from.name.clone()),
                    name: current.name.clone(),
                }),
            }
        }
        for desired in &to.tables {
            if from.table(&desired.name).is_none() {
                table_adds.push(Change::AddTable(owned_by(desired, &to.name)));
            }
        }

        // Enum objects: value changes and additions must land before the
        // tables that reference them.
        for current in &from.enums {
            match to.enums.iter().find(|e| e.name == current.name) {
                Some(desired) if desired.values != current.values => {
                    changes.push(Change::ModifyObject {
                        from: current.clone(),
                        to: desired.clone(),
                    });
                }
                Some(_) => {}
                None => changes.push(Change::DropObject {
                    schema: Some(from.name.clone()),
                    name: current.name.clone(),
                }),
            }
        }
        for desired in &to.enums {
            if !from.enums.iter().any(|e| e.name == desired.name) {
                changes.push(Change::AddObject(desired.clone()));
            }
        }

        changes.extend(table_adds);
        changes.extend(dependent_adds);
        Ok(changes)
    }

    fn reject_pk_change(&self, from: &Table, to: &Table) -> Result<()> {
        let changed = match (&from.primary_key, &to.primary_key) {
            (Some(before), Some(after)) => {
                before.parts.len() != after.parts.len()
                    || before
                        .parts
                        .iter()
                        .zip(after.parts.iter())
                        .any(|(a, b)| a.kind != b.kind)
            }
            (None, None) => false,
            _ => true,
        };

        if changed {
            return Err(Error::Unsupported(format!(
                "structural primary key change on table {:?}",
                to.name
            )));
        }
        Ok(())
    }

    fn check_drops_and_modifies(&self, from: &Table, to: &Table, changes: &mut Vec<TableChange>) {
        for current in &from.checks {
            match to.check(&current.name) {
                Some(desired) => {
                    if checks_differ(current, desired) {
                        changes.push(TableChange::ModifyCheck {
                            from: current.clone(),
                            to: desired.clone(),
                        });
                    }
                }
                None => changes.push(TableChange::DropCheck {
                    name: current.name.clone(),
                }),
            }
        }
    }

    fn column_drops_and_modifies(
        &self,
        from: &Table,
        to: &Table,
        changes: &mut Vec<TableChange>,
    ) -> Result<()> {
        for current in &from.columns {
            match to.column(&current.name) {
                Some(desired) => {
                    let kinds = self.column_change_kinds(current, desired)?;
                    if !kinds.is_empty() {
                        changes.push(TableChange::ModifyColumn {
                            from: current.clone(),
                            to: desired.clone(),
                            kinds,
                        });
                    }
                }
                None => changes.push(TableChange::DropColumn {
                    name: current.name.clone(),
                }),
            }
        }
        Ok(())
    }

    fn index_drops_and_modifies(&self, from: &Table, to: &Table, changes: &mut Vec<TableChange>) {
        for current in &from.indexes {
            match to.index(&current.name) {
                Some(desired) => {
                    let kinds = self.index_change_kinds(current, desired);
                    if !kinds.is_empty() {
                        changes.push(TableChange::ModifyIndex {
                            from: current.clone(),
                            to: desired.clone(),
                            kinds,
                        });
                    }
                }
                None => changes.push(TableChange::DropIndex {
                    name: current.name.clone(),
                }),
            }
        }
    }

    fn fk_drops_and_modifies(&self, from: &Table, to: &Table, changes: &mut Vec<TableChange>) {
        for current in &from.foreign_keys {
            match to.foreign_key(&current.symbol) {
                Some(desired) => {
                    let kinds = fk_change_kinds(current, desired);
                    if !kinds.is_empty() {
                        changes.push(TableChange::ModifyForeignKey {
                            from: current.clone(),
                            to: desired.clone(),
                            kinds,
                        });
                    }
                }
                None => changes.push(TableChange::DropForeignKey {
                    symbol: current.symbol.clone(),
                }),
            }
        }
    }

    fn column_change_kinds(&self, from: &Column, to: &Column) -> Result<BitFlags<ColumnChange>> {
        let mut kinds = BitFlags::empty();

        if from.ty.nullable != to.ty.nullable {
            kinds |= ColumnChange::Null;
        }
        if self.driver.column_type_changed(from, to)? {
            kinds |= ColumnChange::Type;
        }
        if !self
            .driver
            .defaults_equal(from.default.as_ref(), to.default.as_ref())
        {
            kinds |= ColumnChange::Default;
        }
        if from.generated != to.generated {
            kinds |= ColumnChange::Generated;
        }
        if attr::comment(&from.attrs) != attr::comment(&to.attrs) {
            kinds |= ColumnChange::Comment;
        }
        if attr::collation(&from.attrs) != attr::collation(&to.attrs) {
            kinds |= ColumnChange::Collation;
        }
        if attr::charset(&from.attrs) != attr::charset(&to.attrs) {
            kinds |= ColumnChange::Charset;
        }
        if rest_attrs(&from.attrs) != rest_attrs(&to.attrs) {
            kinds |= ColumnChange::Attr;
        }

        Ok(kinds)
    }

    fn index_change_kinds(&self, from: &Index, to: &Index) -> BitFlags<IndexChange> {
        let mut kinds = BitFlags::empty();
        if from.unique != to.unique {
            kinds |= IndexChange::Unique;
        }
        if parts_differ(from, to) {
            kinds |= IndexChange::Parts;
        }
        if attr::comment(&from.attrs) != attr::comment(&to.attrs) {
            kinds |= IndexChange::Comment;
        }
        if self.driver.index_attrs_changed(from, to) {
            kinds |= IndexChange::Attr;
        }
        kinds
    }
}

fn owned_by(table: &Table, schema: &str) -> Table {
    let mut table = table.clone();
    if table.schema.is_none() {
        table.schema = Some(schema.to_string());
    }
    table
}

fn added_schema_changes(schema: &Schema) -> Vec<Change> {
    let mut changes = vec![Change::AddSchema(Schema {
        name: schema.name.clone(),
        attrs: schema.attrs.clone(),
        ..Schema::default()
    })];
    for enum_type in &schema.enums {
        changes.push(Change::AddObject(enum_type.clone()));
    }
    for table in &schema.tables {
        changes.push(Change::AddTable(owned_by(table, &schema.name)));
    }
    for view in &schema.views {
        changes.push(Change::AddView(view.clone()));
    }
    for func in &schema.funcs {
        changes.push(Change::AddFunc(func.clone()));
    }
    for proc in &schema.procs {
        changes.push(Change::AddProc(proc.clone()));
    }
    for trigger in &schema.triggers {
        changes.push(Change::AddTrigger(trigger.clone()));
    }
    changes
}

#[allow(clippy::too_many_arguments)]
fn diff_defined<T>(
    from: &[T],
    to: &[T],
    changes: &mut Vec<Change>,
    adds: &mut Vec<Change>,
    name: impl Fn(&T) -> String,
    def: impl Fn(&T) -> String,
    add: impl Fn(&T) -> Change,
    drop: impl Fn(Option<String>, String) -> Change,
    modify: impl Fn(&T, &T) -> Change,
    schema: Option<String>,
) {
    for current in from {
        match to.iter().find(|t| name(t) == name(current)) {
            Some(desired) => {
                if def(current).trim() != def(desired).trim() {
                    changes.push(modify(current, desired));
                }
            }
            None => changes.push(drop(schema.clone(), name(current))),
        }
    }
    for desired in to {
        if !from.iter().any(|t| name(t) == name(desired)) {
            adds.push(add(desired));
        }
    }
}

fn checks_differ(from: &Check, to: &Check) -> bool {
    from.expr.trim() != to.expr.trim() || from.attrs != to.attrs
}

fn parts_differ(from: &Index, to: &Index) -> bool {
    from.parts.len() != to.parts.len()
        || from
            .parts
            .iter()
            .zip(to.parts.iter())
            .any(|(a, b)| a.kind != b.kind || a.desc != b.desc || a.prefix != b.prefix)
}

fn fk_change_kinds(from: &ForeignKey, to: &ForeignKey) -> BitFlags<ForeignKeyChange> {
    let mut kinds = BitFlags::empty();
    if from.columns != to.columns {
        kinds |= ForeignKeyChange::Column;
    }
    if from.ref_table != to.ref_table {
        kinds |= ForeignKeyChange::RefTable;
    }
    if from.ref_columns != to.ref_columns {
        kinds |= ForeignKeyChange::RefColumn;
    }
    if from.on_update != to.on_update {
        kinds |= ForeignKeyChange::UpdateAction;
    }
    if from.on_delete != to.on_delete {
        kinds |= ForeignKeyChange::DeleteAction;
    }
    kinds
}

fn rest_attrs(attrs: &[Attr]) -> Vec<&Attr> {
    attrs
        .iter()
        .filter(|a| {
            !matches!(
                a.kind(),
                AttrKind::Comment | AttrKind::Collation | AttrKind::Charset
            )
        })
        .collect()
}
