use driftql_core::{
    Result, TableChange,
    diff::DiffDriver,
    schema::{Attr, AttrKind, Column, DefaultValue, Table, Type, attr},
};

use crate::MySql;

impl DiffDriver for MySql {
    /// MySQL numeric semantics: `float(p)` with p ≤ 23 and `float` are the
    /// same subtype, larger precisions are `double`; the parser already
    /// normalized both sides, so floats compare by subtype and signedness.
    fn column_type_changed(&self, from: &Column, to: &Column) -> Result<bool> {
        if from.ty.raw.eq_ignore_ascii_case(&to.ty.raw) {
            return Ok(false);
        }
        Ok(match (&from.ty.ty, &to.ty.ty) {
            (Type::Float(before), Type::Float(after)) => {
                before.t != after.t || before.unsigned != after.unsigned
            }
            (before, after) => before != after,
        })
    }

    fn defaults_equal(&self, from: Option<&DefaultValue>, to: Option<&DefaultValue>) -> bool {
        match (from, to) {
            (None, None) => true,
            (Some(before), Some(after)) => {
                normalize_default(before) == normalize_default(after)
            }
            _ => false,
        }
    }

    fn table_attr_changes(&self, from: &Table, to: &Table) -> Vec<TableChange> {
        let mut changes = Vec::new();
        for kind in [
            AttrKind::Charset,
            AttrKind::Collation,
            AttrKind::Comment,
            AttrKind::Engine,
        ] {
            match (attr::find(&from.attrs, kind), attr::find(&to.attrs, kind)) {
                (None, Some(added)) => changes.push(TableChange::AddAttr(added.clone())),
                (Some(_), None) => changes.push(TableChange::DropAttr(kind)),
                (Some(before), Some(after)) if before != after => {
                    changes.push(TableChange::ModifyAttr {
                        from: before.clone(),
                        to: after.clone(),
                    });
                }
                _ => {}
            }
        }

        // The AUTO_INCREMENT counter only moves forward: a desired value above
        // the inspected high-water mark is planned, anything else is noise.
        let before = auto_increment(from);
        let after = auto_increment(to);
        match (before, after) {
            (None, Some(value)) => {
                changes.push(TableChange::AddAttr(Attr::AutoIncrement(Some(value))));
            }
            (Some(current), Some(desired)) if desired > current => {
                changes.push(TableChange::ModifyAttr {
                    from: Attr::AutoIncrement(Some(current)),
                    to: Attr::AutoIncrement(Some(desired)),
                });
            }
            _ => {}
        }
        changes
    }
}

fn auto_increment(table: &Table) -> Option<u64> {
    match attr::find(&table.attrs, AttrKind::AutoIncrement) {
        Some(Attr::AutoIncrement(value)) => *value,
        _ => None,
    }
}

/// Comparable shape of a default: literal quotes stripped, expression
/// parentheses stripped, keywords lowercased.
fn normalize_default(default: &DefaultValue) -> (bool, String) {
    match default {
        DefaultValue::Literal(literal) => {
            let trimmed = literal.trim();
            let unquoted = trimmed
                .strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
                .unwrap_or(trimmed);
            (false, unquoted.to_string())
        }
        DefaultValue::RawExpr(expr) => {
            let trimmed = expr.trim();
            let unwrapped = trimmed
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .unwrap_or(trimmed);
            (true, unwrapped.to_ascii_lowercase())
        }
    }
}
