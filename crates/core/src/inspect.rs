use enumflags2::{BitFlags, bitflags};
use glob::Pattern;

use crate::{
    Error, ExecQuerier, Result,
    schema::{Realm, Schema},
};

/// Which object classes an inspection populates.
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectMode {
    Schemas,
    Tables,
    Views,
    Funcs,
    Triggers,
    Types,
}

#[derive(Debug, Clone)]
pub struct InspectOptions {
    /// Schema name filter; empty means all visible schemas.
    pub schemas: Vec<String>,
    /// Table name filter; empty means all tables.
    pub tables: Vec<String>,
    /// Exclusion patterns of the form `<schema>[.<table>[.<elem>]]` with
    /// shell-glob components and optional `[type=a|b]` selectors.
    pub exclude: Vec<String>,
    pub mode: BitFlags<InspectMode>,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            schemas: Vec::new(),
            tables: Vec::new(),
            exclude: Vec::new(),
            mode: BitFlags::all(),
        }
    }
}

impl InspectOptions {
    #[must_use]
    pub fn is_inspected(&self, mode: InspectMode) -> bool {
        self.mode.contains(mode)
    }
}

/// Reads the schema model from a live database and normalizes dialect
/// quirks. Implementations must populate dialect attributes, resolve
/// cross-schema foreign keys, and normalize defaults into `Literal` or
/// `RawExpr` before returning.
pub trait Inspector {
    fn inspect_realm(&self, conn: &mut dyn ExecQuerier, opts: &InspectOptions) -> Result<Realm>;

    /// Inspects a single schema; `None` selects the connection's current
    /// schema. Fails with [`Error::NotExist`] when the schema is absent.
    fn inspect_schema(
        &self,
        conn: &mut dyn ExecQuerier,
        name: Option<&str>,
        opts: &InspectOptions,
    ) -> Result<Schema>;
}

/// One parsed exclusion pattern.
#[derive(Debug)]
struct ExcludePattern {
    schema: Component,
    table: Option<Component>,
    element: Option<Component>,
}

#[derive(Debug)]
struct Component {
    glob: Pattern,
    /// Lowercased element kinds from a `[type=...]` selector; empty means
    /// any kind.
    kinds: Vec<String>,
}

impl Component {
    fn matches(&self, name: &str, kind: &str) -> bool {
        self.glob.matches(name) && (self.kinds.is_empty() || self.kinds.iter().any(|k| k == kind))
    }
}

/// Applies exclusion patterns to an inspected realm, removing matching
/// schemas, schema children, and table elements in place.
pub fn exclude_from_realm(realm: &mut Realm, patterns: &[String]) -> Result<()> {
    let parsed = patterns
        .iter()
        .map(|raw| parse_pattern(raw))
        .collect::<Result<Vec<_>>>()?;

    for pattern in &parsed {
        match (&pattern.table, &pattern.element) {
            (None, _) => {
                realm
                    .schemas
                    .retain(|schema| !pattern.schema.matches(&schema.name, "schema"));
            }
            (Some(table), None) => {
                for schema in &mut realm.schemas {
                    if !pattern.schema.matches(&schema.name, "schema") {
                        continue;
                    }
                    exclude_schema_children(schema, table);
                }
            }
            (Some(table), Some(element)) => {
                for schema in &mut realm.schemas {
                    if !pattern.schema.matches(&schema.name, "schema") {
                        continue;
                    }
                    for tbl in &mut schema.tables {
                        if !table.matches(&tbl.name, "table") {
                            continue;
                        }
                        tbl.columns
                            .retain(|column| !element.matches(&column.name, "column"));
                        tbl.indexes
                            .retain(|index| !element.matches(&index.name, "index"));
                        tbl.foreign_keys
                            .retain(|fk| !element.matches(&fk.symbol, "fk"));
                        tbl.checks
                            .retain(|check| !element.matches(&check.name, "check"));
                    }
                }
            }
        }
    }

    Ok(())
}

fn exclude_schema_children(schema: &mut Schema, component: &Component) {
    schema
        .tables
        .retain(|table| !component.matches(&table.name, "table"));
    schema
        .views
        .retain(|view| !component.matches(&view.name, "view"));
    schema
        .enums
        .retain(|enum_type| !component.matches(&enum_type.name, "enum"));
    schema
        .funcs
        .retain(|func| !component.matches(&func.name, "function"));
    schema
        .procs
        .retain(|proc| !component.matches(&proc.name, "procedure"));
    schema
        .triggers
        .retain(|trigger| !component.matches(&trigger.name, "trigger"));
}

fn parse_pattern(raw: &str) -> Result<ExcludePattern> {
    let mut components = raw.split('.').map(parse_component);
    let schema = components
        .next()
        .ok_or_else(|| invalid_pattern(raw, "empty pattern"))??;
    let table = components.next().transpose()?;
    let element = components.next().transpose()?;
    if components.next().is_some() {
        return Err(invalid_pattern(raw, "more than three components"));
    }

    Ok(ExcludePattern {
        schema,
        table,
        element,
    })
}

fn parse_component(raw: &str) -> Result<Component> {
    let (name, kinds) = match raw.split_once('[') {
        Some((name, selector)) => {
            let selector = selector
                .strip_suffix(']')
                .ok_or_else(|| invalid_pattern(raw, "unterminated selector"))?;
            let kinds_raw = selector
                .strip_prefix("type=")
                .ok_or_else(|| invalid_pattern(raw, "selector must be `type=...`"))?;
            let kinds = kinds_raw
                .split('|')
                .map(|kind| kind.trim().to_ascii_lowercase())
                .filter(|kind| !kind.is_empty())
                .collect::<Vec<_>>();
            if kinds.is_empty() {
                return Err(invalid_pattern(raw, "empty type selector"));
            }
            (name, kinds)
        }
        None => (raw, Vec::new()),
    };

    let glob = Pattern::new(name)
        .map_err(|source| invalid_pattern(raw, &format!("bad glob: {source}")))?;
    Ok(Component { glob, kinds })
}

fn invalid_pattern(raw: &str, reason: &str) -> Error {
    Error::Internal(format!("invalid exclude pattern {raw:?}: {reason}"))
}
