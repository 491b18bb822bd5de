use super::{Attr, Type, attr};
use crate::{Error, Result};

/// The database cluster scope above schemas. Carries realm-level defaults
/// (collation, charset) as attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Realm {
    pub schemas: Vec<Schema>,
    pub attrs: Vec<Attr>,
}

impl Realm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|schema| schema.name == name)
    }

    /// All enum objects across the realm, for resolving column references.
    #[must_use]
    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.schemas.iter().flat_map(|schema| schema.enums.iter())
    }
}

/// A named namespace for tables, views, routines, and types.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
    pub enums: Vec<EnumType>,
    pub funcs: Vec<Func>,
    pub procs: Vec<Proc>,
    pub triggers: Vec<Trigger>,
    pub attrs: Vec<Attr>,
}

impl Schema {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    #[must_use]
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|view| view.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub name: String,
    /// Weak back-reference to the owning schema, by name.
    pub schema: Option<String>,
    pub columns: Vec<Column>,
    /// The primary key is a distinguished index, not duplicated in `indexes`.
    pub primary_key: Option<Index>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub checks: Vec<Check>,
    pub attrs: Vec<Attr>,
}

impl Table {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    #[must_use]
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|index| index.name == name)
    }

    #[must_use]
    pub fn foreign_key(&self, symbol: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.symbol == symbol)
    }

    #[must_use]
    pub fn check(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|check| check.name == name)
    }

    /// Indexes covering the named column, the primary key included.
    /// Computed on demand; the model holds no child-to-parent pointers.
    #[must_use]
    pub fn indexes_of(&self, column: &str) -> Vec<&Index> {
        self.primary_key
            .iter()
            .chain(self.indexes.iter())
            .filter(|index| {
                index
                    .parts
                    .iter()
                    .any(|part| matches!(&part.kind, PartKind::Column(name) if name == column))
            })
            .collect()
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        attr::comment(&self.attrs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub default: Option<DefaultValue>,
    pub generated: Option<GeneratedExpr>,
    pub attrs: Vec<Attr>,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            generated: None,
            attrs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnType {
    /// Raw dialect string as inspected or formatted, e.g. `varchar(255)`.
    pub raw: String,
    pub nullable: bool,
    pub ty: Type,
}

impl ColumnType {
    #[must_use]
    pub fn new(raw: impl Into<String>, ty: Type) -> Self {
        Self {
            raw: raw.into(),
            nullable: false,
            ty,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A column default: either a quoted dialect literal or a bare SQL
/// expression. Inspectors normalize server output into one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Literal(String),
    RawExpr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedExpr {
    pub expr: String,
    pub kind: GeneratedKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKind {
    Virtual,
    Stored,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    pub parts: Vec<IndexPart>,
    pub attrs: Vec<Attr>,
}

impl Index {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn push_part(&mut self, kind: PartKind) {
        self.parts.push(IndexPart {
            seq_no: self.parts.len(),
            desc: false,
            prefix: None,
            kind,
        });
    }
}

/// One ordered index part. `seq_no` equals the position in the parts vector;
/// [`validate_realm`] rejects models where the two drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPart {
    pub seq_no: usize,
    pub desc: bool,
    /// Prefix length for partial-column keys (MySQL `KEY (c(10))`).
    pub prefix: Option<u32>,
    pub kind: PartKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartKind {
    Column(String),
    Expr(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForeignKey {
    pub symbol: String,
    pub columns: Vec<String>,
    pub ref_table: TableRef,
    pub ref_columns: Vec<String>,
    pub on_update: Option<RefAction>,
    pub on_delete: Option<RefAction>,
    pub attrs: Vec<Attr>,
}

/// Referenced table, possibly in another schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    #[must_use]
    pub fn new(schema: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.map(str::to_string),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl RefAction {
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub name: String,
    pub expr: String,
    pub attrs: Vec<Attr>,
}

impl Check {
    #[must_use]
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: expr.into(),
            attrs: Vec::new(),
        }
    }
}

/// Definition-carrying objects are compared by their definition text; the
/// differ emits a Modify change when it differs.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub name: String,
    pub schema: Option<String>,
    pub def: String,
    pub attrs: Vec<Attr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    pub name: String,
    pub schema: Option<String>,
    pub def: String,
    pub attrs: Vec<Attr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proc {
    pub name: String,
    pub schema: Option<String>,
    pub def: String,
    pub attrs: Vec<Attr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub name: String,
    pub table: String,
    pub def: String,
    pub attrs: Vec<Attr>,
}

/// A realm-level enum object (Postgres `CREATE TYPE ... AS ENUM`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub schema: Option<String>,
    pub values: Vec<String>,
}

/// Structural validation run before apply: index part positions, foreign-key
/// column ownership, and enum references must all hold.
pub fn validate_realm(realm: &Realm) -> Result<()> {
    for schema in &realm.schemas {
        for table in &schema.tables {
            validate_table(realm, schema, table)?;
        }
    }
    Ok(())
}

fn validate_table(realm: &Realm, schema: &Schema, table: &Table) -> Result<()> {
    for index in table.primary_key.iter().chain(table.indexes.iter()) {
        for (position, part) in index.parts.iter().enumerate() {
            if part.seq_no != position {
                return Err(invalid(format!(
                    "index {:?} on table {:?}: part {position} carries seq_no {}",
                    index.name, table.name, part.seq_no
                )));
            }
            if let PartKind::Column(column) = &part.kind
                && table.column(column).is_none()
            {
                return Err(invalid(format!(
                    "index {:?} on table {:?} references unknown column {column:?}",
                    index.name, table.name
                )));
            }
        }
    }

    for fk in &table.foreign_keys {
        for column in &fk.columns {
            if table.column(column).is_none() {
                return Err(invalid(format!(
                    "foreign key {:?} on table {:?} references unknown local column {column:?}",
                    fk.symbol, table.name
                )));
            }
        }
        if fk.columns.len() != fk.ref_columns.len() {
            return Err(invalid(format!(
                "foreign key {:?} on table {:?}: {} local column(s) but {} referenced",
                fk.symbol,
                table.name,
                fk.columns.len(),
                fk.ref_columns.len()
            )));
        }
    }

    for column in &table.columns {
        if let Type::Enum(enum_ref) = &column.ty.ty
            && let Some(name) = &enum_ref.name
        {
            let owner = enum_ref.schema.as_deref().unwrap_or(schema.name.as_str());
            let resolved = realm
                .schema(owner)
                .and_then(|s| s.enums.iter().find(|e| e.name == *name));
            if resolved.is_none() {
                return Err(invalid(format!(
                    "column {:?} on table {:?} references unknown enum type {owner:?}.{name:?}",
                    column.name, table.name
                )));
            }
        }
    }

    Ok(())
}

fn invalid(reason: String) -> Error {
    Error::Internal(reason)
}
