/// Typed variant of a column type. `ColumnType` pairs one of these with the
/// raw dialect string it was parsed from; drivers must round-trip
/// `parse_type(format_type(t)) == t` modulo their documented normalizations.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Integer(IntegerType),
    Float(FloatType),
    Decimal(DecimalType),
    String(StringType),
    Binary(BinaryType),
    Bool,
    Time(TimeType),
    Json,
    Spatial(SpatialType),
    Enum(EnumRef),
    Uuid,
    Array(Box<ArrayType>),
    Network(NetworkType),
    Currency,
    Interval,
    Bit(BitType),
    Set(SetType),
    UserDefined(UserDefinedType),
    Unsupported(String),
}

impl Type {
    /// True when two types belong to different families, regardless of
    /// size or precision. The data-dependent analyzer flags such changes.
    #[must_use]
    pub fn family_differs(&self, other: &Self) -> bool {
        std::mem::discriminant(self) != std::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerType {
    /// Dialect type name, e.g. `int`, `bigint`, `tinyint`.
    pub t: String,
    pub unsigned: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatType {
    pub t: String,
    pub precision: Option<u32>,
    pub unsigned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalType {
    pub t: String,
    pub precision: u32,
    pub scale: u32,
    pub unsigned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringType {
    pub t: String,
    /// Declared size. SQL Server stores double-byte sizes for `nchar` and
    /// `nvarchar`, and -1 for `MAX` variants.
    pub size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryType {
    pub t: String,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeType {
    pub t: String,
    pub precision: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialType {
    pub t: String,
}

/// A reference to an enum type. Inline dialects (MySQL) carry the values and
/// no name; object dialects (Postgres) name a realm-level [`super::EnumType`]
/// that must exist in the realm at apply time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumRef {
    pub name: Option<String>,
    pub schema: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub elem: Type,
    /// Raw element type string as the dialect spells it, e.g. `integer`.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkType {
    pub t: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitType {
    pub t: String,
    pub size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetType {
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDefinedType {
    pub t: String,
    pub schema: Option<String>,
}
