pub mod attr;
mod object;
mod types;

pub use attr::{Attr, AttrKind, IndexType, SequenceAttr, replace_or_append};
pub use object::{
    Check, Column, ColumnType, DefaultValue, EnumType, ForeignKey, Func, GeneratedExpr,
    GeneratedKind, Index, IndexPart, PartKind, Proc, Realm, RefAction, Schema, Table, TableRef,
    Trigger, View, validate_realm,
};
pub use types::{
    ArrayType, BinaryType, BitType, DecimalType, EnumRef, FloatType, IntegerType, NetworkType,
    SetType, SpatialType, StringType, TimeType, Type, UserDefinedType,
};
