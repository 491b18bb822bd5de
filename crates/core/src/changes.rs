use enumflags2::{BitFlags, bitflags};

use crate::schema::{
    Attr, AttrKind, Check, Column, EnumType, ForeignKey, Func, Index, Proc, Schema, Table, Trigger,
    View,
};

/// A single schema change. The differ allocates a fresh change tree; the
/// input models are never mutated. Planners lower each variant to one or
/// more SQL statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    AddSchema(Schema),
    DropSchema { name: String },
    ModifySchema { name: String, changes: Vec<AttrChange> },

    AddTable(Table),
    DropTable { schema: Option<String>, name: String },
    ModifyTable { table: Table, changes: Vec<TableChange> },
    RenameTable { schema: Option<String>, from: String, to: String },

    AddView(View),
    DropView { schema: Option<String>, name: String },
    ModifyView { from: View, to: View },
    RenameView { schema: Option<String>, from: String, to: String },

    AddFunc(Func),
    DropFunc { schema: Option<String>, name: String },
    ModifyFunc { from: Func, to: Func },
    RenameFunc { schema: Option<String>, from: String, to: String },

    AddProc(Proc),
    DropProc { schema: Option<String>, name: String },
    ModifyProc { from: Proc, to: Proc },
    RenameProc { schema: Option<String>, from: String, to: String },

    AddTrigger(Trigger),
    DropTrigger { schema: Option<String>, table: String, name: String },
    ModifyTrigger { from: Trigger, to: Trigger },
    RenameTrigger { schema: Option<String>, from: String, to: String },

    /// Schema-owned objects that are not tables or views (enum types).
    AddObject(EnumType),
    DropObject { schema: Option<String>, name: String },
    ModifyObject { from: EnumType, to: EnumType },
}

impl Change {
    /// Short tag for logs and diagnostics.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::AddSchema(_) => "AddSchema",
            Self::DropSchema { .. } => "DropSchema",
            Self::ModifySchema { .. } => "ModifySchema",
            Self::AddTable(_) => "AddTable",
            Self::DropTable { .. } => "DropTable",
            Self::ModifyTable { .. } => "ModifyTable",
            Self::RenameTable { .. } => "RenameTable",
            Self::AddView(_) => "AddView",
            Self::DropView { .. } => "DropView",
            Self::ModifyView { .. } => "ModifyView",
            Self::RenameView { .. } => "RenameView",
            Self::AddFunc(_) => "AddFunc",
            Self::DropFunc { .. } => "DropFunc",
            Self::ModifyFunc { .. } => "ModifyFunc",
            Self::RenameFunc { .. } => "RenameFunc",
            Self::AddProc(_) => "AddProc",
            Self::DropProc { .. } => "DropProc",
            Self::ModifyProc { .. } => "ModifyProc",
            Self::RenameProc { .. } => "RenameProc",
            Self::AddTrigger(_) => "AddTrigger",
            Self::DropTrigger { .. } => "DropTrigger",
            Self::ModifyTrigger { .. } => "ModifyTrigger",
            Self::RenameTrigger { .. } => "RenameTrigger",
            Self::AddObject(_) => "AddObject",
            Self::DropObject { .. } => "DropObject",
            Self::ModifyObject { .. } => "ModifyObject",
        }
    }
}

/// An ordered sub-change inside `ModifyTable`.
#[derive(Debug, Clone, PartialEq)]
pub enum TableChange {
    AddColumn(Column),
    DropColumn { name: String },
    ModifyColumn {
        from: Column,
        to: Column,
        kinds: BitFlags<ColumnChange>,
    },

    AddIndex(Index),
    DropIndex { name: String },
    ModifyIndex {
        from: Index,
        to: Index,
        kinds: BitFlags<IndexChange>,
    },

    AddForeignKey(ForeignKey),
    DropForeignKey { symbol: String },
    ModifyForeignKey {
        from: ForeignKey,
        to: ForeignKey,
        kinds: BitFlags<ForeignKeyChange>,
    },

    AddCheck(Check),
    DropCheck { name: String },
    ModifyCheck { from: Check, to: Check },

    AddAttr(Attr),
    DropAttr(AttrKind),
    ModifyAttr { from: Attr, to: Attr },
}

impl TableChange {
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::AddColumn(_) => "AddColumn",
            Self::DropColumn { .. } => "DropColumn",
            Self::ModifyColumn { .. } => "ModifyColumn",
            Self::AddIndex(_) => "AddIndex",
            Self::DropIndex { .. } => "DropIndex",
            Self::ModifyIndex { .. } => "ModifyIndex",
            Self::AddForeignKey(_) => "AddForeignKey",
            Self::DropForeignKey { .. } => "DropForeignKey",
            Self::ModifyForeignKey { .. } => "ModifyForeignKey",
            Self::AddCheck(_) => "AddCheck",
            Self::DropCheck { .. } => "DropCheck",
            Self::ModifyCheck { .. } => "ModifyCheck",
            Self::AddAttr(_) => "AddAttr",
            Self::DropAttr(_) => "DropAttr",
            Self::ModifyAttr { .. } => "ModifyAttr",
        }
    }
}

/// Attribute-level change shared by `ModifySchema` and realm diffs.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrChange {
    Add(Attr),
    Drop(AttrKind),
    Modify { from: Attr, to: Attr },
}

/// What changed on a modified column. Cheap "what changed" queries for
/// planners and analyzers.
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnChange {
    Null,
    Type,
    Default,
    Comment,
    Collation,
    Charset,
    Attr,
    Generated,
}

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyChange {
    Column,
    RefTable,
    RefColumn,
    UpdateAction,
    DeleteAction,
}

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexChange {
    Unique,
    Parts,
    Comment,
    Attr,
}
