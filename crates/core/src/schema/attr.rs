/// Per-element attribute. Tables, columns, indexes, and foreign keys carry
/// an ordered attribute list; at most one attribute of each kind may appear
/// on an element ([`replace_or_append`] maintains that during normalization).
/// `Unknown` preserves attributes a newer server emits that this build does
/// not model yet.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Comment(String),
    Charset(String),
    Collation(String),
    /// Table or column auto-increment; the value is the high-water mark when
    /// the inspector could read it (MySQL `SHOW CREATE TABLE`).
    AutoIncrement(Option<u64>),
    /// TiDB `AUTO_RANDOM(shard[, range])`. Range 64 is normalized to 0 so
    /// inspection round-trips losslessly.
    AutoRandom { shard_bits: u32, range: u32 },
    CreateOptions(String),
    Engine(String),
    /// Column `ON UPDATE` expression (MySQL timestamps).
    OnUpdate(String),
    /// Identity column backed by a sequence (Postgres).
    Identity {
        always: bool,
        sequence: SequenceAttr,
    },
    IndexType(IndexType),
    IndexParser(String),
    /// Partial-index predicate (`WHERE` clause).
    IndexPredicate(String),
    /// Check constraint enforcement toggle (MySQL `NOT ENFORCED`).
    Enforced(bool),
    Unknown { raw: String },
}

/// Fieldless tag for attribute kinds, used for O(1) extraction and for
/// `DropAttr` changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Comment,
    Charset,
    Collation,
    AutoIncrement,
    AutoRandom,
    CreateOptions,
    Engine,
    OnUpdate,
    Identity,
    IndexType,
    IndexParser,
    IndexPredicate,
    Enforced,
    Unknown,
}

impl Attr {
    #[must_use]
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::Comment(_) => AttrKind::Comment,
            Self::Charset(_) => AttrKind::Charset,
            Self::Collation(_) => AttrKind::Collation,
            Self::AutoIncrement(_) => AttrKind::AutoIncrement,
            Self::AutoRandom { .. } => AttrKind::AutoRandom,
            Self::CreateOptions(_) => AttrKind::CreateOptions,
            Self::Engine(_) => AttrKind::Engine,
            Self::OnUpdate(_) => AttrKind::OnUpdate,
            Self::Identity { .. } => AttrKind::Identity,
            Self::IndexType(_) => AttrKind::IndexType,
            Self::IndexParser(_) => AttrKind::IndexParser,
            Self::IndexPredicate(_) => AttrKind::IndexPredicate,
            Self::Enforced(_) => AttrKind::Enforced,
            Self::Unknown { .. } => AttrKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceAttr {
    pub start: i64,
    pub increment: i64,
    pub cache: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: bool,
}

impl Default for SequenceAttr {
    fn default() -> Self {
        Self {
            start: 1,
            increment: 1,
            cache: 1,
            min_value: None,
            max_value: None,
            cycle: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    BTree,
    Hash,
    FullText,
    Spatial,
}

/// Replaces the element's attribute of the same kind, or appends when none
/// exists yet. `Unknown` attributes compare by raw text so distinct unknown
/// payloads can coexist.
pub fn replace_or_append(attrs: &mut Vec<Attr>, attr: Attr) {
    if let Attr::Unknown { raw } = &attr {
        if !attrs
            .iter()
            .any(|existing| matches!(existing, Attr::Unknown { raw: existing_raw } if existing_raw == raw))
        {
            attrs.push(attr);
        }
        return;
    }

    let kind = attr.kind();
    match attrs.iter_mut().find(|existing| existing.kind() == kind) {
        Some(existing) => *existing = attr,
        None => attrs.push(attr),
    }
}

#[must_use]
pub fn find(attrs: &[Attr], kind: AttrKind) -> Option<&Attr> {
    attrs.iter().find(|attr| attr.kind() == kind)
}

#[must_use]
pub fn comment(attrs: &[Attr]) -> Option<&str> {
    match find(attrs, AttrKind::Comment) {
        Some(Attr::Comment(text)) => Some(text.as_str()),
        _ => None,
    }
}

#[must_use]
pub fn charset(attrs: &[Attr]) -> Option<&str> {
    match find(attrs, AttrKind::Charset) {
        Some(Attr::Charset(name)) => Some(name.as_str()),
        _ => None,
    }
}

#[must_use]
pub fn collation(attrs: &[Attr]) -> Option<&str> {
    match find(attrs, AttrKind::Collation) {
        Some(Attr::Collation(name)) => Some(name.as_str()),
        _ => None,
    }
}
