// shadow.rs — Shadow-memory capability and identity-keyed side table
//
// The tracker never owns per-object metadata; it asks a `ShadowStore` for
// the record associated with a runtime value. Primitives never have a
// record. `ShadowTable` is the side table used by trace replay: records are
// created lazily the first time an object handle is looked up and dropped
// when the collector reports the object reclaimed.

use std::collections::HashMap;
use std::fmt;

use crate::id::ObjectId;
use crate::path_index::PathVector;

// ── Runtime values ──────────────────────────────────────────────────────────

/// Non-heap values. Never shadowed, never tracked.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

/// A runtime value as seen by the callback protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Object(ObjectId),
    Primitive(Primitive),
}

impl Value {
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            Value::Primitive(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Object(id) => write!(f, "{id}"),
            Value::Primitive(Primitive::Undefined) => write!(f, "undefined"),
            Value::Primitive(Primitive::Null) => write!(f, "null"),
            Value::Primitive(Primitive::Bool(b)) => write!(f, "{b}"),
            Value::Primitive(Primitive::Number(n)) => write!(f, "{n}"),
            Value::Primitive(Primitive::Str(s)) => write!(f, "{s:?}"),
        }
    }
}

// ── Shadow records ──────────────────────────────────────────────────────────

/// Per-object metadata extended with the object's creation identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowRecord {
    pub(crate) creation_path: Option<PathVector>,
    pub(crate) depth: usize,
}

impl ShadowRecord {
    /// Path vector captured when the object was first observed. Set once.
    pub fn creation_path(&self) -> Option<&PathVector> {
        self.creation_path.as_ref()
    }

    /// Index into the creation path down to which the object's trie node is
    /// addressed. Only meaningful once `creation_path` is set.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_tracked(&self) -> bool {
        self.creation_path.is_some()
    }
}

/// Lookup capability the tracker consumes.
pub trait ShadowStore {
    /// Record associated with `value`, or `None` for untracked values.
    fn shadow_record(&mut self, value: &Value) -> Option<&mut ShadowRecord>;

    /// Drop the association for a reclaimed object, returning its record.
    fn release(&mut self, object: ObjectId) -> Option<ShadowRecord>;
}

/// Side table keyed by object identity.
#[derive(Debug, Default)]
pub struct ShadowTable {
    records: HashMap<ObjectId, ShadowRecord>,
}

impl ShadowTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object: ObjectId) -> Option<&ShadowRecord> {
        self.records.get(&object)
    }

    /// Number of live shadow records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ShadowStore for ShadowTable {
    fn shadow_record(&mut self, value: &Value) -> Option<&mut ShadowRecord> {
        let id = value.object_id()?;
        Some(self.records.entry(id).or_default())
    }

    fn release(&mut self, object: ObjectId) -> Option<ShadowRecord> {
        self.records.remove(&object)
    }
}
