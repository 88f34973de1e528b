/// Heap object kinds.
///
/// Every non-scalar value is one of these, allocated in the [`Heap`]
/// and referenced by typed index from [`Value`]s.
///
/// [`Heap`]: crate::heap::Heap
/// [`Value`]: crate::value::Value
use crate::intern::SymbolId;
use crate::value::Value;
use indexmap::IndexMap;

/// A byte-buffer string of known length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrCell {
    pub bytes: Vec<u8>,
}

impl StrCell {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        StrCell { bytes: bytes.into() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// An ordered sequence of values. Indexing is 1-based at the language
/// level; callers translate before reaching this type.
#[derive(Clone, Debug, Default)]
pub struct LinearList {
    pub items: Vec<Value>,
}

impl LinearList {
    pub fn with_capacity(n: usize) -> Self {
        LinearList {
            items: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// An ordered symbol → value mapping. Insertion order is preserved and
/// observable (iteration, printing). May carry an attached script id,
/// in which case method calls on the value dispatch to that script's
/// handlers and the entries serve as its property slots.
#[derive(Clone, Debug, Default)]
pub struct PropList {
    pub entries: IndexMap<SymbolId, Value>,
    pub script: Option<u32>,
}

impl PropList {
    pub fn new() -> Self {
        PropList::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: SymbolId) -> Option<Value> {
        self.entries.get(&key).copied()
    }

    pub fn set(&mut self, key: SymbolId, value: Value) {
        self.entries.insert(key, value);
    }
}

/// A two-number value: horizontal and vertical components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub h: Value,
    pub v: Value,
}

/// A four-number value: left, top, right, bottom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub left: Value,
    pub top: Value,
    pub right: Value,
    pub bottom: Value,
}
