/// Interned symbol storage.
///
/// Symbols are immutable byte strings deduplicated in a per-VM table;
/// after interning, symbol equality is id equality. Entries live for
/// the lifetime of the table.
use std::collections::HashMap;
use std::fmt;

/// An opaque handle to an interned symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SymbolId(pub u32);

/// A symbol's stored form: bytes plus a precomputed hash.
#[derive(Clone)]
pub struct SymbolData {
    bytes: Vec<u8>,
    hash: u32,
}

impl SymbolData {
    fn new(bytes: &[u8]) -> Self {
        SymbolData {
            bytes: bytes.to_vec(),
            hash: byte_hash(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }
}

impl fmt::Debug for SymbolData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(s) = std::str::from_utf8(&self.bytes) {
            write!(f, "#{s}")
        } else {
            write!(f, "#<binary len={}>", self.bytes.len())
        }
    }
}

/// Shift-xor hash over the byte content. Stable across runs so tests
/// can rely on bucket behaviour.
pub fn byte_hash(bytes: &[u8]) -> u32 {
    let mut h = bytes.len() as u32;
    for &b in bytes {
        h = h ^ ((h << 5).wrapping_add(h >> 2).wrapping_add(b as u32));
    }
    h
}

/// Symbol interner: owns every symbol and deduplicates by byte content.
#[derive(Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolData>,
    lookup: HashMap<u32, Vec<u32>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            symbols: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Intern a symbol. Returns the existing id when the content was
    /// seen before.
    pub fn intern(&mut self, bytes: &[u8]) -> SymbolId {
        let hash = byte_hash(bytes);
        if let Some(ids) = self.lookup.get(&hash) {
            for &id in ids {
                if self.symbols[id as usize].as_bytes() == bytes {
                    return SymbolId(id);
                }
            }
        }

        let id = self.symbols.len() as u32;
        self.symbols.push(SymbolData::new(bytes));
        self.lookup.entry(hash).or_default().push(id);
        SymbolId(id)
    }

    /// Look up a symbol without creating it.
    pub fn find(&self, bytes: &[u8]) -> Option<SymbolId> {
        let hash = byte_hash(bytes);
        let ids = self.lookup.get(&hash)?;
        ids.iter()
            .copied()
            .find(|&id| self.symbols[id as usize].as_bytes() == bytes)
            .map(SymbolId)
    }

    pub fn get(&self, id: SymbolId) -> &SymbolData {
        &self.symbols[id.0 as usize]
    }

    pub fn get_bytes(&self, id: SymbolId) -> &[u8] {
        self.symbols[id.0 as usize].as_bytes()
    }

    /// Symbol text for diagnostics; lossy on non-UTF-8 content.
    pub fn name(&self, id: SymbolId) -> String {
        String::from_utf8_lossy(self.get_bytes(id)).into_owned()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut t = SymbolTable::new();
        let a = t.intern(b"foo");
        let b = t.intern(b"foo");
        assert_eq!(a, b);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_distinct_symbols() {
        let mut t = SymbolTable::new();
        let a = t.intern(b"foo");
        let b = t.intern(b"bar");
        assert_ne!(a, b);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_find_without_insert() {
        let mut t = SymbolTable::new();
        assert_eq!(t.find(b"missing"), None);
        let id = t.intern(b"present");
        assert_eq!(t.find(b"present"), Some(id));
    }

    #[test]
    fn test_roundtrip_bytes() {
        let mut t = SymbolTable::new();
        let id = t.intern(b"some symbol");
        assert_eq!(t.get_bytes(id), b"some symbol");
    }

    #[test]
    fn test_empty_symbol() {
        let mut t = SymbolTable::new();
        let id = t.intern(b"");
        assert!(t.get(id).is_empty());
    }

    #[test]
    fn test_hash_consistency() {
        assert_eq!(byte_hash(b"abc"), byte_hash(b"abc"));
        assert_ne!(byte_hash(b"abc"), byte_hash(b"abd"));
    }

    #[test]
    fn test_many_symbols() {
        let mut t = SymbolTable::new();
        let mut ids = Vec::new();
        for i in 0..1000u32 {
            ids.push(t.intern(format!("sym_{i}").as_bytes()));
        }
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(t.get_bytes(*id), format!("sym_{i}").as_bytes());
        }
        // Re-interning returns the same ids
        for i in 0..1000u32 {
            assert_eq!(t.intern(format!("sym_{i}").as_bytes()), ids[i as usize]);
        }
        assert_eq!(t.len(), 1000);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_intern_idempotent(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut t = SymbolTable::new();
            let a = t.intern(&bytes);
            let b = t.intern(&bytes);
            prop_assert_eq!(a, b);
            prop_assert_eq!(t.get_bytes(a), &bytes[..]);
        }

        #[test]
        fn prop_distinct_content_distinct_id(
            a in proptest::collection::vec(any::<u8>(), 0..32),
            b in proptest::collection::vec(any::<u8>(), 0..32),
        ) {
            prop_assume!(a != b);
            let mut t = SymbolTable::new();
            let ia = t.intern(&a);
            let ib = t.intern(&b);
            prop_assert_ne!(ia, ib);
        }
    }
}
