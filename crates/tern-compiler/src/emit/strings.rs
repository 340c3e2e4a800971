//! Constant strings referenced by generated code.
//!
//! Shared across every method of a unit, so identical literals are emitted
//! once and loaded by index.

use rustc_hash::FxHashMap;

/// Unit-level string table with deduplication.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` or find the entry already holding it.
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(&idx) = self.index.get(value) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(value.to_string());
        self.index.insert(value.to_string(), idx);
        idx
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates() {
        let mut table = StringTable::new();
        let a = table.intern("hello");
        let b = table.intern("world");
        assert_eq!(table.intern("hello"), a);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(b), Some("world"));
        assert_eq!(table.iter().collect::<Vec<_>>(), ["hello", "world"]);
    }

    #[test]
    fn empty_string_is_an_entry() {
        let mut table = StringTable::new();
        assert!(table.is_empty());
        let idx = table.intern("");
        assert_eq!(table.get(idx), Some(""));
        assert_eq!(table.get(idx + 1), None);
    }
}
