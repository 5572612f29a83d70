// Symbol table: bidirectional symbol <-> key mapping.

use crate::arc::{EPSILON, Label};
use hashbrown::HashMap;

/// Shared handle to a symbol table.
pub type SymbolTableRef = std::sync::Arc<SymbolTable>;

/// Conventional name of the epsilon symbol.
pub const EPSILON_SYMBOL: &str = "<eps>";

/// Append-only mapping between symbol strings and integer keys.
///
/// Entries keep their insertion order, and keys need not be dense: tables
/// read from interchange files may contain gaps, and `available_key` records
/// the next key [`add_symbol`](Self::add_symbol) will hand out. Existing keys
/// are never reassigned or removed.
///
/// Fsts share tables through `std::sync::Arc<SymbolTable>`; extending a shared
/// table goes through `Arc::make_mut`, so automata holding the old table keep
/// seeing a valid (shorter) table.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    name: String,
    available_key: i64,
    entries: Vec<(String, i64)>,
    by_symbol: HashMap<String, usize>,
    by_key: HashMap<i64, usize>,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a table whose key 0 is the epsilon symbol.
    pub fn with_epsilon(name: impl Into<String>) -> Self {
        let mut table = Self::new(name);
        table.add_symbol(EPSILON_SYMBOL);
        table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available_key(&self) -> i64 {
        self.available_key
    }

    pub(crate) fn set_available_key(&mut self, key: i64) {
        self.available_key = key;
    }

    /// Add a symbol, returning its key. Re-adding a known symbol returns the
    /// existing key.
    pub fn add_symbol(&mut self, symbol: &str) -> i64 {
        if let Some(&idx) = self.by_symbol.get(symbol) {
            return self.entries[idx].1;
        }
        let key = self.available_key;
        self.insert(symbol, key);
        key
    }

    /// Add a symbol under an explicit key.
    ///
    /// Returns the key the symbol ends up with: a symbol already present keeps
    /// its key. A key already bound to a different symbol is rejected with
    /// `None`.
    pub fn add_symbol_with_key(&mut self, symbol: &str, key: i64) -> Option<i64> {
        if let Some(&idx) = self.by_symbol.get(symbol) {
            return Some(self.entries[idx].1);
        }
        if self.by_key.contains_key(&key) {
            return None;
        }
        self.insert(symbol, key);
        Some(key)
    }

    fn insert(&mut self, symbol: &str, key: i64) {
        let idx = self.entries.len();
        self.entries.push((symbol.to_string(), key));
        self.by_symbol.insert(symbol.to_string(), idx);
        self.by_key.insert(key, idx);
        if key >= self.available_key {
            self.available_key = key + 1;
        }
    }

    pub fn find_key(&self, symbol: &str) -> Option<i64> {
        self.by_symbol.get(symbol).map(|&idx| self.entries[idx].1)
    }

    pub fn find_symbol(&self, key: i64) -> Option<&str> {
        self.by_key.get(&key).map(|&idx| self.entries[idx].0.as_str())
    }

    /// Key of `symbol` as an arc label, if present and representable.
    pub fn find_label(&self, symbol: &str) -> Option<Label> {
        self.find_key(symbol).and_then(|k| Label::try_from(k).ok())
    }

    pub fn contains_label(&self, label: Label) -> bool {
        self.by_key.contains_key(&i64::from(label))
    }

    /// Symbol printed for `label`; epsilon falls back to [`EPSILON_SYMBOL`].
    pub fn label_symbol(&self, label: Label) -> Option<&str> {
        match self.find_symbol(i64::from(label)) {
            Some(s) => Some(s),
            None if label == EPSILON => Some(EPSILON_SYMBOL),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(s, k)| (s.as_str(), *k))
    }
}

/// Tables are equal when name, next key and entry sequence agree.
impl PartialEq for SymbolTable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.available_key == other.available_key
            && self.entries == other.entries
    }
}

impl Eq for SymbolTable {}

/// Compare two optional shared tables by content.
pub(crate) fn same_table(a: Option<&SymbolTableRef>, b: Option<&SymbolTableRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => SymbolTableRef::ptr_eq(a, b) || a.entries == b.entries,
        _ => false,
    }
}
