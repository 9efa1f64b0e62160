//! Symbol interning
//!
//! Every name in the runtime is an interned symbol: a small copyable id
//! that compares by identity. The text is consulted only at intern time
//! and when rendering. The interner is constructed before any type object
//! exists, so the bootstrap sequencer can name the root and symbol types
//! retroactively once `"type"` and `"symbol"` have been interned.

use std::collections::HashMap;

/// An interned name. Identity (the id) is the only thing compared at
/// runtime; two symbols with the same id are the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Canonical name <-> identity mapping. Ids are handed out sequentially
/// in first-seen order; nothing is ever removed.
#[derive(Debug, Default)]
pub struct Interner {
    names: Vec<String>,
    ids: HashMap<String, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: returns the existing symbol for a seen name, otherwise
    /// allocates the next sequential id.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.ids.get(name) {
            return *sym;
        }
        let sym = Symbol(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), sym);
        sym
    }

    /// The text this symbol was interned from.
    pub fn name(&self, sym: Symbol) -> &str {
        self.names
            .get(sym.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
