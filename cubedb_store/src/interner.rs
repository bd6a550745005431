//! String interning.
//!
//! Column names and values each get a dense id from their own table. Ids
//! are stable for the life of the process; a restore may renumber them, so
//! nothing durable encodes an id.

use cubedb_data::{ColumnId, SymbolId, ValueId};
use hashbrown::HashMap;
use std::sync::Arc;

/// A bidirectional `string -> id` / `id -> string` table.
///
/// The string storage is shared between both directions, so each distinct
/// string is held once.
pub struct SymbolTable<I> {
    by_name: HashMap<Arc<str>, I>,
    by_id: Vec<Arc<str>>,
}

impl<I> std::fmt::Debug for SymbolTable<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("symbols", &self.by_id.len())
            .finish()
    }
}

impl<I> Default for SymbolTable<I> {
    fn default() -> Self {
        Self {
            by_name: HashMap::new(),
            by_id: Vec::new(),
        }
    }
}

impl<I: SymbolId> SymbolTable<I> {
    /// Return the id for `symbol`, assigning the next dense id if the
    /// symbol has not been seen before.
    pub fn intern(&mut self, symbol: &str) -> I {
        if let Some(id) = self.by_name.get(symbol) {
            return *id;
        }
        let id = I::from_u32(self.by_id.len() as u32);
        let shared: Arc<str> = Arc::from(symbol);
        self.by_id.push(Arc::clone(&shared));
        self.by_name.insert(shared, id);
        id
    }

    /// Return the id for `symbol` without creating one.
    ///
    /// Query paths use this so that a query naming an unknown value returns
    /// zero instead of growing the table.
    pub fn lookup(&self, symbol: &str) -> Option<I> {
        self.by_name.get(symbol).copied()
    }

    /// Return the string behind `id`.
    ///
    /// `id` must have been produced by this table; ids are never handed out
    /// for untracked strings.
    pub fn resolve(&self, id: I) -> &str {
        &self.by_id[id.as_u32() as usize]
    }

    /// Number of interned symbols.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// The process-wide pair of symbol tables: one for column names, one for
/// values.
#[derive(Debug, Default)]
pub struct Interner {
    columns: SymbolTable<ColumnId>,
    values: SymbolTable<ValueId>,
}

impl Interner {
    /// Intern a column name.
    pub fn intern_column(&mut self, name: &str) -> ColumnId {
        self.columns.intern(name)
    }

    /// Intern a value.
    pub fn intern_value(&mut self, value: &str) -> ValueId {
        self.values.intern(value)
    }

    /// Look up a column name without creating it.
    pub fn lookup_column(&self, name: &str) -> Option<ColumnId> {
        self.columns.lookup(name)
    }

    /// Look up a value without creating it.
    pub fn lookup_value(&self, value: &str) -> Option<ValueId> {
        self.values.lookup(value)
    }

    /// The name behind a column id.
    pub fn resolve_column(&self, id: ColumnId) -> &str {
        self.columns.resolve(id)
    }

    /// The string behind a value id.
    pub fn resolve_value(&self, id: ValueId) -> &str {
        self.values.resolve(id)
    }
}
