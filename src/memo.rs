//! Functional memo table keyed by `(node identity, restriction)`.
//!
//! `put` returns a new `Memos`; callers thread the result forward rather
//! than mutating in place, matching the engine's functional context
//! threading (resolver.rs).

use std::collections::HashMap;

use crate::path::Path;
use crate::value::{ConfigValue, NodeId};

/// `None` restriction means "fully resolved"; `Some(path)` means "resolved
/// only as far as `path` requires".
pub type MemoKey = (NodeId, Option<Path>);

#[derive(Debug, Clone, Default)]
pub struct Memos {
    table: HashMap<MemoKey, ConfigValue>,
}

impl Memos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the full-resolution key first (restriction = `None`); a
    /// fully resolved cache entry satisfies any restricted query, since a
    /// fully resolved subtree has no unresolved children left to restrict
    /// to. Falls back to the exact `(id, restriction)` key on miss.
    pub fn get(&self, id: NodeId, restriction: Option<&Path>) -> Option<&ConfigValue> {
        if let Some(v) = self.table.get(&(id, None)) {
            return Some(v);
        }
        restriction.and_then(|r| self.table.get(&(id, Some(r.clone()))))
    }

    pub fn put(&self, id: NodeId, restriction: Option<Path>, value: ConfigValue) -> Self {
        let mut table = self.table.clone();
        table.insert((id, restriction), value);
        Self { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
