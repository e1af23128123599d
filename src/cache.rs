//! In-memory table cache
//!
//! Extracted tables are stored under the name of the file they came from and
//! re-read for every metric computation. Entries are shared as `Arc<Table>` so
//! readers never mutate a cached table. There is no eviction.

use crate::types::Table;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Filename-keyed store of extracted tables
#[derive(Debug, Default)]
pub struct TableCache {
    entries: RwLock<HashMap<String, Arc<Table>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a table, replacing any previous entry under the same key
    pub fn put(&self, key: impl Into<String>, table: Table) -> Arc<Table> {
        let key = key.into();
        let table = Arc::new(table);
        tracing::debug!(key = %key, rows = table.len(), "caching table");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&table));
        table
    }

    pub fn get(&self, key: &str) -> Option<Arc<Table>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Remove one entry, returning it when present
    pub fn remove(&self, key: &str) -> Option<Arc<Table>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
