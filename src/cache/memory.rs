// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::RwLock;

use super::{CacheEntry, CacheStore};
use crate::Result;

/// Non-persistent [CacheStore] keeping all entries in a [HashMap].
#[derive(Debug, Default)]
pub struct MemoryStore(RwLock<HashMap<String, CacheEntry>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entries = self.0.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let mut entries = self.0.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.0.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self.0.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.keys().cloned().collect())
    }
}
