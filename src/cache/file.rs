// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use super::{CacheEntry, CacheStore};
use crate::{Error, Result};

/// [CacheStore] persisting all entries to a single JSON file.
///
/// Entries are held in memory and the whole file is rewritten on every modification,
/// which is fine for the few hundred entries a route cache usually holds.
/// Writes go to a temporary file first, which is then renamed over the target.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl FileStore {
    /// Opens a cache file, loading all of its entries. A missing file is
    /// treated as an empty cache, and will be created on the first write.
    ///
    /// Fails with [Error::CacheUnavailable] if the file exists, but can't be read or parsed.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read(&path).await {
            Ok(content) => serde_json::from_slice(&content).map_err(|e| {
                Error::CacheUnavailable(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::default(),
            Err(e) => return Err(Error::CacheUnavailable(format!("{}: {}", path.display(), e))),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        let content = serde_json::to_vec(entries)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");

        let write = async {
            tokio::fs::write(&tmp, content).await?;
            tokio::fs::rename(&tmp, &self.path).await
        };

        write
            .await
            .map_err(|e| Error::CacheUnavailable(format!("{}: {}", self.path.display(), e)))
    }
}

impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), entry);
        self.flush(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(stored_at: u64) -> CacheEntry {
        CacheEntry {
            value: serde_json::json!([1, 2, 3]),
            stored_at,
        }
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("cache.json")).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn entries_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        {
            let store = FileStore::open(&path).await.unwrap();
            store.put("a", entry(1)).await.unwrap();
            store.put("b", entry(2)).await.unwrap();
            store.delete("a").await.unwrap();
        }

        let store = FileStore::open(&path).await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["b".to_string()]);
        assert_eq!(store.get("b").await.unwrap(), Some(entry(2)));
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupted_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{ definitely not json").unwrap();

        match FileStore::open(&path).await {
            Err(Error::CacheUnavailable(_)) => {}
            other => panic!("expected CacheUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unwritable_location_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("missing-dir").join("cache.json"))
            .await
            .unwrap();

        match store.put("a", entry(1)).await {
            Err(Error::CacheUnavailable(_)) => {}
            other => panic!("expected CacheUnavailable, got {:?}", other),
        }
    }
}
