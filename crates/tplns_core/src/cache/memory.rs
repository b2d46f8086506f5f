//! Process-local cache store.

use super::{CacheError, CacheResult, CacheStore};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    tags: BTreeSet<String>,
}

/// Mutex-guarded in-memory store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::LockPoisoned("memory"))
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.lock()?.get(key).map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &str, tags: &[&str]) -> CacheResult<()> {
        self.lock()?.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
            },
        );
        Ok(())
    }

    fn invalidate_tags(&self, tags: &[&str]) -> CacheResult<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| !tags.iter().any(|tag| entry.tags.contains(*tag)));
        Ok(before - entries.len())
    }
}
