//! Tagged key/value cache stores for resolved namespaces.
//!
//! # Responsibility
//! - Define the persistent cache boundary shared across requests/processes.
//! - Provide in-memory and SQLite-backed stores.
//!
//! # Invariants
//! - Values are opaque JSON strings; typed access goes through
//!   `get_json`/`set_json`.
//! - Writes are last-writer-wins per key; there is no time-based expiry.
//! - Invalidating a tag removes every entry carrying that tag.

use crate::db::DbError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;

pub type CacheResult<T> = Result<T, CacheError>;

/// Key/value store with tag-based invalidation.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    fn set(&self, key: &str, value: &str, tags: &[&str]) -> CacheResult<()>;

    /// Removes every entry tagged with any of `tags`; returns removed entry count.
    fn invalidate_tags(&self, tags: &[&str]) -> CacheResult<usize>;
}

/// Reads and deserializes one cached value.
pub fn get_json<T: DeserializeOwned>(store: &dyn CacheStore, key: &str) -> CacheResult<Option<T>> {
    store
        .get(key)?
        .map(|raw| serde_json::from_str(&raw).map_err(CacheError::from))
        .transpose()
}

/// Serializes and stores one value under `key`.
pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
    tags: &[&str],
) -> CacheResult<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw, tags)
}

#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    Serialization(serde_json::Error),
    LockPoisoned(&'static str),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "cache storage error: {err}"),
            Self::Serialization(err) => write!(f, "cache value is not valid JSON: {err}"),
            Self::LockPoisoned(store) => write!(f, "{store} cache lock poisoned"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::LockPoisoned(_) => None,
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
