//! SQLite-backed cache store shared across processes.

use super::{CacheError, CacheResult, CacheStore};
use crate::db::{open_db, open_db_in_memory};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// Cache store persisted in a SQLite database file.
#[derive(Debug)]
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Opens (or creates) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> CacheResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::LockPoisoned("sqlite"))
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE cache_key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, tags: &[&str]) -> CacheResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO cache_entries (cache_key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(cache_key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value, unix_seconds()],
        )?;
        tx.execute("DELETE FROM cache_tags WHERE cache_key = ?1;", [key])?;
        for tag in tags {
            tx.execute(
                "INSERT OR IGNORE INTO cache_tags (cache_key, tag) VALUES (?1, ?2);",
                params![key, tag],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn invalidate_tags(&self, tags: &[&str]) -> CacheResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        for tag in tags {
            removed += tx.execute(
                "DELETE FROM cache_entries
                 WHERE cache_key IN (SELECT cache_key FROM cache_tags WHERE tag = ?1);",
                [tag],
            )?;
        }
        tx.commit()?;
        debug!(
            "event=cache_invalidate module=cache status=ok store=sqlite tags={} removed={}",
            tags.join(","),
            removed
        );
        Ok(removed)
    }
}

fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}
