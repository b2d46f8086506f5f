use rusqlite::Connection;
use tplns_core::db::migrations::latest_version;
use tplns_core::db::{open_db, open_db_in_memory, DbError};
use tplns_core::{CacheError, CacheStore, SqliteCacheStore};

#[test]
fn in_memory_database_has_cache_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "cache_entries");
    assert_table_exists(&conn, "cache_tags");
}

#[test]
fn reopening_cache_file_keeps_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tplns-cache.db");

    let store = SqliteCacheStore::open(&path).unwrap();
    store
        .set("template_namespaces", "{}", &["theme_registry"])
        .unwrap();
    drop(store);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    drop(conn);

    let store = SqliteCacheStore::open(&path).unwrap();
    assert_eq!(
        store.get("template_namespaces").unwrap().as_deref(),
        Some("{}")
    );
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 42);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        SqliteCacheStore::open(&path),
        Err(CacheError::Db(DbError::UnsupportedSchemaVersion { .. }))
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "expected table `{table_name}`");
}
