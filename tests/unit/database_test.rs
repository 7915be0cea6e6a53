//! Unit tests for the database layer (connection + migrations) and the
//! SQLite-backed key/value store built on it.

use serde_json::json;
use tempfile::TempDir;

use ytcontroller::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use ytcontroller::database::Database;
use ytcontroller::services::storage::{self, keys, KeyValueStore, SqliteStore};

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_kv_table() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let exists: bool = db
        .connection()
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
            ["kv_store"],
            |row| row.get(0),
        )
        .unwrap_or(false);
    assert!(exists, "Table 'kv_store' should exist after migrations");
}

#[test]
fn test_schema_version_recorded() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().unwrap();
    run_all(db.connection()).expect("second run should be a no-op");
    run_all(db.connection()).expect("third run should be a no-op");
    let rows: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn test_open_creates_parent_directories() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("a").join("b").join("storage.db");
    Database::open(&path).expect("open should create parents");
    assert!(path.exists());
}

#[tokio::test]
async fn test_sqlite_store_persists_settings_record() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("storage.db");
    {
        let store = SqliteStore::open(&path).unwrap();
        store
            .set(keys::SETTINGS, json!({"autoPause": true, "volumeStep": 5}))
            .await
            .unwrap();
        storage::save_hint(&store, 12).await;
    }
    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(
        store.get(keys::SETTINGS).await.unwrap(),
        Some(json!({"autoPause": true, "volumeStep": 5}))
    );
    assert_eq!(storage::load_hint(&store).await, Some(12));
}

#[tokio::test]
async fn test_sqlite_store_remove_missing_key_is_ok() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.remove("never-set").await.unwrap();
    assert_eq!(store.get("never-set").await.unwrap(), None);
}
