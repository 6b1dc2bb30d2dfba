use botstore_core::{NewChatSession, NewUser};
use rusqlite::Connection;
use tempfile::TempDir;

use super::{create_test_storage, create_test_user};
use crate::migrations::SCHEMA_VERSION;
use crate::{SchemaStore as _, Storage, StorageBackend, StorageError, UserStore as _};

const USERS_COLUMNS_SQL: &str = "
    id INTEGER PRIMARY KEY,
    username VARCHAR(100),
    first_name VARCHAR(100),
    last_name VARCHAR(100),
    complexity_level VARCHAR(20) DEFAULT 'medium',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))";

fn sessions_table(user_id: &str, session_id: &str) -> String {
    format!(
        "CREATE TABLE chat_sessions (
             id INTEGER PRIMARY KEY,
             user_id {user_id},
             session_id {session_id},
             created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
             is_active BOOLEAN NOT NULL DEFAULT 1
         )"
    )
}

fn precreate(sql: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("existing.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(sql).unwrap();
    (temp_dir, db_path)
}

fn object_names(storage: &Storage, kind: &str) -> Vec<String> {
    let conn = storage.pool.get().unwrap();
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
              WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .unwrap();
    stmt.query_map([kind], |row| row.get(0)).unwrap().map(Result::unwrap).collect()
}

fn assert_drift(result: Result<Storage, StorageError>, table: &str) {
    match result {
        Err(StorageError::SchemaDrift { table: t, .. }) => assert_eq!(t, table),
        other => panic!("expected schema drift in {table}, got {other:?}"),
    }
}

#[test]
fn test_fresh_store_has_all_structures() {
    let (storage, _temp_dir) = create_test_storage();
    assert_eq!(object_names(&storage, "table"), ["chat_sessions", "messages", "users"]);
    assert_eq!(
        object_names(&storage, "index"),
        [
            "idx_chat_sessions_user_id",
            "idx_messages_created_at",
            "idx_messages_session_id",
            "idx_users_telegram_id",
        ]
    );
    assert_eq!(object_names(&storage, "trigger"), ["update_users_updated_at"]);

    let conn = storage.pool.get().unwrap();
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0)).unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[test]
fn test_ensure_schema_is_idempotent() {
    let (storage, temp_dir) = create_test_storage();
    let user = create_test_user(&storage, "42");

    storage.ensure_schema().unwrap();
    storage.ensure_schema().unwrap();
    drop(storage);

    let reopened = Storage::new(&temp_dir.path().join("test.db")).unwrap();
    assert_eq!(reopened.get_user(user.id).unwrap().unwrap(), user);
    assert_eq!(object_names(&reopened, "trigger").len(), 1);
}

#[test]
fn test_incompatible_column_type_is_drift() {
    let (_temp_dir, db_path) =
        precreate("CREATE TABLE users (id INTEGER PRIMARY KEY, telegram_id INTEGER NOT NULL)");
    assert_drift(Storage::new(&db_path), "users");
}

#[test]
fn test_drift_leaves_existing_database_untouched() {
    let (_temp_dir, db_path) =
        precreate("CREATE TABLE users (id INTEGER PRIMARY KEY, telegram_id INTEGER NOT NULL)");
    assert_drift(Storage::new(&db_path), "users");

    let conn = Connection::open(&db_path).unwrap();
    let tables: i64 = conn
        .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn test_missing_column_is_drift() {
    let (_temp_dir, db_path) = precreate(
        "CREATE TABLE chat_sessions (
             id INTEGER PRIMARY KEY,
             user_id INTEGER,
             session_id VARCHAR(100) NOT NULL UNIQUE,
             created_at TEXT
         )",
    );
    assert_drift(Storage::new(&db_path), "chat_sessions");
}

#[test]
fn test_nullable_required_column_is_drift() {
    let (_temp_dir, db_path) = precreate(
        "CREATE TABLE messages (
             id INTEGER PRIMARY KEY,
             session_id VARCHAR(100) NOT NULL,
             user_message TEXT,
             bot_response TEXT NOT NULL,
             sources TEXT,
             complexity_level VARCHAR(20),
             created_at TEXT
         )",
    );
    assert_drift(Storage::new(&db_path), "messages");
}

#[test]
fn test_compatible_existing_table_with_extra_column_is_accepted() {
    let (_temp_dir, db_path) = precreate(
        "CREATE TABLE users (
             id INTEGER PRIMARY KEY,
             telegram_id VARCHAR(50) NOT NULL UNIQUE,
             username VARCHAR(100),
             first_name VARCHAR(100),
             last_name VARCHAR(100),
             complexity_level VARCHAR(20) DEFAULT 'medium',
             created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
             updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
             language_code TEXT
         )",
    );
    let storage = Storage::new(&db_path).unwrap();
    let user = create_test_user(&storage, "77");
    assert_eq!(user.telegram_id, "77");
}

#[test]
fn test_index_on_wrong_column_is_drift() {
    let (_temp_dir, db_path) = precreate(
        "CREATE TABLE messages (
             id INTEGER PRIMARY KEY,
             session_id VARCHAR(100) NOT NULL,
             user_message TEXT NOT NULL,
             bot_response TEXT NOT NULL,
             sources TEXT,
             complexity_level VARCHAR(20),
             created_at TEXT NOT NULL
         );
         CREATE INDEX idx_messages_created_at ON messages (session_id);",
    );
    assert_drift(Storage::new(&db_path), "messages");
}

#[test]
fn test_telegram_id_without_unique_is_drift() {
    let (_temp_dir, db_path) = precreate(&format!(
        "CREATE TABLE users (telegram_id VARCHAR(50) NOT NULL, {USERS_COLUMNS_SQL})"
    ));
    assert_drift(Storage::new(&db_path), "users");
}

#[test]
fn test_non_unique_telegram_id_index_is_drift() {
    let (_temp_dir, db_path) = precreate(&format!(
        "CREATE TABLE users (telegram_id VARCHAR(50) NOT NULL, {USERS_COLUMNS_SQL});
         CREATE INDEX idx_users_telegram_id ON users (telegram_id);"
    ));
    assert_drift(Storage::new(&db_path), "users");
}

#[test]
fn test_separate_unique_index_keeps_telegram_id_unique() {
    let (_temp_dir, db_path) = precreate(&format!(
        "CREATE TABLE users (telegram_id VARCHAR(50) NOT NULL, {USERS_COLUMNS_SQL});
         CREATE UNIQUE INDEX users_telegram_id_key ON users (telegram_id);"
    ));
    let storage = Storage::new(&db_path).unwrap();

    create_test_user(&storage, "tg123");
    let second = storage.create_user(&NewUser::new("tg123"));
    assert!(matches!(second, Err(StorageError::Duplicate(_))), "got {second:?}");
}

#[test]
fn test_session_token_without_unique_is_drift() {
    let (_temp_dir, db_path) =
        precreate(&sessions_table("INTEGER REFERENCES users(id)", "VARCHAR(100) NOT NULL"));
    assert_drift(Storage::new(&db_path), "chat_sessions");
}

#[test]
fn test_session_owner_without_foreign_key_is_drift() {
    let (_temp_dir, db_path) =
        precreate(&sessions_table("INTEGER", "VARCHAR(100) NOT NULL UNIQUE"));
    assert_drift(Storage::new(&db_path), "chat_sessions");
}

#[test]
fn test_session_owner_referencing_other_table_is_drift() {
    let (_temp_dir, db_path) = precreate(&format!(
        "CREATE TABLE accounts (id INTEGER PRIMARY KEY);
         {}",
        sessions_table("INTEGER REFERENCES accounts(id)", "VARCHAR(100) NOT NULL UNIQUE")
    ));
    assert_drift(Storage::new(&db_path), "chat_sessions");
}

#[test]
fn test_foreign_key_to_parent_primary_key_is_accepted() {
    let (_temp_dir, db_path) =
        precreate(&sessions_table("INTEGER REFERENCES users", "VARCHAR(100) NOT NULL UNIQUE"));
    let storage = Storage::new(&db_path).unwrap();

    let orphan = storage.create_session(&NewChatSession::new("orphan", Some(404)));
    assert!(matches!(orphan, Err(StorageError::ForeignKey(_))), "got {orphan:?}");
}

#[test]
fn test_nullable_timestamps_are_drift() {
    let (_temp_dir, db_path) = precreate(
        "CREATE TABLE users (
             id INTEGER PRIMARY KEY,
             telegram_id VARCHAR(50) NOT NULL UNIQUE,
             username VARCHAR(100),
             first_name VARCHAR(100),
             last_name VARCHAR(100),
             complexity_level VARCHAR(20) DEFAULT 'medium',
             created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
             updated_at TEXT
         );
         INSERT INTO users (telegram_id) VALUES ('legacy');",
    );
    match Storage::new(&db_path) {
        Err(StorageError::SchemaDrift { table, detail }) => {
            assert_eq!(table, "users");
            assert!(detail.contains("updated_at"), "{detail}");
        },
        other => panic!("expected schema drift in users, got {other:?}"),
    }
}

#[test]
fn test_newer_schema_version_is_drift() {
    let (_temp_dir, db_path) = precreate("PRAGMA user_version = 99");
    assert_drift(Storage::new(&db_path), "database");
}

#[test]
fn test_in_memory_store() {
    let storage = Storage::open_in_memory().unwrap();
    let user = create_test_user(&storage, "mem");
    assert_eq!(storage.get_user_by_telegram_id("mem").unwrap().unwrap(), user);
}

#[tokio::test]
async fn test_backend_dispatch_through_traits() {
    let temp_dir = TempDir::new().unwrap();
    let config = botstore_core::StoreConfig {
        database_url: format!("sqlite://{}", temp_dir.path().join("backend.db").display()),
        ..Default::default()
    };
    let backend = StorageBackend::connect(&config).await.unwrap();
    backend.ensure_schema().await.unwrap();

    let user = backend.create_user(&botstore_core::NewUser::new("async-1")).await.unwrap();
    let found = backend.get_user_by_telegram_id("async-1").await.unwrap().unwrap();
    assert_eq!(found, user);
}

#[tokio::test]
async fn test_backend_in_memory_url() {
    let config = botstore_core::StoreConfig {
        database_url: "sqlite::memory:".to_owned(),
        ..Default::default()
    };
    let backend = StorageBackend::connect(&config).await.unwrap();
    assert!(matches!(backend, StorageBackend::Sqlite(_)));
    assert!(backend.get_user(1).await.unwrap().is_none());
}
