//! Test utilities and module declarations for storage tests.

use botstore_core::{NewChatSession, NewMessage, NewUser, ProfileUpdate, User};
use tempfile::TempDir;

use crate::Storage;

#[expect(clippy::unwrap_used, reason = "test code")]
pub fn create_test_storage() -> (Storage, TempDir) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let storage = Storage::new(&db_path).unwrap();
    (storage, temp_dir)
}

#[expect(clippy::unwrap_used, reason = "test code")]
pub fn create_test_user(storage: &Storage, telegram_id: &str) -> User {
    let profile = ProfileUpdate {
        username: Some(format!("user_{telegram_id}")),
        first_name: Some("Ada".to_owned()),
        last_name: None,
    };
    storage.create_user(&NewUser::new(telegram_id).with_profile(profile)).unwrap()
}

#[expect(clippy::unwrap_used, reason = "test code")]
pub fn create_test_session(storage: &Storage, token: &str, user_id: Option<i64>) {
    storage.create_session(&NewChatSession::new(token, user_id)).unwrap();
}

pub fn exchange(token: &str, n: usize) -> NewMessage {
    NewMessage::new(token, format!("question {n}"), format!("answer {n}"))
}

/// Run raw SQL on a pooled connection, bypassing the typed API.
#[expect(clippy::unwrap_used, reason = "test code")]
pub fn raw_execute(storage: &Storage, sql: &str) -> Result<usize, rusqlite::Error> {
    let conn = storage.pool.get().unwrap();
    conn.execute(sql, [])
}

mod message_tests;
mod schema_tests;
mod user_tests;
