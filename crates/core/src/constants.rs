//! Shared constants for botstore.
//!
//! Column limits mirror the VARCHAR widths of the persisted schema.

/// Maximum length of `users.telegram_id`.
pub const TELEGRAM_ID_MAX_LEN: usize = 50;

/// Maximum length of `users.username`, `users.first_name`, `users.last_name`.
pub const NAME_MAX_LEN: usize = 100;

/// Maximum length of a session token (`chat_sessions.session_id`, `messages.session_id`).
pub const SESSION_TOKEN_MAX_LEN: usize = 100;

/// Maximum length of a stored complexity label.
pub const COMPLEXITY_MAX_LEN: usize = 20;

/// Maximum number of rows returned by any list query.
pub const MAX_QUERY_LIMIT: usize = 1000;

/// Default number of messages returned when reconstructing a conversation.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A session created within this many hours is reused as the active one.
pub const DEFAULT_ACTIVE_SESSION_HOURS: i64 = 24;

/// SQLite connection pool size when `BOTSTORE_DB_POOL_SIZE` is not set.
pub const DEFAULT_DB_POOL_SIZE: u32 = 8;

/// SQLite busy timeout in milliseconds.
pub const SQLITE_BUSY_TIMEOUT_MS: u32 = 30_000;

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL connection pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Database used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://botstore.db";

/// Clamp a caller-supplied limit to `1..=MAX_QUERY_LIMIT`.
#[must_use]
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_QUERY_LIMIT)
}
