//! Initial schema: users, chat sessions and messages.
//!
//! Timestamps are stored as UTC RFC 3339 text with millisecond precision so
//! that lexical order matches chronological order.

pub const TABLES_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    telegram_id VARCHAR(50) NOT NULL UNIQUE CHECK (length(telegram_id) BETWEEN 1 AND 50),
    username VARCHAR(100) CHECK (length(username) <= 100),
    first_name VARCHAR(100) CHECK (length(first_name) <= 100),
    last_name VARCHAR(100) CHECK (length(last_name) <= 100),
    complexity_level VARCHAR(20) NOT NULL DEFAULT 'medium' CHECK (length(complexity_level) <= 20),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS chat_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER REFERENCES users(id),
    session_id VARCHAR(100) NOT NULL UNIQUE CHECK (length(session_id) BETWEEN 1 AND 100),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    is_active BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id VARCHAR(100) NOT NULL CHECK (length(session_id) BETWEEN 1 AND 100),
    user_message TEXT NOT NULL,
    bot_response TEXT NOT NULL,
    sources TEXT,
    complexity_level VARCHAR(20) CHECK (length(complexity_level) <= 20),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
";

/// `AFTER UPDATE` with an inner `UPDATE` does not re-fire while
/// `recursive_triggers` is off (the default), so one update costs one rewrite.
pub const TRIGGER_SQL: &str = r"
CREATE TRIGGER IF NOT EXISTS update_users_updated_at
AFTER UPDATE ON users
FOR EACH ROW
BEGIN
    UPDATE users
       SET updated_at = MAX(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), OLD.updated_at)
     WHERE id = NEW.id;
END;
";
