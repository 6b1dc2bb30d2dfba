//! Expected shape of the persisted schema.
//!
//! Both migration paths create the structures with dialect-specific DDL and
//! then check the live catalog against these tables, so a pre-existing
//! structure with an incompatible shape is reported instead of used.

#![cfg_attr(
    not(all(feature = "sqlite", feature = "postgres")),
    allow(dead_code, reason = "each backend reads only its own dialect columns")
)]

pub(crate) struct ColumnShape {
    pub name: &'static str,
    /// Declared type as written in the SQLite DDL.
    pub sqlite_type: &'static str,
    /// `information_schema.columns.data_type` in PostgreSQL.
    pub pg_type: &'static str,
    pub max_len: Option<i32>,
    /// Must be NOT NULL in the store.
    pub required: bool,
    pub primary_key: bool,
}

pub(crate) struct TableShape {
    pub name: &'static str,
    pub columns: &'static [ColumnShape],
}

pub(crate) struct IndexShape {
    pub name: &'static str,
    pub table: &'static str,
    pub column: &'static str,
}

/// A single-column UNIQUE constraint.
pub(crate) struct UniqueShape {
    pub table: &'static str,
    pub column: &'static str,
}

/// A single-column foreign key `table(column) REFERENCES parent(parent_column)`.
pub(crate) struct ForeignKeyShape {
    pub table: &'static str,
    pub column: &'static str,
    pub parent: &'static str,
    pub parent_column: &'static str,
}

const fn column(
    name: &'static str,
    sqlite_type: &'static str,
    pg_type: &'static str,
    max_len: Option<i32>,
    required: bool,
) -> ColumnShape {
    ColumnShape { name, sqlite_type, pg_type, max_len, required, primary_key: false }
}

const fn id_column() -> ColumnShape {
    ColumnShape {
        name: "id",
        sqlite_type: "INTEGER",
        pg_type: "integer",
        max_len: None,
        required: true,
        primary_key: true,
    }
}

const VARCHAR: &str = "character varying";
const TIMESTAMPTZ: &str = "timestamp with time zone";

pub(crate) const USERS: TableShape = TableShape {
    name: "users",
    columns: &[
        id_column(),
        column("telegram_id", "VARCHAR(50)", VARCHAR, Some(50), true),
        column("username", "VARCHAR(100)", VARCHAR, Some(100), false),
        column("first_name", "VARCHAR(100)", VARCHAR, Some(100), false),
        column("last_name", "VARCHAR(100)", VARCHAR, Some(100), false),
        column("complexity_level", "VARCHAR(20)", VARCHAR, Some(20), false),
        column("created_at", "TEXT", TIMESTAMPTZ, None, true),
        column("updated_at", "TEXT", TIMESTAMPTZ, None, true),
    ],
};

pub(crate) const CHAT_SESSIONS: TableShape = TableShape {
    name: "chat_sessions",
    columns: &[
        id_column(),
        column("user_id", "INTEGER", "integer", None, false),
        column("session_id", "VARCHAR(100)", VARCHAR, Some(100), true),
        column("created_at", "TEXT", TIMESTAMPTZ, None, true),
        column("is_active", "BOOLEAN", "boolean", None, true),
    ],
};

pub(crate) const MESSAGES: TableShape = TableShape {
    name: "messages",
    columns: &[
        id_column(),
        column("session_id", "VARCHAR(100)", VARCHAR, Some(100), true),
        column("user_message", "TEXT", "text", None, true),
        column("bot_response", "TEXT", "text", None, true),
        column("sources", "TEXT", "text", None, false),
        column("complexity_level", "VARCHAR(20)", VARCHAR, Some(20), false),
        column("created_at", "TEXT", TIMESTAMPTZ, None, true),
    ],
};

pub(crate) const TABLES: [&TableShape; 3] = [&USERS, &CHAT_SESSIONS, &MESSAGES];

pub(crate) const INDEXES: [IndexShape; 4] = [
    IndexShape { name: "idx_users_telegram_id", table: "users", column: "telegram_id" },
    IndexShape { name: "idx_chat_sessions_user_id", table: "chat_sessions", column: "user_id" },
    IndexShape { name: "idx_messages_session_id", table: "messages", column: "session_id" },
    IndexShape { name: "idx_messages_created_at", table: "messages", column: "created_at" },
];

pub(crate) const UNIQUE_KEYS: [UniqueShape; 2] = [
    UniqueShape { table: "users", column: "telegram_id" },
    UniqueShape { table: "chat_sessions", column: "session_id" },
];

pub(crate) const FOREIGN_KEYS: [ForeignKeyShape; 1] = [ForeignKeyShape {
    table: "chat_sessions",
    column: "user_id",
    parent: "users",
    parent_column: "id",
}];

/// Trigger that refreshes `users.updated_at` on every update.
pub(crate) const UPDATED_AT_TRIGGER: &str = "update_users_updated_at";

impl IndexShape {
    pub(crate) fn create_sql(&self) -> String {
        format!("CREATE INDEX IF NOT EXISTS {} ON {} ({})", self.name, self.table, self.column)
    }
}

pub(crate) const USER_COLUMNS: &str =
    "id, telegram_id, username, first_name, last_name, complexity_level, created_at, updated_at";

pub(crate) const SESSION_COLUMNS: &str = "id, user_id, session_id, created_at, is_active";

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, session_id, user_message, bot_response, sources, complexity_level, created_at";

/// Normalize a declared SQL type for comparison (`varchar( 50 )` → `VARCHAR(50)`).
pub(crate) fn normalize_type(declared: &str) -> String {
    declared.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase()
}
