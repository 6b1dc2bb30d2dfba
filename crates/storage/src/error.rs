//! Typed error enum for the storage layer.
//!
//! Driver errors are classified by SQLite extended result code or PostgreSQL
//! SQLSTATE so callers can match on constraint failures (duplicate key,
//! dangling reference, missing value) instead of inspecting messages.

use botstore_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Row not found for expected-present entity.
    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation (telegram_id, session token).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Foreign key violation (chat_sessions.user_id naming no user).
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// NOT NULL violation on a required column.
    #[error("missing required value: {0}")]
    MissingValue(String),

    /// CHECK or width constraint violation.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Database-side row-level policy or privilege denial.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Input rejected before reaching the database.
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationError),

    /// Existing structure does not match the expected schema.
    #[error("schema drift in {table}: {detail}")]
    SchemaDrift { table: String, detail: String },

    /// Migration failure.
    #[error("migration error: {0}")]
    Migration(String),

    /// Row data could not be decoded into a domain type.
    #[error("data corruption: {context}")]
    DataCorruption {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[cfg(feature = "sqlite")]
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[source] sqlx::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The requested backend is not compiled in.
    #[error("unsupported database: {0}")]
    Unsupported(String),
}

impl StorageError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub(crate) fn drift(table: &str, detail: impl Into<String>) -> Self {
        Self::SchemaDrift { table: table.to_owned(), detail: detail.into() }
    }

    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            #[cfg(feature = "sqlite")]
            Self::Pool(_) => true,
            #[cfg(feature = "postgres")]
            Self::Postgres(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) => true,
            _ => false,
        }
    }

    /// Whether this error is a unique-constraint violation.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    /// Whether this error is a dangling-reference violation.
    pub fn is_foreign_key(&self) -> bool {
        matches!(self, Self::ForeignKey(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Custom `From<rusqlite::Error>`, classified by extended result code.
///
/// - `QueryReturnedNoRows` → `NotFound` (generic; callers remap with entity context)
/// - `SQLITE_CONSTRAINT_UNIQUE` / `_PRIMARYKEY` → `Duplicate`
/// - `SQLITE_CONSTRAINT_FOREIGNKEY` → `ForeignKey`
/// - `SQLITE_CONSTRAINT_NOTNULL` → `MissingValue`
/// - other constraint codes → `Constraint`
/// - conversion failures → `DataCorruption`
#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        match err {
            rusqlite::Error::QueryReturnedNoRows => Self::not_found("row", "unknown"),
            rusqlite::Error::SqliteFailure(code, ref msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let detail = msg.clone().unwrap_or_else(|| code.to_string());
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        Self::Duplicate(detail)
                    },
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKey(detail),
                    ffi::SQLITE_CONSTRAINT_NOTNULL => Self::MissingValue(detail),
                    _ => Self::Constraint(detail),
                }
            },
            rusqlite::Error::FromSqlConversionFailure(column, _, source) => Self::DataCorruption {
                context: format!("column {column} could not be decoded"),
                source,
            },
            rusqlite::Error::InvalidColumnType(column, _, ty) => Self::DataCorruption {
                context: format!("column {column} has unexpected type {ty}"),
                source: Box::new(err),
            },
            other => Self::Sqlite(other),
        }
    }
}

/// Custom `From<sqlx::Error>`, classified by SQLSTATE.
///
/// - `RowNotFound` → `NotFound`
/// - 23505 → `Duplicate`, 23503 → `ForeignKey`, 23502 → `MissingValue`
/// - 23514 (check) and 22001 (value too long) → `Constraint`
/// - 42501 (insufficient privilege, row-level policy) → `PermissionDenied`
#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::not_found("row", "unknown"),
            sqlx::Error::Database(db_err) => {
                let detail = db_err.message().to_owned();
                let code = db_err.code().map(std::borrow::Cow::into_owned);
                match code.as_deref() {
                    Some("23505") => Self::Duplicate(detail),
                    Some("23503") => Self::ForeignKey(detail),
                    Some("23502") => Self::MissingValue(detail),
                    Some("23514" | "22001") => Self::Constraint(detail),
                    Some("42501") => Self::PermissionDenied(detail),
                    _ => Self::Postgres(err),
                }
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => Self::DataCorruption {
                context: "row decode".to_owned(),
                source: Box::new(err),
            },
            _ => Self::Postgres(err),
        }
    }
}
