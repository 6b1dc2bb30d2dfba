//! `SQLite` storage implementation.
//!
//! All methods are synchronous; [`backend`] wraps them for async callers.

// SQLite uses i64 for counts/limits, Rust uses usize
#![allow(
    clippy::as_conversions,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    reason = "SQLite i64 <-> Rust usize conversions are safe within DB row counts"
)]

mod backend;
mod messages;
mod sessions;
mod users;

use std::path::Path;

use botstore_core::constants::{DEFAULT_DB_POOL_SIZE, SQLITE_BUSY_TIMEOUT_MS};
use chrono::{DateTime, NaiveDateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use rusqlite::types::Type;

use crate::error::StorageError;
use crate::migrations;

/// Type alias for pooled connection
pub(crate) type PooledConn = PooledConnection<SqliteConnectionManager>;

/// `SQLite` storage wrapping an r2d2 connection pool.
#[derive(Clone, Debug)]
pub struct Storage {
    pub(crate) pool: Pool<SqliteConnectionManager>,
}

/// Get a connection from the pool
pub(crate) fn get_conn(pool: &Pool<SqliteConnectionManager>) -> Result<PooledConn, StorageError> {
    pool.get().map_err(StorageError::from)
}

fn init_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&format!(
        "PRAGMA busy_timeout = {SQLITE_BUSY_TIMEOUT_MS};
         PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;"
    ))
}

impl Storage {
    /// Open (or create) the database file and ensure the schema.
    ///
    /// # Errors
    /// Returns error if the pool cannot be built or the existing schema has drifted.
    pub fn new(db_path: &Path) -> Result<Self, StorageError> {
        Self::with_pool_size(db_path, DEFAULT_DB_POOL_SIZE)
    }

    /// # Errors
    /// Returns error if the pool cannot be built or the existing schema has drifted.
    pub fn with_pool_size(db_path: &Path, pool_size: u32) -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::file(db_path).with_init(init_connection);
        let storage = Self::from_manager(manager, pool_size)?;
        tracing::info!(path = %db_path.display(), pool_size, "SQLite storage opened");
        Ok(storage)
    }

    /// Private in-memory database.
    ///
    /// Every in-memory connection is a separate database, so the pool holds a
    /// single connection.
    ///
    /// # Errors
    /// Returns error if the connection cannot be opened.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        Self::from_manager(manager, 1)
    }

    fn from_manager(
        manager: SqliteConnectionManager,
        pool_size: u32,
    ) -> Result<Self, StorageError> {
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;
        {
            let conn = get_conn(&pool)?;
            migrations::ensure_schema(&conn)?;
        }
        Ok(Self { pool })
    }

    /// Re-run schema creation and verification.
    ///
    /// # Errors
    /// Returns [`StorageError::SchemaDrift`] if an existing structure has an incompatible shape.
    pub fn ensure_schema(&self) -> Result<(), StorageError> {
        let conn = get_conn(&self.pool)?;
        migrations::ensure_schema(&conn)
    }
}

/// Same layout SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ')` produces.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub(crate) fn to_sql_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts RFC 3339 and SQLite's `CURRENT_TIMESTAMP` layout.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|d| d.with_timezone(&Utc)).or_else(|_| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|n| n.and_utc())
    })
}

pub(crate) fn timestamp_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn count_to_usize(count: i64) -> usize {
    count.max(0) as usize
}

pub(crate) fn limit_param(limit: usize) -> i64 {
    botstore_core::constants::clamp_limit(limit) as i64
}
