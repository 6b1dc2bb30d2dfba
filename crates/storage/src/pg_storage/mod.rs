//! PostgreSQL storage backend using sqlx.

mod messages;
mod sessions;
mod users;

use std::time::Duration;

use botstore_core::constants::{
    PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_IDLE_TIMEOUT_SECS, PG_POOL_MAX_CONNECTIONS,
};
use botstore_core::{ChatSession, ComplexityLevel, Message, User};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row as _};

use crate::error::StorageError;
use crate::pg_migrations::ensure_pg_schema;
use crate::traits::SchemaStore;

#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connect and ensure the schema.
    ///
    /// # Errors
    /// Returns error if the database is unreachable or the schema has drifted.
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        Self::with_max_connections(database_url, PG_POOL_MAX_CONNECTIONS).await
    }

    /// # Errors
    /// Returns error if the database is unreachable or the schema has drifted.
    pub async fn with_max_connections(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(Duration::from_secs(PG_POOL_IDLE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        ensure_pg_schema(&pool).await?;
        tracing::info!(max_connections, "PgStorage initialized");
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl SchemaStore for PgStorage {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        ensure_pg_schema(&self.pool).await
    }
}

/// `SERIAL` columns are `int4`; the domain uses `i64`.
fn id_column(row: &PgRow, column: &str) -> Result<i64, StorageError> {
    Ok(i64::from(row.try_get::<i32, _>(column)?))
}

fn optional_id_column(row: &PgRow, column: &str) -> Result<Option<i64>, StorageError> {
    Ok(row.try_get::<Option<i32>, _>(column)?.map(i64::from))
}

pub(crate) fn row_to_user(row: &PgRow) -> Result<User, StorageError> {
    let complexity: Option<String> = row.try_get("complexity_level")?;
    Ok(User {
        id: id_column(row, "id")?,
        telegram_id: row.try_get("telegram_id")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        complexity_level: complexity
            .as_deref()
            .map(ComplexityLevel::from_stored)
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn row_to_session(row: &PgRow) -> Result<ChatSession, StorageError> {
    Ok(ChatSession {
        id: id_column(row, "id")?,
        user_id: optional_id_column(row, "user_id")?,
        session_id: row.try_get("session_id")?,
        created_at: row.try_get("created_at")?,
        is_active: row.try_get::<Option<bool>, _>("is_active")?.unwrap_or(true),
    })
}

pub(crate) fn row_to_message(row: &PgRow) -> Result<Message, StorageError> {
    let complexity: Option<String> = row.try_get("complexity_level")?;
    Ok(Message {
        id: id_column(row, "id")?,
        session_id: row.try_get("session_id")?,
        user_message: row.try_get("user_message")?,
        bot_response: row.try_get("bot_response")?,
        sources: row.try_get("sources")?,
        complexity_level: ComplexityLevel::from_stored_optional(complexity.as_deref()),
        created_at: row.try_get("created_at")?,
    })
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(botstore_core::constants::clamp_limit(limit)).unwrap_or(i64::MAX)
}

fn count_to_usize(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}
