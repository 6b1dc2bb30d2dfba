//! ChatSessionStore implementation for PgStorage.

use async_trait::async_trait;
use botstore_core::{ChatSession, NewChatSession};
use chrono::{DateTime, Utc};

use super::{PgStorage, count_to_usize, limit_param, row_to_session};
use crate::error::StorageError;
use crate::schema::SESSION_COLUMNS;
use crate::traits::ChatSessionStore;

#[async_trait]
impl ChatSessionStore for PgStorage {
    async fn create_session(&self, session: &NewChatSession) -> Result<ChatSession, StorageError> {
        session.validate()?;
        let row = sqlx::query(&format!(
            "INSERT INTO chat_sessions (user_id, session_id) VALUES ($1, $2)
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session.user_id)
        .bind(&session.session_id)
        .fetch_one(&self.pool)
        .await?;
        row_to_session(&row)
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<ChatSession>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn list_user_sessions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatSession>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
              WHERE user_id = $1
              ORDER BY created_at DESC, id DESC
              LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_session).collect()
    }

    async fn latest_active_session(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Option<ChatSession>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
              WHERE user_id = $1 AND is_active AND created_at >= $2
              ORDER BY created_at DESC, id DESC
              LIMIT 1"
        ))
        .bind(user_id)
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn set_session_active(
        &self,
        token: &str,
        active: bool,
    ) -> Result<ChatSession, StorageError> {
        let row = sqlx::query(&format!(
            "UPDATE chat_sessions SET is_active = $1 WHERE session_id = $2
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(active)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("chat_session", token))?;
        row_to_session(&row)
    }

    async fn count_user_sessions(&self, user_id: i64) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count_to_usize(count))
    }
}
