//! MessageStore implementation for PgStorage.

use async_trait::async_trait;
use botstore_core::{Message, NewMessage};
use chrono::{DateTime, Utc};

use super::{PgStorage, count_to_usize, limit_param, row_to_message};
use crate::error::StorageError;
use crate::schema::MESSAGE_COLUMNS;
use crate::traits::MessageStore;

#[async_trait]
impl MessageStore for PgStorage {
    async fn save_message(&self, message: &NewMessage) -> Result<Message, StorageError> {
        message.validate()?;
        let row = sqlx::query(&format!(
            "INSERT INTO messages
                 (session_id, user_message, bot_response, sources, complexity_level)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(&message.session_id)
        .bind(&message.user_message)
        .bind(&message.bot_response)
        .bind(&message.sources)
        .bind(message.complexity_level.map(|l| l.as_str()))
        .fetch_one(&self.pool)
        .await?;
        row_to_message(&row)
    }

    async fn get_session_messages(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM (
                 SELECT {MESSAGE_COLUMNS} FROM messages
                  WHERE session_id = $1
                  ORDER BY created_at DESC, id DESC
                  LIMIT $2
             ) recent
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(token)
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_message).collect()
    }

    async fn get_messages_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
              WHERE ($1::timestamptz IS NULL OR created_at >= $1)
                AND ($2::timestamptz IS NULL OR created_at < $2)
              ORDER BY created_at ASC, id ASC
              LIMIT $3"
        ))
        .bind(from)
        .bind(to)
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_message).collect()
    }

    async fn count_user_messages(&self, user_id: i64) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m
               JOIN chat_sessions s ON s.session_id = m.session_id
              WHERE s.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count_to_usize(count))
    }
}
