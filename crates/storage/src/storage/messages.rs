use botstore_core::{ComplexityLevel, Message, NewMessage};
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::{Storage, count_to_usize, get_conn, limit_param, timestamp_column, to_sql_timestamp};
use crate::error::StorageError;
use crate::schema::MESSAGE_COLUMNS;

impl Storage {
    /// Append one exchange. The session token is not checked against `chat_sessions`.
    ///
    /// # Errors
    /// Returns error if validation or the insert fails.
    pub fn save_message(&self, message: &NewMessage) -> Result<Message, StorageError> {
        message.validate()?;
        let conn = get_conn(&self.pool)?;
        let saved = conn.query_row(
            &format!(
                "INSERT INTO messages
                     (session_id, user_message, bot_response, sources, complexity_level)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING {MESSAGE_COLUMNS}"
            ),
            params![
                message.session_id,
                message.user_message,
                message.bot_response,
                message.sources,
                message.complexity_level.map(|l| l.as_str()),
            ],
            Self::row_to_message,
        )?;
        tracing::debug!(message_id = saved.id, session_id = %saved.session_id, "message saved");
        Ok(saved)
    }

    /// The `limit` most recent messages of a session, oldest first.
    ///
    /// # Errors
    /// Returns error if database query fails.
    pub fn get_session_messages(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM (
                 SELECT {MESSAGE_COLUMNS} FROM messages
                  WHERE session_id = ?1
                  ORDER BY created_at DESC, id DESC
                  LIMIT ?2
             ) ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![token, limit_param(limit)], Self::row_to_message)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Messages with `from <= created_at < to`, oldest first. Open bounds are unbounded.
    ///
    /// # Errors
    /// Returns error if database query fails.
    pub fn get_messages_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
              WHERE (?1 IS NULL OR created_at >= ?1)
                AND (?2 IS NULL OR created_at < ?2)
              ORDER BY created_at ASC, id ASC
              LIMIT ?3"
        ))?;
        let rows = stmt.query_map(
            params![
                from.as_ref().map(to_sql_timestamp),
                to.as_ref().map(to_sql_timestamp),
                limit_param(limit),
            ],
            Self::row_to_message,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Messages in every session owned by `user_id`, joined through the token.
    ///
    /// # Errors
    /// Returns error if database query fails.
    pub fn count_user_messages(&self, user_id: i64) -> Result<usize, StorageError> {
        let conn = get_conn(&self.pool)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages m
               JOIN chat_sessions s ON s.session_id = m.session_id
              WHERE s.user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count_to_usize(count))
    }

    pub(crate) fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
        let complexity: Option<String> = row.get(5)?;
        Ok(Message {
            id: row.get(0)?,
            session_id: row.get(1)?,
            user_message: row.get(2)?,
            bot_response: row.get(3)?,
            sources: row.get(4)?,
            complexity_level: ComplexityLevel::from_stored_optional(complexity.as_deref()),
            created_at: timestamp_column(row, 6)?,
        })
    }
}
