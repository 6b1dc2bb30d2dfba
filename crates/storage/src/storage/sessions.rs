use botstore_core::{ChatSession, NewChatSession};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, params};

use super::{Storage, count_to_usize, get_conn, limit_param, timestamp_column, to_sql_timestamp};
use crate::error::StorageError;
use crate::schema::SESSION_COLUMNS;

impl Storage {
    /// Insert a new, active session.
    ///
    /// # Errors
    /// Returns [`StorageError::Duplicate`] for a reused token and
    /// [`StorageError::ForeignKey`] if `user_id` names no user.
    pub fn create_session(&self, session: &NewChatSession) -> Result<ChatSession, StorageError> {
        session.validate()?;
        let conn = get_conn(&self.pool)?;
        let created = conn.query_row(
            &format!(
                "INSERT INTO chat_sessions (user_id, session_id) VALUES (?1, ?2)
                 RETURNING {SESSION_COLUMNS}"
            ),
            params![session.user_id, session.session_id],
            Self::row_to_session,
        )?;
        tracing::debug!(
            session_id = %created.session_id,
            user_id = ?created.user_id,
            "chat session created"
        );
        Ok(created)
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_session_by_token(&self, token: &str) -> Result<Option<ChatSession>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let session = conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = ?1"),
                [token],
                Self::row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// Newest first.
    ///
    /// # Errors
    /// Returns error if database query fails.
    pub fn list_user_sessions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatSession>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
              WHERE user_id = ?1
              ORDER BY created_at DESC, id DESC
              LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![user_id, limit_param(limit)], Self::row_to_session)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Most recent active session of `user_id` created at or after `since`.
    ///
    /// # Errors
    /// Returns error if database query fails.
    pub fn latest_active_session(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Option<ChatSession>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let session = conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM chat_sessions
                      WHERE user_id = ?1 AND is_active = 1 AND created_at >= ?2
                      ORDER BY created_at DESC, id DESC
                      LIMIT 1"
                ),
                params![user_id, to_sql_timestamp(&since)],
                Self::row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// # Errors
    /// Returns [`StorageError::NotFound`] if no session has this token.
    pub fn set_session_active(
        &self,
        token: &str,
        active: bool,
    ) -> Result<ChatSession, StorageError> {
        let conn = get_conn(&self.pool)?;
        let session = conn
            .query_row(
                &format!(
                    "UPDATE chat_sessions SET is_active = ?1 WHERE session_id = ?2
                     RETURNING {SESSION_COLUMNS}"
                ),
                params![active, token],
                Self::row_to_session,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("chat_session", token))?;
        tracing::debug!(session_id = %token, active, "chat session state changed");
        Ok(session)
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn count_user_sessions(&self, user_id: i64) -> Result<usize, StorageError> {
        let conn = get_conn(&self.pool)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_sessions WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count_to_usize(count))
    }

    pub(crate) fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatSession> {
        Ok(ChatSession {
            id: row.get(0)?,
            user_id: row.get(1)?,
            session_id: row.get(2)?,
            created_at: timestamp_column(row, 3)?,
            is_active: row.get::<_, Option<bool>>(4)?.unwrap_or(true),
        })
    }
}
