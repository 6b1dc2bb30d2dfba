use async_trait::async_trait;
use botstore_core::{ChatSession, NewChatSession};
use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// Chat session lifecycle operations.
#[async_trait]
pub trait ChatSessionStore: Send + Sync {
    /// Insert a new active session.
    async fn create_session(&self, session: &NewChatSession) -> Result<ChatSession, StorageError>;

    /// Get session by its external token.
    async fn get_session_by_token(&self, token: &str) -> Result<Option<ChatSession>, StorageError>;

    /// Sessions of a user, newest first.
    async fn list_user_sessions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatSession>, StorageError>;

    /// Newest active session of a user created at or after `since`.
    async fn latest_active_session(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Option<ChatSession>, StorageError>;

    /// Flip `is_active`. Fails with `NotFound` for an unknown token.
    async fn set_session_active(&self, token: &str, active: bool)
    -> Result<ChatSession, StorageError>;

    async fn count_user_sessions(&self, user_id: i64) -> Result<usize, StorageError>;
}
