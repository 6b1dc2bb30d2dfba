use async_trait::async_trait;
use botstore_core::{Message, NewMessage};
use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// Append-only message history.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(&self, message: &NewMessage) -> Result<Message, StorageError>;

    /// Most recent `limit` messages of a session, returned oldest first.
    async fn get_session_messages(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError>;

    /// Messages in the half-open window `[from, to)`; `None` leaves a side open.
    async fn get_messages_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError>;

    /// Messages across all sessions owned by a user.
    async fn count_user_messages(&self, user_id: i64) -> Result<usize, StorageError>;
}
