use async_trait::async_trait;
use botstore_core::{
    ChatSession, ComplexityLevel, Message, NewChatSession, NewMessage, NewUser, ProfileUpdate, User,
};
use chrono::{DateTime, Utc};

use super::Storage;
use crate::error::StorageError;
use crate::traits::{ChatSessionStore, MessageStore, SchemaStore, UserStore};

#[async_trait]
impl SchemaStore for Storage {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || storage.ensure_schema()).await?
    }
}

#[async_trait]
impl UserStore for Storage {
    async fn create_user(&self, user: &NewUser) -> Result<User, StorageError> {
        let storage = self.clone();
        let user = user.clone();
        tokio::task::spawn_blocking(move || storage.create_user(&user)).await?
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || storage.get_user(id)).await?
    }

    async fn get_user_by_telegram_id(
        &self,
        telegram_id: &str,
    ) -> Result<Option<User>, StorageError> {
        let storage = self.clone();
        let telegram_id = telegram_id.to_owned();
        tokio::task::spawn_blocking(move || storage.get_user_by_telegram_id(&telegram_id)).await?
    }

    async fn update_user_profile(
        &self,
        telegram_id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, StorageError> {
        let storage = self.clone();
        let telegram_id = telegram_id.to_owned();
        let update = update.clone();
        tokio::task::spawn_blocking(move || storage.update_user_profile(&telegram_id, &update))
            .await?
    }

    async fn update_user_complexity(
        &self,
        telegram_id: &str,
        level: ComplexityLevel,
    ) -> Result<User, StorageError> {
        let storage = self.clone();
        let telegram_id = telegram_id.to_owned();
        tokio::task::spawn_blocking(move || storage.update_user_complexity(&telegram_id, level))
            .await?
    }
}

#[async_trait]
impl ChatSessionStore for Storage {
    async fn create_session(&self, session: &NewChatSession) -> Result<ChatSession, StorageError> {
        let storage = self.clone();
        let session = session.clone();
        tokio::task::spawn_blocking(move || storage.create_session(&session)).await?
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<ChatSession>, StorageError> {
        let storage = self.clone();
        let token = token.to_owned();
        tokio::task::spawn_blocking(move || storage.get_session_by_token(&token)).await?
    }

    async fn list_user_sessions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatSession>, StorageError> {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || storage.list_user_sessions(user_id, limit)).await?
    }

    async fn latest_active_session(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Option<ChatSession>, StorageError> {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || storage.latest_active_session(user_id, since)).await?
    }

    async fn set_session_active(
        &self,
        token: &str,
        active: bool,
    ) -> Result<ChatSession, StorageError> {
        let storage = self.clone();
        let token = token.to_owned();
        tokio::task::spawn_blocking(move || storage.set_session_active(&token, active)).await?
    }

    async fn count_user_sessions(&self, user_id: i64) -> Result<usize, StorageError> {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || storage.count_user_sessions(user_id)).await?
    }
}

#[async_trait]
impl MessageStore for Storage {
    async fn save_message(&self, message: &NewMessage) -> Result<Message, StorageError> {
        let storage = self.clone();
        let message = message.clone();
        tokio::task::spawn_blocking(move || storage.save_message(&message)).await?
    }

    async fn get_session_messages(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        let storage = self.clone();
        let token = token.to_owned();
        tokio::task::spawn_blocking(move || storage.get_session_messages(&token, limit)).await?
    }

    async fn get_messages_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || storage.get_messages_between(from, to, limit)).await?
    }

    async fn count_user_messages(&self, user_id: i64) -> Result<usize, StorageError> {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || storage.count_user_messages(user_id)).await?
    }
}
