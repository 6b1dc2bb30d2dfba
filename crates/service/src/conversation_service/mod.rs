use std::sync::Arc;

use botstore_core::{
    AccessPolicy, Caller, ChatSession, ComplexityLevel, Message, NewChatSession, NewMessage,
    NewUser, Operation, PermissivePolicy, ProfileUpdate, StoreConfig, Table, User, UserStats,
};
use botstore_storage::StorageBackend;
use botstore_storage::traits::{ChatSessionStore, MessageStore, SchemaStore, UserStore};
use chrono::{DateTime, TimeDelta, Utc};

use crate::error::ServiceError;

/// Users, sessions and message history for the bot front end.
#[derive(Debug)]
pub struct ConversationService {
    storage: Arc<StorageBackend>,
    policy: Arc<dyn AccessPolicy>,
    config: StoreConfig,
}

impl ConversationService {
    #[must_use]
    pub fn new(
        storage: Arc<StorageBackend>,
        policy: Arc<dyn AccessPolicy>,
        config: StoreConfig,
    ) -> Self {
        Self { storage, policy, config }
    }

    /// Open the configured store with the permissive policy.
    pub async fn connect(config: StoreConfig) -> Result<Self, ServiceError> {
        let storage = StorageBackend::connect(&config).await?;
        Ok(Self::new(Arc::new(storage), Arc::new(PermissivePolicy), config))
    }

    pub async fn connect_from_env() -> Result<Self, ServiceError> {
        Self::connect(StoreConfig::from_env()).await
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn storage(&self) -> &Arc<StorageBackend> {
        &self.storage
    }

    fn authorize(
        &self,
        caller: Caller,
        table: Table,
        operation: Operation,
        owner: Option<i64>,
    ) -> Result<(), ServiceError> {
        self.policy.authorize(caller, table, operation, owner).map_err(|denied| {
            tracing::warn!(?caller, %table, %operation, ?owner, "access denied");
            ServiceError::from(denied)
        })
    }

    pub async fn ensure_schema(&self) -> Result<(), ServiceError> {
        self.storage.ensure_schema().await?;
        Ok(())
    }

    /// Look up a user by telegram id, creating it on first contact.
    ///
    /// For an existing user, only the profile fields that are provided and
    /// differ from the stored values are written.
    pub async fn get_or_create_user(
        &self,
        caller: Caller,
        telegram_id: &str,
        profile: ProfileUpdate,
    ) -> Result<User, ServiceError> {
        profile.validate()?;
        if let Some(user) = self.storage.get_user_by_telegram_id(telegram_id).await? {
            return self.refresh_profile(caller, user, &profile).await;
        }

        self.authorize(caller, Table::Users, Operation::Insert, None)?;
        let mut new_user = NewUser::new(telegram_id).with_profile(profile.clone());
        if let Some(level) = self.config.new_user_complexity {
            new_user = new_user.with_complexity(level);
        }
        new_user.validate()?;

        match self.storage.create_user(&new_user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, telegram_id, "new user registered");
                Ok(user)
            },
            Err(e) if e.is_duplicate() => {
                tracing::debug!(telegram_id, "user created concurrently, re-reading");
                let user = self
                    .storage
                    .get_user_by_telegram_id(telegram_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("user", telegram_id))?;
                self.refresh_profile(caller, user, &profile).await
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn refresh_profile(
        &self,
        caller: Caller,
        user: User,
        profile: &ProfileUpdate,
    ) -> Result<User, ServiceError> {
        self.authorize(caller, Table::Users, Operation::Select, Some(user.id))?;
        let changes = profile.changes_for(&user);
        if changes.is_empty() {
            return Ok(user);
        }
        self.authorize(caller, Table::Users, Operation::Update, Some(user.id))?;
        let updated = self.storage.update_user_profile(&user.telegram_id, &changes).await?;
        tracing::debug!(user_id = updated.id, "user profile refreshed");
        Ok(updated)
    }

    pub async fn update_user_complexity(
        &self,
        caller: Caller,
        telegram_id: &str,
        level: ComplexityLevel,
    ) -> Result<User, ServiceError> {
        self.require_user(caller, Operation::Update, telegram_id).await?;
        Ok(self.storage.update_user_complexity(telegram_id, level).await?)
    }

    /// Start a new session with a fresh token.
    pub async fn create_chat_session(
        &self,
        caller: Caller,
        user_id: i64,
    ) -> Result<ChatSession, ServiceError> {
        self.authorize(caller, Table::ChatSessions, Operation::Insert, Some(user_id))?;
        let session = self.storage.create_session(&NewChatSession::generate(Some(user_id))).await?;
        tracing::info!(user_id, session_id = %session.session_id, "chat session started");
        Ok(session)
    }

    /// Reuse the newest active session started within the configured window,
    /// or start a new one.
    pub async fn get_or_create_active_session(
        &self,
        caller: Caller,
        user_id: i64,
    ) -> Result<ChatSession, ServiceError> {
        self.authorize(caller, Table::ChatSessions, Operation::Select, Some(user_id))?;
        if let Some(session) =
            self.storage.latest_active_session(user_id, self.active_since()).await?
        {
            tracing::debug!(user_id, session_id = %session.session_id, "reusing active session");
            return Ok(session);
        }
        self.create_chat_session(caller, user_id).await
    }

    pub async fn close_session(
        &self,
        caller: Caller,
        token: &str,
    ) -> Result<ChatSession, ServiceError> {
        let session = self.storage.get_session_by_token(token).await?;
        self.authorize(
            caller,
            Table::ChatSessions,
            Operation::Update,
            session.as_ref().and_then(|s| s.user_id),
        )?;
        if session.is_none() {
            return Err(ServiceError::not_found("chat_session", token));
        }
        Ok(self.storage.set_session_active(token, false).await?)
    }

    /// Store one question/answer exchange under its session token.
    pub async fn record_exchange(
        &self,
        caller: Caller,
        message: NewMessage,
    ) -> Result<Message, ServiceError> {
        message.validate()?;
        let owner = self.session_owner(&message.session_id).await?;
        self.authorize(caller, Table::Messages, Operation::Insert, owner)?;
        Ok(self.storage.save_message(&message).await?)
    }

    /// The `limit` most recent messages of a session, oldest first.
    pub async fn conversation_history(
        &self,
        caller: Caller,
        token: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ServiceError> {
        let owner = self.session_owner(token).await?;
        self.authorize(caller, Table::Messages, Operation::Select, owner)?;
        Ok(self.storage.get_session_messages(token, limit).await?)
    }

    /// Messages across all sessions with `from <= created_at < to`.
    pub async fn messages_between(
        &self,
        caller: Caller,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, ServiceError> {
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(ServiceError::InvalidInput(format!(
                "range start {from} is after end {to}"
            )));
        }
        self.authorize(caller, Table::Messages, Operation::Select, None)?;
        Ok(self.storage.get_messages_between(from, to, limit).await?)
    }

    /// Activity counters for a user; `None` if the telegram id is unknown.
    pub async fn user_stats(
        &self,
        caller: Caller,
        telegram_id: &str,
    ) -> Result<Option<UserStats>, ServiceError> {
        let user = match self.require_user(caller, Operation::Select, telegram_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        for table in [Table::ChatSessions, Table::Messages] {
            self.authorize(caller, table, Operation::Select, Some(user.id))?;
        }

        let message_count = self.storage.count_user_messages(user.id).await?;
        let session_count = self.storage.count_user_sessions(user.id).await?;
        Ok(Some(UserStats {
            user_id: user.id,
            telegram_id: user.telegram_id,
            username: user.username,
            complexity_level: user.complexity_level,
            message_count,
            session_count,
            created_at: user.created_at,
        }))
    }

    /// Look up a user and authorize `operation` on it. An unknown id is
    /// checked as an unowned row first, so callers the policy would deny get
    /// `AccessDenied` whether or not the id exists.
    async fn require_user(
        &self,
        caller: Caller,
        operation: Operation,
        telegram_id: &str,
    ) -> Result<User, ServiceError> {
        let user = self.storage.get_user_by_telegram_id(telegram_id).await?;
        self.authorize(caller, Table::Users, operation, user.as_ref().map(|u| u.id))?;
        user.ok_or_else(|| ServiceError::not_found("user", telegram_id))
    }

    /// Owner of the session a token names; `None` for tokens with no session.
    async fn session_owner(&self, token: &str) -> Result<Option<i64>, ServiceError> {
        Ok(self.storage.get_session_by_token(token).await?.and_then(|s| s.user_id))
    }

    fn active_since(&self) -> DateTime<Utc> {
        TimeDelta::try_hours(self.config.active_session_hours.max(0))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
