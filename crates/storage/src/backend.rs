//! Unified storage backend with enum dispatch.

use async_trait::async_trait;
use botstore_core::{
    ChatSession, ComplexityLevel, DatabaseTarget, Message, NewChatSession, NewMessage, NewUser,
    ProfileUpdate, StoreConfig, User,
};
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::traits::{ChatSessionStore, MessageStore, SchemaStore, UserStore};

macro_rules! dispatch {
    ($self:expr, $trait:path, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            #[cfg(feature = "sqlite")]
            StorageBackend::Sqlite(s) => <crate::Storage as $trait>::$method(s, $($arg),*).await,
            #[cfg(feature = "postgres")]
            StorageBackend::Postgres(s) => {
                <crate::pg_storage::PgStorage as $trait>::$method(s, $($arg),*).await
            },
        }
    };
}

#[derive(Clone, Debug)]
pub enum StorageBackend {
    #[cfg(feature = "sqlite")]
    Sqlite(crate::Storage),
    #[cfg(feature = "postgres")]
    Postgres(crate::pg_storage::PgStorage),
}

impl StorageBackend {
    /// Open the store named by `config.database_url`, ensuring the schema.
    ///
    /// # Errors
    /// Returns [`StorageError::Unsupported`] when the URL names a backend this
    /// build was compiled without, or the backend's open error.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StorageError> {
        match config.target() {
            #[cfg(feature = "sqlite")]
            DatabaseTarget::SqliteFile(path) => {
                let pool_size = config.pool_size;
                let storage = tokio::task::spawn_blocking(move || {
                    crate::Storage::with_pool_size(&path, pool_size)
                })
                .await??;
                Ok(Self::Sqlite(storage))
            },
            #[cfg(feature = "sqlite")]
            DatabaseTarget::SqliteMemory => Ok(Self::Sqlite(crate::Storage::open_in_memory()?)),
            #[cfg(feature = "postgres")]
            DatabaseTarget::Postgres(url) => Ok(Self::Postgres(
                crate::pg_storage::PgStorage::with_max_connections(&url, config.pool_size).await?,
            )),
            #[allow(unreachable_patterns, reason = "reachable when a backend feature is off")]
            other => Err(StorageError::Unsupported(format!(
                "backend for {other:?} not compiled in"
            ))),
        }
    }
}

#[async_trait]
impl SchemaStore for StorageBackend {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        dispatch!(self, SchemaStore, ensure_schema())
    }
}

// ── UserStore ────────────────────────────────────────────────────

#[async_trait]
impl UserStore for StorageBackend {
    async fn create_user(&self, user: &NewUser) -> Result<User, StorageError> {
        dispatch!(self, UserStore, create_user(user))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        dispatch!(self, UserStore, get_user(id))
    }

    async fn get_user_by_telegram_id(
        &self,
        telegram_id: &str,
    ) -> Result<Option<User>, StorageError> {
        dispatch!(self, UserStore, get_user_by_telegram_id(telegram_id))
    }

    async fn update_user_profile(
        &self,
        telegram_id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, StorageError> {
        dispatch!(self, UserStore, update_user_profile(telegram_id, update))
    }

    async fn update_user_complexity(
        &self,
        telegram_id: &str,
        level: ComplexityLevel,
    ) -> Result<User, StorageError> {
        dispatch!(self, UserStore, update_user_complexity(telegram_id, level))
    }
}

// ── ChatSessionStore ─────────────────────────────────────────────

#[async_trait]
impl ChatSessionStore for StorageBackend {
    async fn create_session(&self, session: &NewChatSession) -> Result<ChatSession, StorageError> {
        dispatch!(self, ChatSessionStore, create_session(session))
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<ChatSession>, StorageError> {
        dispatch!(self, ChatSessionStore, get_session_by_token(token))
    }

    async fn list_user_sessions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatSession>, StorageError> {
        dispatch!(self, ChatSessionStore, list_user_sessions(user_id, limit))
    }

    async fn latest_active_session(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Option<ChatSession>, StorageError> {
        dispatch!(self, ChatSessionStore, latest_active_session(user_id, since))
    }

    async fn set_session_active(
        &self,
        token: &str,
        active: bool,
    ) -> Result<ChatSession, StorageError> {
        dispatch!(self, ChatSessionStore, set_session_active(token, active))
    }

    async fn count_user_sessions(&self, user_id: i64) -> Result<usize, StorageError> {
        dispatch!(self, ChatSessionStore, count_user_sessions(user_id))
    }
}

// ── MessageStore ─────────────────────────────────────────────────

#[async_trait]
impl MessageStore for StorageBackend {
    async fn save_message(&self, message: &NewMessage) -> Result<Message, StorageError> {
        dispatch!(self, MessageStore, save_message(message))
    }

    async fn get_session_messages(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        dispatch!(self, MessageStore, get_session_messages(token, limit))
    }

    async fn get_messages_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, StorageError> {
        dispatch!(self, MessageStore, get_messages_between(from, to, limit))
    }

    async fn count_user_messages(&self, user_id: i64) -> Result<usize, StorageError> {
        dispatch!(self, MessageStore, count_user_messages(user_id))
    }
}
