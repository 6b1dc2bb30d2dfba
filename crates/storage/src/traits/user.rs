use async_trait::async_trait;
use botstore_core::{ComplexityLevel, NewUser, ProfileUpdate, User};

use crate::error::StorageError;

/// User registry keyed by the messaging platform's id.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user.
    async fn create_user(&self, user: &NewUser) -> Result<User, StorageError>;

    /// Get user by surrogate id.
    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError>;

    async fn get_user_by_telegram_id(&self, telegram_id: &str)
    -> Result<Option<User>, StorageError>;

    /// Overwrite the profile fields set in `update`; refreshes `updated_at`.
    async fn update_user_profile(
        &self,
        telegram_id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, StorageError>;

    async fn update_user_complexity(
        &self,
        telegram_id: &str,
        level: ComplexityLevel,
    ) -> Result<User, StorageError>;
}
