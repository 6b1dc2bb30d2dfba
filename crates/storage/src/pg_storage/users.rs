//! UserStore implementation for PgStorage.

use async_trait::async_trait;
use botstore_core::{ComplexityLevel, NewUser, ProfileUpdate, User};

use super::{PgStorage, row_to_user};
use crate::error::StorageError;
use crate::schema::USER_COLUMNS;
use crate::traits::UserStore;

#[async_trait]
impl UserStore for PgStorage {
    async fn create_user(&self, user: &NewUser) -> Result<User, StorageError> {
        user.validate()?;
        let row = if let Some(level) = user.complexity_level {
            sqlx::query(&format!(
                "INSERT INTO users (telegram_id, username, first_name, last_name, complexity_level)
                 VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
            ))
            .bind(&user.telegram_id)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(level.as_str())
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "INSERT INTO users (telegram_id, username, first_name, last_name)
                 VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
            ))
            .bind(&user.telegram_id)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .fetch_one(&self.pool)
            .await?
        };
        let created = row_to_user(&row)?;
        tracing::debug!(user_id = created.id, telegram_id = %created.telegram_id, "user created");
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn get_user_by_telegram_id(
        &self,
        telegram_id: &str,
    ) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1"))
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn update_user_profile(
        &self,
        telegram_id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, StorageError> {
        update.validate()?;
        let row = sqlx::query(&format!(
            "UPDATE users
                SET username = COALESCE($1, username),
                    first_name = COALESCE($2, first_name),
                    last_name = COALESCE($3, last_name),
                    updated_at = GREATEST(NOW(), updated_at)
              WHERE telegram_id = $4
              RETURNING {USER_COLUMNS}"
        ))
        .bind(&update.username)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("user", telegram_id))?;
        row_to_user(&row)
    }

    async fn update_user_complexity(
        &self,
        telegram_id: &str,
        level: ComplexityLevel,
    ) -> Result<User, StorageError> {
        let row = sqlx::query(&format!(
            "UPDATE users
                SET complexity_level = $1,
                    updated_at = GREATEST(NOW(), updated_at)
              WHERE telegram_id = $2
              RETURNING {USER_COLUMNS}"
        ))
        .bind(level.as_str())
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::not_found("user", telegram_id))?;
        row_to_user(&row)
    }
}
