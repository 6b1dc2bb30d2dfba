use botstore_core::{ComplexityLevel, NewUser, ProfileUpdate, User};
use rusqlite::{OptionalExtension as _, Params, ToSql, params};

use super::{Storage, get_conn, timestamp_column};
use crate::error::StorageError;
use crate::schema::USER_COLUMNS;

impl Storage {
    /// Insert a user. A `None` complexity leaves the column default in place.
    ///
    /// # Errors
    /// Returns [`StorageError::Duplicate`] if the telegram id is already registered.
    pub fn create_user(&self, user: &NewUser) -> Result<User, StorageError> {
        user.validate()?;
        let conn = get_conn(&self.pool)?;

        let level = user.complexity_level.map(|l| l.as_str());
        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(5);
        values.push(&user.telegram_id);
        values.push(&user.username);
        values.push(&user.first_name);
        values.push(&user.last_name);
        let sql = if level.is_some() {
            values.push(&level);
            format!(
                "INSERT INTO users (telegram_id, username, first_name, last_name, complexity_level)
                 VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {USER_COLUMNS}"
            )
        } else {
            format!(
                "INSERT INTO users (telegram_id, username, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4) RETURNING {USER_COLUMNS}"
            )
        };

        let created = conn.query_row(&sql, values.as_slice(), Self::row_to_user)?;
        tracing::debug!(user_id = created.id, telegram_id = %created.telegram_id, "user created");
        Ok(created)
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_user_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1"),
                [telegram_id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Overwrite the profile fields that are `Some` in `update`.
    ///
    /// # Errors
    /// Returns [`StorageError::NotFound`] if no user has this telegram id.
    pub fn update_user_profile(
        &self,
        telegram_id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, StorageError> {
        update.validate()?;
        self.update_user_returning(
            "UPDATE users
                SET username = COALESCE(?1, username),
                    first_name = COALESCE(?2, first_name),
                    last_name = COALESCE(?3, last_name),
                    updated_at = MAX(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), updated_at)
              WHERE telegram_id = ?4",
            params![update.username, update.first_name, update.last_name, telegram_id],
            telegram_id,
        )
    }

    /// # Errors
    /// Returns [`StorageError::NotFound`] if no user has this telegram id.
    pub fn update_user_complexity(
        &self,
        telegram_id: &str,
        level: ComplexityLevel,
    ) -> Result<User, StorageError> {
        self.update_user_returning(
            "UPDATE users
                SET complexity_level = ?1,
                    updated_at = MAX(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), updated_at)
              WHERE telegram_id = ?2",
            params![level.as_str(), telegram_id],
            telegram_id,
        )
    }

    /// `RETURNING` reports the row before `AFTER UPDATE` triggers run, so the
    /// row is re-read inside the same transaction.
    fn update_user_returning<P: Params>(
        &self,
        sql: &str,
        params: P,
        telegram_id: &str,
    ) -> Result<User, StorageError> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction()?;
        if tx.execute(sql, params)? == 0 {
            return Err(StorageError::not_found("user", telegram_id));
        }
        let user = tx.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1"),
            [telegram_id],
            Self::row_to_user,
        )?;
        tx.commit()?;
        tracing::debug!(user_id = user.id, "user updated");
        Ok(user)
    }

    pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        let complexity: Option<String> = row.get(5)?;
        Ok(User {
            id: row.get(0)?,
            telegram_id: row.get(1)?,
            username: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            complexity_level: complexity
                .as_deref()
                .map(ComplexityLevel::from_stored)
                .unwrap_or_default(),
            created_at: timestamp_column(row, 6)?,
            updated_at: timestamp_column(row, 7)?,
        })
    }
}
