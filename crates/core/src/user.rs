use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{NAME_MAX_LEN, TELEGRAM_ID_MAX_LEN};
use crate::error::{ValidationError, check_len, check_non_empty, check_optional_len};

/// Answer complexity a user asked the bot for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Simple,
    #[default]
    Medium,
    Hard,
}

impl ComplexityLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Parse a stored label, falling back to the column default on garbage.
    #[must_use]
    pub fn from_stored(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!(invalid_level = %raw, "corrupt complexity_level in DB, defaulting");
            Self::default()
        })
    }

    /// Parse an optional stored label; garbage becomes `None`.
    #[must_use]
    pub fn from_stored_optional(raw: Option<&str>) -> Option<Self> {
        let raw = raw?;
        match raw.parse() {
            Ok(level) => Some(level),
            Err(_) => {
                tracing::warn!(
                    invalid_level = %raw,
                    "corrupt message complexity_level in DB, ignoring"
                );
                None
            },
        }
    }
}

impl FromStr for ComplexityLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(ValidationError::UnknownComplexity(s.to_owned())),
        }
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat participant, keyed externally by the messaging platform's user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub complexity_level: ComplexityLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for [`User`].
///
/// `complexity_level: None` leaves the column default (`medium`) in effect.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub complexity_level: Option<ComplexityLevel>,
}

impl NewUser {
    #[must_use]
    pub fn new(telegram_id: impl Into<String>) -> Self {
        Self { telegram_id: telegram_id.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: ProfileUpdate) -> Self {
        self.username = profile.username;
        self.first_name = profile.first_name;
        self.last_name = profile.last_name;
        self
    }

    #[must_use]
    pub const fn with_complexity(mut self, level: ComplexityLevel) -> Self {
        self.complexity_level = Some(level);
        self
    }

    /// # Errors
    /// Returns the first field that violates the `users` column limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_non_empty("telegram_id", &self.telegram_id)?;
        check_len("telegram_id", &self.telegram_id, TELEGRAM_ID_MAX_LEN)?;
        check_optional_len("username", self.username.as_deref(), NAME_MAX_LEN)?;
        check_optional_len("first_name", self.first_name.as_deref(), NAME_MAX_LEN)?;
        check_optional_len("last_name", self.last_name.as_deref(), NAME_MAX_LEN)?;
        Ok(())
    }
}

/// Profile fields to overwrite; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }

    /// Keep only the fields that would change `user`.
    #[must_use]
    pub fn changes_for(&self, user: &User) -> Self {
        fn changed(new: Option<&String>, old: Option<&String>) -> Option<String> {
            new.filter(|n| Some(*n) != old).cloned()
        }
        Self {
            username: changed(self.username.as_ref(), user.username.as_ref()),
            first_name: changed(self.first_name.as_ref(), user.first_name.as_ref()),
            last_name: changed(self.last_name.as_ref(), user.last_name.as_ref()),
        }
    }

    /// # Errors
    /// Returns the first field that exceeds its column width.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_optional_len("username", self.username.as_deref(), NAME_MAX_LEN)?;
        check_optional_len("first_name", self.first_name.as_deref(), NAME_MAX_LEN)?;
        check_optional_len("last_name", self.last_name.as_deref(), NAME_MAX_LEN)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            telegram_id: "tg1".to_owned(),
            username: Some("alice".to_owned()),
            first_name: None,
            last_name: Some("Smith".to_owned()),
            complexity_level: ComplexityLevel::Medium,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn complexity_parses_case_insensitively() {
        assert_eq!("HARD".parse::<ComplexityLevel>(), Ok(ComplexityLevel::Hard));
        assert_eq!(" simple ".parse::<ComplexityLevel>(), Ok(ComplexityLevel::Simple));
        assert!("expert".parse::<ComplexityLevel>().is_err());
    }

    #[test]
    fn complexity_from_stored_defaults_on_garbage() {
        assert_eq!(ComplexityLevel::from_stored("expert"), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_stored_optional(Some("expert")), None);
        assert_eq!(ComplexityLevel::from_stored_optional(None), None);
        assert_eq!(
            ComplexityLevel::from_stored_optional(Some("hard")),
            Some(ComplexityLevel::Hard)
        );
    }

    #[test]
    fn new_user_rejects_overlong_telegram_id() {
        let user = NewUser::new("x".repeat(51));
        assert_eq!(
            user.validate(),
            Err(ValidationError::TooLong { field: "telegram_id", max: 50, actual: 51 })
        );
        assert!(NewUser::new("x".repeat(50)).validate().is_ok());
    }

    #[test]
    fn new_user_rejects_blank_telegram_id() {
        assert_eq!(
            NewUser::new("  ").validate(),
            Err(ValidationError::Empty { field: "telegram_id" })
        );
    }

    #[test]
    fn name_limit_counts_characters_not_bytes() {
        let profile = ProfileUpdate { username: Some("ж".repeat(100)), ..ProfileUpdate::default() };
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn changes_for_drops_unchanged_and_missing_fields() {
        let user = sample_user();
        let update = ProfileUpdate {
            username: Some("alice".to_owned()),
            first_name: Some("Alice".to_owned()),
            last_name: None,
        };
        let changes = update.changes_for(&user);
        assert_eq!(changes.username, None);
        assert_eq!(changes.first_name.as_deref(), Some("Alice"));
        assert_eq!(changes.last_name, None);
        assert!(!changes.is_empty());
        assert!(ProfileUpdate::default().changes_for(&user).is_empty());
    }
}
