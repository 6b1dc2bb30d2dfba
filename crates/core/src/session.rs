use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SESSION_TOKEN_MAX_LEN;
use crate::error::{ValidationError, check_len, check_non_empty};

/// One continuous conversation context.
///
/// `session_id` is the external token; messages refer to a session by this
/// token rather than by the surrogate `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatSession {
    pub id: i64,
    pub user_id: Option<i64>,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Insert payload for [`ChatSession`]. New sessions always start active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewChatSession {
    pub user_id: Option<i64>,
    pub session_id: String,
}

impl NewChatSession {
    #[must_use]
    pub fn new(session_id: impl Into<String>, user_id: Option<i64>) -> Self {
        Self { user_id, session_id: session_id.into() }
    }

    /// Session with a freshly generated UUID v4 token.
    #[must_use]
    pub fn generate(user_id: Option<i64>) -> Self {
        Self::new(new_session_token(), user_id)
    }

    /// # Errors
    /// Returns an error if the token is blank or wider than the column.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_session_token(&self.session_id)
    }
}

#[must_use]
pub fn new_session_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn validate_session_token(token: &str) -> Result<(), ValidationError> {
    check_non_empty("session_id", token)?;
    check_len("session_id", token, SESSION_TOKEN_MAX_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_valid() {
        let a = NewChatSession::generate(Some(1));
        let b = NewChatSession::generate(Some(1));
        assert_ne!(a.session_id, b.session_id);
        assert!(a.validate().is_ok());
        assert_eq!(a.session_id.len(), 36);
    }

    #[test]
    fn overlong_token_is_rejected() {
        let session = NewChatSession::new("s".repeat(101), None);
        assert!(matches!(
            session.validate(),
            Err(ValidationError::TooLong { field: "session_id", max: 100, actual: 101 })
        ));
    }
}
