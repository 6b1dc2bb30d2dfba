use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::ComplexityLevel;

/// Per-user activity counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: i64,
    pub telegram_id: String,
    pub username: Option<String>,
    pub complexity_level: ComplexityLevel,
    pub message_count: usize,
    pub session_count: usize,
    pub created_at: DateTime<Utc>,
}
