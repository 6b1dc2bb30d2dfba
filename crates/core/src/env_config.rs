//! Environment configuration with warn-level logging for invalid values.

use std::path::PathBuf;

use crate::constants::{DEFAULT_ACTIVE_SESSION_HOURS, DEFAULT_DATABASE_URL, DEFAULT_DB_POOL_SIZE};
use crate::user::ComplexityLevel;

/// Parse a raw variable value with a default fallback.
///
/// - If the variable is not set: returns `default` silently (expected case).
/// - If the variable is set but cannot be parsed: logs a warning and returns `default`.
fn parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    raw: Option<String>,
    default: T,
) -> T {
    match raw {
        Some(v) => match v.parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        None => default,
    }
}

/// Where the store lives, decoded from `DATABASE_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    SqliteFile(PathBuf),
    SqliteMemory,
    Postgres(String),
}

impl DatabaseTarget {
    /// `postgres://` and `postgresql://` select PostgreSQL; `sqlite::memory:`
    /// an in-memory database; `sqlite://<path>`, `sqlite:<path>` or a bare
    /// path a SQLite file.
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Self::Postgres(url.to_owned());
        }
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        if path == ":memory:" || path.is_empty() {
            Self::SqliteMemory
        } else {
            Self::SqliteFile(PathBuf::from(path))
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    /// SQLite connection pool size.
    pub pool_size: u32,
    /// A session created within this many hours is reused as the active one.
    pub active_session_hours: i64,
    /// Complexity assigned to newly created users; `None` keeps the column default.
    pub new_user_complexity: Option<ComplexityLevel>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            pool_size: DEFAULT_DB_POOL_SIZE,
            active_session_hours: DEFAULT_ACTIVE_SESSION_HOURS,
            new_user_complexity: None,
        }
    }
}

impl StoreConfig {
    /// Read `DATABASE_URL`, `BOTSTORE_DB_POOL_SIZE`, `BOTSTORE_ACTIVE_SESSION_HOURS`
    /// and `BOTSTORE_NEW_USER_COMPLEXITY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let new_user_complexity = lookup("BOTSTORE_NEW_USER_COMPLEXITY").and_then(|raw| {
            raw.parse()
                .map_err(|_| {
                    tracing::warn!(value = %raw, "invalid BOTSTORE_NEW_USER_COMPLEXITY, ignoring");
                })
                .ok()
        });
        Self {
            database_url: lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.database_url),
            pool_size: parse_with_default(
                "BOTSTORE_DB_POOL_SIZE",
                lookup("BOTSTORE_DB_POOL_SIZE"),
                defaults.pool_size,
            )
            .max(1),
            active_session_hours: parse_with_default(
                "BOTSTORE_ACTIVE_SESSION_HOURS",
                lookup("BOTSTORE_ACTIVE_SESSION_HOURS"),
                defaults.active_session_hours,
            ),
            new_user_complexity,
        }
    }

    #[must_use]
    pub fn target(&self) -> DatabaseTarget {
        DatabaseTarget::parse(&self.database_url)
    }
}
