//! Row-level access model.
//!
//! The persisted schema grants everyone read on all three tables, insert on all
//! three, and update on `users` and `chat_sessions`; nothing may be deleted and
//! messages are never updated. [`PERMISSIVE_GRANTS`] is that grant table. The
//! PostgreSQL migration installs one always-true policy per grant, and the
//! service layer calls an [`AccessPolicy`] before every read or write.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    ChatSessions,
    Messages,
}

impl Table {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Users => "users",
            Self::ChatSessions => "chat_sessions",
            Self::Messages => "messages",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// SQL command keyword, as used in `CREATE POLICY ... FOR <cmd>`.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match *self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

pub const PERMISSIVE_GRANTS: &[(Table, Operation)] = &[
    (Table::Users, Operation::Select),
    (Table::Users, Operation::Insert),
    (Table::Users, Operation::Update),
    (Table::ChatSessions, Operation::Select),
    (Table::ChatSessions, Operation::Insert),
    (Table::ChatSessions, Operation::Update),
    (Table::Messages, Operation::Select),
    (Table::Messages, Operation::Insert),
];

#[must_use]
pub fn is_granted(table: Table, operation: Operation) -> bool {
    PERMISSIVE_GRANTS.contains(&(table, operation))
}

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// The bot backend itself.
    System,
    /// An end user, by surrogate `users.id`.
    User(i64),
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("access denied: {operation} on {table} for {caller:?}")]
pub struct AccessDenied {
    pub caller: Caller,
    pub table: Table,
    pub operation: Operation,
}

/// Authorization check run before every store call.
///
/// `owner` is the `users.id` owning the row (the user itself for `users`, the
/// session owner for sessions and their messages); `None` when the row is
/// unowned or does not exist yet.
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    /// # Errors
    /// Returns [`AccessDenied`] when the caller may not perform the operation.
    fn authorize(
        &self,
        caller: Caller,
        table: Table,
        operation: Operation,
        owner: Option<i64>,
    ) -> Result<(), AccessDenied>;
}

fn deny(caller: Caller, table: Table, operation: Operation) -> Result<(), AccessDenied> {
    Err(AccessDenied { caller, table, operation })
}

/// Every granted operation passes for every caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissivePolicy;

impl AccessPolicy for PermissivePolicy {
    fn authorize(
        &self,
        caller: Caller,
        table: Table,
        operation: Operation,
        _owner: Option<i64>,
    ) -> Result<(), AccessDenied> {
        if is_granted(table, operation) { Ok(()) } else { deny(caller, table, operation) }
    }
}

/// Granted operations pass for `System`, and for a `User` only on rows it owns.
///
/// A user may create its own sessions and messages but never a `users` row.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerScopedPolicy;

impl AccessPolicy for OwnerScopedPolicy {
    fn authorize(
        &self,
        caller: Caller,
        table: Table,
        operation: Operation,
        owner: Option<i64>,
    ) -> Result<(), AccessDenied> {
        if !is_granted(table, operation) {
            return deny(caller, table, operation);
        }
        match caller {
            Caller::System => Ok(()),
            Caller::User(id) if owner == Some(id) => Ok(()),
            Caller::User(_) | Caller::Anonymous => deny(caller, table, operation),
        }
    }
}
