//! Typed error enum for the service layer.

use botstore_core::{AccessDenied, ValidationError};
use botstore_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage operation failed (DB, duplicate, dangling reference, drift).
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// The access policy rejected the call.
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    /// A row the operation needs does not exist.
    #[error("not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller provided invalid input (overlong field, empty token, bad range).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_transient())
    }

    /// Whether this error represents a not-found condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }

    /// Whether this error represents a duplicate/conflict.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_duplicate())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Storage(StorageError::Invalid(_)))
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use botstore_core::{Caller, Operation, Table};

    use super::*;

    #[test]
    fn denied_and_not_found_never_overlap() {
        let denied = ServiceError::from(AccessDenied {
            caller: Caller::Anonymous,
            table: Table::Messages,
            operation: Operation::Select,
        });
        assert!(denied.is_access_denied());
        assert!(!denied.is_not_found());

        let missing = ServiceError::not_found("user", "tg-1");
        assert!(missing.is_not_found());
        assert!(!missing.is_access_denied());
    }

    #[test]
    fn validation_maps_to_invalid_input() {
        let err = ServiceError::from(ValidationError::UnknownComplexity("extreme".to_owned()));
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("extreme"));
    }
}
