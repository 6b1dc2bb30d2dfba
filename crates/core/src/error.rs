use thiserror::Error;

/// Rejected input, detected before anything reaches the store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} exceeds {max} characters (got {actual})")]
    TooLong { field: &'static str, max: usize, actual: usize },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("unknown complexity level: {0}")]
    UnknownComplexity(String),

    #[error("malformed sources: {0}")]
    MalformedSources(String),
}

/// Check a value against a VARCHAR width, counted in characters.
pub(crate) fn check_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

pub(crate) fn check_optional_len(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    value.map_or(Ok(()), |v| check_len(field, v, max))
}

pub(crate) fn check_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}
