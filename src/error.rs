//! Error types for store mutations
//!
//! Errors are classified by when they stop a mutation:
//! - Rejected: validation/uniqueness checks that fail before any state change
//! - Protected: the target must always exist (the "default" playlist)
//! - Persistence: the external store failed after an optimistic mutation;
//!   by the time this surfaces the mutation has been rolled back

use thiserror::Error;

/// Failure taxonomy shared by the roster and playlist stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("'{0}' already exists")]
    DuplicateName(String),

    #[error("'{0}' not found")]
    NotFound(String),

    #[error("'{0}' is protected and cannot be deleted")]
    Protected(String),

    #[error("{0}")]
    Validation(String),

    #[error("failed to persist: {0}")]
    Persistence(String),
}

impl StoreError {
    /// True when the operation was refused before touching any state.
    pub fn rejected_before_mutation(&self) -> bool {
        !matches!(self, StoreError::Persistence(_))
    }

    /// True when repeating the same action may succeed.
    pub fn can_retry(&self) -> bool {
        matches!(self, StoreError::Persistence(_))
    }
}

/// Serializable error representation for the UI host.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiError {
    pub message: String,
    pub kind: ErrorKind,
    pub can_retry: bool,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Duplicate,
    NotFound,
    Protected,
    Validation,
    Persistence,
}

impl From<&StoreError> for UiError {
    fn from(err: &StoreError) -> Self {
        let kind = match err {
            StoreError::DuplicateName(_) => ErrorKind::Duplicate,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Protected(_) => ErrorKind::Protected,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::Persistence(_) => ErrorKind::Persistence,
        };

        UiError {
            message: err.to_string(),
            kind,
            can_retry: err.can_retry(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_is_the_only_retryable_error() {
        assert!(StoreError::Persistence("disk full".into()).can_retry());
        assert!(!StoreError::DuplicateName("Anna".into()).can_retry());
        assert!(!StoreError::Protected("default".into()).can_retry());
    }

    #[test]
    fn test_rejected_errors_precede_mutation() {
        assert!(StoreError::Validation("empty name".into()).rejected_before_mutation());
        assert!(!StoreError::Persistence("io".into()).rejected_before_mutation());
    }

    #[test]
    fn test_ui_error_carries_kind() {
        let ui = UiError::from(&StoreError::NotFound("Beto".into()));
        assert!(ui.message.contains("Beto"));
        assert!(!ui.can_retry);
    }
}
