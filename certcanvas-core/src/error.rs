//! Error types for certcanvas operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for certcanvas core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The export precondition that blocked an export attempt.
///
/// Surfaced to callers so the UI can instruct the correct remediation:
/// re-save for [`ExportGate::NotSaved`], verify for [`ExportGate::NotVerified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportGate {
    /// No save covers the current design content: either the design was never
    /// saved, or it was mutated after the last save.
    NotSaved,
    /// The current save exists but has no verification record bound to it.
    NotVerified,
}

impl std::fmt::Display for ExportGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSaved => write!(f, "not saved"),
            Self::NotVerified => write!(f, "not verified"),
        }
    }
}

/// Errors that can occur in certcanvas core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed shape or length validation. Recoverable: the caller
    /// corrects the input and retries.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The design was mutated after the referenced save was produced, or a
    /// newer save supersedes it. Recoverable: save again, then verify.
    #[error("design changed since the referenced save; save again before verifying")]
    StaleSave,

    /// Export was attempted while a precondition gate is unmet.
    #[error("export not allowed: {0}")]
    ExportNotAllowed(ExportGate),

    /// No session exists under the given identifier.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A session already exists under the given identifier.
    #[error("session already exists: {0}")]
    SessionExists(String),

    /// No element exists under the given identifier.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// No verification record exists for the given token.
    #[error("verification not found: {0}")]
    VerificationNotFound(String),

    /// The caller identity does not own the session it tried to operate on.
    #[error("actor {actor:?} does not own session {session:?}")]
    Forbidden {
        /// The caller identity attached to the request.
        actor: String,
        /// The session the caller tried to operate on.
        session: String,
    },

    /// Durable storage was unavailable or the write failed. Retryable; the
    /// in-memory store is left in its prior consistent state.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Stable machine-readable kind for wire error bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::StaleSave => "stale_save",
            Self::ExportNotAllowed(_) => "export_not_allowed",
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionExists(_) => "session_exists",
            Self::ElementNotFound(_) => "element_not_found",
            Self::VerificationNotFound(_) => "verification_not_found",
            Self::Forbidden { .. } => "forbidden",
            Self::Persistence(_) => "persistence",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Whether retrying the same call without changes can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_gate_messages_name_the_unmet_gate() {
        let err = CoreError::ExportNotAllowed(ExportGate::NotSaved);
        assert!(err.to_string().contains("not saved"));

        let err = CoreError::ExportNotAllowed(ExportGate::NotVerified);
        assert!(err.to_string().contains("not verified"));
    }

    #[test]
    fn only_persistence_is_retryable() {
        assert!(CoreError::Persistence("disk full".into()).is_retryable());
        assert!(!CoreError::StaleSave.is_retryable());
        assert!(!CoreError::Validation("empty title".into()).is_retryable());
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(CoreError::StaleSave.kind(), "stale_save");
        assert_eq!(
            CoreError::ExportNotAllowed(ExportGate::NotVerified).kind(),
            "export_not_allowed"
        );
    }
}
