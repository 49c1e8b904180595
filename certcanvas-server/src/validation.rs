//! Input validation for untrusted transport-level data.
//!
//! Identifiers arriving over HTTP are validated before they reach the store.
//! Title, author, and date validation live in `certcanvas-core` next to the
//! operations that own those rules.

use thiserror::Error;

/// Maximum length for session IDs.
pub const MAX_SESSION_ID_LEN: usize = 64;
/// Maximum length for actor identities.
pub const MAX_ACTOR_LEN: usize = 64;

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Session ID exceeds maximum length.
    #[error("session_id too long (max {MAX_SESSION_ID_LEN} chars)")]
    SessionIdTooLong,
    /// Session ID contains invalid characters.
    #[error("session_id contains invalid characters")]
    SessionIdInvalidChars,
    /// Actor identity exceeds maximum length.
    #[error("actor too long (max {MAX_ACTOR_LEN} chars)")]
    ActorTooLong,
    /// Actor identity contains invalid characters.
    #[error("actor contains invalid characters")]
    ActorInvalidChars,
}

impl ValidationError {
    /// Which validation failed, for metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionIdTooLong | Self::SessionIdInvalidChars => "session_id",
            Self::ActorTooLong | Self::ActorInvalidChars => "actor",
        }
    }
}

/// Check if a character is valid for IDs (alphanumeric, hyphen, or underscore).
fn is_valid_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Validate a session ID.
///
/// Valid session IDs:
/// - 1-64 characters
/// - Alphanumeric, hyphen, underscore only
///
/// # Errors
///
/// Returns [`ValidationError::SessionIdTooLong`] if the ID exceeds 64 characters.
/// Returns [`ValidationError::SessionIdInvalidChars`] if the ID is empty or contains invalid characters.
pub fn validate_session_id(id: &str) -> Result<(), ValidationError> {
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(ValidationError::SessionIdTooLong);
    }
    if id.is_empty() || !id.chars().all(is_valid_id_char) {
        return Err(ValidationError::SessionIdInvalidChars);
    }
    Ok(())
}

/// Validate a caller identity.
///
/// Same shape as session IDs: 1-64 chars, alphanumeric/hyphen/underscore.
///
/// # Errors
///
/// Returns [`ValidationError::ActorTooLong`] if the identity exceeds 64 characters.
/// Returns [`ValidationError::ActorInvalidChars`] if the identity is empty or contains invalid characters.
pub fn validate_actor(actor: &str) -> Result<(), ValidationError> {
    if actor.len() > MAX_ACTOR_LEN {
        return Err(ValidationError::ActorTooLong);
    }
    if actor.is_empty() || !actor.chars().all(is_valid_id_char) {
        return Err(ValidationError::ActorInvalidChars);
    }
    Ok(())
}
