//! Immutable save and verification records.
//!
//! A [`SaveRecord`] is an append-only snapshot of a design; a
//! [`VerificationRecord`] binds one save to a public token and an authorship
//! claim. Neither is mutated after creation: a later save appends a new
//! record, and a later edit invalidates export until the design is saved and
//! verified again.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::schema::DesignDocument;

/// Unique identifier for a save record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveId(Uuid);

impl SaveId {
    /// Create a new unique save ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a save ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the string is not a valid UUID.
    pub fn parse(s: &str) -> CoreResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::Validation(format!("invalid save id {s:?}: {e}")))
    }
}

impl Default for SaveId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SaveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque public verification token.
///
/// Generated from a v4 UUID (OS randomness via `getrandom`), rendered without
/// hyphens. Tokens are exposed in public URLs, so they must be unguessable;
/// they are never derived from a counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationToken(String);

impl VerificationToken {
    /// Generate a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VerificationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable persisted snapshot of a design at save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecord {
    /// Save identifier.
    pub id: SaveId,
    /// Owning session.
    pub session_id: String,
    /// User-supplied title.
    pub title: String,
    /// Full design snapshot taken at save time.
    pub document: DesignDocument,
    /// Design revision the snapshot covers.
    pub revision: u64,
    /// SHA-256 content digest of the snapshot.
    pub digest: String,
    /// Save timestamp.
    pub created_at: DateTime<Utc>,
}

/// An immutable binding of one save to a public verification token and an
/// authorship claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Public token, exposed in the verification URL.
    pub token: VerificationToken,
    /// The save this record is bound to.
    pub save_id: SaveId,
    /// Owning session.
    pub session_id: String,
    /// Author name of the authorization claim.
    pub author: String,
    /// Date the certificate was authorized.
    pub authorized_on: NaiveDate,
    /// Content digest of the bound save, for artifact binding.
    pub digest: String,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Opaque URL path resolving this record, relative to the service's
    /// public base URL.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/verify/{}", self.token)
    }
}

/// Public metadata returned by the verification lookup endpoint for
/// third-party authenticity checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Public token.
    pub token: String,
    /// Certificate title from the bound save.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Authorization date.
    pub authorized_on: NaiveDate,
    /// Content digest of the bound snapshot.
    pub digest: String,
    /// When the bound save was created.
    pub saved_at: DateTime<Utc>,
    /// When the verification record was created.
    pub verified_at: DateTime<Utc>,
}
