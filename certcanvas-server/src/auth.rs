//! Caller identity extraction.
//!
//! Authentication itself is an external collaborator: a front-end (gateway,
//! reverse proxy, session middleware) authenticates the user and forwards the
//! resulting identity in the `x-actor` header. This module only enforces that
//! the identity is present and well-formed; the store decides whether that
//! identity may operate on a given session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::validation;

/// Header carrying the authenticated caller identity.
pub const ACTOR_HEADER: &str = "x-actor";

/// The authenticated caller identity attached to a request.
#[derive(Debug, Clone)]
pub struct Identity {
    actor: String,
}

impl Identity {
    /// The caller's identity string.
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ApiError::unauthorized(format!("missing {ACTOR_HEADER} header"))
            })?;
        validation::validate_actor(actor)?;
        Ok(Self {
            actor: actor.to_string(),
        })
    }
}
