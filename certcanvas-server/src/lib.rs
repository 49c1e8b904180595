//! # Certcanvas Server Library
//!
//! Shared state and router for the certcanvas HTTP surface. This library is
//! used by both the binary and integration tests.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use url::Url;

use certcanvas_core::{DesignStore, SessionStatus};
use certcanvas_renderer::CertificateExporter;

pub mod auth;
pub mod error;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod validation;

pub use auth::Identity;
pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Design session store.
    pub store: DesignStore,
    /// Export encoder.
    pub exporter: Arc<CertificateExporter>,
    /// Public base URL used to build absolute verification URLs.
    pub public_base: Url,
}

impl AppState {
    /// Create state around a store with the default export configuration.
    pub fn new(store: DesignStore, public_base: Url) -> Self {
        Self {
            store,
            exporter: Arc::new(CertificateExporter::with_defaults()),
            public_base,
        }
    }

    /// Join an opaque verification path onto the public base URL.
    pub fn verification_url(&self, path: &str) -> String {
        self.public_base
            .join(path)
            .map_or_else(|_| path.to_string(), |url| url.to_string())
    }

    /// Wrap a core status with its absolute verification URL.
    pub(crate) fn status_response(&self, status: SessionStatus) -> routes::StatusResponse {
        let verification_url = status
            .verification_path
            .as_deref()
            .map(|path| self.verification_url(path));
        routes::StatusResponse {
            status,
            verification_url,
        }
    }
}

/// Build the API router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check endpoints (Kubernetes probes)
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Session lifecycle
        .route("/api/session", post(routes::create_session))
        .route("/api/session/{session_id}", get(routes::get_design))
        .route("/api/session/{session_id}/status", get(routes::get_status))
        // Element editing
        .route(
            "/api/session/{session_id}/elements",
            post(routes::add_element),
        )
        .route(
            "/api/session/{session_id}/elements/{element_id}",
            put(routes::update_element).delete(routes::remove_element),
        )
        // Save -> verify -> export pipeline
        .route("/api/session/{session_id}/save", post(routes::save))
        .route("/api/session/{session_id}/verify", post(routes::verify))
        .route("/api/session/{session_id}/export", get(routes::export))
        // Public verification lookup
        .route("/verify/{token}", get(routes::lookup_verification))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_url_joins_onto_the_base() {
        let state = AppState::new(
            DesignStore::new(),
            Url::parse("https://certs.example").expect("url"),
        );
        assert_eq!(
            state.verification_url("/verify/abc123"),
            "https://certs.example/verify/abc123"
        );
    }
}
