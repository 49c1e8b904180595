//! HTTP error mapping.
//!
//! Every error leaving a handler becomes a `{ "kind": ..., "message": ... }`
//! JSON body with a status code that tells the UI which remediation applies:
//! 400 correct the input, 409 re-save, 412 complete the missing pipeline
//! stage (the body names the unmet gate), 503 retry later.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use certcanvas_core::{CoreError, ExportGate};
use certcanvas_renderer::RenderError;

use crate::metrics;
use crate::validation::ValidationError;

/// An API-level error with a wire representation.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    gate: Option<ExportGate>,
}

impl ApiError {
    /// Missing or malformed caller identity.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            kind: "unauthorized",
            message: message.into(),
            gate: None,
        }
    }

    /// The response status this error maps to.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::Validation(_) | CoreError::Serialization(_) => StatusCode::BAD_REQUEST,
            CoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CoreError::SessionNotFound(_)
            | CoreError::ElementNotFound(_)
            | CoreError::VerificationNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::SessionExists(_) | CoreError::StaleSave => StatusCode::CONFLICT,
            CoreError::ExportNotAllowed(_) => StatusCode::PRECONDITION_FAILED,
            CoreError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let gate = match &err {
            CoreError::ExportNotAllowed(gate) => Some(*gate),
            _ => None,
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
            gate,
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        match &err {
            RenderError::InvalidDocument(_) => Self {
                status: StatusCode::BAD_REQUEST,
                kind: "validation",
                message: err.to_string(),
                gate: None,
            },
            RenderError::Export(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                kind: "render",
                message: err.to_string(),
                gate: None,
            },
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        metrics::record_validation_failure(err.kind());
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation",
            message: err.to_string(),
            gate: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = self.kind, "request failed: {}", self.message);
        } else {
            tracing::debug!(kind = self.kind, "request rejected: {}", self.message);
        }

        let mut body = serde_json::json!({
            "kind": self.kind,
            "message": self.message,
        });
        if let Some(gate) = self.gate {
            body["gate"] = serde_json::json!(gate);
        }
        if self.status == StatusCode::SERVICE_UNAVAILABLE {
            body["retryable"] = serde_json::json!(true);
        }
        (self.status, Json(body)).into_response()
    }
}
