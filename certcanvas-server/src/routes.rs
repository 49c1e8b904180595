//! API route handlers for session editing, the save → verify → export
//! pipeline, and the public verification lookup.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use certcanvas_core::{
    DesignDocument, Element, ElementId, ElementKind, SaveId, SessionStatus, Transform,
    VerificationSummary,
};
use certcanvas_renderer::{ExportFormat, VerificationStamp};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::metrics;
use crate::validation;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request/response payloads
// ---------------------------------------------------------------------------

/// Request body for session creation.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Session identifier; generated when omitted.
    pub session_id: Option<String>,
    /// Canvas width in pixels.
    pub width: Option<f32>,
    /// Canvas height in pixels.
    pub height: Option<f32>,
}

/// Request body for adding an element.
#[derive(Debug, Deserialize)]
pub struct ElementRequest {
    /// Element content.
    pub kind: ElementKind,
    /// Optional position/size; defaults apply when omitted.
    pub transform: Option<Transform>,
}

/// Request body for updating an element. Omitted fields keep their value.
#[derive(Debug, Deserialize)]
pub struct ElementUpdateRequest {
    /// Replacement content.
    pub kind: Option<ElementKind>,
    /// Replacement position/size.
    pub transform: Option<Transform>,
}

/// Request body for the save gate.
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    /// Save title.
    pub title: String,
}

/// Request body for the verification binder.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// The save to verify; must be the session's current save.
    pub save_id: String,
    /// Author name for the authorization claim.
    pub author: String,
    /// Authorization date, `YYYY-MM-DD`.
    pub authorized_on: String,
}

/// Export query parameters.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Target format: png (default), jpeg, or pdf.
    pub format: Option<String>,
}

/// Session status plus the absolute verification URL.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Derived session state.
    #[serde(flatten)]
    pub status: SessionStatus,
    /// Absolute verification URL, present once verified.
    pub verification_url: Option<String>,
}

/// Save outcome returned to the UI (the snapshot itself stays server-side).
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    /// New save identifier.
    pub save_id: String,
    /// Accepted title.
    pub title: String,
    /// Design revision the save covers.
    pub revision: u64,
    /// Snapshot content digest.
    pub digest: String,
    /// Save timestamp (RFC 3339).
    pub created_at: String,
}

/// Verification outcome returned to the UI.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Public verification token.
    pub token: String,
    /// Absolute verification URL.
    pub verification_url: String,
    /// Bound save identifier.
    pub save_id: String,
    /// Author name.
    pub author: String,
    /// Authorization date.
    pub authorized_on: String,
}

// ---------------------------------------------------------------------------
// Session and element handlers
// ---------------------------------------------------------------------------

/// Create a new design session owned by the caller.
#[tracing::instrument(name = "create_session", skip(state, req))]
pub async fn create_session(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = req
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    validation::validate_session_id(&session_id)?;

    let status = state
        .store
        .create_session(&session_id, identity.actor(), req.width, req.height)?;
    metrics::record_session_created();
    metrics::set_sessions_active(state.store.session_ids().len());

    Ok((StatusCode::CREATED, Json(state.status_response(status))))
}

/// Current design document for a session.
#[tracing::instrument(name = "get_design", skip(state))]
pub async fn get_design(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DesignDocument>, ApiError> {
    validation::validate_session_id(&session_id)?;
    Ok(Json(state.store.document(&session_id)?))
}

/// Derived pipeline state for the UI gate.
#[tracing::instrument(name = "get_status", skip(state))]
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    validation::validate_session_id(&session_id)?;
    let status = state.store.status(&session_id)?;
    Ok(Json(state.status_response(status)))
}

/// Add an element to the design.
#[tracing::instrument(name = "add_element", skip(state, req))]
pub async fn add_element(
    State(state): State<AppState>,
    identity: Identity,
    Path(session_id): Path<String>,
    Json(req): Json<ElementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_session_id(&session_id)?;

    let mut element = Element::new(req.kind);
    if let Some(transform) = req.transform {
        element = element.with_transform(transform);
    }
    let id = state
        .store
        .add_element(&session_id, identity.actor(), element)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "element_id": id.to_string() })),
    ))
}

/// Update an element's content and/or transform.
#[tracing::instrument(name = "update_element", skip(state, req))]
pub async fn update_element(
    State(state): State<AppState>,
    identity: Identity,
    Path((session_id, element_id)): Path<(String, String)>,
    Json(req): Json<ElementUpdateRequest>,
) -> Result<StatusCode, ApiError> {
    validation::validate_session_id(&session_id)?;
    let id = ElementId::parse(&element_id)?;

    state
        .store
        .update_element(&session_id, identity.actor(), id, move |el| {
            if let Some(kind) = req.kind {
                el.kind = kind;
            }
            if let Some(transform) = req.transform {
                el.transform = transform;
            }
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove an element from the design.
#[tracing::instrument(name = "remove_element", skip(state))]
pub async fn remove_element(
    State(state): State<AppState>,
    identity: Identity,
    Path((session_id, element_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    validation::validate_session_id(&session_id)?;
    let id = ElementId::parse(&element_id)?;
    state
        .store
        .remove_element(&session_id, identity.actor(), id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Pipeline handlers
// ---------------------------------------------------------------------------

/// Save gate: persist a snapshot of the current design.
#[tracing::instrument(name = "save", skip(state, req))]
pub async fn save(
    State(state): State<AppState>,
    identity: Identity,
    Path(session_id): Path<String>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    validation::validate_session_id(&session_id)?;

    let record = match state.store.save(&session_id, identity.actor(), &req.title) {
        Ok(record) => record,
        Err(e) => {
            metrics::record_save(false);
            return Err(e.into());
        }
    };
    metrics::record_save(true);

    Ok(Json(SaveResponse {
        save_id: record.id.to_string(),
        title: record.title,
        revision: record.revision,
        digest: record.digest,
        created_at: record.created_at.to_rfc3339(),
    }))
}

/// Verification binder: bind the current save to a public token.
#[tracing::instrument(name = "verify", skip(state, req))]
pub async fn verify(
    State(state): State<AppState>,
    identity: Identity,
    Path(session_id): Path<String>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    validation::validate_session_id(&session_id)?;
    let save_id = SaveId::parse(&req.save_id)?;

    let record = match state.store.verify(
        &session_id,
        identity.actor(),
        save_id,
        &req.author,
        &req.authorized_on,
    ) {
        Ok(record) => record,
        Err(e) => {
            metrics::record_verification(false);
            return Err(e.into());
        }
    };
    metrics::record_verification(true);

    Ok(Json(VerifyResponse {
        token: record.token.as_str().to_string(),
        verification_url: state.verification_url(&record.path()),
        save_id: record.save_id.to_string(),
        author: record.author,
        authorized_on: record.authorized_on.to_string(),
    }))
}

/// Export gate and encoder: render the verified snapshot to the requested
/// format.
#[tracing::instrument(name = "export", skip(state))]
pub async fn export(
    State(state): State<AppState>,
    identity: Identity,
    Path(session_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    validation::validate_session_id(&session_id)?;
    let format: ExportFormat = query.format.as_deref().unwrap_or("png").parse()?;

    let (save, verification) = match state.store.export_snapshot(&session_id, identity.actor()) {
        Ok(pair) => pair,
        Err(e) => {
            metrics::record_export(format.extension(), false);
            return Err(e.into());
        }
    };

    let stamp = VerificationStamp {
        url: state.verification_url(&verification.path()),
        author: verification.author.clone(),
        authorized_on: verification.authorized_on.to_string(),
    };
    let artifact = state
        .exporter
        .export(&save.document, &stamp, format)
        .map_err(|e| {
            metrics::record_export(format.extension(), false);
            ApiError::from(e)
        })?;
    metrics::record_export(format.extension(), true);

    let disposition = format!(
        "attachment; filename=\"{}.{}\"",
        filename_stem(&save.title),
        format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// Public verification lookup for third-party authenticity checks.
#[tracing::instrument(name = "lookup_verification", skip(state))]
pub async fn lookup_verification(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<VerificationSummary>, ApiError> {
    match state.store.lookup_verification(&token) {
        Ok(summary) => {
            metrics::record_verification_lookup(true);
            Ok(Json(summary))
        }
        Err(e) => {
            metrics::record_verification_lookup(false);
            Err(e.into())
        }
    }
}

/// Reduce a save title to a safe download filename stem.
fn filename_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = stem.trim_matches('_');
    if trimmed.is_empty() {
        "certificate".to_string()
    } else {
        trimmed.to_string()
    }
}
