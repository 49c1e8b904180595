//! Router-level integration tests for the save → verify → export pipeline.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use url::Url;

use certcanvas_core::{DesignStore, ElementKind, ShapeKind};
use certcanvas_server::{router, AppState};

const OWNER: &str = "jane";

fn app() -> Router {
    let state = AppState::new(
        DesignStore::new(),
        Url::parse("http://localhost:2378").expect("base url"),
    );
    router(state)
}

fn json_request(method: &str, uri: &str, actor: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(actor) = actor {
        builder = builder.header("x-actor", actor);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str, actor: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-actor", actor);
    }
    builder.body(Body::empty()).expect("request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn rect_kind() -> ElementKind {
    ElementKind::Shape {
        shape: ShapeKind::Rect,
        fill: "#fdf6e3".to_string(),
        stroke: "#b58900".to_string(),
        stroke_width: 2.0,
    }
}

/// Drive a session through create → add element → save → verify and return
/// the (save_id, token) pair.
async fn set_up_verified_session(app: &Router, session_id: &str) -> (String, String) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session",
            Some(OWNER),
            serde_json::json!({ "session_id": session_id }),
        ))
        .await
        .expect("create session");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/session/{session_id}/elements"),
            Some(OWNER),
            serde_json::json!({
                "kind": rect_kind(),
                "transform": { "x": 100.0, "y": 100.0, "width": 200.0, "height": 120.0, "rotation": 0.0, "z_index": 0 }
            }),
        ))
        .await
        .expect("add element");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/session/{session_id}/save"),
            Some(OWNER),
            serde_json::json!({ "title": "Cert A" }),
        ))
        .await
        .expect("save");
    assert_eq!(response.status(), StatusCode::OK);
    let save = body_json(response).await;
    let save_id = save["save_id"].as_str().expect("save_id").to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/session/{session_id}/verify"),
            Some(OWNER),
            serde_json::json!({
                "save_id": save_id,
                "author": "Jane Doe",
                "authorized_on": "2024-01-01"
            }),
        ))
        .await
        .expect("verify");
    assert_eq!(response.status(), StatusCode::OK);
    let verification = body_json(response).await;
    let token = verification["token"].as_str().expect("token").to_string();
    assert!(verification["verification_url"]
        .as_str()
        .expect("url")
        .contains("/verify/"));

    (save_id, token)
}

#[tokio::test]
async fn full_pipeline_exports_png_then_gates_after_mutation() {
    let app = app();
    let (_save_id, token) = set_up_verified_session(&app, "cert-flow").await;

    // Status shows the exportable state with an absolute verification URL.
    let response = app
        .clone()
        .oneshot(get_request("/api/session/cert-flow/status", None))
        .await
        .expect("status");
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["is_saved"], serde_json::json!(true));
    assert_eq!(status["can_export"], serde_json::json!(true));
    assert_eq!(status["stage"], serde_json::json!("verified"));
    let url = status["verification_url"].as_str().expect("url");
    assert!(url.starts_with("http://localhost:2378/verify/"));
    assert!(url.contains(&token));

    // PNG export succeeds.
    let response = app
        .clone()
        .oneshot(get_request(
            "/api/session/cert-flow/export?format=png",
            Some(OWNER),
        ))
        .await
        .expect("export png");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("image/png")
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("png body");
    assert_eq!(&bytes[0..4], &[137, 80, 78, 71]);

    // Fetch the design to learn the element id, then move the rectangle.
    let response = app
        .clone()
        .oneshot(get_request("/api/session/cert-flow", None))
        .await
        .expect("design");
    let design = body_json(response).await;
    let element_id = design["elements"][0]["id"].as_str().expect("element id");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/session/cert-flow/elements/{element_id}"),
            Some(OWNER),
            serde_json::json!({
                "transform": { "x": 150.0, "y": 100.0, "width": 200.0, "height": 120.0, "rotation": 0.0, "z_index": 0 }
            }),
        ))
        .await
        .expect("move element");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // PDF export is now gated: 412 with the "not saved" reason.
    let response = app
        .clone()
        .oneshot(get_request(
            "/api/session/cert-flow/export?format=pdf",
            Some(OWNER),
        ))
        .await
        .expect("export pdf");
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    let error = body_json(response).await;
    assert_eq!(error["kind"], serde_json::json!("export_not_allowed"));
    assert_eq!(error["gate"], serde_json::json!("not_saved"));
}

#[tokio::test]
async fn public_lookup_resolves_the_token() {
    let app = app();
    let (_save_id, token) = set_up_verified_session(&app, "cert-lookup").await;

    let response = app
        .clone()
        .oneshot(get_request(&format!("/verify/{token}"), None))
        .await
        .expect("lookup");
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["author"], serde_json::json!("Jane Doe"));
    assert_eq!(summary["title"], serde_json::json!("Cert A"));
    assert_eq!(summary["authorized_on"], serde_json::json!("2024-01-01"));

    let response = app
        .clone()
        .oneshot(get_request("/verify/00000000missing", None))
        .await
        .expect("missing lookup");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn identity_is_required_and_ownership_enforced() {
    let app = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session",
            Some(OWNER),
            serde_json::json!({ "session_id": "cert-auth" }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    // Missing identity on a mutating call.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session/cert-auth/elements",
            None,
            serde_json::json!({ "kind": rect_kind() }),
        ))
        .await
        .expect("anonymous add");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Foreign identity is rejected with 403.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session/cert-auth/elements",
            Some("mallory"),
            serde_json::json!({ "kind": rect_kind() }),
        ))
        .await
        .expect("foreign add");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let error = body_json(response).await;
    assert_eq!(error["kind"], serde_json::json!("forbidden"));
}

#[tokio::test]
async fn verify_rejects_bad_input_and_stale_saves() {
    let app = app();

    // Set up a saved (not yet verified) session.
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/session",
            Some(OWNER),
            serde_json::json!({ "session_id": "cert-verify" }),
        ))
        .await
        .expect("create");
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/session/cert-verify/elements",
            Some(OWNER),
            serde_json::json!({ "kind": rect_kind() }),
        ))
        .await
        .expect("add");
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session/cert-verify/save",
            Some(OWNER),
            serde_json::json!({ "title": "Draft" }),
        ))
        .await
        .expect("save");
    let save_id = body_json(response).await["save_id"]
        .as_str()
        .expect("save_id")
        .to_string();

    // Empty author: 400, and the session stays unverified.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session/cert-verify/verify",
            Some(OWNER),
            serde_json::json!({ "save_id": save_id, "author": "", "authorized_on": "2024-01-01" }),
        ))
        .await
        .expect("empty author");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["kind"], serde_json::json!("validation"));

    let response = app
        .clone()
        .oneshot(get_request("/api/session/cert-verify/status", None))
        .await
        .expect("status");
    let status = body_json(response).await;
    assert_eq!(status["stage"], serde_json::json!("saved"));

    // Mutate, then verify against the now-stale save: 409.
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/session/cert-verify/elements",
            Some(OWNER),
            serde_json::json!({ "kind": rect_kind() }),
        ))
        .await
        .expect("mutate");
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session/cert-verify/verify",
            Some(OWNER),
            serde_json::json!({ "save_id": save_id, "author": "Jane Doe", "authorized_on": "2024-01-01" }),
        ))
        .await
        .expect("stale verify");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error = body_json(response).await;
    assert_eq!(error["kind"], serde_json::json!("stale_save"));
}

#[tokio::test]
async fn export_requires_a_known_format() {
    let app = app();
    set_up_verified_session(&app, "cert-format").await;

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/session/cert-format/export?format=gif",
            Some(OWNER),
        ))
        .await
        .expect("bad format");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
