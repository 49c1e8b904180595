//! # Certcanvas Server
//!
//! Local HTTP server for the certificate design studio.
//! Binds to localhost only; a fronting proxy terminates TLS and
//! authentication.

use std::net::SocketAddr;

use axum::{extract::State, http::HeaderValue, response::IntoResponse, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use certcanvas_core::DesignStore;
use certcanvas_server::{metrics, router, AppState};

/// Default port for the certcanvas server.
const DEFAULT_PORT: u16 = 2378; // "CERT" on a phone keypad

/// Build a CORS layer that only allows localhost origins.
///
/// The server is designed to run behind a local proxy; direct cross-origin
/// access from other hosts is rejected.
fn build_cors_layer(port: u16) -> CorsLayer {
    let localhost_origins = [
        format!("http://localhost:{port}"),
        format!("http://127.0.0.1:{port}"),
        // Common dev-server ports for the editing UI
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(), // Vite
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ];

    let origins: Vec<HeaderValue> = localhost_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static(certcanvas_server::auth::ACTOR_HEADER),
        ])
        .allow_credentials(true)
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default:
/// info,certcanvas_server=debug,tower_http=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output (recommended for production).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,certcanvas_server=debug,tower_http=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let metrics_handle = metrics::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to initialize Prometheus metrics: {}", e))?;
    tracing::info!("Prometheus metrics initialized");

    let port = std::env::var("CERTCANVAS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    // Durable store: with CERTCANVAS_DATA_DIR set, sessions survive restarts.
    let store = match std::env::var("CERTCANVAS_DATA_DIR") {
        Ok(dir) => {
            let store = DesignStore::with_data_dir(&dir)
                .map_err(|e| anyhow::anyhow!("Failed to open data dir {dir}: {e}"))?;
            let loaded = store
                .load_persisted()
                .map_err(|e| anyhow::anyhow!("Failed to load persisted sessions: {e}"))?;
            tracing::info!("Loaded {} persisted sessions from {dir}", loaded.len());
            store
        }
        Err(_) => {
            tracing::info!("CERTCANVAS_DATA_DIR not set; running with in-memory store");
            DesignStore::new()
        }
    };

    // Public base for verification URLs embedded in exports.
    let public_base = std::env::var("CERTCANVAS_PUBLIC_URL")
        .unwrap_or_else(|_| format!("http://localhost:{port}"));
    let public_base = Url::parse(&public_base)
        .map_err(|e| anyhow::anyhow!("Invalid CERTCANVAS_PUBLIC_URL {public_base:?}: {e}"))?;
    tracing::info!("Verification URLs will be built on {public_base}");

    let state = AppState::new(store, public_base);

    // Build metrics router with PrometheusHandle
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let app = router(state)
        .merge(metrics_router)
        // Request ID for distributed tracing correlation
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        // CORS configuration - restricted to localhost only
        .layer(build_cors_layer(port))
        // Structured request tracing with timing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    // Bind to localhost ONLY (security requirement)
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Certcanvas server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Prometheus metrics endpoint.
#[tracing::instrument(name = "metrics", skip(handle))]
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
