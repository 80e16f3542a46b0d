// Web server — Axum backend for the moderation endpoint.
//
// POST /check-feedback classifies user feedback; GET /health is a liveness
// check. Every non-2xx response carries a JSON `{ "error": ... }` body.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::classifier::Classifier;
use crate::config::Config;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
///
/// The classifier is built once at startup and only ever read.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub classify_timeout: Duration,
}

impl AppState {
    pub fn new(classifier: Arc<dyn Classifier>, classify_timeout: Duration) -> Self {
        Self {
            classifier,
            classify_timeout,
        }
    }
}

/// Start the Axum web server and block until it exits (Ctrl-C or SIGTERM).
pub async fn run_server(config: &Config, classifier: Arc<dyn Classifier>) -> Result<()> {
    let state = AppState::new(classifier, config.classify_timeout);
    let app = build_router(state);

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("feedback-guard listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/check-feedback", post(handlers::feedback::check_feedback))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check — always returns 200 OK. The classifier is loaded before the
/// listener binds, so a reachable server has a working model.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
