//! HTTP API for starting and observing batch runs.
//!
//! The server never blocks on a run: `POST /api/start` claims the progress
//! tracker, spawns the batch on a background task, and returns immediately.
//! Observers poll `GET /api/status` for defensive-copy snapshots and fetch
//! the packaged output from `GET /api/download` once a run completes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::archive;
use crate::config::{Config, DEFAULT_MODEL, KNOWN_MODELS, SUPPORTED_EXTENSIONS};
use crate::orchestrator::{RunOptions, StartError, run_claimed};
use crate::processor::NoopObserver;
use crate::progress::ProgressTracker;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub config: Config,
    pub progress: ProgressTracker,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub source_path: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub skip_analysis: bool,
    #[serde(default)]
    pub skip_refactoring: bool,
    /// Seconds between remote calls.
    #[serde(default = "default_delay")]
    pub delay: u64,
}

fn default_output_dir() -> String {
    "refactored_codebase".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_delay() -> u64 {
    2
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/start", post(start_run))
        .route("/api/status", get(get_status))
        .route("/api/download", get(download_output))
        .route("/api/config", get(get_config))
        .route("/health", get(health_check))
}

/// Build the full application router. CORS is permissive so a separately
/// hosted front end can poll the API.
pub fn build_router(state: SharedState) -> Router {
    api_router().layer(CorsLayer::permissive()).with_state(state)
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn start_run(
    State(state): State<SharedState>,
    Json(request): Json<StartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let options = RunOptions {
        source: request.source_path.trim().to_string(),
        output_dir: PathBuf::from(request.output_dir),
        model: request.model,
        skip_analysis: request.skip_analysis,
        skip_refactoring: request.skip_refactoring,
        delay: Duration::from_secs(request.delay),
    };
    options
        .validate()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    if !state.progress.begin_run(&options.output_dir) {
        return Err(ApiError::BadRequest(StartError::AlreadyRunning.to_string()));
    }

    let config = state.config.clone();
    let progress = state.progress.clone();
    tokio::spawn(async move {
        run_claimed(config, progress, options, &NoopObserver).await;
    });

    Ok(Json(serde_json::json!({
        "message": "Processing started",
        "status": "started",
    })))
}

async fn get_status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.progress.snapshot())
}

async fn download_output(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let output_dir = state
        .progress
        .snapshot()
        .output_dir
        .filter(|dir| dir.is_dir())
        .ok_or_else(|| {
            ApiError::NotFound("No refactored code available for download".to_string())
        })?;

    let bytes = archive::zip_dir(&output_dir)
        .map_err(|err| ApiError::Internal(format!("Failed to create download: {err:#}")))?;

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", archive::archive_filename()),
        )
        .body(Body::from(bytes))
        .map_err(|err| ApiError::Internal(err.to_string()))
}

async fn get_config(State(state): State<SharedState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "api_key_configured": state.config.api_key_configured(),
        "model": state.config.model,
        "supported_extensions": SUPPORTED_EXTENSIONS,
        "models": KNOWN_MODELS,
    }))
}

// ── Server entry point ────────────────────────────────────────────────

/// Start the API server and block until shutdown.
pub async fn start_server(config: Config, port: u16) -> Result<()> {
    let state = Arc::new(AppState {
        config,
        progress: ProgressTracker::new(),
    });
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    let local_addr = listener.local_addr()?;
    println!("recast API running at http://{local_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
