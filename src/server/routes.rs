//! Router, shared state and request handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use super::files::{content_type_for, serve_file};
use super::uploads::{UploadBundle, UploadStore};
use crate::config::{MediaConfig, MediaPaths};
use crate::error::{MediaError, MediaResult};

/// Highest clip id served by `/audio/{id}`.
const MAX_AUDIO_ID: u8 = 5;

const AUDIO_FAILURE: &str = "Failed to serve audio file";
const VIDEO_FAILURE: &str = "Failed to serve video file";
const UPLOAD_FAILURE: &str = "Upload failed";

/// Shared state passed to all request handlers.
#[derive(Clone)]
pub struct AppState {
    paths: Arc<MediaPaths>,
    uploads: UploadStore,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new(paths: MediaPaths, max_upload_bytes: usize) -> Self {
        let uploads = UploadStore::new(paths.upload_dir.clone());
        Self {
            paths: Arc::new(paths),
            uploads,
            max_upload_bytes,
        }
    }
}

/// Builds the router with every Chefpup endpoint.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    let upload_files = ServeDir::new(state.uploads.dir());

    Router::new()
        .route("/audio/{id}", get(handle_audio))
        .route("/video", get(handle_video))
        .route("/looping-video", get(handle_looping_video))
        .route("/upload", post(handle_upload).layer(upload_limit))
        .route("/check-files", get(handle_check_files))
        .nest_service("/uploads", upload_files)
        .with_state(state)
}

/// Resolves configuration, binds the listener and serves until Ctrl-C.
pub async fn start_server(config: MediaConfig) -> Result<()> {
    let paths = config.resolve()?;
    log::info!("[Server] Media root: {}", paths.root.display());
    log::info!("[Server] Uploads go to {}", paths.upload_dir.display());

    let app = create_router(AppState::new(paths, config.max_upload_bytes));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    log::info!("[Server] Listening on http://{}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    log::info!("[Server] Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("[Server] Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn range_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::RANGE).and_then(|v| v.to_str().ok())
}

/// Accepts only the decimal ids `1`..=`MAX_AUDIO_ID`.
fn parse_audio_id(raw: &str) -> MediaResult<u8> {
    raw.parse::<u8>()
        .ok()
        .filter(|id| (1..=MAX_AUDIO_ID).contains(id))
        .ok_or_else(|| MediaError::validation("Invalid audio file ID"))
}

/// Handles `GET /audio/{id}`.
async fn handle_audio(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> MediaResult<Response> {
    let id = parse_audio_id(&id)?;
    let path = state.paths.audio_dir.join(format!("{}.wav", id));
    serve_file(&path, range_header(&headers), "audio/wav")
        .await
        .map_err(|e| e.reported_as(AUDIO_FAILURE))
}

/// Handles `GET /video`.
async fn handle_video(State(state): State<AppState>, headers: HeaderMap) -> MediaResult<Response> {
    let path = &state.paths.video;
    serve_file(path, range_header(&headers), content_type_for(path))
        .await
        .map_err(|e| e.reported_as(VIDEO_FAILURE))
}

/// Handles `GET /looping-video`.
async fn handle_looping_video(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> MediaResult<Response> {
    let path = &state.paths.looping_video;
    serve_file(path, range_header(&headers), content_type_for(path))
        .await
        .map_err(|e| e.reported_as(VIDEO_FAILURE))
}

/// Handles `POST /upload`.
///
/// Nothing is written unless the video and all four audio fields arrived.
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> MediaResult<Json<Value>> {
    let multipart = multipart.map_err(|e| MediaError::validation(e.body_text()))?;
    let bundle = UploadBundle::from_multipart(multipart).await?;
    state
        .uploads
        .save(bundle)
        .await
        .map_err(|e| e.reported_as(UPLOAD_FAILURE))?;
    Ok(Json(json!({ "success": true })))
}

/// Handles `GET /check-files`.
async fn handle_check_files(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "exist": state.uploads.is_complete().await }))
}
