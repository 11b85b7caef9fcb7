//! Serves stored objects when the local storage backend is active.
//! The GCS backend hands out bucket URLs instead, so this returns 404 there.

use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;

use crate::AppState;
use crate::services::error::{ApiError, LogErr};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/media/{*path}", get(serve_media))
}

/// GET /media/*path - Serve a locally stored media file
async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Reject traversal attempts and null bytes upfront
    if path.contains("..") || path.contains('\0') {
        return Err(ApiError::Forbidden("invalid media path".to_string()));
    }

    let root = state
        .storage
        .local_root()
        .ok_or_else(|| ApiError::NotFound("media not found".to_string()))?;

    let full_path = root.join(&path);

    // canonicalize() resolves symlinks, so a path that escapes the storage
    // root is caught even when it contains no literal ".."
    let canonical = full_path
        .canonicalize()
        .map_err(|_| ApiError::NotFound("media not found".to_string()))?;
    let storage_canonical = root
        .canonicalize()
        .log_internal("Failed to canonicalize storage root")?;

    if !canonical.starts_with(&storage_canonical) {
        return Err(ApiError::Forbidden("invalid media path".to_string()));
    }

    let bytes = tokio::fs::read(&canonical)
        .await
        .map_err(|_| ApiError::NotFound("media not found".to_string()))?;

    let content_type = match canonical.extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    };

    // Object keys embed a timestamp, so the content behind a path never
    // changes and can be cached hard
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        bytes,
    ))
}
