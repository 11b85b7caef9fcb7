//! Video catalog endpoints: upload pipeline, listing, deletion, view counter

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::auth::AuthUser;
use crate::AppState;
use crate::constants::{DEFAULT_DESCRIPTION, DEFAULT_TITLE, UNKNOWN_CHANNEL};
use crate::domain::{comments, videos};
use crate::services::error::{ApiError, LogErr};
use crate::services::ownership;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/videos", get(list_videos).post(upload_video))
        .route("/videos/{id}", delete(delete_video))
        .route("/videos/{id}/views", post(increment_views))
}

fn get_extension(content_type: &str) -> &'static str {
    match content_type {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        _ => "bin",
    }
}

// Key: videos/user_123/2025-12-06/1733500000000.mp4
fn object_key(account_id: i64, now: DateTime<Utc>, ext: &str) -> String {
    format!(
        "videos/user_{}/{}/{}.{}",
        account_id,
        now.format("%Y-%m-%d"),
        now.timestamp_millis(),
        ext
    )
}

fn field_or_default(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    video_id: i64,
}

/// POST /videos - Upload pipeline: the payload is transferred to durable
/// storage first and the catalog entry is committed only once the transfer
/// is acknowledged, never before. Title and description get placeholders
/// when blank; a missing or empty byte stream is always fatal.
async fn upload_video(
    State(state): State<Arc<AppState>>,
    AuthUser(account_id): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut payload: Option<(Bytes, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => {
                title = field.text().await.ok();
            }
            Some("description") => {
                description = field.text().await.ok();
            }
            Some("video") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                // A client that disconnects mid-transfer fails here, before
                // any storage or catalog write exists to clean up
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::Validation(format!("failed to read video payload: {}", e))
                })?;
                payload = Some((bytes, content_type));
            }
            _ => {}
        }
    }

    let (body, content_type) =
        payload.ok_or_else(|| ApiError::Validation("missing video payload".to_string()))?;
    if body.is_empty() {
        return Err(ApiError::Validation("empty video payload".to_string()));
    }

    let title = field_or_default(title, DEFAULT_TITLE);
    let description = field_or_default(description, DEFAULT_DESCRIPTION);
    let key = object_key(account_id, Utc::now(), get_extension(&content_type));

    // Detached from the connection: if the client disconnects now, this
    // handler future is dropped but the transfer-and-commit continuation
    // still runs to completion, so it either commits the catalog entry or
    // releases whatever it stored
    let task = tokio::spawn(store_and_commit(
        state.clone(),
        account_id,
        title,
        description,
        key,
        body,
    ));
    let video_id = task.await.log_internal("Upload task join error")??;

    Ok((StatusCode::CREATED, Json(UploadResponse { video_id })))
}

/// Transfer the payload to durable storage, then commit the catalog entry.
/// The commit is strictly conditioned on the transfer being acknowledged;
/// a failure at either step releases the stored object best-effort before
/// the error surfaces.
async fn store_and_commit(
    state: Arc<AppState>,
    account_id: i64,
    title: String,
    description: String,
    key: String,
    body: Bytes,
) -> Result<i64, ApiError> {
    if let Err(e) = state.storage.put(&key, body).await {
        // The failed transfer may have left a partial object; release it
        // before surfacing the failure
        if let Err(cleanup_err) = state.storage.delete(&key).await {
            eprintln!(
                "[upload_video] Failed to clean up partial object {}: {}",
                key, cleanup_err
            );
        }
        return Err(e.into());
    }

    match videos::insert_video(&state.db, account_id, &title, &description, &key).await {
        Ok(video_id) => {
            println!(
                "[upload_video] Stored {} for account {} as video {}",
                key, account_id, video_id
            );
            Ok(video_id)
        }
        Err(e) => {
            // Stored object with no catalog entry is an orphan; release it
            if let Err(cleanup_err) = state.storage.delete(&key).await {
                eprintln!(
                    "[upload_video] Failed to clean up orphaned object {}: {}",
                    key, cleanup_err
                );
            }
            // A valid token whose account was cascaded away mid-upload
            match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => Err(
                    ApiError::Authentication("account no longer exists".to_string()),
                ),
                other => Err(other.into()),
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: i64,
    account_id: i64,
    title: String,
    description: String,
    url: String,
    storage_path: String,
    view_count: i64,
    created_at: DateTime<Utc>,
    channel_name: String,
    icon_url: Option<String>,
}

/// GET /videos - Full catalog, newest first, owner data joined at read time
async fn list_videos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VideoItem>>, ApiError> {
    let rows = videos::list_videos_with_owner(&state.db, UNKNOWN_CHANNEL)
        .await
        .log_internal("List videos error")?;

    let items = rows
        .into_iter()
        .map(|row| VideoItem {
            id: row.id,
            account_id: row.account_id,
            title: row.title,
            description: row.description,
            url: state.storage.media_url(&row.storage_path),
            storage_path: row.storage_path,
            view_count: row.view_count,
            created_at: row.created_at,
            channel_name: row.channel_name,
            icon_url: row.icon_url,
        })
        .collect();

    Ok(Json(items))
}

/// DELETE /videos/:id - Owner-only; cascades to the video's comments, then
/// releases the storage object best-effort once the catalog rows are gone
async fn delete_video(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(video_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let video = videos::get_video(&state.db, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("video not found".to_string()))?;

    ownership::authorize(actor, video.account_id)?;

    let mut tx = state
        .db
        .begin()
        .await
        .log_internal("Begin delete transaction error")?;

    comments::delete_comments_for_video(&mut *tx, video_id).await?;
    let removed = videos::delete_video_row(&mut *tx, video_id).await?;

    tx.commit()
        .await
        .log_internal("Commit delete transaction error")?;

    if removed == 0 {
        // Lost a race with another delete of the same video
        return Err(ApiError::NotFound("video not found".to_string()));
    }

    if let Err(e) = state.storage.delete(&video.storage_path).await {
        eprintln!(
            "[delete_video] Failed to release storage object {}: {}",
            video.storage_path, e
        );
    }

    Ok(Json(json!({ "success": true })))
}

/// POST /videos/:id/views - Anonymous, atomic view counter
async fn increment_views(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let count = videos::increment_view_count(&state.db, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("video not found".to_string()))?;

    Ok(Json(json!({ "viewCount": count })))
}
