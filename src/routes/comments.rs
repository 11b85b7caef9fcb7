//! Comment endpoints; author-only mutation behind the ownership check

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::auth::AuthUser;
use crate::AppState;
use crate::constants::UNKNOWN_CHANNEL;
use crate::domain::{comments, videos};
use crate::services::error::{ApiError, LogErr};
use crate::services::ownership;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
        .route("/videos/{id}/comments", get(list_comments))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentRequest {
    video_id: i64,
    text: String,
}

/// POST /comments - Any authenticated account may comment on any video
async fn create_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(account_id): AuthUser,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<comments::Comment>), ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation(
            "comment text must not be empty".to_string(),
        ));
    }

    videos::get_video(&state.db, req.video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("video not found".to_string()))?;

    // The video can be cascaded away between the check and the insert; the
    // foreign key turns that race into a deterministic 404 instead of an
    // orphan comment
    let comment = match comments::insert_comment(&state.db, req.video_id, account_id, text).await {
        Ok(comment) => comment,
        Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
            return Err(ApiError::NotFound("video not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /videos/:id/comments - Oldest first, author data joined at read time
async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
) -> Result<Json<Vec<comments::CommentWithAuthor>>, ApiError> {
    videos::get_video(&state.db, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("video not found".to_string()))?;

    let items = comments::list_comments_with_author(&state.db, video_id, UNKNOWN_CHANNEL)
        .await
        .log_internal("List comments error")?;

    Ok(Json(items))
}

#[derive(Deserialize)]
struct UpdateCommentRequest {
    text: String,
}

/// PUT /comments/:id - Author-only edit
async fn update_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(comment_id): Path<i64>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<comments::Comment>, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation(
            "comment text must not be empty".to_string(),
        ));
    }

    let existing = comments::get_comment(&state.db, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;

    ownership::authorize(actor, existing.account_id)?;

    // The row can vanish between the check and the write; that race is a 404
    let updated = comments::update_comment_body(&state.db, comment_id, text)
        .await?
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;

    Ok(Json(updated))
}

/// DELETE /comments/:id - Author-only; never touches the parent video
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(comment_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let existing = comments::get_comment(&state.db, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;

    ownership::authorize(actor, existing.account_id)?;

    let removed = comments::delete_comment_row(&state.db, comment_id).await?;
    if removed == 0 {
        // Lost a race with another delete of the same comment
        return Err(ApiError::NotFound("comment not found".to_string()));
    }

    Ok(Json(json!({ "success": true })))
}
