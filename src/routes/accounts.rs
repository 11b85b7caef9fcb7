//! Account registration, login, and self-service endpoints

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

use super::auth::AuthUser;
use crate::AppState;
use crate::domain::{accounts, comments, videos};
use crate::services::error::{ApiError, LogErr};
use crate::services::{ownership, session};

pub fn routes() -> Router<Arc<AppState>> {
    // Rate limit registration and login to slow down origin-signal churn
    let rate_limit_config = GovernorConfigBuilder::default()
        .per_second(6)
        .burst_size(10)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("Failed to build rate limit config");

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config.into(),
    };

    Router::new()
        .route("/accounts", post(register))
        .route("/login", post(login))
        .layer(rate_limit_layer)
        .route(
            "/accounts/{id}",
            get(get_account).put(update_account).delete(delete_account),
        )
}

/// Coarse, spoofable client-network identifier used only as an anti-abuse
/// heuristic at registration. Best-effort by design: it is not a security
/// boundary, and swapping it for a stronger signal touches nothing outside
/// this module and the accounts domain.
fn origin_signal(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    display_name: String,
    channel_name: String,
    icon: Option<String>,
}

#[derive(Serialize)]
struct AuthResponse {
    account: accounts::Account,
    token: String,
}

/// POST /accounts - Register an account and issue its bearer token
async fn register(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let display_name = req.display_name.trim();
    let channel_name = req.channel_name.trim();
    if display_name.is_empty() {
        return Err(ApiError::Validation(
            "displayName must not be empty".to_string(),
        ));
    }
    if channel_name.is_empty() {
        return Err(ApiError::Validation(
            "channelName must not be empty".to_string(),
        ));
    }

    let origin = origin_signal(&headers, peer);

    let account = match accounts::insert_account(
        &state.db,
        display_name,
        channel_name,
        req.icon.as_deref(),
        &origin,
    )
    .await
    {
        Ok(account) => account,
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(ApiError::RateLimited(
                "an account was already created from this origin".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let token =
        session::issue_token(account.id, &state.jwt_secret).log_internal("Issue token error")?;

    Ok((StatusCode::CREATED, Json(AuthResponse { account, token })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    channel_name: String,
}

/// POST /login - Issue a fresh bearer token for an existing account
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let account = accounts::find_by_channel_name(&state.db, req.channel_name.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))?;

    let token =
        session::issue_token(account.id, &state.jwt_secret).log_internal("Issue token error")?;

    Ok(Json(AuthResponse { account, token }))
}

/// GET /accounts/:id - Public account profile
async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<i64>,
) -> Result<Json<accounts::Account>, ApiError> {
    let account = accounts::get_account(&state.db, account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))?;

    Ok(Json(account))
}

/// Distinguishes "field absent" (outer None) from "field explicitly null"
/// (Some(None)) in a JSON patch body
fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    display_name: Option<String>,
    channel_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    icon: Option<Option<String>>,
}

/// PUT /accounts/:id - Self-service profile update (display fields only)
async fn update_account(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(account_id): Path<i64>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Json<Value>, ApiError> {
    ownership::authorize(actor, account_id)?;

    if matches!(req.display_name.as_deref(), Some(s) if s.trim().is_empty()) {
        return Err(ApiError::Validation(
            "displayName must not be empty".to_string(),
        ));
    }
    if matches!(req.channel_name.as_deref(), Some(s) if s.trim().is_empty()) {
        return Err(ApiError::Validation(
            "channelName must not be empty".to_string(),
        ));
    }

    accounts::update_account(
        &state.db,
        account_id,
        req.display_name.as_deref().map(str::trim),
        req.channel_name.as_deref().map(str::trim),
        req.icon.as_ref().map(|icon| icon.as_deref()),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("account not found".to_string()))?;

    Ok(Json(json!({ "success": true })))
}

/// DELETE /accounts/:id - Self-service deletion with full cascade
async fn delete_account(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(account_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    ownership::authorize(actor, account_id)?;
    cascade_delete_account(&state, account_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Dependents go first inside one transaction and the account row is the
/// last step, so a failed cascade leaves an owner able to retry. Storage
/// release happens only after the commit.
async fn cascade_delete_account(state: &AppState, account_id: i64) -> Result<(), ApiError> {
    let mut tx = state
        .db
        .begin()
        .await
        .log_internal("Begin delete transaction error")?;

    // Collect locators before the rows disappear
    let storage_paths = videos::storage_paths_for_account(&mut *tx, account_id).await?;

    comments::delete_comments_on_account_videos(&mut *tx, account_id).await?;
    comments::delete_comments_by_author(&mut *tx, account_id).await?;
    videos::delete_videos_for_account(&mut *tx, account_id).await?;
    let removed = accounts::delete_account_row(&mut *tx, account_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("account not found".to_string()));
    }

    tx.commit()
        .await
        .log_internal("Commit delete transaction error")?;

    // Storage release is best-effort hygiene; the catalog is already consistent
    for path in storage_paths {
        if let Err(e) = state.storage.delete(&path).await {
            eprintln!(
                "[delete_account] Failed to release storage object {}: {}",
                path, e
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BlobStore;
    use axum::http::HeaderValue;
    use bytes::Bytes;
    use sqlx::PgPool;

    fn peer() -> SocketAddr {
        "10.0.0.7:55555".parse().unwrap()
    }

    #[test]
    fn test_origin_signal_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        assert_eq!(origin_signal(&headers, peer()), "1.2.3.4");
    }

    #[test]
    fn test_origin_signal_falls_back_to_peer() {
        assert_eq!(origin_signal(&HeaderMap::new(), peer()), "10.0.0.7");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(origin_signal(&headers, peer()), "10.0.0.7");
    }

    #[sqlx::test]
    async fn test_account_cascade_removes_all_dependents(pool: PgPool) {
        let root = std::env::temp_dir().join(format!("vidshare-cascade-{}", std::process::id()));
        let state = AppState {
            db: pool.clone(),
            storage: BlobStore::Local { root: root.clone() },
            jwt_secret: b"test-secret".to_vec(),
        };

        let alice = accounts::insert_account(&pool, "Alice", "alice_tv", None, "198.51.100.1")
            .await
            .unwrap();
        let bob = accounts::insert_account(&pool, "Bob", "bob_tv", None, "198.51.100.2")
            .await
            .unwrap();

        let alice_key_1 = "videos/cascade/alice-1.mp4";
        let alice_key_2 = "videos/cascade/alice-2.mp4";
        let bob_key = "videos/cascade/bob-1.mp4";
        for key in [alice_key_1, alice_key_2, bob_key] {
            state
                .storage
                .put(key, Bytes::from_static(b"payload"))
                .await
                .unwrap();
        }

        let alice_video = videos::insert_video(&pool, alice.id, "One", "d", alice_key_1)
            .await
            .unwrap();
        videos::insert_video(&pool, alice.id, "Two", "d", alice_key_2)
            .await
            .unwrap();
        let bob_video = videos::insert_video(&pool, bob.id, "Bob's", "d", bob_key)
            .await
            .unwrap();

        // One on Alice's video by Bob, one by Alice elsewhere, one untouched
        comments::insert_comment(&pool, alice_video, bob.id, "nice")
            .await
            .unwrap();
        comments::insert_comment(&pool, bob_video, alice.id, "thanks")
            .await
            .unwrap();
        let bob_comment = comments::insert_comment(&pool, bob_video, bob.id, "mine")
            .await
            .unwrap();

        cascade_delete_account(&state, alice.id).await.unwrap();

        assert!(accounts::get_account(&pool, alice.id).await.unwrap().is_none());
        let leftover_videos: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM videos WHERE account_id = $1")
                .bind(alice.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(leftover_videos.0, 0);
        let leftover_comments: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM comments
            WHERE account_id = $1
               OR video_id NOT IN (SELECT id FROM videos)
            "#,
        )
        .bind(alice.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(leftover_comments.0, 0);

        // Bob's catalog and storage are untouched
        assert!(videos::get_video(&pool, bob_video).await.unwrap().is_some());
        assert!(comments::get_comment(&pool, bob_comment.id)
            .await
            .unwrap()
            .is_some());
        assert!(!root.join(alice_key_1).exists());
        assert!(!root.join(alice_key_2).exists());
        assert!(root.join(bob_key).exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[sqlx::test]
    async fn test_cascade_on_missing_account_is_not_found(pool: PgPool) {
        let state = AppState {
            db: pool,
            storage: BlobStore::Local {
                root: std::env::temp_dir(),
            },
            jwt_secret: b"test-secret".to_vec(),
        };
        let err = cascade_delete_account(&state, 424242).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
