pub mod accounts;
pub mod auth;
pub mod comments;
pub mod media;
pub mod videos;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(accounts::routes())
        .merge(comments::routes())
        .merge(media::routes())
        .merge(videos::routes())
}
