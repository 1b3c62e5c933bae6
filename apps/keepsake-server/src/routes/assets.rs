//! Static file serving
//!
//! `/favicon.ico` comes from the configured icon path and `/public/*` from
//! the public directory with the `/public` prefix stripped, which also
//! serves uploaded blobs under `/public/upload/`.

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::StorageConfig;
use crate::state::AppState;

/// Create the static asset router
pub fn router(storage: &StorageConfig) -> Router<AppState> {
    Router::new()
        .route_service("/favicon.ico", ServeFile::new(&storage.favicon_path))
        .nest_service("/public", ServeDir::new(&storage.public_dir))
}
