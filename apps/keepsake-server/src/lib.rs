//! Keepsake Server Library
//!
//! Content-addressed upload gallery. Uploaded files are stored under the
//! SHA-1 of their bytes; each visitor's uploads are tracked in cookies.
//!
//! # Modules
//!
//! - `upload`: hashing, naming and storage of uploaded blobs
//! - `session`: session identifiers and per-visitor upload lists
//! - `gallery`: page template and rendering
//! - `routes`: HTTP handlers

pub mod config;
pub mod error;
pub mod gallery;
pub mod routes;
pub mod session;
pub mod state;
pub mod upload;

use axum::Router;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::gallery::router())
        .merge(routes::upload::router())
        .merge(routes::health::router())
        .merge(routes::assets::router(&state.config().storage))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
