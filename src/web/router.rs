//! Router assembly for the hoard web boundary.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::web::handlers::{self, AppState};

/// Upper bound on one request body. Chunked uploads keep individual
/// requests small; this cap only guards against a runaway single chunk.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(handlers::status))
        .route("/upload", post(handlers::upload_chunk))
        .route("/merge", post(handlers::merge))
        .route("/files", get(handlers::list_files))
        .route("/download/*path", get(handlers::download))
        .route("/delete/*path", delete(handlers::delete_path))
        .route("/scan", post(handlers::scan))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
