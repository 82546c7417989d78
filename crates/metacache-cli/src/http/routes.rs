//! Route table.

use axum::{routing::get, Router};

use super::handlers::{self, AppState};

/// Build the API router. The metadata resource answers with and without a trailing slash.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/metadata",
            get(handlers::get_metadata).post(handlers::create_metadata),
        )
        .route(
            "/api/metadata/",
            get(handlers::get_metadata).post(handlers::create_metadata),
        )
        .with_state(app_state)
}
