//! Request handlers mapping HTTP onto `AppContext` operations.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metacache_core::app::{AppContext, LookupOutcome};
use metacache_core::MetadataError;
use serde_json::Value;

use super::types::{AcceptedResponse, ErrorResponse, HealthResponse};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/metadata` with `{"url": "..."}`: fetch now, store, return the record.
pub async fn create_metadata(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let Some(url) = body.get("url").and_then(Value::as_str) else {
        return bad_request("Field 'url' is required and must be a string.");
    };

    match state.ctx.service().collect_and_store(url).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/metadata?url=...`: the cached record, or 202 while it is collected.
pub async fn get_metadata(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(url) = params.get("url") else {
        return bad_request("Query parameter 'url' is required.");
    };

    match state.ctx.lookup_or_schedule(url).await {
        Ok(LookupOutcome::Found(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(LookupOutcome::Scheduled { url, started }) => (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse::new(url, started)),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

fn bad_request(detail: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(detail))).into_response()
}

fn status_for(err: &MetadataError) -> StatusCode {
    match err {
        MetadataError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        MetadataError::Collection(_) => StatusCode::BAD_GATEWAY,
        MetadataError::StoreUnavailable { .. } | MetadataError::Store { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        MetadataError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &MetadataError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::warn!(status = status.as_u16(), error = %err, "request failed");
    }
    (status, Json(ErrorResponse::new(err.to_string()))).into_response()
}
