//! JSON bodies that are not metadata records.

use serde::{Deserialize, Serialize};

pub const DETAIL_STARTED: &str = "Metadata not found. Background collection started.";
pub const DETAIL_RUNNING: &str = "Metadata not found. Background collection already running.";

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// 202 body for a cache miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub detail: String,
    /// The validated URL being collected.
    pub url: String,
}

impl AcceptedResponse {
    pub fn new(url: String, started: bool) -> Self {
        let detail = if started {
            DETAIL_STARTED
        } else {
            DETAIL_RUNNING
        };
        Self {
            detail: detail.to_string(),
            url,
        }
    }
}

/// Health check body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
}
