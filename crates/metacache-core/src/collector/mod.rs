//! Page collection: fetch a validated URL and return headers, cookies and
//! the (capped) page source.
//!
//! The orchestrator only sees the `Collector` trait; `CurlCollector` is the
//! production implementation.

mod fetch;
mod parse;

use async_trait::async_trait;

use crate::error::MetadataResult;
use crate::record::CollectedPage;
use crate::url_model::ValidatedUrl;

pub use fetch::CurlCollector;

/// Fetch-a-URL capability.
///
/// Implementations fail with `MetadataError::Collection` when the fetch
/// fails or the final response is not a success status. Oversized bodies
/// are truncated, not rejected.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn fetch(&self, url: &ValidatedUrl) -> MetadataResult<CollectedPage>;
}
