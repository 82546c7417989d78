//! Request-facing composition root: cache lookup with background collection on a miss.

use std::sync::Arc;

use crate::collector::{Collector, CurlCollector};
use crate::config::ServiceConfig;
use crate::error::MetadataResult;
use crate::record::MetadataRecord;
use crate::scheduler::DedupScheduler;
use crate::service::MetadataService;
use crate::store::{MetadataStore, SqliteStore};
use crate::url_model::{normalize_url, validate_url};

/// Result of a lookup that may have started a background collection.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(MetadataRecord),
    /// Nothing cached yet. `started` is false when a collection for the same
    /// key was already running.
    Scheduled { url: String, started: bool },
}

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    service: Arc<MetadataService>,
    scheduler: DedupScheduler,
}

impl AppContext {
    pub fn new(service: MetadataService, scheduler: DedupScheduler) -> Self {
        Self {
            service: Arc::new(service),
            scheduler,
        }
    }

    /// SQLite store and curl collector, both configured from `cfg`.
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn MetadataStore> = Arc::new(SqliteStore::from_config(cfg)?);
        Ok(Self::with_store(cfg, store))
    }

    /// Curl collector from `cfg` in front of the given store.
    pub fn with_store(cfg: &ServiceConfig, store: Arc<dyn MetadataStore>) -> Self {
        let collector: Arc<dyn Collector> = Arc::new(CurlCollector::from_config(cfg));
        Self::new(
            MetadataService::new(store, collector),
            DedupScheduler::new(cfg.background_workers),
        )
    }

    pub fn service(&self) -> &MetadataService {
        &self.service
    }

    pub fn scheduler(&self) -> &DedupScheduler {
        &self.scheduler
    }

    /// Validates `raw_url` and returns the cached record, or schedules a
    /// deduplicated background collection and reports whether it was started.
    pub async fn lookup_or_schedule(&self, raw_url: &str) -> MetadataResult<LookupOutcome> {
        let validated = validate_url(raw_url)?;

        if let Some(record) = self.service.lookup(validated.as_str()).await? {
            return Ok(LookupOutcome::Found(record));
        }

        let key = normalize_url(validated.as_str());
        let url = validated.to_string();
        let service = Arc::clone(&self.service);
        let job_url = url.clone();
        let started = self.scheduler.submit_once(&key, async move {
            if let Err(e) = service.collect_and_store(&job_url).await {
                tracing::error!(url = %job_url, error = %e, "background metadata collection failed");
            }
        });

        if started {
            tracing::info!(url = %url, key = %key, "cache miss, background collection started");
        } else {
            tracing::debug!(url = %url, key = %key, "cache miss, collection already running");
        }
        Ok(LookupOutcome::Scheduled { url, started })
    }
}
