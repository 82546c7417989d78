//! Deterministic collector and store doubles for unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::collector::Collector;
use crate::error::{MetadataError, MetadataResult};
use crate::record::{CollectedPage, MetadataRecord};
use crate::store::{MemoryStore, MetadataStore};
use crate::url_model::ValidatedUrl;

/// Returns a fixed page (or a fixed failure), optionally waiting on a gate first.
#[derive(Default)]
pub(crate) struct FakeCollector {
    calls: AtomicUsize,
    fail: bool,
    gate: Option<Arc<Semaphore>>,
}

impl FakeCollector {
    pub(crate) fn ok() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Each fetch waits for one permit on `gate` before answering.
    pub(crate) fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Collector for FakeCollector {
    async fn fetch(&self, url: &ValidatedUrl) -> MetadataResult<CollectedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if self.fail {
            return Err(MetadataError::Collection(format!(
                "Failed collecting metadata from '{url}': connection refused"
            )));
        }
        Ok(CollectedPage {
            headers: BTreeMap::from([("server".to_string(), "dummy".to_string())]),
            cookies: BTreeMap::from([("sessionid".to_string(), "abc".to_string())]),
            page_source: format!("<html>{url}</html>"),
        })
    }
}

/// In-memory store that counts calls.
#[derive(Default)]
pub(crate) struct CountingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    upserts: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for CountingStore {
    async fn get(&self, key: &str) -> MetadataResult<Option<MetadataRecord>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn upsert(&self, key: &str, record: MetadataRecord) -> MetadataResult<MetadataRecord> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(key, record).await
    }
}
