//! Metadata orchestrator: tolerant lookups and validated collect-and-store.

use std::sync::Arc;

use crate::collector::Collector;
use crate::error::MetadataResult;
use crate::record::MetadataRecord;
use crate::store::MetadataStore;
use crate::url_model::{normalize_url, validate_url};

/// Composes a store and a collector. Holds no cache of its own.
pub struct MetadataService {
    store: Arc<dyn MetadataStore>,
    collector: Arc<dyn Collector>,
}

impl MetadataService {
    pub fn new(store: Arc<dyn MetadataStore>, collector: Arc<dyn Collector>) -> Self {
        Self { store, collector }
    }

    /// Looks up the cached record for `raw_url`. No validation: any string
    /// is normalized into a key and looked up.
    pub async fn lookup(&self, raw_url: &str) -> MetadataResult<Option<MetadataRecord>> {
        let key = normalize_url(raw_url);
        self.store.get(&key).await
    }

    /// Validates `raw_url`, fetches it and stores a fresh record.
    ///
    /// An invalid URL fails before any network call; a failed fetch leaves
    /// the store untouched.
    pub async fn collect_and_store(&self, raw_url: &str) -> MetadataResult<MetadataRecord> {
        let validated = validate_url(raw_url)?;
        let key = normalize_url(validated.as_str());

        let page = self.collector.fetch(&validated).await?;
        let record = MetadataRecord::from_collected(validated.as_str(), &key, page);
        let stored = self.store.upsert(&key, record).await?;

        tracing::info!(url = %validated, key = %key, "metadata collected and stored");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataError;
    use crate::test_support::{CountingStore, FakeCollector};

    fn service(store: &Arc<CountingStore>, collector: &Arc<FakeCollector>) -> MetadataService {
        MetadataService::new(store.clone(), collector.clone())
    }

    #[tokio::test]
    async fn collect_and_store_persists_payload() {
        let store = Arc::new(CountingStore::default());
        let collector = Arc::new(FakeCollector::ok());
        let svc = service(&store, &collector);

        let rec = svc.collect_and_store("https://example.com").await.unwrap();
        assert_eq!(rec.original_url, "https://example.com/");
        assert_eq!(rec.normalized_url, "https://example.com/");
        assert_eq!(rec.headers["server"], "dummy");
        assert_eq!(rec.cookies["sessionid"], "abc");
        assert_eq!(rec.page_source, "<html>https://example.com/</html>");

        let stored = store.get("https://example.com/").await.unwrap();
        assert_eq!(stored, Some(rec));
    }

    #[tokio::test]
    async fn invalid_url_never_reaches_network_or_store() {
        let store = Arc::new(CountingStore::default());
        let collector = Arc::new(FakeCollector::ok());
        let svc = service(&store, &collector);

        let err = svc.collect_and_store("ftp://example.com").await.unwrap_err();
        assert!(matches!(err, MetadataError::InvalidUrl(_)));
        assert_eq!(collector.calls(), 0);
        assert_eq!(store.upserts(), 0);
    }

    #[tokio::test]
    async fn failed_fetch_writes_nothing() {
        let store = Arc::new(CountingStore::default());
        let collector = Arc::new(FakeCollector::failing());
        let svc = service(&store, &collector);

        let err = svc.collect_and_store("https://down.example.com").await.unwrap_err();
        assert!(matches!(err, MetadataError::Collection(_)));
        assert_eq!(collector.calls(), 1);
        assert_eq!(store.upserts(), 0);
        assert!(svc.lookup("https://down.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_normalizes_and_tolerates_garbage() {
        let store = Arc::new(CountingStore::default());
        let collector = Arc::new(FakeCollector::ok());
        let svc = service(&store, &collector);

        svc.collect_and_store("https://example.com/docs/").await.unwrap();
        let hit = svc.lookup("HTTPS://Example.com/docs#top").await.unwrap();
        assert_eq!(hit.unwrap().normalized_url, "https://example.com/docs");

        assert!(svc.lookup("not-a-url").await.unwrap().is_none());
        assert_eq!(collector.calls(), 1);
    }

    #[tokio::test]
    async fn recollection_overwrites() {
        let store = Arc::new(CountingStore::default());
        let collector = Arc::new(FakeCollector::ok());
        let svc = service(&store, &collector);

        let first = svc.collect_and_store("https://example.com").await.unwrap();
        let second = svc.collect_and_store("https://EXAMPLE.com/#again").await.unwrap();
        assert!(second.fetched_at >= first.fetched_at);
        assert_eq!(second.original_url, "https://example.com/#again");

        let stored = svc.lookup("https://example.com").await.unwrap().unwrap();
        assert_eq!(stored, second);
    }
}
