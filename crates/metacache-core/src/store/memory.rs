//! Process-local store used by tests and by `serve --memory`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::MetadataResult;
use crate::record::MetadataRecord;

use super::MetadataStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, MetadataRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get(&self, key: &str) -> MetadataResult<Option<MetadataRecord>> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn upsert(&self, key: &str, record: MetadataRecord) -> MetadataResult<MetadataRecord> {
        let mut stored = record;
        stored.normalized_url = key.to_string();
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), stored.clone());
        Ok(stored)
    }
}
