//! Persistent metadata repository keyed by normalized URL.
//!
//! `MetadataStore` is the capability the orchestrator depends on; the SQLite
//! implementation owns a managed connection that reconnects on failure, and
//! `MemoryStore` backs tests and ephemeral servers.

mod connection;
mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::error::MetadataResult;
use crate::record::MetadataRecord;

pub use connection::{ConnectionState, Connector, ManagedConnection};
pub use memory::MemoryStore;
pub use sqlite::{SqliteConnector, SqliteStore, SqliteStoreSettings};

/// Get/upsert-by-key capability.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Returns the record stored under `key`, if any.
    async fn get(&self, key: &str) -> MetadataResult<Option<MetadataRecord>>;

    /// Stores `record` under `key`, replacing any previous record completely.
    /// Returns the stored value.
    async fn upsert(&self, key: &str, record: MetadataRecord) -> MetadataResult<MetadataRecord>;
}
