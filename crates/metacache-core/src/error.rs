//! Error taxonomy shared by the core components.
//!
//! Bootstrapping code (config loading, logging, CLI) uses `anyhow`; everything
//! a request handler has to map to a status code goes through `MetadataError`.

use thiserror::Error;

/// Boxed error carried by [`MetadataError::Store`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias for results carrying a [`MetadataError`].
pub type MetadataResult<T> = Result<T, MetadataError>;

#[derive(Debug, Error)]
pub enum MetadataError {
    /// Malformed URL or disallowed scheme. Reported synchronously, never retried.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The outbound fetch failed or returned a non-success status.
    #[error("{0}")]
    Collection(String),

    /// Connect budget for the backing store exhausted.
    #[error("metadata store unavailable after {attempts} connect attempt(s): {reason}")]
    StoreUnavailable { attempts: u32, reason: String },

    /// A store operation failed again after the forced reconnect.
    #[error("metadata store {operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MetadataError {
    pub(crate) fn store(operation: &'static str, source: impl Into<BoxError>) -> Self {
        MetadataError::Store {
            operation,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_unavailable_message_names_attempts() {
        let e = MetadataError::StoreUnavailable {
            attempts: 3,
            reason: "unable to open database file".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("3 connect attempt(s)"));
        assert!(msg.contains("unable to open database file"));
    }

    #[test]
    fn store_error_keeps_source() {
        use std::error::Error as _;
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let e = MetadataError::store("get", io);
        assert_eq!(e.to_string(), "metadata store get failed: disk gone");
        assert!(e.source().is_some());
    }
}
