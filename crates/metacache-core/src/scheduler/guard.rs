//! RAII guard that removes a key from the in-flight set when dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

pub(super) type InFlightSet = Arc<Mutex<HashSet<String>>>;

/// Holds `key` in the in-flight set for as long as it lives. Dropping it
/// (job finished, failed, panicked or was cancelled) releases the key.
pub(super) struct InFlightGuard {
    set: InFlightSet,
    key: String,
}

impl InFlightGuard {
    /// Inserts `key` and returns a guard, or `None` if it is already in flight.
    pub(super) fn acquire(set: &InFlightSet, key: &str) -> Option<Self> {
        let mut keys = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.to_string()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            key: key.to_string(),
        })
    }

    pub(super) fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
