//! Connection lifecycle for a backing store that may come and go.
//!
//! State machine: `Disconnected → Connecting → Connected`, and back to
//! `Disconnected` when an operation fails on the current handle. Connecting
//! runs the retry policy (fixed delay, bounded attempts); operations get
//! exactly one forced reconnect-and-retry.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{BoxError, MetadataError, MetadataResult};
use crate::retry::{run_with_retry, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Opens handles to a backing store.
#[async_trait]
pub trait Connector: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    /// Open a handle, verify liveness and (re)create the unique key constraint.
    /// Must be idempotent: concurrent or repeated connects are allowed.
    async fn connect(&self) -> anyhow::Result<Self::Handle>;
}

struct Slot<H> {
    state: ConnectionState,
    handle: Option<H>,
    /// Bumped on every successful connect so stale failures can't evict a newer handle.
    generation: u64,
    /// Bumped whenever a connect round ends, successful or not.
    rounds: u64,
    /// Attempts and reason of the last round, if it exhausted the budget.
    last_failure: Option<(u32, String)>,
}

/// Shared, lazily (re)connected handle to a backing store.
pub struct ManagedConnection<C: Connector> {
    connector: C,
    policy: RetryPolicy,
    slot: Mutex<Slot<C::Handle>>,
    connect_gate: tokio::sync::Mutex<()>,
}

impl<C: Connector> ManagedConnection<C> {
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self {
            connector,
            policy,
            slot: Mutex::new(Slot {
                state: ConnectionState::Disconnected,
                handle: None,
                generation: 0,
                rounds: 0,
                last_failure: None,
            }),
            connect_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.lock_slot().state
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot<C::Handle>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> Option<(C::Handle, u64)> {
        let slot = self.lock_slot();
        match (slot.state, &slot.handle) {
            (ConnectionState::Connected, Some(h)) => Some((h.clone(), slot.generation)),
            _ => None,
        }
    }

    /// Returns the live handle and its generation, connecting first if needed.
    ///
    /// Connects are serialized; a caller that waited behind another connect
    /// round takes that round's outcome, the handle it produced or the
    /// `StoreUnavailable` it ended with, instead of spending a budget of its own.
    pub async fn handle(&self) -> MetadataResult<(C::Handle, u64)> {
        if let Some(current) = self.current() {
            return Ok(current);
        }

        let rounds_seen = self.lock_slot().rounds;
        let _gate = self.connect_gate.lock().await;
        if let Some(current) = self.current() {
            return Ok(current);
        }
        if let Some(err) = self.failure_since(rounds_seen) {
            return Err(err);
        }

        self.lock_slot().state = ConnectionState::Connecting;
        tracing::info!(
            max_attempts = self.policy.max_attempts,
            "connecting to metadata store"
        );

        let result = run_with_retry(&self.policy, |attempt| {
            tracing::debug!(attempt, "metadata store connect attempt");
            self.connector.connect()
        })
        .await;

        let mut slot = self.lock_slot();
        match result {
            Ok(handle) => {
                slot.rounds += 1;
                slot.last_failure = None;
                slot.generation += 1;
                slot.handle = Some(handle.clone());
                slot.state = ConnectionState::Connected;
                tracing::info!(generation = slot.generation, "metadata store connected");
                Ok((handle, slot.generation))
            }
            Err(exhausted) => {
                let reason = format!("{:#}", exhausted.last_error);
                slot.rounds += 1;
                slot.last_failure = Some((exhausted.attempts, reason.clone()));
                slot.handle = None;
                slot.state = ConnectionState::Disconnected;
                tracing::error!(
                    attempts = exhausted.attempts,
                    error = %reason,
                    "could not connect to metadata store"
                );
                Err(MetadataError::StoreUnavailable {
                    attempts: exhausted.attempts,
                    reason,
                })
            }
        }
    }

    /// The failure of a connect round that ended after `rounds_seen`, if the
    /// most recent round failed.
    fn failure_since(&self, rounds_seen: u64) -> Option<MetadataError> {
        let slot = self.lock_slot();
        if slot.rounds == rounds_seen {
            return None;
        }
        slot.last_failure
            .as_ref()
            .map(|(attempts, reason)| MetadataError::StoreUnavailable {
                attempts: *attempts,
                reason: reason.clone(),
            })
    }

    /// Drops the handle of `generation` if it is still the current one.
    pub fn invalidate(&self, generation: u64) {
        let mut slot = self.lock_slot();
        if slot.generation == generation && slot.state == ConnectionState::Connected {
            slot.handle = None;
            slot.state = ConnectionState::Disconnected;
            tracing::warn!(generation, "metadata store connection invalidated");
        }
    }

    /// Runs `op` on the current handle. On failure, invalidates that handle,
    /// reconnects and runs `op` once more; a second failure is returned.
    pub async fn run<T, E, F, Fut>(&self, operation: &'static str, mut op: F) -> MetadataResult<T>
    where
        F: FnMut(C::Handle) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError> + fmt::Display,
    {
        let (handle, generation) = self.handle().await?;
        match op(handle).await {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!(
                    operation,
                    error = %e,
                    "metadata store operation failed, reconnecting and retrying once"
                );
                self.invalidate(generation);
                let (handle, _) = self.handle().await?;
                op(handle)
                    .await
                    .map_err(|e| MetadataError::store(operation, e))
            }
        }
    }
}
