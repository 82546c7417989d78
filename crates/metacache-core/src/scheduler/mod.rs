//! Single-flight background job runner.
//!
//! At most one job per key runs at a time. Admission is decided against the
//! in-flight set alone; a fixed pool of worker permits then bounds how many
//! admitted jobs execute concurrently, the rest wait in FIFO order.

mod guard;

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;

use self::guard::{InFlightGuard, InFlightSet};

/// Cheap to clone; clones share the in-flight set and the worker pool.
#[derive(Clone)]
pub struct DedupScheduler {
    in_flight: InFlightSet,
    workers: Arc<Semaphore>,
    pool_size: usize,
}

impl DedupScheduler {
    /// `workers` is the number of jobs allowed to run at once (at least 1).
    pub fn new(workers: usize) -> Self {
        let pool_size = workers.max(1);
        Self {
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            workers: Arc::new(Semaphore::new(pool_size)),
            pool_size,
        }
    }

    /// Admits `job` for `key` unless a job for `key` is already in flight.
    ///
    /// Returns `true` if the job was admitted and spawned, `false` if it was
    /// dropped unrun. The return value says nothing about how the job ends;
    /// jobs report their own failures. Must be called within a Tokio runtime.
    pub fn submit_once<F>(&self, key: &str, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(guard) = InFlightGuard::acquire(&self.in_flight, key) else {
            tracing::debug!(key, "background job already in flight");
            return false;
        };

        let workers = Arc::clone(&self.workers);
        tokio::spawn(async move {
            let Ok(_permit) = workers.acquire_owned().await else {
                return;
            };
            tracing::debug!(key = guard.key(), "background job started");
            job.await;
            tracing::debug!(key = guard.key(), "background job finished");
        });
        true
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn wait_idle(s: &DedupScheduler) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while s.in_flight_count() > 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("scheduler did not go idle");
    }

    #[tokio::test]
    async fn second_submission_while_running_is_rejected() {
        let s = DedupScheduler::new(4);
        let runs = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let r = Arc::clone(&runs);
        assert!(s.submit_once("https://example.com/", async move {
            r.fetch_add(1, Ordering::SeqCst);
            let _ = release_rx.await;
        }));

        let r = Arc::clone(&runs);
        assert!(!s.submit_once("https://example.com/", async move {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(s.is_in_flight("https://example.com/"));

        release_tx.send(()).unwrap();
        wait_idle(&s).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Released: a new submission is admitted again.
        let r = Arc::clone(&runs);
        assert!(s.submit_once("https://example.com/", async move {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        wait_idle(&s).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn panicking_job_still_releases_key() {
        let s = DedupScheduler::new(1);
        assert!(s.submit_once("k", async {
            panic!("job blew up");
        }));
        wait_idle(&s).await;
        assert!(!s.is_in_flight("k"));
        assert!(s.submit_once("k", async {}));
        wait_idle(&s).await;
    }

    #[tokio::test]
    async fn different_keys_are_admitted_independently() {
        let s = DedupScheduler::new(2);
        let (tx_a, rx_a) = oneshot::channel::<()>();
        let (tx_b, rx_b) = oneshot::channel::<()>();
        assert!(s.submit_once("a", async move {
            let _ = rx_a.await;
        }));
        assert!(s.submit_once("b", async move {
            let _ = rx_b.await;
        }));
        assert_eq!(s.in_flight_count(), 2);
        tx_a.send(()).unwrap();
        tx_b.send(()).unwrap();
        wait_idle(&s).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn worker_pool_bounds_concurrency() {
        let s = DedupScheduler::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..6 {
            let (running, peak, done) = (Arc::clone(&running), Arc::clone(&peak), Arc::clone(&done));
            assert!(s.submit_once(&format!("job-{i}"), async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }
        // Queued jobs count as in flight: admission ignores pool depth.
        assert_eq!(s.in_flight_count(), 6);

        wait_idle(&s).await;
        assert_eq!(done.load(Ordering::SeqCst), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
