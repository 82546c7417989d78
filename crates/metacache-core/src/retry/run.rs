//! Retry loop: run an async closure until success or the budget is spent.

use std::fmt;
use std::future::Future;

use super::policy::{RetryDecision, RetryPolicy};

/// Every attempt failed; carries the last error.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Runs `f` (given the 1-based attempt number) until it succeeds or the
/// policy says stop, sleeping the policy delay between attempts.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut f: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt) {
                RetryDecision::NoRetry => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    })
                }
                RetryDecision::RetryAfter(d) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "attempt failed, retrying in {:?}",
                        d
                    );
                    tokio::time::sleep(d).await;
                    attempt += 1;
                }
            },
        }
    }
}
