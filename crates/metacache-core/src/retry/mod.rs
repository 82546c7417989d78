//! Fixed-delay retry policy for establishing backing-store connections.
//!
//! The store retries *connecting* up to a budget; individual operations are
//! retried at most once by the connection manager, not by this loop.

mod policy;
mod run;

pub use policy::{RetryDecision, RetryPolicy};
pub use run::{run_with_retry, RetryExhausted};
