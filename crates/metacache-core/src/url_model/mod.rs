//! URL validation and cache-key normalization.
//!
//! Validation enforces shape (absolute, http/https, has a host) and is applied
//! before any network fetch. Normalization derives the stable cache key and
//! accepts anything, so the read path never rejects a lookup.

mod normalize;
mod validate;

pub use normalize::normalize_url;
pub use validate::{validate_url, ValidatedUrl, MAX_URL_LENGTH};
