//! Shape validation for URLs that are about to be fetched.

use std::fmt;

use url::Url;

use crate::error::{MetadataError, MetadataResult};

/// Longest URL accepted for collection.
pub const MAX_URL_LENGTH: usize = 2083;

/// An absolute http(s) URL in its standard serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

impl ValidatedUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Parses `raw` as an absolute URL and checks it may be collected.
///
/// Does not normalize: `"HTTPS://Example.com"` validates to
/// `"https://example.com/"` (the parser's standard form) but keeps trailing
/// slashes and fragments.
pub fn validate_url(raw: &str) -> MetadataResult<ValidatedUrl> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(MetadataError::InvalidUrl(format!(
            "URL is {} characters long; at most {} are allowed",
            raw.len(),
            MAX_URL_LENGTH
        )));
    }

    let parsed = Url::parse(raw)
        .map_err(|e| MetadataError::InvalidUrl(format!("'{raw}' is not an absolute URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(MetadataError::InvalidUrl(format!(
                "scheme '{other}' is not supported; only http and https are allowed"
            )))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(MetadataError::InvalidUrl(format!("'{raw}' has no host")));
    }

    Ok(ValidatedUrl(parsed))
}
