//! Metadata records and the collector's raw output.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a collector returns for one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedPage {
    /// Response headers of the final response, names as received, last value wins.
    pub headers: BTreeMap<String, String>,
    /// Cookies set by the final response.
    pub cookies: BTreeMap<String, String>,
    /// Response body, already capped to the configured byte limit.
    pub page_source: String,
}

/// A cached metadata document, keyed by `normalized_url`.
///
/// Serialized as-is in API responses; the store's internal row id never
/// appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub original_url: String,
    pub normalized_url: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub page_source: String,
    pub fetched_at: DateTime<Utc>,
}

impl MetadataRecord {
    /// Builds a fresh record from a collection, stamped with the current time.
    pub fn from_collected(original_url: &str, normalized_url: &str, page: CollectedPage) -> Self {
        Self {
            original_url: original_url.to_string(),
            normalized_url: normalized_url.to_string(),
            headers: page.headers,
            cookies: page.cookies,
            page_source: page.page_source,
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> CollectedPage {
        CollectedPage {
            headers: BTreeMap::from([("Content-Type".to_string(), "text/html".to_string())]),
            cookies: BTreeMap::from([("sessionid".to_string(), "abc".to_string())]),
            page_source: "<html></html>".to_string(),
        }
    }

    #[test]
    fn from_collected_stamps_now() {
        let before = Utc::now();
        let rec = MetadataRecord::from_collected("https://example.com/", "https://example.com/", page());
        assert!(rec.fetched_at >= before);
        assert!(rec.fetched_at <= Utc::now());
        assert_eq!(rec.headers["Content-Type"], "text/html");
        assert_eq!(rec.cookies["sessionid"], "abc");
    }

    #[test]
    fn json_shape_has_exactly_the_record_fields() {
        let rec = MetadataRecord::from_collected("https://Example.com/", "https://example.com/", page());
        let value = serde_json::to_value(&rec).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "cookies",
                "fetched_at",
                "headers",
                "normalized_url",
                "original_url",
                "page_source"
            ]
        );
        let ts = obj["fetched_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
