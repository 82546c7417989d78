//! libcurl-backed collector.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ServiceConfig;
use crate::error::{MetadataError, MetadataResult};
use crate::record::CollectedPage;
use crate::url_model::ValidatedUrl;

use super::parse::{decode_body, parse_header_lines, push_header_line};
use super::Collector;

const MAX_REDIRECTS: u32 = 10;
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("metacache/", env!("CARGO_PKG_VERSION"));

/// GETs pages with libcurl, following redirects, within a hard timeout and
/// a hard body cap.
#[derive(Debug, Clone)]
pub struct CurlCollector {
    timeout: Duration,
    max_body_bytes: usize,
}

impl CurlCollector {
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Self {
        Self {
            timeout,
            max_body_bytes,
        }
    }

    pub fn from_config(cfg: &ServiceConfig) -> Self {
        Self::new(cfg.http_timeout(), cfg.http_max_body_bytes)
    }
}

#[async_trait]
impl Collector for CurlCollector {
    async fn fetch(&self, url: &ValidatedUrl) -> MetadataResult<CollectedPage> {
        let url = url.as_str().to_string();
        let timeout = self.timeout;
        let max_body_bytes = self.max_body_bytes;

        // libcurl's easy interface blocks; keep it off the async workers.
        tokio::task::spawn_blocking(move || fetch_blocking(&url, timeout, max_body_bytes))
            .await
            .map_err(|e| MetadataError::Collection(format!("collector task failed: {e}")))?
    }
}

fn fetch_blocking(url: &str, timeout: Duration, max_body_bytes: usize) -> MetadataResult<CollectedPage> {
    let fail = |e: curl::Error| {
        MetadataError::Collection(format!("Failed collecting metadata from '{url}': {e}"))
    };

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(fail)?;
    easy.get(true).map_err(fail)?;
    easy.follow_location(true).map_err(fail)?;
    easy.max_redirections(MAX_REDIRECTS).map_err(fail)?;
    easy.connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT)).map_err(fail)?;
    easy.timeout(timeout).map_err(fail)?;
    // Empty string = every encoding libcurl can decode.
    easy.accept_encoding("").map_err(fail)?;
    easy.useragent(USER_AGENT).map_err(fail)?;

    let mut header_lines: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();
    let mut truncated = false;

    let outcome = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                push_header_line(&mut header_lines, data);
                true
            })
            .map_err(fail)?;
        transfer
            .write_function(|data| {
                let room = max_body_bytes.saturating_sub(body.len());
                if data.len() <= room {
                    body.extend_from_slice(data);
                    Ok(data.len())
                } else {
                    // Cap reached: keep what fits and stop the transfer.
                    body.extend_from_slice(&data[..room]);
                    truncated = true;
                    Ok(0)
                }
            })
            .map_err(fail)?;
        transfer.perform()
    };

    match outcome {
        Ok(()) => {}
        Err(e) if truncated && e.is_write_error() => {
            tracing::debug!(url, max_body_bytes, "page source truncated at byte cap");
        }
        Err(e) => return Err(fail(e)),
    }

    let code = easy.response_code().map_err(fail)?;
    if !(200..300).contains(&code) {
        return Err(MetadataError::Collection(format!(
            "Failed collecting metadata from '{url}': server returned HTTP {code}"
        )));
    }

    let (headers, cookies) = parse_header_lines(&header_lines);
    tracing::debug!(
        url,
        status = code,
        headers = headers.len(),
        cookies = cookies.len(),
        body_bytes = body.len(),
        truncated,
        "page collected"
    );

    Ok(CollectedPage {
        headers,
        cookies,
        page_source: decode_body(&body, max_body_bytes),
    })
}
