//! Canonical cache keys.

use url::Url;

/// Produces the cache key for `raw`.
///
/// - scheme and host lowercased
/// - empty path becomes `/`, trailing slashes on other paths are stripped
/// - fragment and `;params` on the last path segment dropped
/// - query kept, in the URL parser's percent-encoded form
/// - dot segments resolved and default ports dropped, as the URL parser does
///
/// Pure: the same input always yields the same key. Strings the URL parser
/// rejects are normalized by a lenient split so lookups never fail.
///
/// # Examples
///
/// - `normalize_url("HTTPS://Example.com/path/?a=1#section")` → `"https://example.com/path?a=1"`
/// - `normalize_url("https://example.com")` → `"https://example.com/"`
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) if !parsed.cannot_be_a_base() => normalize_parsed(parsed),
        _ => normalize_lenient(raw),
    }
}

fn normalize_parsed(mut url: Url) -> String {
    url.set_fragment(None);

    // Special schemes already come back with a lowercase host; opaque hosts don't.
    if let Some(host) = url.host_str() {
        if host.bytes().any(|b| b.is_ascii_uppercase()) {
            let lower = host.to_ascii_lowercase();
            let _ = url.set_host(Some(&lower));
        }
    }

    let path = canonical_path(url.path());
    url.set_path(&path);
    url.into()
}

fn normalize_lenient(raw: &str) -> String {
    let without_fragment = raw.split_once('#').map_or(raw, |(head, _)| head);
    let (rest, query) = match without_fragment.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (without_fragment, None),
    };
    let (scheme, rest) = split_scheme(rest);
    let (netloc, path) = match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find('/').unwrap_or(after.len());
            (Some(&after[..end]), &after[end..])
        }
        None => (None, rest),
    };

    let mut out = String::with_capacity(raw.len() + 1);
    if let Some(scheme) = scheme {
        out.push_str(&scheme.to_ascii_lowercase());
        out.push(':');
    }
    if let Some(netloc) = netloc {
        out.push_str("//");
        out.push_str(&netloc.to_ascii_lowercase());
    }
    out.push_str(&canonical_path(path));
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        out.push('?');
        out.push_str(query);
    }
    out
}

/// Splits off a leading `scheme:` if the prefix is a syntactically valid scheme.
fn split_scheme(s: &str) -> (Option<&str>, &str) {
    if let Some((head, tail)) = s.split_once(':') {
        let valid = head.starts_with(|c: char| c.is_ascii_alphabetic())
            && head
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if valid {
            return (Some(head), tail);
        }
    }
    (None, s)
}

fn canonical_path(path: &str) -> String {
    let last_segment_start = path.rfind('/').map_or(0, |i| i + 1);
    let path = match path[last_segment_start..].find(';') {
        Some(i) => &path[..last_segment_start + i],
        None => path,
    };
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
