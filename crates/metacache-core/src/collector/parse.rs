//! Turn raw response header lines and body bytes into a `CollectedPage`'s parts.

use std::collections::BTreeMap;

/// Records one raw header line as delivered by the transfer.
///
/// A status line starts a new response (redirect hop or 100-continue), so
/// lines from earlier responses are discarded. Non-UTF-8 bytes are replaced,
/// never cause the line to be dropped.
pub(crate) fn push_header_line(lines: &mut Vec<String>, raw: &[u8]) {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end();
    if line.starts_with("HTTP/") {
        lines.clear();
    } else if !line.is_empty() {
        lines.push(line.to_string());
    }
}

/// Splits header lines into a header map and a cookie map.
///
/// Header names keep the case they arrived with; repeated names (compared
/// case-insensitively) keep the last value. Cookies come from `Set-Cookie`,
/// taking the `name=value` pair before the first attribute.
pub(crate) fn parse_header_lines(
    lines: &[String],
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let mut headers = BTreeMap::new();
    let mut cookies = BTreeMap::new();

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() {
            continue;
        }

        if let Some(existing) = headers
            .keys()
            .find(|k: &&String| k.eq_ignore_ascii_case(name))
            .cloned()
        {
            headers.remove(&existing);
        }
        headers.insert(name.to_string(), value.to_string());

        if name.eq_ignore_ascii_case("set-cookie") {
            let pair = value.split(';').next().unwrap_or("");
            if let Some((cookie, cookie_value)) = pair.split_once('=') {
                let cookie = cookie.trim();
                if !cookie.is_empty() {
                    cookies.insert(cookie.to_string(), cookie_value.trim().to_string());
                }
            }
        }
    }

    (headers, cookies)
}

/// Decodes the body as UTF-8 (lossy) without exceeding `max_bytes`.
pub(crate) fn decode_body(body: &[u8], max_bytes: usize) -> String {
    let capped = &body[..body.len().min(max_bytes)];
    let mut text = String::from_utf8_lossy(capped).into_owned();
    if text.len() > max_bytes {
        let mut end = max_bytes;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
