//! URL helpers for request templates.

use std::collections::BTreeMap;
use url::Url;

/// Prepend `https://` when `url` has no scheme.
pub fn fix_prefix(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Host of `url` without a leading `www.`; empty when it cannot be parsed.
///
/// # Examples
///
/// ```
/// use droplift_custom::urls::host_name;
///
/// assert_eq!(host_name("https://www.example.com/upload"), "example.com");
/// assert_eq!(host_name("i.example.com/api"), "i.example.com");
/// assert_eq!(host_name(""), "");
/// ```
pub fn host_name(url: &str) -> String {
    let fixed = fix_prefix(url);
    if fixed.is_empty() {
        return String::new();
    }
    Url::parse(&fixed)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

/// Index of the `?` that starts the query, ignoring any inside placeholders.
fn query_start(url: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in url.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '?' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split `url` into the part before the query and its decoded pairs.
///
/// A bare key (`?flag`) maps to the empty string.
pub fn split_query(url: &str) -> (String, Vec<(String, String)>) {
    let Some(start) = query_start(url) else {
        return (url.to_string(), Vec::new());
    };
    let base = url[..start].to_string();
    let query = &url[start + 1..];
    let query = query.split('#').next().unwrap_or_default();

    let pairs = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .filter(|(key, _)| !key.is_empty())
        .collect();
    (base, pairs)
}

fn decode(text: &str) -> String {
    urlencoding::decode(text)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| text.to_string())
}

/// Append `parameters` to `url` as a percent-encoded query string.
pub fn create_query_string(url: &str, parameters: &BTreeMap<String, String>) -> String {
    if parameters.is_empty() {
        return url.to_string();
    }
    let query = parameters
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                urlencoding::encode(key).into_owned()
            } else {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            }
        })
        .collect::<Vec<_>>()
        .join("&");
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}
