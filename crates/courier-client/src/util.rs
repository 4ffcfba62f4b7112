//! URL and header helpers shared by the fetch layers.

use std::collections::BTreeMap;

/// Strip a single trailing slash. Upstream endpoints are joined as
/// `base + "/path"`, so a trailing slash would double up.
pub fn clean_url(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Scheme+authority portion of a URL, if it parses. Two URLs with equal
/// origins point at the same server.
pub fn origin(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    Some(parsed.origin().ascii_serialization())
}

/// Flatten a live `reqwest` header map into the plain map that crosses the
/// transport. Non-UTF-8 values are dropped.
pub fn headers_from_reqwest(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
