//! Settings-aware fetch layer.
//!
//! Sits between callers and the proxy client: folds the persisted custom
//! headers into every request and applies the configured origin rewrite
//! before the request crosses the transport. Stored custom headers overlay
//! the request's own on a name clash; the rewrite only touches URLs aimed
//! at the default upstream origin, so requests to other hosts pass through
//! untouched.

use courier_core::{FetchOptions, HeaderInput, ProxyError};
use courier_store::settings::{Settings, DEFAULT_REWRITE_URL};
use courier_store::KvStore;

use crate::client::{DirectFetch, ProxyClient};
use crate::response::ProxyResponse;
use crate::transport::Transport;
use crate::util::{clean_url, origin};

pub struct Fetcher<T, D, S> {
    client: ProxyClient<T, D>,
    settings: Settings<S>,
}

impl<T: Transport, D: DirectFetch, S: KvStore> Fetcher<T, D, S> {
    pub fn new(client: ProxyClient<T, D>, settings: Settings<S>) -> Self {
        Self { client, settings }
    }

    pub async fn fetch(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<ProxyResponse, ProxyError> {
        let url = self.rewrite_url(url).await;
        let options = self.apply_custom_headers(options).await;
        self.client.fetch(&url, options).await
    }

    async fn apply_custom_headers(&self, options: FetchOptions) -> FetchOptions {
        merge_headers(self.settings.custom_headers().await, options)
    }

    /// Redirect requests aimed at the default upstream origin to the
    /// configured one, keeping path and query intact.
    async fn rewrite_url(&self, url: &str) -> String {
        if !self.settings.url_rewrite_enabled().await {
            return url.to_string();
        }
        let target = self.settings.rewrite_url().await;
        rewrite_origin(url, DEFAULT_REWRITE_URL, &target)
    }
}

/// Merge stored custom headers over the request's own headers. On a name
/// clash the stored value wins: the whole point of a configured header is
/// to apply regardless of what individual call sites set.
fn merge_headers(
    custom: std::collections::BTreeMap<String, String>,
    mut options: FetchOptions,
) -> FetchOptions {
    if custom.is_empty() {
        return options;
    }
    let mut merged = options
        .headers
        .as_ref()
        .map(HeaderInput::normalize)
        .unwrap_or_default();
    merged.extend(custom);
    options.headers = Some(HeaderInput::Canonical(merged));
    options
}

fn rewrite_origin(url: &str, from: &str, to: &str) -> String {
    let (Some(url_origin), Some(from_origin)) = (origin(url), origin(from)) else {
        return url.to_string();
    };
    if url_origin != from_origin {
        return url.to_string();
    }
    match url::Url::parse(url) {
        Ok(parsed) => {
            let mut rewritten = clean_url(to).to_string();
            rewritten.push_str(parsed.path());
            if let Some(query) = parsed.query() {
                rewritten.push('?');
                rewritten.push_str(query);
            }
            rewritten
        }
        Err(_) => url.to_string(),
    }
}
