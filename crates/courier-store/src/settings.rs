//! Typed settings over the key-value store.
//!
//! Reads never fail: a missing key, a malformed value, or a store error all
//! fall back to the setting's default, so a half-written store cannot take
//! the fetch path down with it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{KvStore, KvStoreExt, StoreError};

/// Default upstream origin for the URL rewrite, when none is configured.
pub const DEFAULT_REWRITE_URL: &str = "http://127.0.0.1:11434";

const KEY_CUSTOM_HEADERS: &str = "customHeaders";
const KEY_URL_REWRITE_ENABLED: &str = "urlRewriteEnabled";
const KEY_REWRITE_URL: &str = "rewriteUrl";

/// One stored header entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPair {
    pub key: String,
    pub value: String,
}

/// Typed accessors for the assistant's persisted settings.
pub struct Settings<S> {
    store: Arc<S>,
}

impl<S> Clone for Settings<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KvStore> Settings<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Stored custom headers, flattened to a plain map. Empty when unset
    /// or malformed.
    pub async fn custom_headers(&self) -> BTreeMap<String, String> {
        match self.store.get_as::<Vec<HeaderPair>>(KEY_CUSTOM_HEADERS).await {
            Ok(Some(pairs)) => pairs.into_iter().map(|p| (p.key, p.value)).collect(),
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "custom headers unreadable, using none");
                BTreeMap::new()
            }
        }
    }

    pub async fn set_custom_headers(&self, headers: &[HeaderPair]) -> Result<(), StoreError> {
        self.store.set_as(KEY_CUSTOM_HEADERS, &headers).await
    }

    pub async fn url_rewrite_enabled(&self) -> bool {
        self.store
            .get_as::<bool>(KEY_URL_REWRITE_ENABLED)
            .await
            .ok()
            .flatten()
            .unwrap_or(false)
    }

    pub async fn set_url_rewrite_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.store.set_as(KEY_URL_REWRITE_ENABLED, &enabled).await
    }

    /// Configured rewrite target. Blank or unset falls back to the default.
    pub async fn rewrite_url(&self) -> String {
        match self.store.get_as::<String>(KEY_REWRITE_URL).await {
            Ok(Some(url)) if !url.trim().is_empty() => url,
            _ => DEFAULT_REWRITE_URL.to_string(),
        }
    }

    pub async fn set_rewrite_url(&self, url: &str) -> Result<(), StoreError> {
        self.store.set_as(KEY_REWRITE_URL, &url).await
    }
}
