//! Request options and the transport-safe serialized form.
//!
//! Callers describe a request with [`FetchOptions`], which may hold live
//! handles (a [`CancelSignal`]) and headers in whatever shape is convenient.
//! [`serialize_options`] flattens that into [`SerializableOptions`]: plain
//! data only, headers normalized to one string map, cancellation dropped —
//! the form that crosses the context boundary.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Request body. Untagged on the wire: a JSON string or a byte array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Body {
    Text(String),
    Bytes(Vec<u8>),
}

/// Header shapes accepted from callers.
///
/// All three normalize to the same plain string map; the transport never
/// sees anything else.
#[derive(Debug, Clone)]
pub enum HeaderInput {
    Map(HashMap<String, String>),
    Pairs(Vec<(String, String)>),
    Canonical(BTreeMap<String, String>),
}

impl HeaderInput {
    /// Flatten into the one transport-safe representation.
    /// Duplicate keys resolve to the last occurrence.
    pub fn normalize(&self) -> BTreeMap<String, String> {
        match self {
            HeaderInput::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            HeaderInput::Pairs(pairs) => pairs.iter().cloned().collect(),
            HeaderInput::Canonical(map) => map.clone(),
        }
    }
}

impl From<HashMap<String, String>> for HeaderInput {
    fn from(map: HashMap<String, String>) -> Self {
        HeaderInput::Map(map)
    }
}

impl From<Vec<(String, String)>> for HeaderInput {
    fn from(pairs: Vec<(String, String)>) -> Self {
        HeaderInput::Pairs(pairs)
    }
}

impl From<BTreeMap<String, String>> for HeaderInput {
    fn from(map: BTreeMap<String, String>) -> Self {
        HeaderInput::Canonical(map)
    }
}

/// Clonable cancellation handle.
///
/// Never crosses the transport — the serializer drops it. Proxied streams
/// cancel through the channel instead (closing the body stream closes the
/// channel); only the direct fallback path honors this handle.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            // Re-check after registering: cancel() may have landed in between.
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Caller-facing request descriptor.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: Option<String>,
    pub headers: Option<HeaderInput>,
    pub body: Option<Body>,
    pub credentials: Option<String>,
    pub referrer_policy: Option<String>,
    pub stream: bool,
    pub cancel: Option<CancelSignal>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn headers(mut self, headers: impl Into<HeaderInput>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn credentials(mut self, mode: &str) -> Self {
        self.credentials = Some(mode.to_string());
        self
    }

    pub fn referrer_policy(mut self, policy: &str) -> Self {
        self.referrer_policy = Some(policy.to_string());
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }
}

/// The transport-safe form of [`FetchOptions`]: primitive data only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializableOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer_policy: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

/// Convert caller options into the transport-safe form.
///
/// Pure transform: copies every field, normalizes headers, and drops the
/// cancellation handle (not transferable across the context boundary).
/// Total over well-formed input — this never fails.
pub fn serialize_options(options: &FetchOptions) -> SerializableOptions {
    SerializableOptions {
        method: options.method.clone(),
        headers: options.headers.as_ref().map(HeaderInput::normalize),
        body: options.body.clone(),
        credentials: options.credentials.clone(),
        referrer_policy: options.referrer_policy.clone(),
        stream: options.stream,
    }
}
