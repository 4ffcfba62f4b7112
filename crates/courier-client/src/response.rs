//! Response envelope and the channel-backed byte stream.
//!
//! One envelope type covers both transports. Buffered responses carry their
//! whole payload and answer `text()`/`json()`/`bytes()`; streamed responses
//! carry a live `body` stream instead, and the buffered accessors fail —
//! the payload is consumed from the stream, never re-buffered.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};

use courier_core::{FetchReply, ProxyError};

/// Lazily-consumed response body.
///
/// Chunks are buffered unbounded as they arrive from the executor — the
/// consumer's pull rate does not pace the producer. Dropping the stream (or
/// calling [`ByteStream::cancel`]) fires a one-shot cancel signal that the
/// owning driver translates into exactly one channel close, telling the
/// executor to stop producing.
pub struct ByteStream {
    chunks: mpsc::UnboundedReceiver<Result<Bytes, ProxyError>>,
    cancel: Option<oneshot::Sender<()>>,
}

impl ByteStream {
    pub(crate) fn new(
        chunks: mpsc::UnboundedReceiver<Result<Bytes, ProxyError>>,
        cancel: oneshot::Sender<()>,
    ) -> Self {
        Self {
            chunks,
            cancel: Some(cancel),
        }
    }

    /// Pump an arbitrary byte stream into a `ByteStream`. Used by the
    /// direct-fetch path; cancellation stops the pump task.
    pub fn spawn_from<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            futures::pin_mut!(stream);
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    next = stream.next() => match next {
                        Some(Ok(chunk)) => {
                            if tx.send(Ok(chunk)).is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            let _ = tx.send(Err(ProxyError::Direct(e.to_string())));
                            break;
                        }
                        None => break,
                    },
                }
            }
        });
        Self::new(rx, cancel_tx)
    }

    /// Stop the stream and signal the producer to stop. Dropping the stream
    /// has the same effect.
    pub fn cancel(mut self) {
        self.fire_cancel();
    }

    /// Read the stream to completion into one buffer.
    pub async fn drain(mut self) -> Result<Vec<u8>, ProxyError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    fn fire_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

impl Drop for ByteStream {
    fn drop(&mut self) {
        self.fire_cancel();
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes, ProxyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().chunks.poll_recv(cx)
    }
}

/// Response-like object handed to callers, abstracting over buffered and
/// streamed transports.
pub struct ProxyResponse {
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub url: String,
    /// Present for streamed responses only.
    pub body: Option<ByteStream>,
    text: Option<String>,
}

// Manual: `ByteStream` has nothing printable, so the body renders as a
// presence flag and the buffered text is elided.
impl std::fmt::Debug for ProxyResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyResponse")
            .field("ok", &self.ok)
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("url", &self.url)
            .field("headers", &self.headers.len())
            .field("streamed", &self.body.is_some())
            .finish()
    }
}

impl ProxyResponse {
    /// Envelope from a buffered executor reply. Missing status fields
    /// default to 200 / "OK" — early executors reported success alone.
    pub fn from_reply(reply: FetchReply, request_url: &str) -> Self {
        let status = reply.status.unwrap_or(200);
        Self {
            ok: (200..=299).contains(&status),
            status,
            status_text: reply.status_text.unwrap_or_else(|| "OK".to_string()),
            headers: reply.headers.unwrap_or_default(),
            url: reply.url.unwrap_or_else(|| request_url.to_string()),
            body: None,
            text: Some(reply.text.unwrap_or_default()),
        }
    }

    /// Buffered envelope from already-materialized parts (direct path).
    pub fn buffered(
        status: u16,
        status_text: String,
        headers: BTreeMap<String, String>,
        url: String,
        text: String,
    ) -> Self {
        Self {
            ok: (200..=299).contains(&status),
            status,
            status_text,
            headers,
            url,
            body: None,
            text: Some(text),
        }
    }

    /// Streamed envelope. Resolves as soon as metadata arrives; the body
    /// drains on its own schedule.
    pub fn streamed(
        status: u16,
        status_text: String,
        headers: BTreeMap<String, String>,
        url: String,
        body: ByteStream,
    ) -> Self {
        Self {
            ok: (200..=299).contains(&status),
            status,
            status_text,
            headers,
            url,
            body: Some(body),
            text: None,
        }
    }

    /// Whole payload as text. Fails on streamed responses.
    pub async fn text(&self) -> Result<String, ProxyError> {
        match &self.text {
            Some(text) => Ok(text.clone()),
            None => Err(ProxyError::UnsupportedOnStream("text()")),
        }
    }

    /// Parse the payload as JSON. Fails on streamed responses.
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T, ProxyError> {
        match &self.text {
            Some(text) => Ok(serde_json::from_str(text)?),
            None => Err(ProxyError::UnsupportedOnStream("json()")),
        }
    }

    /// Payload re-encoded to bytes from the buffered text. Lossy for true
    /// binary payloads that were not valid text. Fails on streamed
    /// responses.
    pub async fn bytes(&self) -> Result<Vec<u8>, ProxyError> {
        match &self.text {
            Some(text) => Ok(text.clone().into_bytes()),
            None => Err(ProxyError::UnsupportedOnStream("bytes()")),
        }
    }

    /// Not implemented on either transport.
    pub async fn blob(&self) -> Result<Bytes, ProxyError> {
        Err(ProxyError::Unimplemented("blob()"))
    }
}
