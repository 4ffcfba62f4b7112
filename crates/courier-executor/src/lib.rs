//! courier-executor — the privileged side of the fetch proxy.
//!
//! Performs the actual HTTP requests on behalf of restricted callers and
//! answers in wire form: a [`FetchReply`] for buffered requests, a
//! [`StreamEvent`] sequence for streamed ones. Failures never escape as
//! errors here — they become `success: false` replies or `Error` events,
//! because the caller on the other side of the transport can only consume
//! wire messages.

pub mod memory;
pub mod unix;

pub use memory::MemoryTransport;

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;

use courier_client::util::headers_from_reqwest;
use courier_core::{Body, CourierConfig, FetchReply, SerializableOptions, StreamEvent};

#[derive(Clone)]
pub struct FetchExecutor {
    client: reqwest::Client,
}

impl FetchExecutor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Build an executor honoring the configured user agent, redirect
    /// limit, and per-request timeout.
    pub fn from_config(config: &CourierConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.executor.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(
                config.executor.max_redirects as usize,
            ));
        if config.daemon.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.daemon.request_timeout_secs));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Perform a buffered fetch. Total: failures come back as an
    /// unsuccessful reply carrying the error text.
    pub async fn handle_fetch(&self, url: &str, options: &SerializableOptions) -> FetchReply {
        match self.perform(url, options).await {
            Ok(response) => {
                let status = response.status();
                let status_text = status.canonical_reason().unwrap_or("").to_string();
                let headers = headers_from_reqwest(response.headers());
                let final_url = response.url().to_string();
                match response.text().await {
                    Ok(text) => FetchReply {
                        success: true,
                        text: Some(text),
                        status: Some(status.as_u16()),
                        status_text: Some(status_text),
                        headers: Some(headers),
                        url: Some(final_url),
                        error: None,
                    },
                    Err(e) => failure(e.to_string()),
                }
            }
            Err(message) => failure(message),
        }
    }

    /// Perform a streamed fetch, emitting events on `events`.
    ///
    /// Emits `Metadata` once the response envelope is in, then `Chunk`s as
    /// the body arrives, terminated by `Done` or `Error`. A pre-envelope
    /// failure is a single `Error` event. Stops producing as soon as the
    /// receiver goes away — that is the cancel signal.
    pub async fn handle_stream(
        &self,
        url: &str,
        options: &SerializableOptions,
        events: mpsc::Sender<StreamEvent>,
    ) {
        let response = match self.perform(url, options).await {
            Ok(response) => response,
            Err(message) => {
                let _ = events.send(StreamEvent::Error { error: message }).await;
                return;
            }
        };

        let status = response.status();
        let metadata = StreamEvent::Metadata {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers: headers_from_reqwest(response.headers()),
            url: response.url().to_string(),
        };
        if events.send(metadata).await.is_err() {
            return;
        }

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let event = match chunk {
                Ok(bytes) => StreamEvent::Chunk {
                    value: bytes.to_vec(),
                },
                Err(e) => {
                    let _ = events
                        .send(StreamEvent::Error {
                            error: e.to_string(),
                        })
                        .await;
                    return;
                }
            };
            if events.send(event).await.is_err() {
                return;
            }
        }
        let _ = events.send(StreamEvent::Done).await;
    }

    async fn perform(
        &self,
        url: &str,
        options: &SerializableOptions,
    ) -> Result<reqwest::Response, String> {
        let method = options.method.as_deref().unwrap_or("GET");
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| format!("invalid method: {}", method))?;

        let mut request = self.client.request(method, url);
        if let Some(headers) = &options.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }
        match &options.body {
            Some(Body::Text(text)) => request = request.body(text.clone()),
            Some(Body::Bytes(bytes)) => request = request.body(bytes.clone()),
            None => {}
        }

        request.send().await.map_err(|e| e.to_string())
    }
}

impl Default for FetchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn failure(message: String) -> FetchReply {
    FetchReply {
        success: false,
        error: Some(message),
        ..Default::default()
    }
}
