//! Proxy client — buffered and streamed fetch with direct-fetch fallback.
//!
//! The failure boundary is an injectable policy ([`DirectFetch`]): the
//! default [`ReqwestFetcher`] logs a warning and retries the request
//! directly, [`NoFallback`] propagates the proxy error unchanged. Once a
//! streamed response has resolved and handed its body to the caller, later
//! errors surface through the stream — there is no mid-stream fallback
//! (already-delivered bytes cannot be replayed on another transport).

use std::future::Future;

use tokio::sync::{mpsc, oneshot};

use courier_core::{
    serialize_options, ClientMessage, FetchOptions, ProxyError, TransportError, STREAM_CHANNEL,
};

use crate::assembler::StreamAssembler;
use crate::response::{ByteStream, ProxyResponse};
use crate::transport::{StreamChannel, Transport};
use crate::util::headers_from_reqwest;

/// Failure boundary around the proxy path.
pub trait DirectFetch: Send + Sync {
    /// Called with the original url/options and the proxy-path error.
    /// Return a response to recover, or an error to surface to the caller.
    fn recover(
        &self,
        url: &str,
        options: &FetchOptions,
        error: ProxyError,
    ) -> impl Future<Output = Result<ProxyResponse, ProxyError>> + Send;
}

/// Default policy: warn and retry the same request directly.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Perform the request directly, without the proxy.
    pub async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<ProxyResponse, ProxyError> {
        let method = options.method.as_deref().unwrap_or("GET");
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| ProxyError::Direct(format!("invalid method: {}", method)))?;

        let mut request = self.client.request(method, url);
        if let Some(headers) = &options.headers {
            for (key, value) in headers.normalize() {
                request = request.header(&key, &value);
            }
        }
        match &options.body {
            Some(courier_core::Body::Text(text)) => request = request.body(text.clone()),
            Some(courier_core::Body::Bytes(bytes)) => request = request.body(bytes.clone()),
            None => {}
        }

        let send = request.send();
        let response = match &options.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(ProxyError::Direct("request cancelled".to_string()));
                    }
                    outcome = send => outcome,
                }
            }
            None => send.await,
        }
        .map_err(|e| ProxyError::Direct(e.to_string()))?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        let headers = headers_from_reqwest(response.headers());
        let final_url = response.url().to_string();

        if options.stream {
            let body = ByteStream::spawn_from(response.bytes_stream());
            Ok(ProxyResponse::streamed(
                status.as_u16(),
                status_text,
                headers,
                final_url,
                body,
            ))
        } else {
            let text = response
                .text()
                .await
                .map_err(|e| ProxyError::Direct(e.to_string()))?;
            Ok(ProxyResponse::buffered(
                status.as_u16(),
                status_text,
                headers,
                final_url,
                text,
            ))
        }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectFetch for ReqwestFetcher {
    async fn recover(
        &self,
        url: &str,
        options: &FetchOptions,
        error: ProxyError,
    ) -> Result<ProxyResponse, ProxyError> {
        tracing::warn!(url, error = %error, "proxy fetch failed, falling back to direct fetch");
        self.fetch(url, options).await
    }
}

/// Policy for callers (and tests) that want proxy errors surfaced as-is.
pub struct NoFallback;

impl DirectFetch for NoFallback {
    async fn recover(
        &self,
        _url: &str,
        _options: &FetchOptions,
        error: ProxyError,
    ) -> Result<ProxyResponse, ProxyError> {
        Err(error)
    }
}

/// The proxy client: serializes the request, drives the transport, and
/// reconstructs a response-like object.
pub struct ProxyClient<T, D> {
    transport: T,
    direct: D,
}

impl<T: Transport, D: DirectFetch> ProxyClient<T, D> {
    pub fn new(transport: T, direct: D) -> Self {
        Self { transport, direct }
    }

    /// Fetch `url`, delegating to the privileged executor when reachable.
    ///
    /// `options.stream` picks the transport mode: buffered (one
    /// request/response pair) or streamed (a per-call channel whose
    /// response resolves on metadata, with the body arriving lazily).
    pub async fn fetch(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<ProxyResponse, ProxyError> {
        if !self.transport.is_available() {
            return self
                .direct
                .recover(url, &options, TransportError::Unavailable.into())
                .await;
        }

        let attempt = if options.stream {
            self.fetch_streaming(url, &options).await
        } else {
            self.fetch_buffered(url, &options).await
        };

        match attempt {
            Ok(response) => Ok(response),
            Err(error) => self.direct.recover(url, &options, error).await,
        }
    }

    async fn fetch_buffered(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<ProxyResponse, ProxyError> {
        let message = ClientMessage::FetchUrl {
            url: url.to_string(),
            options: serialize_options(options),
        };
        let reply = self.transport.send(message).await?;

        if reply.success {
            Ok(ProxyResponse::from_reply(reply, url))
        } else {
            Err(match reply.error {
                Some(message) => ProxyError::Executor(message),
                None => ProxyError::MalformedReply,
            })
        }
    }

    async fn fetch_streaming(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<ProxyResponse, ProxyError> {
        let mut channel = self.transport.open_channel(STREAM_CHANNEL).await?;
        channel
            .send(ClientMessage::StartFetch {
                url: url.to_string(),
                options: serialize_options(options),
            })
            .await?;

        let (resolve_tx, resolve_rx) = oneshot::channel();
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        let body = ByteStream::new(chunk_rx, cancel_tx);
        let mut assembler = StreamAssembler::new(resolve_tx, chunk_tx, body);

        // Per-call driver: all state is owned here, so concurrent fetches
        // cannot cross-talk.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Consumer cancelled the body stream: close the channel
                    // (once) so the executor stops producing.
                    _ = &mut cancel_rx => {
                        channel.close().await;
                        assembler.handle_disconnect();
                        break;
                    }
                    event = channel.recv() => match event {
                        Some(event) => {
                            assembler.handle(event);
                            if assembler.is_terminal() {
                                break;
                            }
                        }
                        None => {
                            assembler.handle_disconnect();
                            break;
                        }
                    },
                }
            }
        });

        resolve_rx.await.map_err(|_| ProxyError::Disconnected)?
    }
}
