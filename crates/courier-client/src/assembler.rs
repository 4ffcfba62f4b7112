//! Stream assembly — channel events in, resolved response and body out.
//!
//! The state machine is the crux of streamed-fetch correctness, so it is
//! explicit rather than a resolved-flag threaded through callbacks:
//!
//! ```text
//! AwaitingMetadata ── Metadata ──────────→ Streaming
//! AwaitingMetadata ── Error/disconnect ──→ Errored   (call rejected)
//! Streaming ──────── Done/disconnect ───→ Closed    (body closes cleanly)
//! Streaming ──────── Error ─────────────→ Errored   (error surfaces in body)
//! ```
//!
//! The response resolves exactly once, on the first `Metadata`; duplicates
//! are ignored. An `Error` arriving before metadata rejects the pending
//! call — the caller never observed an envelope. After metadata, errors
//! flow into the already-open body stream instead.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use courier_core::{ProxyError, StreamEvent};

use crate::response::{ByteStream, ProxyResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    AwaitingMetadata,
    Streaming,
    Closed,
    Errored,
}

pub struct StreamAssembler {
    state: AssemblerState,
    resolve: Option<oneshot::Sender<Result<ProxyResponse, ProxyError>>>,
    chunks: Option<mpsc::UnboundedSender<Result<Bytes, ProxyError>>>,
    body: Option<ByteStream>,
}

impl StreamAssembler {
    pub fn new(
        resolve: oneshot::Sender<Result<ProxyResponse, ProxyError>>,
        chunks: mpsc::UnboundedSender<Result<Bytes, ProxyError>>,
        body: ByteStream,
    ) -> Self {
        Self {
            state: AssemblerState::AwaitingMetadata,
            resolve: Some(resolve),
            chunks: Some(chunks),
            body: Some(body),
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, AssemblerState::Closed | AssemblerState::Errored)
    }

    /// Apply one executor event.
    pub fn handle(&mut self, event: StreamEvent) {
        match (self.state, event) {
            (
                AssemblerState::AwaitingMetadata,
                StreamEvent::Metadata {
                    status,
                    status_text,
                    headers,
                    url,
                },
            ) => {
                if let (Some(resolve), Some(body)) = (self.resolve.take(), self.body.take()) {
                    let response = ProxyResponse::streamed(status, status_text, headers, url, body);
                    let _ = resolve.send(Ok(response));
                }
                self.state = AssemblerState::Streaming;
            }
            // The first metadata is authoritative; later ones are ignored.
            (_, StreamEvent::Metadata { url, .. }) => {
                tracing::warn!(url, "duplicate metadata ignored");
            }
            (AssemblerState::Streaming, StreamEvent::Chunk { value }) => {
                if let Some(chunks) = &self.chunks {
                    let _ = chunks.send(Ok(Bytes::from(value)));
                }
            }
            (AssemblerState::AwaitingMetadata, StreamEvent::Chunk { .. }) => {
                tracing::warn!("chunk before metadata dropped");
            }
            (AssemblerState::Streaming, StreamEvent::Done) => {
                self.close(AssemblerState::Closed);
            }
            // Done with no metadata: nothing to hand out, treat as a dead channel.
            (AssemblerState::AwaitingMetadata, StreamEvent::Done) => {
                self.reject(ProxyError::Disconnected);
            }
            (AssemblerState::AwaitingMetadata, StreamEvent::Error { error }) => {
                self.reject(ProxyError::Executor(error));
            }
            (AssemblerState::Streaming, StreamEvent::Error { error }) => {
                if let Some(chunks) = self.chunks.take() {
                    let _ = chunks.send(Err(ProxyError::Executor(error)));
                }
                self.state = AssemblerState::Errored;
            }
            // Terminal states consume nothing further.
            (AssemblerState::Closed | AssemblerState::Errored, _) => {}
        }
    }

    /// The channel disconnected without a terminal event.
    ///
    /// Before metadata this rejects the pending call — leaving it hanging
    /// on a dead channel would strand the caller. After metadata it is a
    /// clean close: the executor has nothing more to send.
    pub fn handle_disconnect(&mut self) {
        match self.state {
            AssemblerState::AwaitingMetadata => self.reject(ProxyError::Disconnected),
            AssemblerState::Streaming => self.close(AssemblerState::Closed),
            AssemblerState::Closed | AssemblerState::Errored => {}
        }
    }

    fn reject(&mut self, error: ProxyError) {
        if let Some(resolve) = self.resolve.take() {
            let _ = resolve.send(Err(error));
        }
        self.body = None;
        self.chunks = None;
        self.state = AssemblerState::Errored;
    }

    fn close(&mut self, state: AssemblerState) {
        // Dropping the sender ends the body stream.
        self.chunks = None;
        self.state = state;
    }
}
