//! Transport seam between the restricted caller and the privileged executor.
//!
//! Intentionally minimal: a request/response primitive and a channel-opening
//! primitive. The proxy client is generic over this trait so tests can
//! script the executor side and force either the proxy or the fallback path.
//!
//! Methods are declared as `impl Future + Send` rather than `async fn` so
//! the client can drive a channel from a spawned task; implementations
//! still write plain `async fn`.

use std::future::Future;

use courier_core::{ClientMessage, FetchReply, StreamEvent, TransportError};

/// Bridge to the privileged executor context.
///
/// Implementations must support multiplexed concurrent requests and
/// concurrently open channels without cross-talk: every `open_channel` call
/// yields an independent channel whose events belong to that call alone.
pub trait Transport: Send + Sync {
    type Channel: StreamChannel;

    /// Whether a privileged executor is currently reachable.
    fn is_available(&self) -> bool;

    /// Send one buffered request and await its single reply.
    fn send(
        &self,
        message: ClientMessage,
    ) -> impl Future<Output = Result<FetchReply, TransportError>> + Send;

    /// Open a duplex channel for one streamed exchange.
    fn open_channel(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Self::Channel, TransportError>> + Send;
}

/// One streamed exchange: a single outbound start message, then inbound
/// events until the sequence terminates or the channel dies.
pub trait StreamChannel: Send + 'static {
    fn send(
        &mut self,
        message: ClientMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next executor event. `None` means the channel disconnected.
    fn recv(&mut self) -> impl Future<Output = Option<StreamEvent>> + Send;

    /// Close the channel, signalling the executor to stop producing.
    /// Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
