//! Error taxonomy for the fetch proxy.
//!
//! Transport-level failures fall back to a direct request; executor-reported
//! failures surface to the caller (or into the body stream, depending on
//! where they arrive in a streamed exchange).

use thiserror::Error;

/// Failures of the message/channel layer itself.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No privileged executor is reachable — no active runtime binding.
    #[error("privileged transport unavailable")]
    Unavailable,

    #[error("transport i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport codec failed: {0}")]
    Codec(#[from] serde_json::Error),

    /// The peer closed the connection before a reply arrived.
    #[error("transport closed before reply")]
    Closed,
}

/// Everything a proxied fetch can fail with.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The privileged executor reported a failure. The payload is the
    /// executor's own error string, verbatim.
    #[error("{0}")]
    Executor(String),

    /// The executor replied, but with no usable success or error field.
    #[error("fetch failed in background executor")]
    MalformedReply,

    /// The stream channel disconnected before metadata arrived.
    #[error("stream channel disconnected before metadata")]
    Disconnected,

    /// Buffered accessors on a streamed response. The payload lives in the
    /// body stream; there is nothing buffered to return.
    #[error("{0} is not supported on a streamed response; read the body stream")]
    UnsupportedOnStream(&'static str),

    /// Deliberate capability gap, not a transient failure.
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),

    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The direct (unproxied) request failed.
    #[error("direct fetch failed: {0}")]
    Direct(String),
}
