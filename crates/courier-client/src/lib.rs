//! courier-client — the restricted side of the fetch proxy.
//!
//! Code running without network permission delegates HTTP requests to a
//! privileged executor over a message transport: buffered requests as one
//! request/response pair, streamed requests over a per-call channel that
//! relays metadata, body chunks, and a terminal done/error. When the
//! privileged side is unreachable the client falls back to a direct request.

pub mod assembler;
pub mod client;
pub mod fetcher;
pub mod response;
pub mod transport;
pub mod unix;
pub mod util;

pub use client::{DirectFetch, NoFallback, ProxyClient, ReqwestFetcher};
pub use fetcher::Fetcher;
pub use response::{ByteStream, ProxyResponse};
pub use transport::{StreamChannel, Transport};
pub use unix::UnixTransport;
