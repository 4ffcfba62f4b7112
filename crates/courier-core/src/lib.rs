//! courier-core — protocol messages, request options, errors, and configuration.
//! All other Courier crates depend on this one.

pub mod config;
pub mod error;
pub mod options;
pub mod proxy;

pub use config::{ConfigError, CourierConfig, DaemonConfig, ExecutorConfig};
pub use error::{ProxyError, TransportError};
pub use options::{
    serialize_options, Body, CancelSignal, FetchOptions, HeaderInput, SerializableOptions,
};
pub use proxy::{ClientMessage, FetchReply, StreamEvent, STREAM_CHANNEL};
