//! Courier wire protocol — messages exchanged between the restricted caller
//! and the privileged executor.
//!
//! A buffered fetch is one request/response pair: `ClientMessage::FetchUrl`
//! out, one `FetchReply` back. A streamed fetch opens a channel named
//! [`STREAM_CHANNEL`], sends exactly one `ClientMessage::StartFetch`, and
//! then only consumes: one `Metadata` event first, zero or more `Chunk`s,
//! terminated by `Done` or `Error`. The client's sole remaining signal is
//! closing the channel, which tells the executor to stop producing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::options::SerializableOptions;

/// Channel name for streaming fetches. One channel per streamed request.
pub const STREAM_CHANNEL: &str = "courier.fetch_stream";

/// Caller→executor messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Buffered fetch — answered by a single [`FetchReply`].
    FetchUrl {
        url: String,
        options: SerializableOptions,
    },
    /// Streamed fetch — the only client→executor message on a stream channel.
    StartFetch {
        url: String,
        options: SerializableOptions,
    },
}

/// Reply to a buffered `FetchUrl`.
///
/// `status`, `status_text`, `headers`, and `url` are optional: early
/// executors replied with `success` and `text` alone, and the client
/// defaults the rest (200 / "OK" / empty).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Executor→client events on a stream channel.
///
/// Exactly one `Metadata` is authoritative per request and precedes any
/// `Chunk`; `Done` or `Error` terminates the sequence. Consumers match
/// exhaustively — there is no catch-all variant to hide behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Metadata {
        status: u16,
        status_text: String,
        headers: BTreeMap<String, String>,
        url: String,
    },
    Chunk {
        value: Vec<u8>,
    },
    Done,
    Error {
        error: String,
    },
}
