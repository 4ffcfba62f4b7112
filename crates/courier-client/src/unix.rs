//! Unix-socket transport: newline-delimited JSON to a local courierd.
//!
//! One connection per exchange. A buffered fetch writes one `FetchUrl` line
//! and reads one reply line; a streamed fetch holds its connection open and
//! reads events until the daemon terminates the sequence.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use courier_core::{ClientMessage, FetchReply, StreamEvent, TransportError};

use crate::transport::{StreamChannel, Transport};

pub struct UnixTransport {
    socket_path: PathBuf,
}

impl UnixTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn connect(&self) -> Result<UnixStream, TransportError> {
        Ok(UnixStream::connect(&self.socket_path).await?)
    }
}

async fn write_line(
    writer: &mut OwnedWriteHalf,
    message: &ClientMessage,
) -> Result<(), TransportError> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    Ok(())
}

impl Transport for UnixTransport {
    type Channel = UnixChannel;

    fn is_available(&self) -> bool {
        self.socket_path.exists()
    }

    async fn send(&self, message: ClientMessage) -> Result<FetchReply, TransportError> {
        let stream = self.connect().await?;
        let (read_half, mut write_half) = stream.into_split();
        write_line(&mut write_half, &message).await?;

        let mut line = String::new();
        let mut reader = BufReader::new(read_half);
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(TransportError::Closed);
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }

    async fn open_channel(&self, _name: &str) -> Result<UnixChannel, TransportError> {
        let stream = self.connect().await?;
        let (read_half, write_half) = stream.into_split();
        Ok(UnixChannel {
            reader: Some(BufReader::new(read_half)),
            writer: Some(write_half),
        })
    }
}

/// One streamed exchange over its own connection. Closing drops both halves,
/// which the daemon observes as EOF and stops producing.
pub struct UnixChannel {
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: Option<OwnedWriteHalf>,
}

impl StreamChannel for UnixChannel {
    async fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        match self.writer.as_mut() {
            Some(writer) => write_line(writer, &message).await,
            None => Err(TransportError::Closed),
        }
    }

    async fn recv(&mut self) -> Option<StreamEvent> {
        let reader = self.reader.as_mut()?;
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => match serde_json::from_str(line.trim_end()) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping undecodable stream event");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "stream channel read failed");
                None
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        self.reader = None;
    }
}
