//! Unix-socket server: newline-delimited JSON, one connection per exchange.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use courier_core::ClientMessage;

use crate::FetchExecutor;

/// Accept loop. Runs until the listener fails.
pub async fn serve(listener: UnixListener, executor: FetchExecutor) -> std::io::Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let executor = executor.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, executor).await {
                tracing::warn!(error = %e, "connection handler failed");
            }
        });
    }
}

async fn handle_connection(stream: UnixStream, executor: FetchExecutor) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }
    let message: ClientMessage = match serde_json::from_str(line.trim_end()) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, "dropping undecodable request");
            return Ok(());
        }
    };

    match message {
        ClientMessage::FetchUrl { url, options } => {
            tracing::debug!(%url, "buffered fetch");
            let reply = executor.handle_fetch(&url, &options).await;
            write_json_line(&mut write_half, &reply).await?;
        }
        ClientMessage::StartFetch { url, options } => {
            tracing::debug!(%url, "streamed fetch");
            let (tx, mut rx) = mpsc::channel(32);
            let task = tokio::spawn(async move {
                executor.handle_stream(&url, &options, tx).await;
            });
            while let Some(event) = rx.recv().await {
                if write_json_line(&mut write_half, &event).await.is_err() {
                    // Client went away; stop the producer.
                    rx.close();
                    task.abort();
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn write_json_line<T: serde::Serialize>(
    writer: &mut OwnedWriteHalf,
    value: &T,
) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(value).map_err(std::io::Error::other)?;
    line.push(b'\n');
    writer.write_all(&line).await
}
