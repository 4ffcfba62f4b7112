//! The full socket path: client and executor in separate tasks, talking
//! newline-delimited JSON over a Unix socket.

use std::path::PathBuf;

use tokio::net::UnixListener;

use courier_client::{NoFallback, ProxyClient, UnixTransport};
use courier_core::FetchOptions;
use courier_executor::{unix, FetchExecutor};

use crate::infra::spawn_origin;

fn socket_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("courier-test-{}-{}.sock", std::process::id(), tag))
}

async fn spawn_daemon(tag: &str) -> PathBuf {
    let path = socket_path(tag);
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path).expect("bind test socket");
    tokio::spawn(async move {
        let _ = unix::serve(listener, FetchExecutor::new()).await;
    });
    path
}

#[tokio::test]
async fn buffered_fetch_over_the_socket() {
    let origin = spawn_origin().await;
    let path = spawn_daemon("buffered").await;
    let client = ProxyClient::new(UnixTransport::new(&path), NoFallback);

    let response = client
        .fetch(&format!("{}/hello", origin), FetchOptions::new())
        .await
        .expect("socket fetch");
    assert_eq!(response.status, 200);
    assert_eq!(response.text().await.expect("text"), "hi");

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn streamed_fetch_over_the_socket() {
    let origin = spawn_origin().await;
    let path = spawn_daemon("streamed").await;
    let client = ProxyClient::new(UnixTransport::new(&path), NoFallback);

    let mut response = client
        .fetch(&format!("{}/stream", origin), FetchOptions::new().stream(true))
        .await
        .expect("socket stream fetch");
    assert_eq!(response.status, 200);
    let body = response.body.take().expect("streamed body");
    assert_eq!(body.drain().await.expect("drain"), b"alpha beta gamma");

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn missing_socket_reads_as_unavailable() {
    let transport = UnixTransport::new("/nonexistent/courier.sock");
    use courier_client::Transport;
    assert!(!transport.is_available());
}
