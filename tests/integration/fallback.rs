//! Fallback policy: what happens when the privileged side is unreachable.

use crate::infra::*;

use courier_client::{ProxyClient, ReqwestFetcher};
use courier_core::{FetchOptions, ProxyError, TransportError};
use courier_executor::{FetchExecutor, MemoryTransport};

#[tokio::test]
async fn unavailable_transport_falls_back_to_a_direct_fetch() {
    let origin = spawn_origin().await;
    let transport = MemoryTransport::new(FetchExecutor::new());
    transport.set_available(false);
    let client = ProxyClient::new(transport, ReqwestFetcher::new());

    let response = client
        .fetch(&format!("{}/hello", origin), FetchOptions::new())
        .await
        .expect("direct fallback");
    assert_eq!(response.text().await.expect("text"), "hi");
}

#[tokio::test]
async fn fallback_preserves_streaming() {
    let origin = spawn_origin().await;
    let transport = MemoryTransport::new(FetchExecutor::new());
    transport.set_available(false);
    let client = ProxyClient::new(transport, ReqwestFetcher::new());

    let mut response = client
        .fetch(&format!("{}/stream", origin), FetchOptions::new().stream(true))
        .await
        .expect("direct fallback");
    let body = response.body.take().expect("streamed body");
    assert_eq!(body.drain().await.expect("drain"), b"alpha beta gamma");
}

#[tokio::test]
async fn no_fallback_policy_surfaces_unavailability() {
    let (transport, client) = memory_client();
    transport.set_available(false);

    let error = client
        .fetch("http://127.0.0.1:1/hello", FetchOptions::new())
        .await
        .expect_err("no fallback configured");
    assert!(matches!(
        error,
        ProxyError::Transport(TransportError::Unavailable)
    ));
}
