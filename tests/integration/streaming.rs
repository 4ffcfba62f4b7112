//! Streamed fetches: metadata-first resolution, ordered chunks, cancellation.

use crate::infra::*;

use futures::StreamExt;

use courier_core::FetchOptions;

#[tokio::test]
async fn streamed_body_arrives_in_order() {
    let origin = spawn_origin().await;
    let (_transport, client) = memory_client();

    let mut response = client
        .fetch(&format!("{}/stream", origin), FetchOptions::new().stream(true))
        .await
        .expect("stream fetch");

    assert_eq!(response.status, 200);
    let body = response.body.take().expect("streamed body");
    let bytes = body.drain().await.expect("drain");
    assert_eq!(bytes, b"alpha beta gamma");
}

#[tokio::test]
async fn streamed_response_refuses_buffered_accessors() {
    let origin = spawn_origin().await;
    let (_transport, client) = memory_client();

    let response = client
        .fetch(&format!("{}/stream", origin), FetchOptions::new().stream(true))
        .await
        .expect("stream fetch");

    assert!(response.text().await.is_err());
    assert!(response.json::<serde_json::Value>().await.is_err());
}

#[tokio::test]
async fn streamed_http_error_still_resolves_with_its_status() {
    let origin = spawn_origin().await;
    let (_transport, client) = memory_client();

    let mut response = client
        .fetch(&format!("{}/missing", origin), FetchOptions::new().stream(true))
        .await
        .expect("a 404 still resolves");

    assert_eq!(response.status, 404);
    let body = response.body.take().expect("streamed body");
    assert_eq!(body.drain().await.expect("drain"), b"nope");
}

#[tokio::test]
async fn cancelling_the_body_disconnects_the_channel_once() {
    let origin = spawn_origin().await;
    let (transport, client) = memory_client();

    let mut response = client
        .fetch(&format!("{}/slow", origin), FetchOptions::new().stream(true))
        .await
        .expect("stream fetch");

    let mut body = response.body.take().expect("streamed body");
    let first = body.next().await.expect("first tick").expect("chunk");
    assert!(first.starts_with(b"tick"));

    body.cancel();
    let transport = transport.clone();
    assert!(
        wait_for(move || transport.disconnect_count() == 1).await,
        "cancel should close the channel exactly once"
    );
}

#[tokio::test]
async fn dropping_the_body_also_disconnects() {
    let origin = spawn_origin().await;
    let (transport, client) = memory_client();

    let mut response = client
        .fetch(&format!("{}/slow", origin), FetchOptions::new().stream(true))
        .await
        .expect("stream fetch");

    drop(response.body.take());
    let transport = transport.clone();
    assert!(
        wait_for(move || transport.disconnect_count() == 1).await,
        "drop should close the channel"
    );
}

#[tokio::test]
async fn pre_request_failure_rejects_the_streamed_call() {
    let (_transport, client) = memory_client();

    let error = client
        .fetch("http://127.0.0.1:1/slow", FetchOptions::new().stream(true))
        .await
        .expect_err("connection refused should reject before metadata");
    assert!(!error.to_string().is_empty());
}
