//! Buffered fetches through the in-process transport.

use crate::infra::*;

use courier_core::{Body, FetchOptions};

#[tokio::test]
async fn buffered_get_returns_the_whole_payload() {
    let origin = spawn_origin().await;
    let (_transport, client) = memory_client();

    let response = client
        .fetch(&format!("{}/hello", origin), FetchOptions::new())
        .await
        .expect("proxy fetch");

    assert!(response.ok);
    assert_eq!(response.status, 200);
    assert_eq!(response.status_text, "OK");
    assert_eq!(response.text().await.expect("text"), "hi");
    assert!(
        response.headers.contains_key("content-type"),
        "headers missing: {:?}",
        response.headers
    );
    assert!(response.url.ends_with("/hello"));
}

#[tokio::test]
async fn http_errors_are_responses_not_failures() {
    let origin = spawn_origin().await;
    let (_transport, client) = memory_client();

    let response = client
        .fetch(&format!("{}/missing", origin), FetchOptions::new())
        .await
        .expect("a 404 still resolves");

    assert!(!response.ok);
    assert_eq!(response.status, 404);
    assert_eq!(response.text().await.expect("text"), "nope");
}

#[tokio::test]
async fn json_parses_through_the_proxy() {
    let origin = spawn_origin().await;
    let (_transport, client) = memory_client();

    let response = client
        .fetch(&format!("{}/json", origin), FetchOptions::new())
        .await
        .expect("proxy fetch");

    let value: serde_json::Value = response.json().await.expect("json");
    assert_eq!(value["ok"], serde_json::json!(true));
    assert_eq!(value["n"], serde_json::json!(7));
}

#[tokio::test]
async fn post_carries_body_and_headers_across_the_boundary() {
    let origin = spawn_origin().await;
    let (_transport, client) = memory_client();

    let options = FetchOptions::new()
        .method("POST")
        .headers(vec![("x-trace".to_string(), "42".to_string())])
        .body(Body::Text("payload".into()));
    let response = client
        .fetch(&format!("{}/echo", origin), options)
        .await
        .expect("proxy fetch");

    assert_eq!(response.text().await.expect("text"), "payload");
    assert_eq!(
        response.headers.get("x-trace-echo").map(String::as_str),
        Some("42")
    );
}

#[tokio::test]
async fn unreachable_origin_surfaces_the_executor_error() {
    let (_transport, client) = memory_client();

    // Nothing listens on port 1.
    let error = client
        .fetch("http://127.0.0.1:1/hello", FetchOptions::new())
        .await
        .expect_err("connection refused should fail the fetch");
    assert!(
        !error.to_string().is_empty(),
        "executor error should carry a message"
    );
}
