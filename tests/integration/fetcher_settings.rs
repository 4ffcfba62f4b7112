//! The settings-aware fetch layer end to end: stored headers and the URL
//! rewrite applied before the request crosses the transport.

use std::sync::Arc;

use crate::infra::*;

use courier_client::{Fetcher, NoFallback, ProxyClient};
use courier_core::{Body, FetchOptions};
use courier_executor::{FetchExecutor, MemoryTransport};
use courier_store::settings::{HeaderPair, Settings, DEFAULT_REWRITE_URL};
use courier_store::MemoryStore;

fn fetcher() -> (
    Settings<MemoryStore>,
    Fetcher<MemoryTransport, NoFallback, MemoryStore>,
) {
    let transport = MemoryTransport::new(FetchExecutor::new());
    let client = ProxyClient::new(transport, NoFallback);
    let settings = Settings::new(Arc::new(MemoryStore::new()));
    (settings.clone(), Fetcher::new(client, settings))
}

#[tokio::test]
async fn stored_headers_ride_along_on_every_request() {
    let origin = spawn_origin().await;
    let (settings, fetcher) = fetcher();
    settings
        .set_custom_headers(&[HeaderPair {
            key: "x-trace".into(),
            value: "stored".into(),
        }])
        .await
        .expect("store headers");

    let options = FetchOptions::new()
        .method("POST")
        .body(Body::Text("payload".into()));
    let response = fetcher
        .fetch(&format!("{}/echo", origin), options)
        .await
        .expect("fetch");

    assert_eq!(
        response.headers.get("x-trace-echo").map(String::as_str),
        Some("stored")
    );
}

#[tokio::test]
async fn stored_headers_override_request_headers_on_a_clash() {
    let origin = spawn_origin().await;
    let (settings, fetcher) = fetcher();
    settings
        .set_custom_headers(&[HeaderPair {
            key: "x-trace".into(),
            value: "stored".into(),
        }])
        .await
        .expect("store headers");

    let options = FetchOptions::new()
        .method("POST")
        .headers(vec![("x-trace".to_string(), "mine".to_string())])
        .body(Body::Text("payload".into()));
    let response = fetcher
        .fetch(&format!("{}/echo", origin), options)
        .await
        .expect("fetch");

    assert_eq!(
        response.headers.get("x-trace-echo").map(String::as_str),
        Some("stored")
    );
}

#[tokio::test]
async fn rewrite_redirects_the_default_origin_to_the_configured_one() {
    let origin = spawn_origin().await;
    let (settings, fetcher) = fetcher();
    settings.set_url_rewrite_enabled(true).await.expect("enable");
    settings.set_rewrite_url(&origin).await.expect("target");

    // Aimed at the default upstream, lands on the test origin.
    let response = fetcher
        .fetch(
            &format!("{}/hello", DEFAULT_REWRITE_URL),
            FetchOptions::new(),
        )
        .await
        .expect("rewritten fetch");
    assert_eq!(response.text().await.expect("text"), "hi");
}

#[tokio::test]
async fn rewrite_leaves_other_origins_alone() {
    let origin = spawn_origin().await;
    let (settings, fetcher) = fetcher();
    settings.set_url_rewrite_enabled(true).await.expect("enable");
    settings
        .set_rewrite_url("http://10.255.255.1:1")
        .await
        .expect("target");

    // Not the default origin: goes straight through.
    let response = fetcher
        .fetch(&format!("{}/hello", origin), FetchOptions::new())
        .await
        .expect("untouched fetch");
    assert_eq!(response.text().await.expect("text"), "hi");
}
