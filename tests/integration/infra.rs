//! Shared test infrastructure: a local HTTP origin and client plumbing.

use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;

use courier_client::{NoFallback, ProxyClient};
use courier_executor::{FetchExecutor, MemoryTransport};

/// Spin up the origin server on an ephemeral loopback port.
/// Returns its base URL.
pub async fn spawn_origin() -> String {
    let app = Router::new()
        .route("/hello", get(|| async { "hi" }))
        .route(
            "/json",
            get(|| async { axum::Json(serde_json::json!({"ok": true, "n": 7})) }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        )
        .route("/echo", post(echo))
        .route("/stream", get(stream_body))
        .route("/slow", get(slow_body));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind origin listener");
    let addr = listener.local_addr().expect("origin local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("origin server");
    });
    format!("http://{}", addr)
}

async fn echo(headers: axum::http::HeaderMap, body: String) -> impl IntoResponse {
    let trace = headers
        .get("x-trace")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    ([("x-trace-echo", trace)], body)
}

async fn stream_body() -> impl IntoResponse {
    let chunks = futures::stream::iter(vec![
        Ok::<_, std::io::Error>(Bytes::from_static(b"alpha ")),
        Ok(Bytes::from_static(b"beta ")),
        Ok(Bytes::from_static(b"gamma")),
    ]);
    Body::from_stream(chunks)
}

/// Never-ending ticking body, for cancellation tests.
async fn slow_body() -> impl IntoResponse {
    let ticks = futures::stream::unfold(0u64, |n| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Some((
            Ok::<_, std::io::Error>(Bytes::from(format!("tick {} ", n))),
            n + 1,
        ))
    });
    Body::from_stream(ticks)
}

/// In-process transport plus a client that surfaces proxy errors as-is.
pub fn memory_client() -> (MemoryTransport, ProxyClient<MemoryTransport, NoFallback>) {
    let transport = MemoryTransport::new(FetchExecutor::new());
    let client = ProxyClient::new(transport.clone(), NoFallback);
    (transport, client)
}

/// Wait until `condition` holds or a few seconds pass.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
