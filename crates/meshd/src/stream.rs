//! Stub metrics stream handler.
//!
//! The real circuit-breaker metrics feed lives outside this repository;
//! the demo host mounts this stand-in so the deployed endpoint has a
//! body to serve. It answers every GET with a single server-sent ping
//! event, which is also what an idle metrics stream emits.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, header};
use serde::Serialize;

use meshwork_http::HttpHandler;

#[derive(Serialize)]
struct PingEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: u64,
}

/// Answers with one `ping` event per request.
#[derive(Default)]
pub struct PingStream;

#[async_trait]
impl HttpHandler for PingStream {
    async fn handle(&self, _request: Request<Bytes>) -> Response<Bytes> {
        let event = PingEvent {
            kind: "ping",
            timestamp: epoch_secs(),
        };
        // Serializing a struct of two scalars cannot fail.
        let payload = serde_json::to_string(&event).unwrap_or_default();
        let body = format!("data: {payload}\n\n");

        Response::builder()
            .status(200)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Bytes::from(body))
            .unwrap_or_else(|_| Response::new(Bytes::new()))
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
