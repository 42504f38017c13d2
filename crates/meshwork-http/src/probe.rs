//! Endpoint liveness probing.
//!
//! A freshly mounted endpoint is confirmed by GET-ing its URL until the
//! expected status comes back or the attempt budget runs out. Each
//! attempt is a raw http1 exchange over its own TCP connection with an
//! individual timeout, so a hung server cannot stall the retry loop.

use std::time::Duration;

use http::Uri;
use tracing::debug;

/// Per-attempt timeout covering connect, handshake, and response.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of a single probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The endpoint returned the expected status.
    Live,
    /// The endpoint responded with a different status.
    Unexpected,
    /// The probe could not complete (connect error, bad URL, timeout).
    Unreachable,
}

/// Perform one GET against `url`, expecting `expected_status`.
pub async fn probe_once(url: &str, expected_status: u16) -> ProbeResult {
    let Ok(uri) = url.parse::<Uri>() else {
        debug!(%url, "probe skipped: unparseable url");
        return ProbeResult::Unreachable;
    };
    let Some(host) = uri.host() else {
        debug!(%url, "probe skipped: url has no host");
        return ProbeResult::Unreachable;
    };
    let port = uri.port_u16().unwrap_or(80);
    let address = format!("{host}:{port}");
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let result = tokio::time::timeout(ATTEMPT_TIMEOUT, async {
        let stream = match tokio::net::TcpStream::connect(&address).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %url, "probe connection failed");
                return ProbeResult::Unreachable;
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %url, "probe handshake failed");
                return ProbeResult::Unreachable;
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(&target)
            .header("host", &address)
            .header("user-agent", "meshwork-http/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, %url, "probe request build failed");
                return ProbeResult::Unreachable;
            }
        };

        match sender.send_request(req).await {
            Ok(resp) => {
                if resp.status().as_u16() == expected_status {
                    ProbeResult::Live
                } else {
                    debug!(status = %resp.status(), %url, "probe unexpected status");
                    ProbeResult::Unexpected
                }
            }
            Err(e) => {
                debug!(error = %e, %url, "probe request failed");
                ProbeResult::Unreachable
            }
        }
    })
    .await;

    match result {
        Ok(probe) => probe,
        Err(_) => {
            debug!(%url, "probe timed out");
            ProbeResult::Unreachable
        }
    }
}

/// Retry a GET against `url` until `expected_status` comes back or the
/// attempt budget is exhausted. Returns whether the endpoint went live.
pub async fn wait_for_http(url: &str, expected_status: u16, attempts: u32, delay: Duration) -> bool {
    for attempt in 1..=attempts {
        if probe_once(url, expected_status).await == ProbeResult::Live {
            debug!(%url, attempt, "endpoint live");
            return true;
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    debug!(%url, attempts, "endpoint never became live");
    false
}
