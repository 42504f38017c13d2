//! meshwork-hystrix — the circuit-breaker metrics stream provider.
//!
//! Waits for the HTTP-serving capability to appear in the shared context,
//! mounts the metrics stream endpoint on it exactly once, then probes the
//! resulting URL until it answers. The stream body itself is supplied by
//! the embedder as an [`meshwork_http::HttpHandler`]; this crate only
//! handles discovery, deployment, and liveness confirmation.

pub mod provider;

pub use provider::{
    HYSTRIX_METRICS_ENABLED, HYSTRIX_METRICS_PATH, HystrixError, HystrixMetricsProvider,
    STREAM_ENDPOINT_NAME,
};
