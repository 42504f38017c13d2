//! The Hystrix metrics stream provider.
//!
//! Lifecycle: `initialize` seeds the enable flag and mount path defaults,
//! `run` polls the context until the HTTP-serving capability appears,
//! deploys the stream endpoint on it once, and confirms it answers with a
//! bounded probe. A probe that never succeeds is fatal for this provider
//! only; the host process is unaffected.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, trace};

use meshwork_core::{Context, CoreError, CoreResult, Provider};
use meshwork_http::{
    HTTP_SERVER_ADDRESS, HTTP_SERVER_PORT, HandlerDescriptor, HttpError, HttpHandler, HttpServer,
    wait_for_http,
};

/// Enable flag for the metrics stream (boolean, default `false`).
pub const HYSTRIX_METRICS_ENABLED: &str = "hystrix.metrics.enabled";

/// Mount path for the metrics stream (default `hystrix.stream`).
pub const HYSTRIX_METRICS_PATH: &str = "hystrix.metrics.path";

/// Logical name the stream endpoint is deployed under.
pub const STREAM_ENDPOINT_NAME: &str = "HystrixMetricsStreamServlet";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_PROBE_ATTEMPTS: u32 = 60;
const DEFAULT_PROBE_DELAY: Duration = Duration::from_millis(100);
const EXPECTED_STATUS: u16 = 200;

/// Errors terminal for the provider's run loop.
#[derive(Debug, Error)]
pub enum HystrixError {
    #[error("metrics stream never became reachable at {url} after {attempts} attempts")]
    StreamUnreachable { url: String, attempts: u32 },

    #[error("http server published no {0} property")]
    MissingServerProperty(&'static str),

    #[error(transparent)]
    Deploy(#[from] HttpError),
}

/// Publishes the circuit-breaker metrics stream once an HTTP server
/// becomes available.
pub struct HystrixMetricsProvider {
    /// The stream implementation to mount (supplied by the embedder).
    stream_handler: Arc<dyn HttpHandler>,
    poll_interval: Duration,
    probe_attempts: u32,
    probe_delay: Duration,
}

impl HystrixMetricsProvider {
    /// Create a provider that mounts `stream_handler` as the metrics stream.
    pub fn new(stream_handler: Arc<dyn HttpHandler>) -> Self {
        Self {
            stream_handler,
            poll_interval: DEFAULT_POLL_INTERVAL,
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            probe_delay: DEFAULT_PROBE_DELAY,
        }
    }

    /// Override the capability poll interval (for testing).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the probe retry budget (for testing).
    pub fn with_probe_budget(mut self, attempts: u32, delay: Duration) -> Self {
        self.probe_attempts = attempts;
        self.probe_delay = delay;
        self
    }

    /// Deploy the stream endpoint and confirm it answers.
    ///
    /// Called at most once per `run`; a failure here ends the provider.
    async fn register_stream(
        &self,
        context: &Context,
        http: &Arc<dyn HttpServer>,
    ) -> Result<String, HystrixError> {
        let mount_path = context
            .property(HYSTRIX_METRICS_PATH)
            .unwrap_or_else(|| "hystrix.stream".to_string());
        let url = metrics_stream_url(context, &mount_path)?;

        info!(%url, "deploying hystrix metrics stream");
        http.deploy_handlers(
            &mount_path,
            STREAM_ENDPOINT_NAME,
            vec![HandlerDescriptor::at_root(
                STREAM_ENDPOINT_NAME,
                Arc::clone(&self.stream_handler),
            )],
        )
        .await?;

        trace!(%url, "waiting for hystrix metrics stream to appear");
        if !wait_for_http(&url, EXPECTED_STATUS, self.probe_attempts, self.probe_delay).await {
            return Err(HystrixError::StreamUnreachable {
                url,
                attempts: self.probe_attempts,
            });
        }
        Ok(url)
    }
}

#[async_trait]
impl Provider for HystrixMetricsProvider {
    fn name(&self) -> &'static str {
        "hystrix-metrics"
    }

    fn initialize(&self, context: &Context) -> CoreResult<()> {
        context.put_property_if_absent(HYSTRIX_METRICS_ENABLED, "false");
        context.put_property_if_absent(HYSTRIX_METRICS_PATH, "hystrix.stream");

        // Defaulting never produces an empty path; only an embedder can.
        if context
            .property(HYSTRIX_METRICS_PATH)
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(CoreError::InvalidProperty {
                key: HYSTRIX_METRICS_PATH.to_string(),
                reason: "mount path must be non-empty".to_string(),
            });
        }
        Ok(())
    }

    async fn run(&self, context: Context, mut shutdown: watch::Receiver<bool>) {
        if !context.bool_property(HYSTRIX_METRICS_ENABLED) {
            debug!("hystrix metrics stream disabled");
            return;
        }

        debug!("waiting for the http server capability");

        let mut http: Option<Arc<dyn HttpServer>> = None;
        loop {
            if *shutdown.borrow() {
                debug!("hystrix metrics provider shutting down");
                return;
            }

            if http.is_none() {
                if let Some(server) = context.capability::<Arc<dyn HttpServer>>() {
                    match self.register_stream(&context, &server).await {
                        Ok(url) => info!(%url, "hystrix metrics stream live"),
                        Err(e) => {
                            error!(error = %e, "hystrix metrics provider failed");
                            return;
                        }
                    }
                    // Cache the handle so the deploy branch never re-enters.
                    http = Some(server);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {
                    debug!("hystrix metrics provider shutting down");
                    return;
                }
            }
        }
    }
}

/// Derive the stream URL from the server's published address and port.
fn metrics_stream_url(context: &Context, mount_path: &str) -> Result<String, HystrixError> {
    let host = context
        .property(HTTP_SERVER_ADDRESS)
        .ok_or(HystrixError::MissingServerProperty(HTTP_SERVER_ADDRESS))?;
    let port = context
        .property(HTTP_SERVER_PORT)
        .ok_or(HystrixError::MissingServerProperty(HTTP_SERVER_PORT))?;
    Ok(format!("http://{host}:{port}/{mount_path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::{Request, Response};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use meshwork_http::HttpResult;

    struct NoopStream;

    #[async_trait]
    impl HttpHandler for NoopStream {
        async fn handle(&self, _request: Request<Bytes>) -> Response<Bytes> {
            Response::new(Bytes::new())
        }
    }

    /// Fake HTTP server capability that records deploy calls.
    #[derive(Default)]
    struct RecordingServer {
        deploys: AtomicUsize,
        last: Mutex<Option<(String, String)>>,
    }

    #[async_trait]
    impl HttpServer for RecordingServer {
        async fn deploy_handlers(
            &self,
            mount_path: &str,
            name: &str,
            _handlers: Vec<HandlerDescriptor>,
        ) -> HttpResult<()> {
            self.deploys.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((mount_path.to_string(), name.to_string()));
            Ok(())
        }
    }

    fn fast_provider() -> HystrixMetricsProvider {
        HystrixMetricsProvider::new(Arc::new(NoopStream))
            .with_poll_interval(Duration::from_millis(10))
            .with_probe_budget(3, Duration::from_millis(5))
    }

    /// Answers every connection with a canned 200 response.
    async fn canned_ok_server() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = stream.read(&mut buf).await;
                    let _ = stream
                        .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                        .await;
                });
            }
        });
        addr
    }

    #[test]
    fn initialize_inserts_defaults() {
        let ctx = Context::new();
        fast_provider().initialize(&ctx).unwrap();

        assert_eq!(ctx.property(HYSTRIX_METRICS_ENABLED), Some("false".to_string()));
        assert_eq!(ctx.property(HYSTRIX_METRICS_PATH), Some("hystrix.stream".to_string()));
        assert!(!ctx.bool_property(HYSTRIX_METRICS_ENABLED));
    }

    #[test]
    fn initialize_keeps_existing_values() {
        let ctx = Context::new();
        ctx.set_property(HYSTRIX_METRICS_ENABLED, "true");
        ctx.set_property(HYSTRIX_METRICS_PATH, "breaker.stream");
        fast_provider().initialize(&ctx).unwrap();

        assert!(ctx.bool_property(HYSTRIX_METRICS_ENABLED));
        assert_eq!(ctx.property(HYSTRIX_METRICS_PATH), Some("breaker.stream".to_string()));
    }

    #[test]
    fn initialize_rejects_empty_path() {
        let ctx = Context::new();
        ctx.set_property(HYSTRIX_METRICS_PATH, "  ");
        let err = fast_provider().initialize(&ctx).unwrap_err();
        assert!(matches!(err, CoreError::InvalidProperty { .. }));
    }

    #[tokio::test]
    async fn disabled_provider_returns_immediately() {
        let ctx = Context::new();
        let provider = fast_provider();
        provider.initialize(&ctx).unwrap();

        let server = Arc::new(RecordingServer::default());
        ctx.register_capability::<Arc<dyn HttpServer>>(server.clone());

        let (_tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { provider.run(ctx, rx).await });

        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("disabled provider must return at once")
            .unwrap();
        assert_eq!(server.deploys.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_registration_while_capability_absent() {
        let ctx = Context::new();
        let provider = fast_provider();
        provider.initialize(&ctx).unwrap();
        ctx.set_property(HYSTRIX_METRICS_ENABLED, "true");

        let server = Arc::new(RecordingServer::default());
        // Deliberately not registered in the context.

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let ctx = ctx.clone();
            async move { provider.run(ctx, rx).await }
        });

        // Several poll cycles pass without a collaborator.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(server.deploys.load(Ordering::SeqCst), 0);
        assert!(!handle.is_finished());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("provider must stop on shutdown")
            .unwrap();
        assert_eq!(server.deploys.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn registers_once_when_capability_appears() {
        let ctx = Context::new();
        let provider = fast_provider();
        provider.initialize(&ctx).unwrap();
        ctx.set_property(HYSTRIX_METRICS_ENABLED, "true");

        // A live endpoint so the probe succeeds immediately.
        let addr = canned_ok_server().await;
        ctx.set_property(HTTP_SERVER_ADDRESS, addr.ip().to_string());
        ctx.set_property(HTTP_SERVER_PORT, addr.port().to_string());

        let server = Arc::new(RecordingServer::default());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let ctx = ctx.clone();
            async move { provider.run(ctx, rx).await }
        });

        // Let a few poll cycles go by before the collaborator shows up.
        tokio::time::sleep(Duration::from_millis(40)).await;
        ctx.register_capability::<Arc<dyn HttpServer>>(server.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(server.deploys.load(Ordering::SeqCst), 1);
        let (mount_path, name) = server.last.lock().unwrap().clone().unwrap();
        assert_eq!(mount_path, "hystrix.stream");
        assert_eq!(name, STREAM_ENDPOINT_NAME);

        // Further cycles must not redeploy.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(server.deploys.load(Ordering::SeqCst), 1);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("provider must stop on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn probe_exhaustion_is_fatal_after_single_deploy() {
        let ctx = Context::new();
        let provider = fast_provider();
        provider.initialize(&ctx).unwrap();
        ctx.set_property(HYSTRIX_METRICS_ENABLED, "true");
        // Nothing listens on port 1, so every probe attempt fails.
        ctx.set_property(HTTP_SERVER_ADDRESS, "127.0.0.1");
        ctx.set_property(HTTP_SERVER_PORT, "1");

        let server = Arc::new(RecordingServer::default());
        ctx.register_capability::<Arc<dyn HttpServer>>(server.clone());

        let (_tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { provider.run(ctx, rx).await });

        // The provider must terminate on its own, with exactly one deploy.
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("provider must end after probe exhaustion")
            .unwrap();
        assert_eq!(server.deploys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_during_sleep_terminates_within_an_interval() {
        let ctx = Context::new();
        let provider = HystrixMetricsProvider::new(Arc::new(NoopStream))
            .with_poll_interval(Duration::from_millis(200));
        provider.initialize(&ctx).unwrap();
        ctx.set_property(HYSTRIX_METRICS_ENABLED, "true");

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { provider.run(ctx, rx).await });

        // Land inside the first sleep.
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_millis(250), handle)
            .await
            .expect("shutdown must interrupt the sleep")
            .unwrap();
    }

    #[test]
    fn url_derivation() {
        let ctx = Context::new();
        ctx.set_property(HTTP_SERVER_ADDRESS, "10.0.0.5");
        ctx.set_property(HTTP_SERVER_PORT, "8181");
        let url = metrics_stream_url(&ctx, "hystrix.stream").unwrap();
        assert_eq!(url, "http://10.0.0.5:8181/hystrix.stream");
    }

    #[test]
    fn url_derivation_requires_published_address() {
        let ctx = Context::new();
        let err = metrics_stream_url(&ctx, "hystrix.stream").unwrap_err();
        assert!(matches!(err, HystrixError::MissingServerProperty(HTTP_SERVER_ADDRESS)));

        ctx.set_property(HTTP_SERVER_ADDRESS, "127.0.0.1");
        let err = metrics_stream_url(&ctx, "hystrix.stream").unwrap_err();
        assert!(matches!(err, HystrixError::MissingServerProperty(HTTP_SERVER_PORT)));
    }
}
