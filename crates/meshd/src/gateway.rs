//! Axum-backed implementation of the HTTP-serving capability.
//!
//! Handlers are mounted into a shared route table after the server has
//! started, so providers can deploy endpoints whenever they come up.
//! Requests fall through a single dispatch handler that resolves the
//! route table at request time.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::{Request as AxumRequest, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response as AxumResponse};
use bytes::Bytes;
use http::Request;
use tracing::{debug, info};

use meshwork_http::{HandlerDescriptor, HttpError, HttpHandler, HttpResult, HttpServer};

/// Largest request body the gateway will buffer for a handler.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP gateway with a mutable route table.
#[derive(Clone, Default)]
pub struct HttpGateway {
    routes: Arc<RwLock<HashMap<String, Arc<dyn HttpHandler>>>>,
}

impl HttpGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the axum router; every request goes through route-table dispatch.
    pub fn router(&self) -> Router {
        Router::new().fallback(dispatch).with_state(self.clone())
    }

    fn lookup(&self, path: &str) -> Option<Arc<dyn HttpHandler>> {
        let key = normalize(path);
        self.routes
            .read()
            .expect("route table lock poisoned")
            .get(&key)
            .cloned()
    }
}

#[async_trait]
impl HttpServer for HttpGateway {
    async fn deploy_handlers(
        &self,
        mount_path: &str,
        name: &str,
        handlers: Vec<HandlerDescriptor>,
    ) -> HttpResult<()> {
        let mount = mount_path.trim_matches('/');
        if mount.is_empty() {
            return Err(HttpError::InvalidMountPath(mount_path.to_string()));
        }

        let mut routes = self.routes.write().expect("route table lock poisoned");

        // Redeploying a mount path replaces everything under it.
        let prefix = format!("/{mount}");
        routes.retain(|key, _| key != &prefix && !key.starts_with(&format!("{prefix}/")));

        for descriptor in handlers {
            let key = route_key(mount, &descriptor.sub_path);
            debug!(handler = %descriptor.name, route = %key, "handler mounted");
            routes.insert(key, descriptor.handler);
        }

        info!(%mount_path, %name, "handlers deployed");
        Ok(())
    }
}

/// Resolve the route table and run the matching handler.
async fn dispatch(State(gateway): State<HttpGateway>, request: AxumRequest) -> AxumResponse {
    let Some(handler) = gateway.lookup(request.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };

    let response = handler.handle(Request::from_parts(parts, bytes)).await;
    response.map(Body::from)
}

/// Canonical route key for a mount path + sub path pair.
fn route_key(mount: &str, sub_path: &str) -> String {
    let sub = sub_path.trim_matches('/');
    if sub.is_empty() {
        format!("/{mount}")
    } else {
        format!("/{mount}/{sub}")
    }
}

/// Canonical form of an incoming request path.
fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}
