//! Handler deployment contract.
//!
//! An HTTP-serving component implements [`HttpServer`] and registers the
//! handle in the shared context. Other providers hand it
//! [`HandlerDescriptor`]s to mount; the handler bodies themselves are
//! opaque [`HttpHandler`] trait objects.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use thiserror::Error;

/// Context property key under which the serving component publishes its
/// bind address (hostname or IP).
pub const HTTP_SERVER_ADDRESS: &str = "http.server.address";

/// Context property key under which the serving component publishes its
/// listen port.
pub const HTTP_SERVER_PORT: &str = "http.server.port";

/// Result type alias for handler deployment.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors raised by an [`HttpServer`] implementation.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid mount path: {0}")]
    InvalidMountPath(String),

    #[error("deploy failed: {0}")]
    Deploy(String),
}

/// An HTTP request handler supplied by a provider.
///
/// Requests arrive with their body fully buffered; streaming responses
/// are produced by the serving component from the returned body.
#[async_trait]
pub trait HttpHandler: Send + Sync {
    async fn handle(&self, request: Request<Bytes>) -> Response<Bytes>;
}

/// Describes one handler to mount under a deployment's mount path.
#[derive(Clone)]
pub struct HandlerDescriptor {
    /// Logical handler name, used in logs.
    pub name: String,
    /// Sub-path below the mount path ("/" for the root).
    pub sub_path: String,
    /// Free-form init parameters for the serving component.
    pub properties: HashMap<String, String>,
    /// The handler implementation.
    pub handler: Arc<dyn HttpHandler>,
}

impl HandlerDescriptor {
    /// Descriptor for a handler mounted at the deployment root with no
    /// init parameters.
    pub fn at_root(name: impl Into<String>, handler: Arc<dyn HttpHandler>) -> Self {
        Self {
            name: name.into(),
            sub_path: "/".to_string(),
            properties: HashMap::new(),
            handler,
        }
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("sub_path", &self.sub_path)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// The HTTP-serving capability.
#[async_trait]
pub trait HttpServer: Send + Sync {
    /// Mount a named group of handlers under `mount_path`.
    ///
    /// `mount_path` is relative to the server root and must be non-empty.
    /// Deploying the same path twice replaces the previous handlers.
    async fn deploy_handlers(
        &self,
        mount_path: &str,
        name: &str,
        handlers: Vec<HandlerDescriptor>,
    ) -> HttpResult<()>;
}
