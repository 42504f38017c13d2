//! meshwork-http — the HTTP-serving capability surface.
//!
//! Defines the contract between the runtime and whichever component
//! actually serves HTTP: a [`HttpServer`] capability that can mount
//! handlers at a path, the [`HandlerDescriptor`] passed to it, and the
//! bounded liveness probe used to confirm a freshly mounted endpoint
//! answers.
//!
//! The serving component itself lives outside this crate; it registers
//! an `Arc<dyn HttpServer>` handle in the shared context and publishes
//! its listen address under [`HTTP_SERVER_ADDRESS`] / [`HTTP_SERVER_PORT`].

pub mod probe;
pub mod server;

pub use probe::{ProbeResult, probe_once, wait_for_http};
pub use server::{
    HTTP_SERVER_ADDRESS, HTTP_SERVER_PORT, HandlerDescriptor, HttpError, HttpHandler, HttpResult,
    HttpServer,
};
