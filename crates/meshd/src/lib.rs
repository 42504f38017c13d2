//! meshd — the Meshwork demo host.
//!
//! Wires a shared [`meshwork_core::Context`], the axum-backed
//! [`gateway::HttpGateway`] (published as the HTTP-serving capability),
//! and the Hystrix metrics stream provider into one process. The binary
//! (`main.rs`) and the integration tests both assemble from here.

pub mod gateway;
pub mod stream;

pub use gateway::HttpGateway;
pub use stream::PingStream;
