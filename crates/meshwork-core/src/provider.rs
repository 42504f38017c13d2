//! The provider contract.
//!
//! Providers are the unit of composition in a Meshwork process: the
//! embedding binary creates one `Context`, calls `initialize` on every
//! provider (seeding property defaults), then spawns each provider's
//! `run` on its own task with a shared shutdown signal.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::context::Context;
use crate::error::CoreResult;

/// A runtime component discovered and composed by the embedding process.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Seed property defaults and validate configuration.
    ///
    /// Called exactly once, before any provider's `run`. Must not block.
    fn initialize(&self, context: &Context) -> CoreResult<()>;

    /// The provider's long-running body. Called exactly once, on a
    /// dedicated task.
    ///
    /// `shutdown` flips to `true` when the process is stopping; the
    /// provider must treat that as graceful termination, not an error.
    /// Failures internal to the provider are logged and end the task
    /// without propagating to the host.
    async fn run(&self, context: Context, shutdown: watch::Receiver<bool>);
}
