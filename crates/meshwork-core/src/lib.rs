//! meshwork-core — shared runtime context for Meshwork providers.
//!
//! A Meshwork process is assembled from providers that discover each other
//! through a shared [`Context`]: a process-wide string property map plus a
//! typed capability registry. Providers implement the [`Provider`] contract
//! (`initialize` then `run`) and are composed explicitly by the embedding
//! binary.
//!
//! # Architecture
//!
//! ```text
//! Context
//!   ├── properties: String → String (insert-if-absent defaulting)
//!   └── capabilities: TypeId → Arc<dyn ...> handles, borrowed by consumers
//!
//! Provider
//!   ├── initialize(&Context) → seed property defaults, validate config
//!   └── run(Context, shutdown) → long-running task, cooperative shutdown
//! ```

pub mod context;
pub mod error;
pub mod provider;

pub use context::Context;
pub use error::{CoreError, CoreResult};
pub use provider::Provider;
