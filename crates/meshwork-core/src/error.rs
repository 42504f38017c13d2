//! Error types for the Meshwork runtime context.

use thiserror::Error;

/// Result type alias for core runtime operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while initializing or querying the runtime context.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid property {key}: {reason}")]
    InvalidProperty { key: String, reason: String },
}
