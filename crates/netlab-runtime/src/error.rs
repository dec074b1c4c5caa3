//! Error types for the runtime gateway.

use thiserror::Error;

/// Errors a runtime gateway can report.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The named container does not exist.
    #[error("container not found: {0}")]
    NotFound(String),

    /// A container with the same name already exists.
    #[error("container already exists: {0}")]
    Conflict(String),

    /// The runtime ran the operation but reported a failure.
    #[error("{operation} failed for {container}: {message}")]
    CommandFailed {
        /// The gateway operation (`create`, `start`, `exec`, `delete`).
        operation: &'static str,
        /// Container name or ID the operation targeted.
        container: String,
        /// Runtime-provided error text.
        message: String,
    },

    /// The runtime could not be invoked at all.
    #[error("failed to invoke runtime: {0}")]
    Spawn(#[from] std::io::Error),

    /// The operation was cancelled before it completed.
    #[error("operation cancelled: {0}")]
    Cancelled(String),
}

impl RuntimeError {
    /// Check if this error is retriable.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::CommandFailed { .. } | Self::Spawn(_))
    }

    /// Check if this error means the container is absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A specialized Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
