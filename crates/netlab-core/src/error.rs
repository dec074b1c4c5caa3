//! Common error types for netlab.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while validating a node configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A required configuration field is empty.
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    /// A required environment variable is absent or empty.
    #[error("environment variable `{0}` must not be empty")]
    EmptyEnv(String),

    /// A path that must live inside the lab directory does not.
    #[error("path {path} is outside lab directory {lab_dir}")]
    OutsideLabDir {
        /// The offending path.
        path: String,
        /// The node's lab directory.
        lab_dir: String,
    },
}
