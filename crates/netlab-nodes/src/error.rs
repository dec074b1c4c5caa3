//! Error types for node drivers.
//!
//! Every variant that concerns a specific node carries its name, and the
//! rendered message starts with it, so a failed deployment always says which
//! node broke.

use std::path::PathBuf;

use netlab_runtime::RuntimeError;
use thiserror::Error;

use crate::lifecycle::NodeState;
use crate::template::TemplateError;

/// A result type using `NodeError`.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Errors that can occur while driving a node through its lifecycle.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A required field is missing or invalid.
    #[error("node {node}: configuration error: {reason}")]
    Configuration {
        /// The node being configured.
        node: String,
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A directory or file could not be created, read or written.
    #[error("node {node}: filesystem error at {}: {source}", .path.display())]
    Filesystem {
        /// The node owning the artifact.
        node: String,
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The startup configuration template could not be rendered.
    #[error("node {node}: template error: {source}")]
    Template {
        /// The node being rendered.
        node: String,
        /// The rendering failure.
        #[source]
        source: TemplateError,
    },

    /// The container runtime reported a failure.
    #[error("node {node}: runtime error: {source}")]
    Runtime {
        /// The node whose container was targeted.
        node: String,
        /// The gateway error.
        #[source]
        source: RuntimeError,
    },

    /// The version probe output contained no version.
    #[error("node {node}: no version found in probe output {output:?}")]
    Parse {
        /// The probed node.
        node: String,
        /// The beginning of the probe output.
        output: String,
    },

    /// The operation was cancelled through its context.
    #[error("node {node}: operation cancelled")]
    Cancelled {
        /// The node whose operation was cancelled.
        node: String,
    },

    /// A lifecycle method was called out of order.
    #[error("node {node}: invalid lifecycle transition from {from:?} to {to:?}")]
    InvalidState {
        /// The node being transitioned.
        node: String,
        /// The current state.
        from: NodeState,
        /// The requested state.
        to: NodeState,
    },

    /// The operation requires a deployed container.
    #[error("node {node}: container is not deployed (state {state:?})")]
    NotDeployed {
        /// The node.
        node: String,
        /// The current state.
        state: NodeState,
    },

    /// No driver is registered for the requested kind.
    #[error("unknown node kind: {0}")]
    UnknownKind(String),
}

impl NodeError {
    /// The name of the node this error concerns, if any.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::Configuration { node, .. }
            | Self::Filesystem { node, .. }
            | Self::Template { node, .. }
            | Self::Runtime { node, .. }
            | Self::Parse { node, .. }
            | Self::Cancelled { node }
            | Self::InvalidState { node, .. }
            | Self::NotDeployed { node, .. } => Some(node),
            Self::UnknownKind(_) => None,
        }
    }

    /// Whether this error must abort the node's deployment.
    ///
    /// Only a failed version parse is informational.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Parse { .. })
    }

    /// Check if this error might be resolved by retrying the whole call.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Runtime { source, .. } => source.is_retriable(),
            _ => false,
        }
    }

    /// Wrap a gateway error for `node`, turning runtime cancellation into
    /// [`NodeError::Cancelled`].
    #[must_use]
    pub fn from_runtime(node: &str, source: RuntimeError) -> Self {
        match source {
            RuntimeError::Cancelled(_) => Self::Cancelled {
                node: node.to_string(),
            },
            source => Self::Runtime {
                node: node.to_string(),
                source,
            },
        }
    }
}
