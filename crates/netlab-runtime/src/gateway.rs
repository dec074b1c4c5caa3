//! The runtime gateway trait.

use async_trait::async_trait;
use netlab_core::{ContainerId, NodeConfig};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Captured output of a command executed inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    /// Standard output, lossily decoded as UTF-8.
    pub stdout: String,
    /// Standard error, lossily decoded as UTF-8.
    pub stderr: String,
    /// Exit code of the command, if it exited normally.
    pub exit_code: Option<i32>,
}

impl ExecOutput {
    /// Build a successful output with the given stdout.
    #[must_use]
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Whether the command exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// The `RuntimeGateway` trait is the only way node drivers act on containers.
#[async_trait]
pub trait RuntimeGateway: Send + Sync {
    /// Execute `command` inside the running container `container_name`.
    ///
    /// A non-zero exit status is not an error; inspect [`ExecOutput::exit_code`].
    ///
    /// # Errors
    ///
    /// Returns an error if the container does not exist or the runtime fails.
    async fn exec(
        &self,
        ctx: &CancellationToken,
        container_name: &str,
        command: &[String],
    ) -> Result<ExecOutput>;

    /// Create (but do not start) a container for `config`.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Conflict` if a container named
    /// `config.long_name` already exists.
    async fn create_container(
        &self,
        ctx: &CancellationToken,
        config: &NodeConfig,
    ) -> Result<ContainerId>;

    /// Start a previously created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or fails to start.
    async fn start_container(
        &self,
        ctx: &CancellationToken,
        container_id: &ContainerId,
        config: &NodeConfig,
    ) -> Result<()>;

    /// Delete the container named `container_name`, stopping it first.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::NotFound` if no such container exists.
    async fn delete_container(&self, ctx: &CancellationToken, container_name: &str) -> Result<()>;
}
