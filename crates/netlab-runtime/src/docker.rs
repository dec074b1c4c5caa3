//! Docker CLI runtime gateway.
//!
//! This module provides [`DockerCli`], a [`RuntimeGateway`] that drives the
//! `docker` binary. Each call spawns one CLI process; the child is killed when
//! the call's future is dropped, so cancellation never leaves a stray process.

use std::process::Output;

use async_trait::async_trait;
use netlab_core::{ContainerId, NodeConfig};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gateway::{ExecOutput, RuntimeGateway};
use crate::{Result, RuntimeError};

/// Label key carrying the node's short name.
pub const NODE_LABEL: &str = "netlab.node";
/// Label key carrying the node's kind.
pub const KIND_LABEL: &str = "netlab.kind";

/// Configuration for the Docker CLI gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Path or name of the docker binary.
    pub binary: String,
    /// Run node containers privileged (network OS images require it).
    pub privileged: bool,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            privileged: true,
        }
    }
}

impl DockerConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `NETLAB_DOCKER_BIN`: docker binary to invoke
    /// - `NETLAB_DOCKER_PRIVILEGED`: `false`/`0` disables privileged containers
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("NETLAB_DOCKER_BIN") {
            if !val.trim().is_empty() {
                config.binary = val;
            }
        }
        if let Ok(val) = std::env::var("NETLAB_DOCKER_PRIVILEGED") {
            config.privileged = !matches!(val.to_lowercase().as_str(), "false" | "0" | "no");
        }

        config
    }
}

/// Runtime gateway backed by the docker command line.
#[derive(Debug, Clone, Default)]
pub struct DockerCli {
    config: DockerConfig,
}

impl DockerCli {
    /// Create a gateway with the given configuration.
    #[must_use]
    pub fn new(config: DockerConfig) -> Self {
        Self { config }
    }

    /// Get a reference to the gateway config.
    #[must_use]
    pub fn config(&self) -> &DockerConfig {
        &self.config
    }

    /// Build the `docker create` argument list for a node.
    ///
    /// `cmd` is appended as whitespace-separated arguments without shell
    /// quote handling.
    #[must_use]
    pub fn create_args(&self, cfg: &NodeConfig) -> Vec<String> {
        let mut args = vec![
            "create".to_string(),
            "--name".to_string(),
            cfg.long_name.clone(),
            "--hostname".to_string(),
            cfg.short_name.clone(),
            "--label".to_string(),
            format!("{NODE_LABEL}={}", cfg.short_name),
        ];

        if !cfg.kind.is_empty() {
            args.push("--label".to_string());
            args.push(format!("{KIND_LABEL}={}", cfg.kind));
        }
        if self.config.privileged {
            args.push("--privileged".to_string());
        }
        for (key, value) in &cfg.env {
            args.push("--env".to_string());
            args.push(format!("{key}={value}"));
        }
        for bind in &cfg.binds {
            args.push("--volume".to_string());
            args.push(bind.clone());
        }
        if let Some(network) = cfg.mgmt_network() {
            args.push("--network".to_string());
            args.push(network.to_string());
            if let Some(ip) = &cfg.mgmt_ipv4_address {
                args.push("--ip".to_string());
                args.push(ip.clone());
            }
            if let Some(ip) = &cfg.mgmt_ipv6_address {
                args.push("--ip6".to_string());
                args.push(ip.clone());
            }
        }

        args.push(cfg.image.clone());
        if let Some(cmd) = &cfg.cmd {
            args.extend(cmd.split_whitespace().map(str::to_string));
        }

        args
    }

    async fn run(&self, ctx: &CancellationToken, args: &[String]) -> Result<Output> {
        debug!(binary = %self.config.binary, ?args, "Invoking docker");

        let child = Command::new(&self.config.binary)
            .args(args)
            .kill_on_drop(true)
            .output();

        tokio::select! {
            biased;
            () = ctx.cancelled() => Err(RuntimeError::Cancelled(args.first().cloned().unwrap_or_default())),
            out = child => Ok(out?),
        }
    }
}

/// Map docker's stderr to a gateway error.
fn classify_failure(operation: &'static str, container: &str, stderr: &str) -> RuntimeError {
    if stderr.contains("No such container") {
        RuntimeError::NotFound(container.to_string())
    } else if stderr.contains("is already in use") || stderr.contains("Conflict") {
        RuntimeError::Conflict(container.to_string())
    } else {
        RuntimeError::CommandFailed {
            operation,
            container: container.to_string(),
            message: stderr.trim().to_string(),
        }
    }
}

#[async_trait]
impl RuntimeGateway for DockerCli {
    async fn exec(
        &self,
        ctx: &CancellationToken,
        container_name: &str,
        command: &[String],
    ) -> Result<ExecOutput> {
        let mut args = vec!["exec".to_string(), container_name.to_string()];
        args.extend_from_slice(command);

        let out = self.run(ctx, &args).await?;
        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&out.stderr).into_owned();

        if !out.status.success()
            && (stderr.contains("No such container") || stderr.contains("is not running"))
        {
            return Err(classify_failure("exec", container_name, &stderr));
        }

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: out.status.code(),
        })
    }

    async fn create_container(
        &self,
        ctx: &CancellationToken,
        config: &NodeConfig,
    ) -> Result<ContainerId> {
        let out = self.run(ctx, &self.create_args(config)).await?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(classify_failure("create", &config.long_name, &stderr));
        }

        let id = ContainerId::new(String::from_utf8_lossy(&out.stdout).trim());
        info!(container = %config.long_name, id = %id.short(), "Created container");
        Ok(id)
    }

    async fn start_container(
        &self,
        ctx: &CancellationToken,
        container_id: &ContainerId,
        config: &NodeConfig,
    ) -> Result<()> {
        let args = ["start".to_string(), container_id.to_string()];
        let out = self.run(ctx, &args).await?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(classify_failure("start", &config.long_name, &stderr));
        }

        info!(container = %config.long_name, "Started container");
        Ok(())
    }

    async fn delete_container(&self, ctx: &CancellationToken, container_name: &str) -> Result<()> {
        let args = [
            "rm".to_string(),
            "--force".to_string(),
            container_name.to_string(),
        ];
        let out = self.run(ctx, &args).await?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let err = classify_failure("delete", container_name, &stderr);
            if err.is_not_found() {
                warn!(container = container_name, "Container not found, already deleted");
            }
            return Err(err);
        }

        info!(container = container_name, "Deleted container");
        Ok(())
    }
}
