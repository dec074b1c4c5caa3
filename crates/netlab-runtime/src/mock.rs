//! A mock runtime for testing without a container engine.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use netlab_core::{ContainerId, NodeConfig};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::gateway::{ExecOutput, RuntimeGateway};
use crate::{Result, RuntimeError};

/// A mock runtime that stores containers in memory.
#[derive(Default)]
pub struct MockRuntime {
    containers: Mutex<HashMap<String, MockContainer>>,
    exec_outputs: Mutex<HashMap<String, ExecOutput>>,
    exec_calls: Mutex<Vec<(String, Vec<String>)>>,
    failures: Mutex<HashMap<&'static str, String>>,
    hanging: Mutex<HashSet<&'static str>>,
    next_id: AtomicU64,
}

struct MockContainer {
    id: ContainerId,
    running: bool,
    config: NodeConfig,
}

impl MockRuntime {
    /// Create a new mock runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output returned by `exec` against `container_name`.
    pub fn set_exec_output(&self, container_name: &str, output: ExecOutput) {
        self.exec_outputs
            .lock()
            .insert(container_name.to_string(), output);
    }

    /// Make the next call of `operation` fail with `CommandFailed`.
    ///
    /// `operation` is one of `create`, `start`, `exec`, `delete`.
    pub fn fail_next(&self, operation: &'static str, message: impl Into<String>) {
        self.failures.lock().insert(operation, message.into());
    }

    /// Make every call of `operation` block until its token is cancelled.
    pub fn hang_on(&self, operation: &'static str) {
        self.hanging.lock().insert(operation);
    }

    /// Get the number of existing containers.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.lock().len()
    }

    /// Whether the named container exists and has been started.
    #[must_use]
    pub fn is_running(&self, container_name: &str) -> bool {
        self.containers
            .lock()
            .get(container_name)
            .is_some_and(|c| c.running)
    }

    /// Get the configuration a container was created with.
    #[must_use]
    pub fn container_config(&self, container_name: &str) -> Option<NodeConfig> {
        self.containers
            .lock()
            .get(container_name)
            .map(|c| c.config.clone())
    }

    /// Get every `exec` call made so far, as `(container, command)`.
    #[must_use]
    pub fn exec_calls(&self) -> Vec<(String, Vec<String>)> {
        self.exec_calls.lock().clone()
    }

    async fn enter(&self, ctx: &CancellationToken, operation: &'static str, target: &str) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(RuntimeError::Cancelled(operation.to_string()));
        }
        let hangs = self.hanging.lock().contains(operation);
        if hangs {
            ctx.cancelled().await;
            return Err(RuntimeError::Cancelled(operation.to_string()));
        }
        if let Some(message) = self.failures.lock().remove(operation) {
            return Err(RuntimeError::CommandFailed {
                operation,
                container: target.to_string(),
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RuntimeGateway for MockRuntime {
    async fn exec(
        &self,
        ctx: &CancellationToken,
        container_name: &str,
        command: &[String],
    ) -> Result<ExecOutput> {
        self.enter(ctx, "exec", container_name).await?;

        if !self.is_running(container_name) {
            return Err(RuntimeError::NotFound(container_name.to_string()));
        }

        self.exec_calls
            .lock()
            .push((container_name.to_string(), command.to_vec()));

        Ok(self
            .exec_outputs
            .lock()
            .get(container_name)
            .cloned()
            .unwrap_or_else(|| ExecOutput::stdout("")))
    }

    async fn create_container(
        &self,
        ctx: &CancellationToken,
        config: &NodeConfig,
    ) -> Result<ContainerId> {
        self.enter(ctx, "create", &config.long_name).await?;

        let mut containers = self.containers.lock();
        if containers.contains_key(&config.long_name) {
            return Err(RuntimeError::Conflict(config.long_name.clone()));
        }

        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = ContainerId::new(format!("mock-{n}"));
        containers.insert(
            config.long_name.clone(),
            MockContainer {
                id: id.clone(),
                running: false,
                config: config.clone(),
            },
        );

        Ok(id)
    }

    async fn start_container(
        &self,
        ctx: &CancellationToken,
        container_id: &ContainerId,
        config: &NodeConfig,
    ) -> Result<()> {
        self.enter(ctx, "start", &config.long_name).await?;

        let mut containers = self.containers.lock();
        match containers.values_mut().find(|c| &c.id == container_id) {
            Some(container) => {
                container.running = true;
                Ok(())
            }
            None => Err(RuntimeError::NotFound(container_id.to_string())),
        }
    }

    async fn delete_container(&self, ctx: &CancellationToken, container_name: &str) -> Result<()> {
        self.enter(ctx, "delete", container_name).await?;

        match self.containers.lock().remove(container_name) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::NotFound(container_name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> NodeConfig {
        NodeConfig::new("r1", "img", "/lab/r1")
    }

    #[tokio::test]
    async fn mock_create_start_delete() {
        let runtime = MockRuntime::new();
        let ctx = CancellationToken::new();
        let cfg = test_config();

        let id = runtime.create_container(&ctx, &cfg).await.unwrap();
        assert_eq!(runtime.container_count(), 1);
        assert!(!runtime.is_running("r1"));

        runtime.start_container(&ctx, &id, &cfg).await.unwrap();
        assert!(runtime.is_running("r1"));

        runtime.delete_container(&ctx, "r1").await.unwrap();
        assert_eq!(runtime.container_count(), 0);

        let err = runtime.delete_container(&ctx, "r1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn mock_create_conflicts_on_existing_name() {
        let runtime = MockRuntime::new();
        let ctx = CancellationToken::new();
        let cfg = test_config();

        runtime.create_container(&ctx, &cfg).await.unwrap();
        let err = runtime.create_container(&ctx, &cfg).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Conflict(name) if name == "r1"));
        assert_eq!(runtime.container_count(), 1);
    }

    #[tokio::test]
    async fn mock_exec_requires_running_container() {
        let runtime = MockRuntime::new();
        let ctx = CancellationToken::new();
        let cfg = test_config();
        let cmd = vec!["echo".to_string()];

        assert!(runtime.exec(&ctx, "r1", &cmd).await.is_err());

        let id = runtime.create_container(&ctx, &cfg).await.unwrap();
        runtime.start_container(&ctx, &id, &cfg).await.unwrap();
        runtime.set_exec_output("r1", ExecOutput::stdout("hello"));

        let out = runtime.exec(&ctx, "r1", &cmd).await.unwrap();
        assert_eq!(out.stdout, "hello");
        assert!(out.success());
        assert_eq!(runtime.exec_calls(), vec![("r1".to_string(), cmd)]);
    }

    #[tokio::test]
    async fn mock_fail_next_is_one_shot() {
        let runtime = MockRuntime::new();
        let ctx = CancellationToken::new();
        let cfg = test_config();

        runtime.fail_next("create", "boom");
        assert!(matches!(
            runtime.create_container(&ctx, &cfg).await,
            Err(RuntimeError::CommandFailed { operation: "create", .. })
        ));
        assert!(runtime.create_container(&ctx, &cfg).await.is_ok());
    }

    #[tokio::test]
    async fn mock_hang_until_cancelled() {
        let runtime = MockRuntime::new();
        let ctx = CancellationToken::new();
        let cfg = test_config();
        runtime.hang_on("create");

        let cancel = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            cancel.cancel();
        });

        let err = runtime.create_container(&ctx, &cfg).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Cancelled(_)));
        assert_eq!(runtime.container_count(), 0);
    }
}
