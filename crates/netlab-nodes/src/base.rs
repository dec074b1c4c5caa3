//! Behaviour shared by every node kind.
//!
//! Kinds embed a [`NodeBase`] and describe themselves with a static
//! [`KindProfile`]. The base owns the node configuration, the runtime handle
//! and the lifecycle state, and implements the generic steps: configuration
//! finalization, lab directory creation, startup configuration rendering and
//! the guarded runtime calls.

use std::collections::BTreeMap;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use netlab_core::{merge_string_maps, ContainerId, CoreError, NodeConfig};
use netlab_runtime::{ExecOutput, RuntimeGateway};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::driver::{NodeOption, PreDeployParams, IMAGE_KEY};
use crate::env::{env_from_pairs, merge_absent};
use crate::error::{NodeError, Result};
use crate::lifecycle::{is_deployed, validate_transition, NodeState};
use crate::template::{context_for, materialize, render};

/// Static description of a node kind's defaults.
#[derive(Debug, Clone, Copy)]
pub struct KindProfile {
    /// Kind identifier, also the startup configuration file stem.
    pub kind: &'static str,
    /// Environment applied before options.
    pub default_env: &'static [(&'static str, &'static str)],
    /// Variables that must be non-empty once init completes.
    pub required_env: &'static [&'static str],
    /// Container-side path the rendered startup configuration is mounted at.
    pub startup_config_mount: &'static str,
    /// Container command used when none is configured.
    pub default_cmd: Option<&'static str>,
    /// Whether the runtime must load the rendered configuration.
    pub enforce_startup_config: bool,
}

impl KindProfile {
    /// File name of the rendered startup configuration (`<kind>.conf`).
    #[must_use]
    pub fn startup_config_file(&self) -> String {
        format!("{}.conf", self.kind)
    }
}

/// State and helpers common to all node drivers.
pub struct NodeBase {
    profile: KindProfile,
    cfg: NodeConfig,
    runtime: Arc<dyn RuntimeGateway>,
    state: NodeState,
    container_id: Option<ContainerId>,
}

impl NodeBase {
    /// Create an uninitialized base for a kind.
    #[must_use]
    pub fn new(profile: KindProfile, runtime: Arc<dyn RuntimeGateway>) -> Self {
        Self {
            profile,
            cfg: NodeConfig::default(),
            runtime,
            state: NodeState::Uninitialized,
            container_id: None,
        }
    }

    /// The kind profile.
    #[must_use]
    pub fn profile(&self) -> &KindProfile {
        &self.profile
    }

    /// The node configuration.
    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.cfg
    }

    /// The node's short name, for logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.cfg.short_name.is_empty() {
            "<unnamed>"
        } else {
            &self.cfg.short_name
        }
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// The container handle, once deployed.
    #[must_use]
    pub fn container_id(&self) -> Option<&ContainerId> {
        self.container_id.as_ref()
    }

    /// Images used by the node, keyed by role.
    #[must_use]
    pub fn images(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(IMAGE_KEY.to_string(), self.cfg.image.clone())])
    }

    /// Move to `to` if the lifecycle allows it.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::InvalidState` otherwise.
    pub fn transition(&mut self, to: NodeState) -> Result<()> {
        self.state = validate_transition(self.name(), self.state, to)?;
        Ok(())
    }

    /// Check that `to` is reachable without moving there.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::InvalidState` otherwise.
    pub fn check_transition(&self, to: NodeState) -> Result<()> {
        validate_transition(self.name(), self.state, to).map(|_| ())
    }

    /// Finalize the configuration.
    ///
    /// Order: kind defaults (explicit config values win), then `options` in
    /// sequence, then the startup configuration path and bind from the final
    /// `lab_dir`, then `computed` for keys that are still absent.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Configuration` if a required field or variable is
    /// missing.
    pub fn init(
        &mut self,
        config: NodeConfig,
        options: Vec<NodeOption>,
        computed: impl FnOnce(&NodeConfig) -> BTreeMap<String, String>,
    ) -> Result<()> {
        self.check_transition(NodeState::Initialized)?;

        let mut cfg = config;
        let node = cfg.short_name.clone();
        cfg.validate_required()
            .map_err(|e| configuration_error(&node, &e))?;

        cfg.kind = self.profile.kind.to_string();
        cfg.env = merge_string_maps(&env_from_pairs(self.profile.default_env), &cfg.env);
        if cfg.cmd.is_none() {
            cfg.cmd = self.profile.default_cmd.map(str::to_string);
        }

        cfg.enforce_startup_config = self.profile.enforce_startup_config;

        for option in options {
            option(&mut cfg);
        }

        // Derived from the lab_dir the options left behind.
        let startup_path = cfg.lab_path(&self.profile.startup_config_file());
        cfg.add_bind(format!(
            "{}:{}",
            startup_path.display(),
            self.profile.startup_config_mount
        ));
        cfg.set_resolved_startup_config(startup_path)
            .map_err(|e| configuration_error(&node, &e))?;

        let derived = computed(&cfg);
        merge_absent(&mut cfg.env, derived);

        cfg.validate_required()
            .and_then(|()| cfg.require_env(self.profile.required_env))
            .map_err(|e| configuration_error(&node, &e))?;

        self.cfg = cfg;
        self.transition(NodeState::Initialized)?;

        info!(
            node = %self.name(),
            kind = self.profile.kind,
            image = %self.cfg.image,
            env_vars = self.cfg.env.len(),
            binds = self.cfg.binds.len(),
            "Initialized node"
        );
        Ok(())
    }

    /// Create the lab directory. Succeeds if it already exists.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Filesystem` if the directory cannot be created.
    pub fn prepare_lab_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.cfg.lab_dir).map_err(|source| NodeError::Filesystem {
            node: self.name().to_string(),
            path: self.cfg.lab_dir.clone(),
            source,
        })
    }

    /// Render `template` to the resolved startup configuration path and
    /// append the user fragment, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Filesystem` if the fragment cannot be read or the
    /// file cannot be written, `NodeError::Template` if rendering fails.
    pub fn render_startup_config(&self, template: &str, params: &PreDeployParams) -> Result<()> {
        let Some(dest) = self.cfg.resolved_startup_config.as_deref() else {
            return Err(NodeError::Configuration {
                node: self.name().to_string(),
                reason: "startup configuration path is not resolved".to_string(),
            });
        };

        let fragment = match self.cfg.startup_source() {
            Some(source) => Some(self.read_fragment(source)?),
            None => None,
        };

        let rendered = render(template, &context_for(&self.cfg, params)).map_err(|source| {
            NodeError::Template {
                node: self.name().to_string(),
                source,
            }
        })?;

        materialize(dest, &rendered, fragment.as_deref()).map_err(|source| {
            NodeError::Filesystem {
                node: self.name().to_string(),
                path: dest.to_path_buf(),
                source,
            }
        })?;

        debug!(
            node = %self.name(),
            path = %dest.display(),
            user_fragment = fragment.is_some(),
            "Rendered startup configuration"
        );
        Ok(())
    }

    /// The generic pre-deploy phase: lab directory, then startup configuration.
    ///
    /// # Errors
    ///
    /// See [`Self::prepare_lab_dir`] and [`Self::render_startup_config`].
    pub fn pre_deploy(&mut self, template: &str, params: &PreDeployParams) -> Result<()> {
        self.check_transition(NodeState::PreDeployed)?;
        self.prepare_lab_dir()?;
        self.render_startup_config(template, params)?;
        self.transition(NodeState::PreDeployed)
    }

    /// Create then start the container.
    ///
    /// If start fails or is cancelled, the created container is removed again
    /// so the node stays `PreDeployed` with nothing left in the runtime.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Runtime` or `NodeError::Cancelled`.
    pub async fn deploy(&mut self, ctx: &CancellationToken) -> Result<()> {
        self.check_transition(NodeState::Deployed)?;

        let runtime = Arc::clone(&self.runtime);
        let id = guarded(self.name(), ctx, runtime.create_container(ctx, &self.cfg)).await?;
        let started = guarded(self.name(), ctx, runtime.start_container(ctx, &id, &self.cfg)).await;
        if let Err(e) = started {
            self.discard_created(&id).await;
            return Err(e);
        }

        info!(node = %self.name(), container = %self.cfg.long_name, id = %id.short(), "Deployed node");
        self.container_id = Some(id);
        self.transition(NodeState::Deployed)
    }

    /// Remove a container whose start did not complete.
    ///
    /// Runs on a fresh token: the caller's token may be the reason start
    /// failed.
    async fn discard_created(&self, id: &ContainerId) {
        let cleanup = CancellationToken::new();
        match self.runtime.delete_container(&cleanup, &self.cfg.long_name).await {
            Ok(()) => {
                warn!(node = %self.name(), container = %self.cfg.long_name, id = %id.short(), "Removed container after failed start");
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(node = %self.name(), container = %self.cfg.long_name, error = %e, "Failed to remove container after failed start");
            }
        }
    }

    /// Delete the container by its long name. An absent container is success.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Runtime` or `NodeError::Cancelled`.
    pub async fn delete(&mut self, ctx: &CancellationToken) -> Result<()> {
        self.check_transition(NodeState::Deleted)?;

        let runtime = Arc::clone(&self.runtime);
        match guarded(self.name(), ctx, runtime.delete_container(ctx, &self.cfg.long_name)).await {
            Ok(()) => info!(node = %self.name(), container = %self.cfg.long_name, "Deleted node"),
            Err(NodeError::Runtime { source, .. }) if source.is_not_found() => {
                warn!(node = %self.name(), container = %self.cfg.long_name, "Container not found, already deleted");
            }
            Err(e) => return Err(e),
        }

        self.container_id = None;
        self.transition(NodeState::Deleted)
    }

    /// Execute a command inside the running container.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::NotDeployed` before deploy, otherwise the gateway
    /// error.
    pub async fn exec(&self, ctx: &CancellationToken, command: &[String]) -> Result<ExecOutput> {
        if !is_deployed(self.state) {
            return Err(NodeError::NotDeployed {
                node: self.name().to_string(),
                state: self.state,
            });
        }
        guarded(
            self.name(),
            ctx,
            self.runtime.exec(ctx, &self.cfg.long_name, command),
        )
        .await
    }

    /// Write a file into the lab directory.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Filesystem` on failure.
    pub fn write_lab_file(&self, file_name: &str, contents: &str) -> Result<()> {
        let path = self.cfg.lab_path(file_name);
        fs::write(&path, contents).map_err(|source| NodeError::Filesystem {
            node: self.name().to_string(),
            path,
            source,
        })
    }

    fn read_fragment(&self, source: &Path) -> Result<String> {
        fs::read_to_string(source).map_err(|e| NodeError::Filesystem {
            node: self.name().to_string(),
            path: source.to_path_buf(),
            source: e,
        })
    }
}

/// Race a gateway call against cancellation of `ctx`.
async fn guarded<T, F>(node: &str, ctx: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = netlab_runtime::Result<T>>,
{
    tokio::select! {
        biased;
        () = ctx.cancelled() => Err(NodeError::Cancelled { node: node.to_string() }),
        res = call => res.map_err(|e| NodeError::from_runtime(node, e)),
    }
}

fn configuration_error(node: &str, err: &CoreError) -> NodeError {
    NodeError::Configuration {
        node: if node.is_empty() {
            "<unnamed>".to_string()
        } else {
            node.to_string()
        },
        reason: err.to_string(),
    }
}
