//! The node driver trait and its call parameters.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use netlab_core::{is_unset_source, MgmtNet, NodeConfig};
use tokio_util::sync::CancellationToken;

use crate::lifecycle::NodeState;
use crate::Result;

/// Image role key used by [`NodeDriver::images`] for the node's main image.
pub const IMAGE_KEY: &str = "image";

/// A configuration mutator applied during [`NodeDriver::init`].
///
/// Options run in order after the kind defaults, so a later option overrides
/// an earlier one.
pub type NodeOption = Box<dyn FnOnce(&mut NodeConfig) + Send>;

/// Read-only view of the sibling nodes of a topology, keyed by short name.
pub type Peers<'a> = BTreeMap<String, &'a dyn NodeDriver>;

/// Parameters for the pre-deploy phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreDeployParams {
    /// Name of the lab the node belongs to.
    pub lab_name: String,
}

impl PreDeployParams {
    /// Create parameters for the given lab.
    #[must_use]
    pub fn new(lab_name: impl Into<String>) -> Self {
        Self {
            lab_name: lab_name.into(),
        }
    }
}

/// Set (or replace) an environment variable.
#[must_use]
pub fn with_env(key: impl Into<String>, value: impl Into<String>) -> NodeOption {
    let (key, value) = (key.into(), value.into());
    Box::new(move |cfg: &mut NodeConfig| {
        cfg.env.insert(key, value);
    })
}

/// Attach the node to a management network.
#[must_use]
pub fn with_mgmt_net(mgmt: MgmtNet) -> NodeOption {
    Box::new(move |cfg: &mut NodeConfig| cfg.mgmt_net = Some(mgmt))
}

/// Add a bind mount.
#[must_use]
pub fn with_bind(bind: impl Into<String>) -> NodeOption {
    let bind = bind.into();
    Box::new(move |cfg: &mut NodeConfig| cfg.add_bind(bind))
}

/// Use a user-supplied startup configuration fragment.
///
/// An empty path or `none` clears any fragment set earlier.
#[must_use]
pub fn with_startup_config(path: impl Into<PathBuf>) -> NodeOption {
    let path = path.into();
    let source = (!path.to_str().is_some_and(is_unset_source)).then_some(path);
    Box::new(move |cfg: &mut NodeConfig| cfg.startup_config = source)
}

/// Override the container command.
#[must_use]
pub fn with_cmd(cmd: impl Into<String>) -> NodeOption {
    let cmd = cmd.into();
    Box::new(move |cfg: &mut NodeConfig| cfg.cmd = Some(cmd))
}

/// The `NodeDriver` trait is the lifecycle contract every node kind implements.
///
/// Methods must be called in lifecycle order (see [`crate::lifecycle`]); an
/// out-of-order call fails with `NodeError::InvalidState`. Taking `&mut self`
/// keeps calls on one driver sequential, while separate drivers can run their
/// lifecycles concurrently.
#[async_trait]
pub trait NodeDriver: Send + Sync {
    /// The kind identifier this driver was registered under.
    fn kind(&self) -> &'static str;

    /// The current lifecycle state.
    fn state(&self) -> NodeState;

    /// Finalize the configuration: kind defaults, then `options` in order,
    /// then computed environment for keys still absent.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Configuration` if a required field is missing.
    fn init(&mut self, config: NodeConfig, options: Vec<NodeOption>) -> Result<()>;

    /// The finalized node configuration.
    fn config(&self) -> &NodeConfig;

    /// Prepare the lab directory and render the startup configuration.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Filesystem` or `NodeError::Template` on failure.
    fn pre_deploy(&mut self, params: &PreDeployParams) -> Result<()>;

    /// Create and start the node's container.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Runtime` wrapping the gateway failure, or
    /// `NodeError::Cancelled` if `ctx` is cancelled first.
    async fn deploy(&mut self, ctx: &CancellationToken) -> Result<()>;

    /// Run kind-specific actions against the running container.
    ///
    /// Failures are logged, not returned: the container may already be
    /// serving traffic.
    ///
    /// # Errors
    ///
    /// Returns only `NodeError::Cancelled` or `NodeError::InvalidState`.
    async fn post_deploy(&mut self, ctx: &CancellationToken, peers: &Peers<'_>) -> Result<()>;

    /// Persist the device's running configuration, if the kind supports it.
    ///
    /// # Errors
    ///
    /// Returns an error if the save command fails.
    async fn save_config(&mut self, ctx: &CancellationToken) -> Result<()>;

    /// Delete the node's container. Deleting an absent container succeeds.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Runtime` for any other gateway failure.
    async fn delete(&mut self, ctx: &CancellationToken) -> Result<()>;

    /// Images used by this node, keyed by role.
    fn images(&self) -> BTreeMap<String, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_apply_in_order() {
        let mut cfg = NodeConfig::new("r1", "img", "/lab/r1");
        let options = vec![
            with_env("A", "first"),
            with_env("A", "second"),
            with_bind("/x:/y"),
            with_cmd("/bin/true"),
        ];
        for option in options {
            option(&mut cfg);
        }

        assert_eq!(cfg.env["A"], "second");
        assert_eq!(cfg.binds, vec!["/x:/y".to_string()]);
        assert_eq!(cfg.cmd.as_deref(), Some("/bin/true"));
    }

    #[test]
    fn mgmt_and_startup_options() {
        let mut cfg = NodeConfig::new("r1", "img", "/lab/r1");
        with_mgmt_net(MgmtNet {
            network: "netlab".to_string(),
            ..Default::default()
        })(&mut cfg);
        with_startup_config("/cfg/r1.cfg")(&mut cfg);

        assert_eq!(cfg.mgmt_network(), Some("netlab"));
        assert_eq!(cfg.startup_config, Some(PathBuf::from("/cfg/r1.cfg")));

        with_startup_config("None")(&mut cfg);
        assert_eq!(cfg.startup_config, None);
    }
}
