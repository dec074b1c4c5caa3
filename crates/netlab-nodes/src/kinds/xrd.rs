//! Cisco XRd driver.
//!
//! XRd boots from a first-boot configuration file and learns its data-plane
//! interfaces from the `XR_INTERFACES` variable, a `;`-separated table that
//! maps each container interface `ethN` to an IOS XR name.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use netlab_core::NodeConfig;
use netlab_runtime::RuntimeGateway;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::base::{KindProfile, NodeBase};
use crate::driver::{NodeDriver, NodeOption, Peers, PreDeployParams};
use crate::env::{interface_mapping_env, InterfaceNaming};
use crate::error::{NodeError, Result};
use crate::lifecycle::NodeState;
use crate::registry::DriverRegistry;

/// Kind names this driver is registered under.
pub const KINDS: &[&str] = &["xrd", "cisco_xrd"];

/// Number of data-plane interfaces exposed to the device.
pub const INTERFACE_COUNT: usize = 90;

/// Variable holding the interface mapping table.
pub const INTERFACES_ENV: &str = "XR_INTERFACES";

const FIRST_BOOT_ENV: &str = "XR_FIRST_BOOT_CONFIG";
const MGMT_INTERFACES_ENV: &str = "XR_MGMT_INTERFACES";
const FIRST_BOOT_PATH: &str = "/etc/xrd/first-boot.cfg";

const NAMING: InterfaceNaming = InterfaceNaming {
    container_prefix: "eth",
    device_key: "xr_name",
    device_prefix: "Gi0/0/0/",
    first_device_index: 0,
};

const PROFILE: KindProfile = KindProfile {
    kind: "xrd",
    default_env: &[
        (FIRST_BOOT_ENV, FIRST_BOOT_PATH),
        (MGMT_INTERFACES_ENV, "linux:eth0,xr_name=Mg0/RP0/CPU0/0,chksum"),
    ],
    required_env: &[FIRST_BOOT_ENV, MGMT_INTERFACES_ENV, INTERFACES_ENV],
    startup_config_mount: FIRST_BOOT_PATH,
    default_cmd: None,
    enforce_startup_config: true,
};

const TEMPLATE: &str = include_str!("../../templates/xrd.conf");

/// The computed `XR_INTERFACES` entry.
#[must_use]
pub fn interface_env() -> BTreeMap<String, String> {
    interface_mapping_env(INTERFACES_ENV, INTERFACE_COUNT, NAMING, ";")
}

/// Register the XRd driver.
pub fn register(registry: &DriverRegistry) {
    registry.register(KINDS, construct);
}

fn construct(runtime: Arc<dyn RuntimeGateway>) -> Box<dyn NodeDriver> {
    Box::new(Xrd::new(runtime))
}

/// Cisco XRd node driver.
pub struct Xrd {
    base: NodeBase,
    params: PreDeployParams,
}

impl Xrd {
    /// Create an uninitialized XRd driver.
    #[must_use]
    pub fn new(runtime: Arc<dyn RuntimeGateway>) -> Self {
        Self {
            base: NodeBase::new(PROFILE, runtime),
            params: PreDeployParams::default(),
        }
    }
}

#[async_trait]
impl NodeDriver for Xrd {
    fn kind(&self) -> &'static str {
        PROFILE.kind
    }

    fn state(&self) -> NodeState {
        self.base.state()
    }

    fn init(&mut self, config: NodeConfig, options: Vec<NodeOption>) -> Result<()> {
        self.base.init(config, options, |_| interface_env())
    }

    fn config(&self) -> &NodeConfig {
        self.base.config()
    }

    fn pre_deploy(&mut self, params: &PreDeployParams) -> Result<()> {
        self.base.pre_deploy(TEMPLATE, params)?;
        self.params = params.clone();
        Ok(())
    }

    async fn deploy(&mut self, ctx: &CancellationToken) -> Result<()> {
        self.base.deploy(ctx).await
    }

    async fn post_deploy(&mut self, _ctx: &CancellationToken, _peers: &Peers<'_>) -> Result<()> {
        self.base.check_transition(NodeState::PostDeployed)?;
        info!(node = %self.base.name(), "Running post-deploy actions for Cisco XRd node");

        // Same path as pre-deploy: the file is overwritten, not merged.
        if let Err(e) = self.base.render_startup_config(TEMPLATE, &self.params) {
            warn!(node = %self.base.name(), error = %e, "Failed to re-render startup configuration");
        }

        self.base.transition(NodeState::PostDeployed)
    }

    async fn save_config(&mut self, _ctx: &CancellationToken) -> Result<()> {
        if !crate::lifecycle::is_deployed(self.base.state()) {
            return Err(NodeError::NotDeployed {
                node: self.base.name().to_string(),
                state: self.base.state(),
            });
        }
        Ok(())
    }

    async fn delete(&mut self, ctx: &CancellationToken) -> Result<()> {
        self.base.delete(ctx).await
    }

    fn images(&self) -> BTreeMap<String, String> {
        self.base.images()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{with_env, with_startup_config};
    use netlab_runtime::MockRuntime;
    use std::fs;

    fn driver() -> (Xrd, Arc<MockRuntime>) {
        let runtime = Arc::new(MockRuntime::new());
        let dyn_runtime: Arc<dyn RuntimeGateway> = runtime.clone();
        (Xrd::new(dyn_runtime), runtime)
    }

    #[test]
    fn init_sets_xrd_environment_and_bind() {
        let (mut xrd, _) = driver();
        xrd.init(NodeConfig::new("r1", "xrd:7.8.1", "/lab/r1"), Vec::new())
            .unwrap();

        let cfg = xrd.config();
        assert_eq!(cfg.env[FIRST_BOOT_ENV], FIRST_BOOT_PATH);
        assert_eq!(cfg.env[INTERFACES_ENV].split(';').count(), INTERFACE_COUNT);
        assert!(cfg
            .binds
            .contains(&"/lab/r1/xrd.conf:/etc/xrd/first-boot.cfg".to_string()));
        assert!(cfg.enforce_startup_config);
        assert_eq!(xrd.images()["image"], "xrd:7.8.1");
    }

    #[test]
    fn explicit_interfaces_override_computed_table() {
        let (mut xrd, _) = driver();
        xrd.init(
            NodeConfig::new("r1", "xrd:7.8.1", "/lab/r1"),
            vec![with_env(INTERFACES_ENV, "linux:eth1,xr_name=Gi0/0/0/0")],
        )
        .unwrap();

        assert_eq!(
            xrd.config().env[INTERFACES_ENV],
            "linux:eth1,xr_name=Gi0/0/0/0"
        );
    }

    #[test]
    fn pre_deploy_renders_hostname() {
        let dir = tempfile::tempdir().unwrap();
        let (mut xrd, _) = driver();
        xrd.init(NodeConfig::new("r1", "xrd:7.8.1", dir.path().join("r1")), Vec::new())
            .unwrap();
        xrd.pre_deploy(&PreDeployParams::new("demo")).unwrap();

        let rendered = fs::read_to_string(dir.path().join("r1").join("xrd.conf")).unwrap();
        assert!(rendered.contains("hostname r1\n"));
        assert!(rendered.contains("(demo)"));
        assert!(!rendered.contains("{{"));
    }

    #[tokio::test]
    async fn post_deploy_rewrites_startup_config() {
        let dir = tempfile::tempdir().unwrap();
        let fragment = dir.path().join("user.cfg");
        fs::write(&fragment, "interface Loopback0").unwrap();

        let (mut xrd, _) = driver();
        let ctx = CancellationToken::new();
        xrd.init(
            NodeConfig::new("r1", "xrd:7.8.1", dir.path().join("r1")),
            vec![with_startup_config(&fragment)],
        )
        .unwrap();
        xrd.pre_deploy(&PreDeployParams::new("demo")).unwrap();
        xrd.deploy(&ctx).await.unwrap();

        let path = dir.path().join("r1").join("xrd.conf");
        let before = fs::read_to_string(&path).unwrap();
        fs::write(&path, "modified at runtime").unwrap();

        xrd.post_deploy(&ctx, &Peers::new()).await.unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(before.ends_with("\ninterface Loopback0"));
        assert_eq!(xrd.state(), NodeState::PostDeployed);
    }

    #[tokio::test]
    async fn save_config_is_noop_once_deployed() {
        let dir = tempfile::tempdir().unwrap();
        let (mut xrd, runtime) = driver();
        let ctx = CancellationToken::new();

        xrd.init(NodeConfig::new("r1", "xrd:7.8.1", dir.path().join("r1")), Vec::new())
            .unwrap();
        assert!(xrd.save_config(&ctx).await.is_err());

        xrd.pre_deploy(&PreDeployParams::default()).unwrap();
        xrd.deploy(&ctx).await.unwrap();
        xrd.save_config(&ctx).await.unwrap();
        assert!(runtime.exec_calls().is_empty());
    }
}
