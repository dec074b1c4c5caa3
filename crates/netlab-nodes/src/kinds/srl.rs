//! Nokia SR Linux driver.
//!
//! After boot the driver asks the device for its version and renders the
//! welcome banner with documentation links for that release.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use netlab_core::NodeConfig;
use netlab_runtime::RuntimeGateway;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::base::{KindProfile, NodeBase};
use crate::driver::{NodeDriver, NodeOption, Peers, PreDeployParams};
use crate::error::{NodeError, Result};
use crate::lifecycle::{is_deployed, NodeState};
use crate::registry::DriverRegistry;
use crate::version::{VersionInfo, VersionProbe};

/// Kind names this driver is registered under.
pub const KINDS: &[&str] = &["srl", "nokia_srlinux"];

/// File in the lab directory the banner is written to.
pub const BANNER_FILE: &str = "banner.txt";

const VERSION_COMMAND: &[&str] = &[
    "sr_cli",
    "-d",
    "info from state /system information version | grep version",
];

const SAVE_COMMAND: &[&str] = &["sr_cli", "-d", "tools system configuration save"];

const PROFILE: KindProfile = KindProfile {
    kind: "srl",
    default_env: &[("SRLINUX", "1")],
    required_env: &["SRLINUX"],
    startup_config_mount: "/etc/opt/srlinux/startup.cli:ro",
    default_cmd: Some("sudo bash -c /opt/srlinux/bin/sr_linux"),
    enforce_startup_config: true,
};

const TEMPLATE: &str = include_str!("../../templates/srl.conf");

/// Register the SR Linux driver.
pub fn register(registry: &DriverRegistry) {
    registry.register(KINDS, construct);
}

fn construct(runtime: Arc<dyn RuntimeGateway>) -> Box<dyn NodeDriver> {
    Box::new(Srl::new(runtime))
}

/// Format the welcome banner for a device version.
#[must_use]
pub fn banner(version: &VersionInfo) -> String {
    let VersionInfo {
        major,
        minor,
        patch,
    } = version.aligned();

    format!(
        concat!(
            "................................................................\n",
            ":                  Welcome to Nokia SR Linux!                  :\n",
            ":              Open Network OS for the NetOps era.             :\n",
            ":                                                              :\n",
            ":    This is a freely distributed official container image.    :\n",
            ":                      Use it - Share it                       :\n",
            ":                                                              :\n",
            ": Get started: https://learn.srlinux.dev                       :\n",
            ": Container:   https://go.srlinux.dev/container-image          :\n",
            ": Docs:        https://doc.srlinux.dev/{major}-{minor:<2}                   :\n",
            ": Rel. notes:  https://doc.srlinux.dev/rn{major}-{minor}-{patch}               :\n",
            ": YANG:        https://yang.srlinux.dev/v{major}.{minor}.{patch}               :\n",
            ": Discord:     https://go.srlinux.dev/discord                  :\n",
            ": Contact:     https://go.srlinux.dev/contact-sales            :\n",
            "................................................................\n",
        ),
        major = major,
        minor = minor,
        patch = patch,
    )
}

/// Nokia SR Linux node driver.
pub struct Srl {
    base: NodeBase,
    probe: VersionProbe,
}

impl Srl {
    /// Create an uninitialized SR Linux driver.
    #[must_use]
    pub fn new(runtime: Arc<dyn RuntimeGateway>) -> Self {
        Self {
            base: NodeBase::new(PROFILE, runtime),
            probe: VersionProbe::new(VERSION_COMMAND),
        }
    }

    async fn publish_banner(&self, ctx: &CancellationToken) -> Result<()> {
        let version = self.probe.run(&self.base, ctx).await?;
        let text = banner(&version);

        info!(
            node = %self.base.name(),
            version = %format!("{}.{}.{}", version.major, version.minor, version.patch),
            "SR Linux node is up\n{text}"
        );
        self.base.write_lab_file(BANNER_FILE, &text)
    }
}

#[async_trait]
impl NodeDriver for Srl {
    fn kind(&self) -> &'static str {
        PROFILE.kind
    }

    fn state(&self) -> NodeState {
        self.base.state()
    }

    fn init(&mut self, config: NodeConfig, options: Vec<NodeOption>) -> Result<()> {
        self.base.init(config, options, |_| BTreeMap::new())
    }

    fn config(&self) -> &NodeConfig {
        self.base.config()
    }

    fn pre_deploy(&mut self, params: &PreDeployParams) -> Result<()> {
        self.base.pre_deploy(TEMPLATE, params)
    }

    async fn deploy(&mut self, ctx: &CancellationToken) -> Result<()> {
        self.base.deploy(ctx).await
    }

    async fn post_deploy(&mut self, ctx: &CancellationToken, _peers: &Peers<'_>) -> Result<()> {
        self.base.check_transition(NodeState::PostDeployed)?;

        match self.publish_banner(ctx).await {
            Ok(()) => {}
            Err(e @ NodeError::Cancelled { .. }) => return Err(e),
            Err(e) => {
                warn!(node = %self.base.name(), error = %e, "Post-deploy banner step failed");
            }
        }

        self.base.transition(NodeState::PostDeployed)
    }

    async fn save_config(&mut self, ctx: &CancellationToken) -> Result<()> {
        if !is_deployed(self.base.state()) {
            return Err(NodeError::NotDeployed {
                node: self.base.name().to_string(),
                state: self.base.state(),
            });
        }

        let command: Vec<String> = SAVE_COMMAND.iter().map(|s| (*s).to_string()).collect();
        let out = self.base.exec(ctx, &command).await?;
        if !out.success() {
            return Err(NodeError::Runtime {
                node: self.base.name().to_string(),
                source: netlab_runtime::RuntimeError::CommandFailed {
                    operation: "exec",
                    container: self.base.config().long_name.clone(),
                    message: out.stderr.trim().to_string(),
                },
            });
        }

        info!(node = %self.base.name(), "Saved running configuration");
        Ok(())
    }

    async fn delete(&mut self, ctx: &CancellationToken) -> Result<()> {
        self.base.delete(ctx).await
    }

    fn images(&self) -> BTreeMap<String, String> {
        self.base.images()
    }
}
