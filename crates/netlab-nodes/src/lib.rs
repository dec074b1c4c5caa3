//! Node lifecycle drivers for netlab.
//!
//! Every emulated device ("node") is backed by one container. A kind-specific
//! [`NodeDriver`] turns an abstract [`NodeConfig`] into container-runtime
//! operations and walks it through a fixed lifecycle:
//!
//! ```text
//!   Uninitialized ──init──▶ Initialized ──pre_deploy──▶ PreDeployed
//!                                                           │
//!                                                        deploy
//!                                                           ▼
//!                           PostDeployed ◀──post_deploy── Deployed
//!
//!   any state after Initialized ──delete──▶ Deleted
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Orchestrator / CLI (caller)                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   DriverRegistry  ──kind──▶  NodeDriver (xrd, srl, ...)     │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────────────────┐   │
//! │  │ Environment  │ │  Template    │ │   Version probe    │   │
//! │  │ builder      │ │  renderer    │ │                    │   │
//! │  └──────────────┘ └──────────────┘ └────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                RuntimeGateway (docker, mock)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use netlab_core::NodeConfig;
//! use netlab_nodes::{registry, PreDeployParams, Peers};
//! use netlab_runtime::{DockerCli, DockerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Arc::new(DockerCli::new(DockerConfig::from_env()));
//! let mut node = registry::global().new_driver("xrd", runtime)?;
//!
//! let cfg = NodeConfig::new("r1", "ios-xr/xrd-control-plane:7.8.1", "/tmp/lab/r1");
//! node.init(cfg, Vec::new())?;
//! node.pre_deploy(&PreDeployParams::new("demo"))?;
//!
//! let ctx = CancellationToken::new();
//! node.deploy(&ctx).await?;
//! node.post_deploy(&ctx, &Peers::new()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod base;
pub mod driver;
pub mod env;
pub mod error;
pub mod kinds;
pub mod lifecycle;
pub mod registry;
pub mod template;
pub mod version;

pub use base::{KindProfile, NodeBase};
pub use driver::{NodeDriver, NodeOption, Peers, PreDeployParams, IMAGE_KEY};
pub use error::{NodeError, Result};
pub use lifecycle::NodeState;
pub use registry::DriverRegistry;
pub use version::{VersionInfo, VersionProbe};

// Re-export commonly used types from dependencies for convenience
pub use netlab_core::{MgmtNet, NodeConfig};
pub use netlab_runtime::{RuntimeError, RuntimeGateway};
