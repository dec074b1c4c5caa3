//! Container runtime gateway for netlab.
//!
//! Node drivers never talk to a container engine directly. They go through the
//! narrow [`RuntimeGateway`] trait, which covers exactly four operations:
//!
//! - execute a command inside a running container
//! - create a container from a [`NodeConfig`](netlab_core::NodeConfig)
//! - start a created container
//! - delete a container by name
//!
//! Every call takes a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! so an orchestrator can abort a deployment without leaving a half-created
//! container behind.
//!
//! # Implementations
//!
//! - [`DockerCli`] shells out to the `docker` binary
//! - `MockRuntime` keeps containers in memory (enable the `test-utils` feature)
//!
//! # Example
//!
//! ```no_run
//! use netlab_core::NodeConfig;
//! use netlab_runtime::{DockerCli, DockerConfig, RuntimeGateway};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = DockerCli::new(DockerConfig::from_env());
//! let ctx = CancellationToken::new();
//!
//! let cfg = NodeConfig::new("r1", "alpine:3", "/tmp/lab/r1");
//! let id = runtime.create_container(&ctx, &cfg).await?;
//! runtime.start_container(&ctx, &id, &cfg).await?;
//!
//! let out = runtime.exec(&ctx, "r1", &["uname".to_string(), "-a".to_string()]).await?;
//! println!("{}", out.stdout);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod docker;
pub mod error;
pub mod gateway;

pub use docker::{DockerCli, DockerConfig};
pub use error::{Result, RuntimeError};
pub use gateway::{ExecOutput, RuntimeGateway};

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockRuntime;
