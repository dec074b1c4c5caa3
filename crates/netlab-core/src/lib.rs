//! Core types for netlab.
//!
//! This crate provides the value objects shared by the runtime gateway and the
//! node drivers:
//!
//! - **Node configuration**: [`NodeConfig`], the desired state of one emulated
//!   device, and its management network [`MgmtNet`]
//! - **Identifiers**: [`ContainerId`], the opaque handle a runtime returns
//! - **Error types**: validation errors raised while building a configuration
//!
//! # Example
//!
//! ```
//! use netlab_core::NodeConfig;
//!
//! let mut cfg = NodeConfig::new("r1", "ghcr.io/example/xrd:7.8.1", "/tmp/lab/r1");
//! cfg.env.insert("FOO".to_string(), "bar".to_string());
//!
//! assert_eq!(cfg.long_name, "r1");
//! assert!(cfg.validate_required().is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod ids;

pub use config::{is_unset_source, merge_string_maps, MgmtNet, NodeConfig};
pub use error::{CoreError, Result};
pub use ids::ContainerId;
