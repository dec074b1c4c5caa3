//! Built-in node kinds.
//!
//! - [`xrd`]: Cisco XRd, with a computed interface-naming table
//! - [`srl`]: Nokia SR Linux, with a post-deploy version banner

pub mod srl;
pub mod xrd;

use crate::registry::DriverRegistry;

/// Register every built-in kind with `registry`.
pub fn register_builtin(registry: &DriverRegistry) {
    xrd::register(registry);
    srl::register(registry);
}
