//! Node definition files.
//!
//! A definition is a JSON object holding the node configuration fields plus
//! the name of the lab the node belongs to:
//!
//! ```json
//! {
//!   "lab_name": "demo",
//!   "kind": "xrd",
//!   "short_name": "r1",
//!   "image": "ios-xr/xrd-control-plane:7.8.1",
//!   "env": { "XR_EVERY_BOOT_CONFIG": "/etc/xrd/every-boot.cfg" }
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use netlab_core::NodeConfig;
use serde::Deserialize;

const DEFAULT_LAB_NAME: &str = "netlab";

/// A single node, as read from disk.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDefinition {
    /// Lab the node belongs to.
    #[serde(default = "default_lab_name")]
    pub lab_name: String,

    /// Node configuration.
    #[serde(flatten)]
    pub node: NodeConfig,
}

fn default_lab_name() -> String {
    DEFAULT_LAB_NAME.to_string()
}

impl NodeDefinition {
    /// Load and normalize a definition file.
    ///
    /// A relative `lab_dir` and `startup_config` are resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read node definition {}", path.display()))?;
        let mut def = Self::from_json(&text)
            .with_context(|| format!("invalid node definition {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        def.resolve_paths(base);
        Ok(def)
    }

    /// Parse a definition and fill in derived defaults.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let mut def: Self = serde_json::from_str(text)?;

        if def.node.kind.trim().is_empty() {
            bail!("`kind` is required");
        }
        if def.node.short_name.trim().is_empty() {
            bail!("`short_name` is required");
        }
        if def.node.long_name.is_empty() {
            def.node.long_name = format!("netlab-{}-{}", def.lab_name, def.node.short_name);
        }
        if def.node.lab_dir.as_os_str().is_empty() {
            def.node.lab_dir = PathBuf::from(format!("netlab-{}", def.lab_name))
                .join(&def.node.short_name);
        }
        Ok(def)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.node.lab_dir.is_relative() {
            self.node.lab_dir = base.join(&self.node.lab_dir);
        }
        if let Some(source) = self.node.startup_config.as_mut() {
            if source.is_relative() {
                *source = base.join(&*source);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_definition_gets_defaults() {
        let def = NodeDefinition::from_json(
            r#"{"kind": "srl", "short_name": "leaf1", "image": "srlinux:23.10.1"}"#,
        )
        .unwrap();

        assert_eq!(def.lab_name, "netlab");
        assert_eq!(def.node.long_name, "netlab-netlab-leaf1");
        assert_eq!(def.node.lab_dir, PathBuf::from("netlab-netlab/leaf1"));
        assert!(def.node.startup_config.is_none());
    }

    #[test]
    fn explicit_fields_are_kept() {
        let def = NodeDefinition::from_json(
            r#"{
                "lab_name": "demo",
                "kind": "xrd",
                "short_name": "r1",
                "long_name": "core-r1",
                "image": "xrd:7.8.1",
                "lab_dir": "/labs/demo/r1",
                "env": {"XR_INTERFACES": "linux:eth1,xr_name=Gi0/0/0/0"}
            }"#,
        )
        .unwrap();

        assert_eq!(def.lab_name, "demo");
        assert_eq!(def.node.long_name, "core-r1");
        assert_eq!(def.node.lab_dir, PathBuf::from("/labs/demo/r1"));
        assert_eq!(def.node.env["XR_INTERFACES"], "linux:eth1,xr_name=Gi0/0/0/0");
    }

    #[test]
    fn kind_is_required() {
        let err = NodeDefinition::from_json(r#"{"short_name": "r1", "image": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("kind"));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.json");
        std::fs::write(
            &path,
            r#"{"kind": "xrd", "short_name": "r1", "image": "xrd", "startup_config": "r1.cfg"}"#,
        )
        .unwrap();

        let def = NodeDefinition::load(&path).unwrap();
        assert_eq!(def.node.lab_dir, dir.path().join("netlab-netlab").join("r1"));
        assert_eq!(def.node.startup_config, Some(dir.path().join("r1.cfg")));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NodeDefinition::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
