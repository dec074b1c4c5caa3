//! Node configuration model.
//!
//! [`NodeConfig`] describes the desired state of a single emulated device. It
//! carries no behaviour beyond field validation; node drivers own one instance
//! each and fill in the derived fields during their init phase.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, Result};

/// Management network a node is attached to.
///
/// Set by an external caller through a node option, never by a driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MgmtNet {
    /// Runtime network name (e.g. a docker network).
    pub network: String,
    /// IPv4 subnet in CIDR notation.
    pub ipv4_subnet: Option<String>,
    /// IPv6 subnet in CIDR notation.
    pub ipv6_subnet: Option<String>,
}

/// Desired state of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Name of the node inside the topology.
    pub short_name: String,
    /// Unique, runtime-visible container name.
    pub long_name: String,
    /// Kind identifier, filled in by the driver.
    pub kind: String,
    /// Container image reference.
    pub image: String,
    /// Directory owned by this node for generated artifacts.
    pub lab_dir: PathBuf,
    /// Environment variables passed to the container.
    pub env: BTreeMap<String, String>,
    /// Bind mounts in `host:container[:mode]` form.
    pub binds: Vec<String>,
    /// Optional user-supplied startup configuration fragment.
    ///
    /// The strings `""`, `"none"` and `"None"` deserialize to `None`.
    #[serde(deserialize_with = "deserialize_startup_source")]
    pub startup_config: Option<PathBuf>,
    /// Where the rendered startup configuration is materialized.
    pub resolved_startup_config: Option<PathBuf>,
    /// Whether the runtime must load the rendered startup configuration.
    pub enforce_startup_config: bool,
    /// Management network, set by the orchestrator.
    pub mgmt_net: Option<MgmtNet>,
    /// Static management IPv4 address.
    pub mgmt_ipv4_address: Option<String>,
    /// Static management IPv6 address.
    pub mgmt_ipv6_address: Option<String>,
    /// Container command override.
    ///
    /// Split on whitespace into arguments; shell quoting is not interpreted,
    /// so a command needing quoted arguments must be wrapped in a script.
    pub cmd: Option<String>,
}

impl NodeConfig {
    /// Create a configuration with the minimum required fields.
    ///
    /// `long_name` defaults to `short_name`.
    #[must_use]
    pub fn new(
        short_name: impl Into<String>,
        image: impl Into<String>,
        lab_dir: impl Into<PathBuf>,
    ) -> Self {
        let short_name = short_name.into();
        Self {
            long_name: short_name.clone(),
            short_name,
            image: image.into(),
            lab_dir: lab_dir.into(),
            ..Default::default()
        }
    }

    /// Check that the fields every driver needs are present.
    ///
    /// Fills in `long_name` from `short_name` when it is empty.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingField` for an empty name, image or lab directory.
    pub fn validate_required(&mut self) -> Result<()> {
        if self.short_name.trim().is_empty() {
            return Err(CoreError::MissingField("short_name"));
        }
        if self.image.trim().is_empty() {
            return Err(CoreError::MissingField("image"));
        }
        if self.lab_dir.as_os_str().is_empty() {
            return Err(CoreError::MissingField("lab_dir"));
        }
        if self.long_name.trim().is_empty() {
            self.long_name.clone_from(&self.short_name);
        }
        Ok(())
    }

    /// Check that each named environment variable is present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptyEnv` for the first offending key.
    pub fn require_env(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            match self.env.get(*key) {
                Some(v) if !v.trim().is_empty() => {}
                _ => return Err(CoreError::EmptyEnv((*key).to_string())),
            }
        }
        Ok(())
    }

    /// Append a bind mount unless an identical one is already present.
    pub fn add_bind(&mut self, bind: impl Into<String>) {
        let bind = bind.into();
        if !self.binds.contains(&bind) {
            self.binds.push(bind);
        }
    }

    /// Path of a file inside the lab directory.
    #[must_use]
    pub fn lab_path(&self, file_name: &str) -> PathBuf {
        self.lab_dir.join(file_name)
    }

    /// Set the resolved startup configuration path.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::OutsideLabDir` if `path` is not under `lab_dir`.
    pub fn set_resolved_startup_config(&mut self, path: PathBuf) -> Result<()> {
        if !is_within(&self.lab_dir, &path) {
            return Err(CoreError::OutsideLabDir {
                path: path.display().to_string(),
                lab_dir: self.lab_dir.display().to_string(),
            });
        }
        self.resolved_startup_config = Some(path);
        Ok(())
    }

    /// The user startup fragment, unless the field holds a sentinel.
    #[must_use]
    pub fn startup_source(&self) -> Option<&Path> {
        self.startup_config
            .as_deref()
            .filter(|p| !p.to_str().is_some_and(is_unset_source))
    }

    /// Name of the management network, if one is attached.
    #[must_use]
    pub fn mgmt_network(&self) -> Option<&str> {
        self.mgmt_net
            .as_ref()
            .map(|m| m.network.as_str())
            .filter(|n| !n.is_empty())
    }
}

/// Merge two string maps; keys in `overlay` replace keys in `base`.
#[must_use]
pub fn merge_string_maps(
    base: &BTreeMap<String, String>,
    overlay: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Whether a startup source value means "no user fragment".
///
/// Empty strings and `none` in any case are sentinels, not file names.
#[must_use]
pub fn is_unset_source(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw.eq_ignore_ascii_case("none")
}

fn is_within(dir: &Path, path: &Path) -> bool {
    path.starts_with(dir) && path != dir
}

fn deserialize_startup_source<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !is_unset_source(s))
        .map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_long_name() {
        let cfg = NodeConfig::new("r1", "img", "/lab/r1");
        assert_eq!(cfg.long_name, "r1");
        assert!(cfg.env.is_empty());
        assert!(cfg.startup_config.is_none());
    }

    #[test]
    fn validate_required_fields() {
        let mut cfg = NodeConfig::new("r1", "", "/lab/r1");
        assert_eq!(cfg.validate_required(), Err(CoreError::MissingField("image")));

        let mut cfg = NodeConfig::new("", "img", "/lab/r1");
        assert_eq!(
            cfg.validate_required(),
            Err(CoreError::MissingField("short_name"))
        );

        let mut cfg = NodeConfig::new("r1", "img", "");
        assert_eq!(cfg.validate_required(), Err(CoreError::MissingField("lab_dir")));

        let mut cfg = NodeConfig::new("r1", "img", "/lab/r1");
        cfg.long_name.clear();
        assert!(cfg.validate_required().is_ok());
        assert_eq!(cfg.long_name, "r1");
    }

    #[test]
    fn require_env_rejects_empty_values() {
        let mut cfg = NodeConfig::new("r1", "img", "/lab/r1");
        cfg.env.insert("A".to_string(), "1".to_string());
        cfg.env.insert("B".to_string(), "  ".to_string());

        assert!(cfg.require_env(&["A"]).is_ok());
        assert_eq!(
            cfg.require_env(&["A", "B"]),
            Err(CoreError::EmptyEnv("B".to_string()))
        );
        assert_eq!(
            cfg.require_env(&["C"]),
            Err(CoreError::EmptyEnv("C".to_string()))
        );
    }

    #[test]
    fn add_bind_skips_duplicates() {
        let mut cfg = NodeConfig::new("r1", "img", "/lab/r1");
        cfg.add_bind("/a:/b");
        cfg.add_bind("/c:/d");
        cfg.add_bind("/a:/b");
        assert_eq!(cfg.binds, vec!["/a:/b".to_string(), "/c:/d".to_string()]);
    }

    #[test]
    fn resolved_path_must_be_inside_lab_dir() {
        let mut cfg = NodeConfig::new("r1", "img", "/lab/r1");
        assert!(cfg
            .set_resolved_startup_config(PathBuf::from("/lab/r1/xrd.conf"))
            .is_ok());
        assert!(cfg
            .set_resolved_startup_config(PathBuf::from("/elsewhere/xrd.conf"))
            .is_err());
        assert!(cfg
            .set_resolved_startup_config(PathBuf::from("/lab/r1"))
            .is_err());
        assert_eq!(
            cfg.resolved_startup_config,
            Some(PathBuf::from("/lab/r1/xrd.conf"))
        );
    }

    #[test]
    fn merge_overlay_wins() {
        let base = BTreeMap::from([
            ("A".to_string(), "base".to_string()),
            ("B".to_string(), "base".to_string()),
        ]);
        let overlay = BTreeMap::from([("B".to_string(), "overlay".to_string())]);

        let merged = merge_string_maps(&base, &overlay);
        assert_eq!(merged["A"], "base");
        assert_eq!(merged["B"], "overlay");
    }

    #[test]
    fn startup_source_skips_sentinels_set_directly() {
        let mut cfg = NodeConfig::new("r1", "img", "/lab/r1");
        for raw in ["None", "none", " ", ""] {
            cfg.startup_config = Some(PathBuf::from(raw));
            assert_eq!(cfg.startup_source(), None, "{raw:?} should mean absent");
        }

        cfg.startup_config = Some(PathBuf::from("/cfg/none.cfg"));
        assert_eq!(cfg.startup_source(), Some(Path::new("/cfg/none.cfg")));
    }

    #[test]
    fn startup_source_sentinel_deserializes_to_none() {
        for raw in ["\"\"", "\"None\"", "\"none\"", "null"] {
            let json = format!(r#"{{"short_name":"r1","startup_config":{raw}}}"#);
            let cfg: NodeConfig = serde_json::from_str(&json).unwrap();
            assert!(cfg.startup_config.is_none(), "{raw} should mean absent");
        }

        let cfg: NodeConfig =
            serde_json::from_str(r#"{"short_name":"r1","startup_config":"/cfg/r1.cfg"}"#).unwrap();
        assert_eq!(cfg.startup_config, Some(PathBuf::from("/cfg/r1.cfg")));
    }

    #[test]
    fn mgmt_network_ignores_empty_name() {
        let mut cfg = NodeConfig::new("r1", "img", "/lab/r1");
        assert_eq!(cfg.mgmt_network(), None);

        cfg.mgmt_net = Some(MgmtNet::default());
        assert_eq!(cfg.mgmt_network(), None);

        cfg.mgmt_net = Some(MgmtNet {
            network: "clab".to_string(),
            ..Default::default()
        });
        assert_eq!(cfg.mgmt_network(), Some("clab"));
    }
}
