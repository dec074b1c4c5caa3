//! Environment derivation for node containers.
//!
//! Pure functions, no I/O. Kinds use them to build their default environment
//! and large computed values such as an interface-naming table.
//!
//! Precedence is explicit > computed > kind default, and it follows from the
//! merge order alone: defaults are laid down first with [`merge_string_maps`]
//! letting explicit values win, and computed values are added afterwards with
//! [`merge_absent`], which never replaces a key.
//!
//! [`merge_string_maps`]: netlab_core::merge_string_maps

use std::collections::BTreeMap;
use std::fmt;

/// Naming convention the device uses for its data-plane interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceNaming {
    /// Container-side interface prefix (`eth`). Index 0 is management.
    pub container_prefix: &'static str,
    /// Key introducing the device-side name in a rule (`xr_name`).
    pub device_key: &'static str,
    /// Device-side interface prefix (`Gi0/0/0/`).
    pub device_prefix: &'static str,
    /// Device-side index of the first data-plane interface.
    pub first_device_index: usize,
}

/// One container-interface to device-interface mapping rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRule {
    /// Container-side index, starting at 1.
    pub container_index: usize,
    /// Device-side interface name.
    pub device_name: String,
    naming: InterfaceNaming,
}

impl fmt::Display for InterfaceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "linux:{}{},{}={}",
            self.naming.container_prefix, self.container_index, self.naming.device_key, self.device_name
        )
    }
}

/// Build `count` ordered mapping rules for device-facing interfaces.
#[must_use]
pub fn interface_rules(count: usize, naming: InterfaceNaming) -> Vec<InterfaceRule> {
    (1..=count)
        .map(|container_index| InterfaceRule {
            container_index,
            device_name: format!(
                "{}{}",
                naming.device_prefix,
                naming.first_device_index + container_index - 1
            ),
            naming,
        })
        .collect()
}

/// Join rules with the device-required delimiter.
///
/// The delimiter separates rules; none follows the last one.
#[must_use]
pub fn join_rules(rules: &[InterfaceRule], delimiter: &str) -> String {
    rules
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// A single-entry environment map holding an interface mapping table.
#[must_use]
pub fn interface_mapping_env(
    key: &str,
    count: usize,
    naming: InterfaceNaming,
    delimiter: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([(
        key.to_string(),
        join_rules(&interface_rules(count, naming), delimiter),
    )])
}

/// Turn a static table of pairs into an environment map.
#[must_use]
pub fn env_from_pairs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Insert computed entries whose keys are not already present.
pub fn merge_absent(env: &mut BTreeMap<String, String>, computed: BTreeMap<String, String>) {
    for (key, value) in computed {
        env.entry(key).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlab_core::merge_string_maps;

    const XR: InterfaceNaming = InterfaceNaming {
        container_prefix: "eth",
        device_key: "xr_name",
        device_prefix: "Gi0/0/0/",
        first_device_index: 0,
    };

    #[test]
    fn rules_start_at_one() {
        let rules = interface_rules(3, XR);
        let rendered: Vec<_> = rules.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "linux:eth1,xr_name=Gi0/0/0/0",
                "linux:eth2,xr_name=Gi0/0/0/1",
                "linux:eth3,xr_name=Gi0/0/0/2",
            ]
        );
    }

    #[test]
    fn ninety_entries() {
        let env = interface_mapping_env("XR_INTERFACES", 90, XR, ";");
        let value = &env["XR_INTERFACES"];
        let entries: Vec<_> = value.split(';').collect();

        assert_eq!(entries.len(), 90);
        assert_eq!(entries[0], "linux:eth1,xr_name=Gi0/0/0/0");
        assert_eq!(entries[89], "linux:eth90,xr_name=Gi0/0/0/89");
        assert!(!value.contains("eth0,"));
        assert!(!value.ends_with(';'));
    }

    #[test]
    fn zero_interfaces_is_empty() {
        assert!(interface_rules(0, XR).is_empty());
        assert_eq!(join_rules(&[], ";"), "");
    }

    #[test]
    fn explicit_beats_computed_beats_default() {
        let defaults = env_from_pairs(&[("D", "default"), ("SHARED", "default")]);
        let explicit = env_from_pairs(&[("SHARED", "explicit"), ("C", "explicit")]);
        let computed = env_from_pairs(&[("C", "computed"), ("ONLY", "computed")]);

        let mut env = merge_string_maps(&defaults, &explicit);
        merge_absent(&mut env, computed);

        assert_eq!(env["D"], "default");
        assert_eq!(env["SHARED"], "explicit");
        assert_eq!(env["C"], "explicit");
        assert_eq!(env["ONLY"], "computed");
    }
}
