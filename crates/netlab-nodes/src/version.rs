//! Post-boot version probing.
//!
//! A [`VersionProbe`] runs a fixed command inside the running container and
//! extracts a `v<major>.<minor>.<patch>` token from whatever the command
//! prints. Device CLIs tend to wrap the interesting line in prompts and log
//! output, so the token may appear anywhere in the text.

use std::sync::LazyLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::base::NodeBase;
use crate::error::{NodeError, Result};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v(\d{1,3})\.(\d{1,2})\.(\d{1,3})").expect("version pattern is valid")
});

/// Maximum number of output bytes kept in a `NodeError::Parse`.
const OUTPUT_EXCERPT_LEN: usize = 120;

/// Version tokens reported by a device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    /// Major version token.
    pub major: String,
    /// Minor version token.
    pub minor: String,
    /// Patch version token.
    pub patch: String,
}

impl VersionInfo {
    /// Create version info from its three tokens.
    #[must_use]
    pub fn new(major: impl Into<String>, minor: impl Into<String>, patch: impl Into<String>) -> Self {
        Self {
            major: major.into(),
            minor: minor.into(),
            patch: patch.into(),
        }
    }

    /// Copy with `patch` padded for fixed-width tables.
    ///
    /// A one-character minor leaves a column one character short, so the patch
    /// gets a trailing space to compensate.
    #[must_use]
    pub fn aligned(&self) -> Self {
        let mut v = self.clone();
        if v.minor.chars().count() == 1 {
            v.patch.push(' ');
        }
        v
    }
}

/// Extract the first version token from `text`.
#[must_use]
pub fn parse_version(text: &str) -> Option<VersionInfo> {
    let caps = VERSION_RE.captures(text)?;
    Some(VersionInfo::new(&caps[1], &caps[2], &caps[3]))
}

/// Runs an introspection command and parses its output.
#[derive(Debug, Clone)]
pub struct VersionProbe {
    command: Vec<String>,
}

impl VersionProbe {
    /// Create a probe that runs `command` inside the container.
    #[must_use]
    pub fn new(command: &[&str]) -> Self {
        Self {
            command: command.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// The command this probe executes.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Execute the command in `base`'s container and parse the version.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Parse` if the output has no version token, or the
    /// runtime error if the command could not run.
    pub async fn run(&self, base: &NodeBase, ctx: &CancellationToken) -> Result<VersionInfo> {
        let out = base.exec(ctx, &self.command).await?;

        debug!(
            node = %base.name(),
            stdout = %out.stdout,
            stderr = %out.stderr,
            "Version probe output"
        );

        parse_version(&out.stdout).ok_or_else(|| NodeError::Parse {
            node: base.name().to_string(),
            output: excerpt(&out.stdout),
        })
    }
}

fn excerpt(text: &str) -> String {
    text.trim().chars().take(OUTPUT_EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_version() {
        assert_eq!(
            parse_version("v23.10.1"),
            Some(VersionInfo::new("23", "10", "1"))
        );
    }

    #[test]
    fn parse_tolerates_noise() {
        let output = "\
Using configuration file(s): []
Welcome to the srlinux CLI.
    version v22.3.2-118-g4d8d38d609
--{ running }--[  ]--
";
        assert_eq!(
            parse_version(output),
            Some(VersionInfo::new("22", "3", "2"))
        );
    }

    #[test]
    fn parse_takes_first_match() {
        assert_eq!(
            parse_version("old v1.2.3 new v4.5.6"),
            Some(VersionInfo::new("1", "2", "3"))
        );
    }

    #[test]
    fn parse_rejects_versionless_output() {
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("Error: command not found"), None);
        assert_eq!(parse_version("version 23.10.1"), None);
        assert_eq!(parse_version("v.."), None);
    }

    #[test]
    fn single_digit_minor_pads_patch() {
        let v = VersionInfo::new("23", "3", "5").aligned();
        assert_eq!(v.patch, "5 ");
        assert_eq!(v.minor, "3");
    }

    #[test]
    fn two_digit_minor_keeps_patch() {
        let v = VersionInfo::new("23", "12", "5").aligned();
        assert_eq!(v.patch, "5");
    }

    #[test]
    fn excerpt_is_bounded() {
        let long = "x".repeat(1000);
        assert_eq!(excerpt(&long).len(), OUTPUT_EXCERPT_LEN);
    }
}
