//! Startup configuration templating.
//!
//! Kind templates are embedded in the binary and use `{{ name }}`
//! placeholders. Rendering is strict: a placeholder with no value in the
//! context is an error rather than an empty string.
//!
//! Materialization is a two-phase write. The rendered text replaces the file
//! (truncate), then an optional user fragment is appended after a newline, so
//! user content can extend the templated sections but never precede them.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use netlab_core::NodeConfig;
use thiserror::Error;

use crate::driver::PreDeployParams;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Values available to a template, keyed by placeholder name.
pub type TemplateContext = BTreeMap<&'static str, String>;

/// Errors raised while rendering a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A placeholder names a value the context does not have.
    #[error("unresolved placeholder `{0}`")]
    Unresolved(String),

    /// A `{{` is never closed.
    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),
}

/// Build the rendering context for a node.
///
/// Management addresses are only present when the node has them.
#[must_use]
pub fn context_for(cfg: &NodeConfig, params: &PreDeployParams) -> TemplateContext {
    let mut ctx = TemplateContext::new();
    ctx.insert("short_name", cfg.short_name.clone());
    ctx.insert("long_name", cfg.long_name.clone());
    ctx.insert("kind", cfg.kind.clone());
    ctx.insert("image", cfg.image.clone());
    ctx.insert("lab_name", params.lab_name.clone());
    if let Some(ip) = &cfg.mgmt_ipv4_address {
        ctx.insert("mgmt_ipv4_address", ip.clone());
    }
    if let Some(ip) = &cfg.mgmt_ipv6_address {
        ctx.insert("mgmt_ipv6_address", ip.clone());
    }
    ctx
}

/// Substitute every placeholder in `template`.
///
/// # Errors
///
/// Returns `TemplateError::Unresolved` for an unknown placeholder and
/// `TemplateError::Unterminated` for a `{{` without a matching `}}`.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            return Err(TemplateError::Unterminated(offset + start));
        };

        let name = after_open[..end].trim();
        match ctx.get(name) {
            Some(value) => out.push_str(value),
            None => return Err(TemplateError::Unresolved(name.to_string())),
        }

        let consumed = start + OPEN.len() + end + CLOSE.len();
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Write `rendered` to `dest`, then append `"\n"` and `fragment` if given.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn materialize(dest: &Path, rendered: &str, fragment: Option<&str>) -> io::Result<()> {
    fs::write(dest, rendered)?;

    if let Some(fragment) = fragment {
        let mut file = OpenOptions::new().append(true).open(dest)?;
        file.write_all(b"\n")?;
        file.write_all(fragment.as_bytes())?;
        file.flush()?;
    }

    Ok(())
}
