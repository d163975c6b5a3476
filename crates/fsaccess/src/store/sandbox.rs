//! Private per-origin storage under the user data directory.
//!
//! | Purpose | XDG Variable | Default | Path |
//! |---------|--------------|---------|------|
//! | Sandbox root | `$XDG_DATA_HOME` | `~/.local/share` | `$XDG_DATA_HOME/<app>/origins/<origin>/` |
//!
//! Each origin gets its own directory; the origin string is reduced to a
//! single safe path component so it can never climb out of `origins/`.

use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use super::local::LocalDirectory;
use crate::error::{Error, Result};

/// Where a sandbox lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Application name; the first component below the data directory.
    pub app: String,
    /// Isolation key, e.g. `"https://example.com"`.
    pub origin: String,
    /// Overrides the user data directory when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl SandboxConfig {
    pub fn new(app: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            origin: origin.into(),
            base_dir: None,
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Absolute root of this sandbox.
    pub fn root(&self) -> Result<PathBuf> {
        let app = sanitize_component(&self.app);
        let origin = sanitize_component(&self.origin);
        if app.is_empty() || origin.is_empty() {
            return Err(Error::Config(format!(
                "sandbox needs a non-empty app and origin (got {:?}, {:?})",
                self.app, self.origin
            )));
        }
        let base = self.base_dir.clone().unwrap_or_else(data_dir);
        Ok(base.join(app).join("origins").join(origin))
    }
}

/// Open (creating if needed) the sandbox described by `config`.
pub async fn open(config: &SandboxConfig) -> Result<LocalDirectory> {
    let root = config.root()?;
    tokio::fs::create_dir_all(&root)
        .await
        .map_err(Error::from_io)?;
    tracing::debug!(root = %root.display(), "sandbox: opened");
    Ok(LocalDirectory::new(root))
}

/// User data directory, `~/.local/share` when the platform gives none.
fn data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".local").join("share"))
}

fn home_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}

/// Keep `[A-Za-z0-9._-]`, map everything else to `_`, and refuse dot-only names.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        String::new()
    } else {
        cleaned
    }
}
