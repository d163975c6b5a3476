//! Choosing a store from configuration.
//!
//! ```toml
//! backend = "local"
//! root = "/srv/files"
//! read_only = true
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::handle::DirectoryHandle;
use crate::store::memory::MemoryDirectory;
#[cfg(feature = "native")]
use crate::store::sandbox::SandboxConfig;

/// Which store backs a root directory handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Fresh volatile tree.
    #[default]
    Memory,
    /// Existing host directory.
    Local {
        root: PathBuf,
        #[serde(default)]
        read_only: bool,
    },
    /// Per-origin private area under the user data directory.
    #[cfg(feature = "native")]
    Sandbox(SandboxConfig),
}

impl StorageConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| Error::Config(e.to_string()))
    }

    /// Open the root directory this config describes.
    pub async fn open(&self) -> Result<DirectoryHandle> {
        match self {
            StorageConfig::Memory => Ok(DirectoryHandle::new(MemoryDirectory::new())),
            StorageConfig::Local { root, read_only } => open_local(root, *read_only).await,
            #[cfg(feature = "native")]
            StorageConfig::Sandbox(config) => {
                let root = crate::store::sandbox::open(config).await?;
                Ok(DirectoryHandle::new(root))
            }
        }
    }
}

#[cfg(feature = "native")]
async fn open_local(root: &std::path::Path, read_only: bool) -> Result<DirectoryHandle> {
    use crate::store::local::LocalDirectory;

    let meta = tokio::fs::metadata(root).await.map_err(|e| {
        Error::Config(format!("local root {}: {}", root.display(), e))
    })?;
    if !meta.is_dir() {
        return Err(Error::Config(format!(
            "local root {} is not a directory",
            root.display()
        )));
    }
    let store = if read_only {
        LocalDirectory::read_only(root)
    } else {
        LocalDirectory::new(root)
    };
    Ok(DirectoryHandle::new(store))
}

#[cfg(not(feature = "native"))]
async fn open_local(root: &std::path::Path, _read_only: bool) -> Result<DirectoryHandle> {
    tracing::warn!(root = %root.display(), "local storage unavailable in this build");
    Err(Error::NotAllowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use futures::StreamExt;

    #[test]
    fn test_parse_toml() {
        let config = StorageConfig::from_toml_str(
            r#"
            backend = "local"
            root = "/srv/files"
            read_only = true
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            StorageConfig::Local {
                root: PathBuf::from("/srv/files"),
                read_only: true,
            }
        );

        let config = StorageConfig::from_toml_str(r#"backend = "memory""#).unwrap();
        assert_eq!(config, StorageConfig::Memory);
    }

    #[test]
    fn test_parse_json() {
        let config = StorageConfig::from_json_str(r#"{"backend":"local","root":"/tmp/x"}"#).unwrap();
        assert_eq!(
            config,
            StorageConfig::Local {
                root: PathBuf::from("/tmp/x"),
                read_only: false,
            }
        );
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_parse_sandbox() {
        let config = StorageConfig::from_toml_str(
            r#"
            backend = "sandbox"
            app = "notes"
            origin = "https://example.com"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            StorageConfig::Sandbox(SandboxConfig::new("notes", "https://example.com"))
        );
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let err = StorageConfig::from_toml_str(r#"backend = "s3""#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_open_memory() {
        let root = StorageConfig::default().open().await.unwrap();
        root.get_file_handle("a", true).await.unwrap();
        assert_eq!(root.keys().count().await, 1);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn test_open_local_requires_existing_dir() {
        let config = StorageConfig::Local {
            root: PathBuf::from("/definitely/not/here"),
            read_only: false,
        };
        let err = config.open().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
