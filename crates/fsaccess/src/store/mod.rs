//! Backing stores.
//!
//! Every store exposes the same capability traits:
//!
//! - **memory**: volatile in-process tree (tests, scratch space, imports)
//! - **local**: host filesystem rooted at a directory
//! - **sandbox**: per-application private area on the host filesystem
//!
//! Handles hold `Arc<dyn DirectoryEntry>` / `Arc<dyn FileEntry>` and never
//! see the concrete store type. Stores share one policy:
//!
//! | Situation | Error |
//! |-----------|-------|
//! | name missing, `create == false` | `NotFound` |
//! | name present with the other kind | `TypeMismatch` |
//! | non-recursive remove of a non-empty directory | `InvalidModification` |
//! | any operation on a removed node | `NotFound` |
//! | mutation on a read-only store | `NotAllowed` |

#[cfg(feature = "native")]
pub mod local;
pub mod memory;
#[cfg(feature = "native")]
pub mod sandbox;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::blob::File;
use crate::error::Result;
use crate::sink::Sink;

/// A child node as returned by a directory.
#[derive(Debug, Clone)]
pub enum Entry {
    File(Arc<dyn FileEntry>),
    Directory(Arc<dyn DirectoryEntry>),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::File(f) => f.name(),
            Entry::Directory(d) => d.name(),
        }
    }
}

/// Lazy listing of `(name, child)` pairs.
pub type EntryStream = BoxStream<'static, Result<(String, Entry)>>;

/// Store-side directory node.
#[async_trait]
pub trait DirectoryEntry: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// False for read-only stores.
    fn writable(&self) -> bool;

    /// List direct children. No ordering is guaranteed.
    async fn entries(&self) -> Result<EntryStream>;

    /// Look up (or with `create`, make) a child directory.
    async fn get_directory(&self, name: &str, create: bool) -> Result<Arc<dyn DirectoryEntry>>;

    /// Look up (or with `create`, make) a child file.
    async fn get_file(&self, name: &str, create: bool) -> Result<Arc<dyn FileEntry>>;

    /// Remove a child; directories with children need `recursive`.
    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()>;

    /// Identity comparison by the store's own notion of sameness.
    fn is_same_entry(&self, other: &dyn DirectoryEntry) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Store-side file node.
#[async_trait]
pub trait FileEntry: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn writable(&self) -> bool;

    /// Snapshot of the last committed content.
    async fn get_file(&self) -> Result<File>;

    /// Open a write session, staged from the current content when
    /// `keep_existing_data` is set and from empty otherwise.
    async fn create_writable(&self, keep_existing_data: bool) -> Result<Box<dyn Sink>>;

    fn is_same_entry(&self, other: &dyn FileEntry) -> bool;

    fn as_any(&self) -> &dyn Any;
}
