use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use super::name::validate_name;
use super::{FileHandle, Handle, HandleKind, PermissionDescriptor, PermissionState};
use crate::error::Result;
use crate::store::DirectoryEntry;

/// Handle to a directory in any store.
///
/// ```ignore
/// let root = DirectoryHandle::new(MemoryDirectory::new());
/// let file = root.get_file_handle("notes.txt", true).await?;
/// let stream = file.create_writable(WritableOptions::default()).await?;
/// stream.write("hello").await?;
/// stream.close().await?;
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryHandle {
    entry: Arc<dyn DirectoryEntry>,
}

impl DirectoryHandle {
    /// Wrap a store root.
    pub fn new(entry: impl DirectoryEntry + 'static) -> Self {
        Self::from_entry(Arc::new(entry))
    }

    pub fn from_entry(entry: Arc<dyn DirectoryEntry>) -> Self {
        Self { entry }
    }

    pub fn kind(&self) -> HandleKind {
        HandleKind::Directory
    }

    pub fn name(&self) -> &str {
        self.entry.name()
    }

    /// Child directory `name`, created when missing and `create` is set.
    pub async fn get_directory_handle(&self, name: &str, create: bool) -> Result<DirectoryHandle> {
        validate_name(name)?;
        let entry = self.entry.get_directory(name, create).await?;
        Ok(DirectoryHandle::from_entry(entry))
    }

    /// Child file `name`, created empty when missing and `create` is set.
    pub async fn get_file_handle(&self, name: &str, create: bool) -> Result<FileHandle> {
        validate_name(name)?;
        let entry = self.entry.get_file(name, create).await?;
        Ok(FileHandle::from_entry(entry))
    }

    /// Remove child `name`. Non-empty directories need `recursive`.
    pub async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()> {
        validate_name(name)?;
        self.entry.remove_entry(name, recursive).await
    }

    /// Lazily list `(name, handle)` pairs. Nothing is read until polled.
    pub fn entries(&self) -> BoxStream<'static, Result<(String, Handle)>> {
        let entry = self.entry.clone();
        stream::once(async move { entry.entries().await })
            .try_flatten()
            .map_ok(|(name, child)| (name, Handle::from(child)))
            .boxed()
    }

    pub fn keys(&self) -> BoxStream<'static, Result<String>> {
        self.entries().map_ok(|(name, _)| name).boxed()
    }

    pub fn values(&self) -> BoxStream<'static, Result<Handle>> {
        self.entries().map_ok(|(_, handle)| handle).boxed()
    }

    pub fn is_same_entry(&self, other: &DirectoryHandle) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry) || self.entry.is_same_entry(other.entry.as_ref())
    }

    pub fn query_permission(&self, descriptor: PermissionDescriptor) -> PermissionState {
        descriptor.evaluate(self.entry.writable())
    }

    pub fn request_permission(&self, descriptor: PermissionDescriptor) -> PermissionState {
        self.query_permission(descriptor)
    }
}
