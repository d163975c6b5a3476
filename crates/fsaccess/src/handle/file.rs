use std::sync::Arc;

use serde::Deserialize;

use super::{HandleKind, PermissionDescriptor, PermissionState};
use crate::blob::File;
use crate::error::Result;
use crate::sink::WritableFileStream;
use crate::store::FileEntry;

/// Options for [`FileHandle::create_writable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WritableOptions {
    /// Stage from the current content instead of from empty.
    pub keep_existing_data: bool,
}

impl WritableOptions {
    pub fn keep_existing_data() -> Self {
        Self {
            keep_existing_data: true,
        }
    }
}

/// Handle to a file in any store.
#[derive(Debug, Clone)]
pub struct FileHandle {
    entry: Arc<dyn FileEntry>,
}

impl FileHandle {
    pub(crate) fn from_entry(entry: Arc<dyn FileEntry>) -> Self {
        Self { entry }
    }

    pub fn kind(&self) -> HandleKind {
        HandleKind::File
    }

    pub fn name(&self) -> &str {
        self.entry.name()
    }

    /// Snapshot of the last committed content.
    pub async fn get_file(&self) -> Result<File> {
        self.entry.get_file().await
    }

    /// Open a write session. Nothing is visible to readers until `close`.
    pub async fn create_writable(&self, options: WritableOptions) -> Result<WritableFileStream> {
        let sink = self.entry.create_writable(options.keep_existing_data).await?;
        tracing::debug!(
            name = self.name(),
            keep_existing_data = options.keep_existing_data,
            "opened write session"
        );
        Ok(WritableFileStream::spawn(sink))
    }

    pub fn is_same_entry(&self, other: &FileHandle) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry) || self.entry.is_same_entry(other.entry.as_ref())
    }

    pub fn query_permission(&self, descriptor: PermissionDescriptor) -> PermissionState {
        descriptor.evaluate(self.entry.writable())
    }

    pub fn request_permission(&self, descriptor: PermissionDescriptor) -> PermissionState {
        self.query_permission(descriptor)
    }
}
