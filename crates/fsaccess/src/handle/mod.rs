//! Store-agnostic handles.
//!
//! Handles validate names and wrap store entries; they never know which
//! store they sit on.

mod directory;
mod file;
mod name;

pub use directory::DirectoryHandle;
pub use file::{FileHandle, WritableOptions};
pub use name::validate_name;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::Entry;

/// What a handle points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    File,
    Directory,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::File => write!(f, "file"),
            HandleKind::Directory => write!(f, "directory"),
        }
    }
}

/// Access being asked about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PermissionDescriptor {
    pub readable: bool,
    pub writable: bool,
}

impl PermissionDescriptor {
    pub fn read() -> Self {
        Self {
            readable: true,
            writable: false,
        }
    }

    pub fn write() -> Self {
        Self {
            readable: false,
            writable: true,
        }
    }

    /// Read access is always granted; write access follows the store.
    fn evaluate(self, store_writable: bool) -> PermissionState {
        if self.readable || !self.writable || store_writable {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
}

/// Either kind of handle, as produced by directory listings.
#[derive(Debug, Clone)]
pub enum Handle {
    File(FileHandle),
    Directory(DirectoryHandle),
}

impl Handle {
    pub fn kind(&self) -> HandleKind {
        match self {
            Handle::File(_) => HandleKind::File,
            Handle::Directory(_) => HandleKind::Directory,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Handle::File(f) => f.name(),
            Handle::Directory(d) => d.name(),
        }
    }

    /// False when the kinds differ.
    pub fn is_same_entry(&self, other: &Handle) -> bool {
        match (self, other) {
            (Handle::File(a), Handle::File(b)) => a.is_same_entry(b),
            (Handle::Directory(a), Handle::Directory(b)) => a.is_same_entry(b),
            _ => false,
        }
    }

    pub fn query_permission(&self, descriptor: PermissionDescriptor) -> PermissionState {
        match self {
            Handle::File(f) => f.query_permission(descriptor),
            Handle::Directory(d) => d.query_permission(descriptor),
        }
    }

    pub fn request_permission(&self, descriptor: PermissionDescriptor) -> PermissionState {
        self.query_permission(descriptor)
    }

    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            Handle::File(f) => Some(f),
            Handle::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryHandle> {
        match self {
            Handle::Directory(d) => Some(d),
            Handle::File(_) => None,
        }
    }
}

impl From<Entry> for Handle {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::File(f) => Handle::File(FileHandle::from_entry(f)),
            Entry::Directory(d) => Handle::Directory(DirectoryHandle::from_entry(d)),
        }
    }
}

impl From<FileHandle> for Handle {
    fn from(handle: FileHandle) -> Self {
        Handle::File(handle)
    }
}

impl From<DirectoryHandle> for Handle {
    fn from(handle: DirectoryHandle) -> Self {
        Handle::Directory(handle)
    }
}
