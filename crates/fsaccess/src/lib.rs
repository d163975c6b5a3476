//! fsaccess: capability-based file and directory handles.
//!
//! This crate provides:
//!
//! - **Blob / File**: immutable byte sequences that share storage across
//!   slices and concatenations
//! - **Stores**: in-memory trees, host directories and per-origin sandboxes
//!   behind one pair of entry traits
//! - **Sinks**: queued write sessions that publish on close
//! - **Handles**: the store-agnostic façade callers work with
//!
//! ```ignore
//! use fsaccess::{DirectoryHandle, MemoryDirectory, WritableOptions};
//!
//! let root = DirectoryHandle::new(MemoryDirectory::new());
//! let file = root.get_file_handle("hello.txt", true).await?;
//! let stream = file.create_writable(WritableOptions::default()).await?;
//! stream.write("hello").await?;
//! stream.close().await?;
//! assert_eq!(file.get_file().await?.text(), "hello");
//! ```

pub mod blob;
pub mod config;
pub mod error;
pub mod handle;
pub mod sink;
pub mod store;

pub use blob::{Blob, BlobPart, File, FileBuilder, LastModified};
pub use config::StorageConfig;
pub use error::{Error, ErrorKind, Result};
pub use handle::{
    DirectoryHandle, FileHandle, Handle, HandleKind, PermissionDescriptor, PermissionState,
    WritableOptions,
};
pub use sink::{WritableFileStream, WriteChunk, WriteParams};
pub use store::memory::MemoryDirectory;
#[cfg(feature = "native")]
pub use store::local::LocalDirectory;
#[cfg(feature = "native")]
pub use store::sandbox::SandboxConfig;
