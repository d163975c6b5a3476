//! Host filesystem store.
//!
//! Directory and file entries are thin path wrappers; every operation goes
//! to the disk, so removals by other processes are observed as `NotFound`.
//! Write sessions modify the file in place.

use std::any::Any;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use super::{DirectoryEntry, Entry, EntryStream, FileEntry};
use crate::blob::file::{millis_since_epoch, now_millis};
use crate::blob::{Blob, File};
use crate::error::{Error, Result};
use crate::sink::{Command, Sink};

/// Directory on the host filesystem.
///
/// A root built with [`LocalDirectory::new`] has an empty name; children are
/// named after their final path component.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    path: PathBuf,
    name: String,
    read_only: bool,
}

impl LocalDirectory {
    /// Writable root at `root`. The path should exist and be a directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            path: root.into(),
            name: String::new(),
            read_only: false,
        }
    }

    /// Root at `root` that refuses every mutation.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            read_only: true,
            ..Self::new(root)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn child_directory(&self, name: &str) -> LocalDirectory {
        LocalDirectory {
            path: self.path.join(name),
            name: name.to_string(),
            read_only: self.read_only,
        }
    }

    fn child_file(&self, name: &str) -> LocalFile {
        LocalFile {
            path: self.path.join(name),
            name: name.to_string(),
            read_only: self.read_only,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            Err(Error::NotAllowed)
        } else {
            Ok(())
        }
    }
}

/// `symlink_metadata`, with absence reported as `None`.
async fn probe(path: &Path) -> Result<Option<std::fs::Metadata>> {
    match fs::symlink_metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::from_io(e)),
    }
}

#[async_trait]
impl DirectoryEntry for LocalDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn writable(&self) -> bool {
        !self.read_only
    }

    async fn entries(&self) -> Result<EntryStream> {
        let read_dir = fs::read_dir(&self.path).await.map_err(Error::from_io)?;
        let parent = self.clone();

        let listing = stream::unfold(Some((read_dir, parent)), |state| async move {
            let (mut read_dir, parent) = match state {
                Some(state) => state,
                None => return None,
            };
            loop {
                let entry = match read_dir.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => return None,
                    Err(e) => return Some((Err(Error::from_io(e)), None)),
                };
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => return Some((Err(Error::from_io(e)), None)),
                };
                let name = entry.file_name().to_string_lossy().into_owned();

                // Symlinks, sockets and devices are not exposed.
                let child = if file_type.is_dir() {
                    Entry::Directory(Arc::new(parent.child_directory(&name)))
                } else if file_type.is_file() {
                    Entry::File(Arc::new(parent.child_file(&name)))
                } else {
                    tracing::trace!(name = %name, "local: skipping special entry");
                    continue;
                };
                return Some((Ok((name, child)), Some((read_dir, parent))));
            }
        });
        Ok(listing.boxed())
    }

    async fn get_directory(&self, name: &str, create: bool) -> Result<Arc<dyn DirectoryEntry>> {
        let child = self.child_directory(name);
        match probe(&child.path).await? {
            Some(meta) if meta.is_dir() => return Ok(Arc::new(child)),
            Some(_) => return Err(Error::TypeMismatch),
            None => {}
        }

        if !create {
            return Err(Error::NotFound);
        }
        self.check_writable()?;

        match fs::create_dir(&child.path).await {
            Ok(()) => {
                tracing::debug!(path = %child.path.display(), "local: created directory");
            }
            // Lost a race with another creator; fine if it made a directory.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if !probe(&child.path).await?.is_some_and(|m| m.is_dir()) {
                    return Err(Error::TypeMismatch);
                }
            }
            Err(e) => return Err(Error::from_io(e)),
        }
        Ok(Arc::new(child))
    }

    async fn get_file(&self, name: &str, create: bool) -> Result<Arc<dyn FileEntry>> {
        let child = self.child_file(name);
        match probe(&child.path).await? {
            Some(meta) if meta.is_file() => return Ok(Arc::new(child)),
            Some(_) => return Err(Error::TypeMismatch),
            None => {}
        }

        if !create {
            return Err(Error::NotFound);
        }
        self.check_writable()?;

        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&child.path)
            .await
            .map_err(Error::from_io)?;
        tracing::debug!(path = %child.path.display(), "local: created file");
        Ok(Arc::new(child))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()> {
        self.check_writable()?;
        let path = self.path.join(name);
        let meta = probe(&path).await?.ok_or(Error::NotFound)?;

        let removed = if meta.is_dir() {
            if recursive {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_dir(&path).await
            }
        } else {
            fs::remove_file(&path).await
        };
        removed.map_err(Error::from_io)?;
        tracing::debug!(path = %path.display(), recursive, "local: removed entry");
        Ok(())
    }

    fn is_same_entry(&self, other: &dyn DirectoryEntry) -> bool {
        other
            .as_any()
            .downcast_ref::<LocalDirectory>()
            .is_some_and(|other| other.path == self.path)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// File on the host filesystem.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    read_only: bool,
}

#[async_trait]
impl FileEntry for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn writable(&self) -> bool {
        !self.read_only
    }

    /// Snapshot of the file as it is now. The content is read in full.
    async fn get_file(&self) -> Result<File> {
        let meta = fs::metadata(&self.path).await.map_err(Error::from_io)?;
        if !meta.is_file() {
            return Err(Error::NotFound);
        }
        let data = fs::read(&self.path).await.map_err(Error::from_io)?;
        let last_modified = meta
            .modified()
            .map(millis_since_epoch)
            .unwrap_or_else(|_| now_millis());
        Ok(File::from_blob(Blob::from(data), self.name.as_str(), last_modified))
    }

    async fn create_writable(&self, keep_existing_data: bool) -> Result<Box<dyn Sink>> {
        if self.read_only {
            return Err(Error::NotAllowed);
        }
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .await
            .map_err(Error::from_io)?;
        if !keep_existing_data {
            file.set_len(0).await.map_err(Error::from_io)?;
        }
        let size = file.metadata().await.map_err(Error::from_io)?.len();

        Ok(Box::new(LocalSink {
            file: Some(file),
            path: self.path.clone(),
            position: 0,
            size,
        }))
    }

    fn is_same_entry(&self, other: &dyn FileEntry) -> bool {
        other
            .as_any()
            .downcast_ref::<LocalFile>()
            .is_some_and(|other| other.path == self.path)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Largest file length the host accepts through `set_len` (`off_t`).
const MAX_FILE_SIZE: u64 = i64::MAX as u64;

/// In-place write session over an open descriptor.
///
/// If the file is unlinked mid-session the descriptor stays valid and the
/// remaining commands complete against the orphaned inode.
struct LocalSink {
    file: Option<fs::File>,
    path: PathBuf,
    position: u64,
    size: u64,
}

impl LocalSink {
    fn file(&mut self) -> Result<&mut fs::File> {
        self.file.as_mut().ok_or(Error::InvalidState)
    }

    async fn resize(&mut self, len: u64) -> Result<()> {
        if len > MAX_FILE_SIZE {
            return Err(Error::QuotaExceeded);
        }
        self.file()?.set_len(len).await.map_err(Error::from_io)?;
        self.size = len;
        Ok(())
    }
}

#[async_trait]
impl Sink for LocalSink {
    async fn write(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Write { position, data } => {
                let end = position
                    .unwrap_or(self.position)
                    .checked_add(data.size())
                    .filter(|end| *end <= MAX_FILE_SIZE)
                    .ok_or(Error::QuotaExceeded)?;
                if let Some(position) = position {
                    if position > self.size {
                        self.resize(position).await?;
                    }
                    self.position = position;
                }
                let start = self.position;
                let file = self.file()?;
                file.seek(SeekFrom::Start(start)).await.map_err(Error::from_io)?;
                for span in data.spans() {
                    file.write_all(span).await.map_err(Error::from_io)?;
                }
                self.position = end;
                self.size = self.size.max(end);
            }
            Command::Seek(position) => {
                if position > self.size {
                    return Err(Error::InvalidState);
                }
                self.position = position;
            }
            Command::Truncate(size) => {
                self.resize(size).await?;
                self.position = self.position.min(size);
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(Error::from_io)?;
            tracing::debug!(path = %self.path.display(), size = self.size, "local: closed write session");
        }
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }
}
