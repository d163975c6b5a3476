//! In-memory store.
//!
//! The whole tree lives in nested node maps; nothing touches the disk. Used
//! for scratch space, tests, and read-only imports of user-selected files.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;

use super::{DirectoryEntry, Entry, EntryStream, FileEntry};
use crate::blob::{Blob, File};
use crate::blob::file::now_millis;
use crate::error::{Error, Result};
use crate::sink::{Command, Sink};

#[derive(Debug)]
struct FileNode {
    name: String,
    writable: bool,
    state: RwLock<FileState>,
}

#[derive(Debug)]
struct FileState {
    deleted: bool,
    file: File,
}

#[derive(Debug)]
struct DirNode {
    name: String,
    writable: bool,
    state: RwLock<DirState>,
}

#[derive(Debug, Default)]
struct DirState {
    deleted: bool,
    children: BTreeMap<String, Node>,
}

#[derive(Debug, Clone)]
enum Node {
    File(Arc<FileNode>),
    Directory(Arc<DirNode>),
}

impl FileNode {
    fn new(name: &str, file: File, writable: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            writable,
            state: RwLock::new(FileState {
                deleted: false,
                file,
            }),
        })
    }
}

impl DirNode {
    fn new(name: &str, writable: bool, children: BTreeMap<String, Node>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            writable,
            state: RwLock::new(DirState {
                deleted: false,
                children,
            }),
        })
    }
}

impl Node {
    fn into_entry(self) -> Entry {
        match self {
            Node::File(node) => Entry::File(Arc::new(MemoryFile { node })),
            Node::Directory(node) => Entry::Directory(Arc::new(MemoryDirectory { node })),
        }
    }
}

/// Directory in the in-memory store.
///
/// Thread-safe via per-node `RwLock`s. Cloning yields another reference to
/// the same node. All data is lost when the last reference is dropped.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    node: Arc<DirNode>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    /// Create a new empty, writable root.
    pub fn new() -> Self {
        Self {
            node: DirNode::new("", true, BTreeMap::new()),
        }
    }
}

/// Destroy `root` and, when allowed, everything below it.
///
/// The emptiness check and the marking of `root` happen under one write
/// lock, so a child added through another handle either lands first (and
/// non-recursive removal fails) or sees the directory already deleted.
async fn destroy(root: Node, recursive: bool) -> Result<()> {
    let mut pending = Vec::new();
    match root {
        Node::Directory(dir) => {
            let mut state = dir.state.write().await;
            if !recursive && !state.children.is_empty() {
                return Err(Error::InvalidModification);
            }
            state.deleted = true;
            pending.extend(std::mem::take(&mut state.children).into_values());
        }
        file => pending.push(file),
    }

    while let Some(node) = pending.pop() {
        match node {
            Node::File(file) => {
                let mut state = file.state.write().await;
                state.deleted = true;
                state.file = File::from_blob(Blob::default(), file.name.as_str(), 0);
            }
            Node::Directory(dir) => {
                let mut state = dir.state.write().await;
                state.deleted = true;
                pending.extend(std::mem::take(&mut state.children).into_values());
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DirectoryEntry for MemoryDirectory {
    fn name(&self) -> &str {
        &self.node.name
    }

    fn writable(&self) -> bool {
        self.node.writable
    }

    async fn entries(&self) -> Result<EntryStream> {
        let state = self.node.state.read().await;
        if state.deleted {
            return Err(Error::NotFound);
        }
        let snapshot: Vec<_> = state
            .children
            .iter()
            .map(|(name, node)| Ok((name.clone(), node.clone().into_entry())))
            .collect();
        Ok(stream::iter(snapshot).boxed())
    }

    async fn get_directory(&self, name: &str, create: bool) -> Result<Arc<dyn DirectoryEntry>> {
        let mut state = self.node.state.write().await;
        if state.deleted {
            return Err(Error::NotFound);
        }

        match state.children.get(name) {
            Some(Node::Directory(node)) => {
                return Ok(Arc::new(MemoryDirectory { node: node.clone() }));
            }
            Some(Node::File(_)) => return Err(Error::TypeMismatch),
            None => {}
        }

        if !create {
            return Err(Error::NotFound);
        }
        if !self.node.writable {
            return Err(Error::NotAllowed);
        }

        let node = DirNode::new(name, true, BTreeMap::new());
        state
            .children
            .insert(name.to_string(), Node::Directory(node.clone()));
        tracing::debug!(parent = %self.node.name, name, "memory: created directory");
        Ok(Arc::new(MemoryDirectory { node }))
    }

    async fn get_file(&self, name: &str, create: bool) -> Result<Arc<dyn FileEntry>> {
        let mut state = self.node.state.write().await;
        if state.deleted {
            return Err(Error::NotFound);
        }

        match state.children.get(name) {
            Some(Node::File(node)) => return Ok(Arc::new(MemoryFile { node: node.clone() })),
            Some(Node::Directory(_)) => return Err(Error::TypeMismatch),
            None => {}
        }

        if !create {
            return Err(Error::NotFound);
        }
        if !self.node.writable {
            return Err(Error::NotAllowed);
        }

        let node = FileNode::new(name, File::new(Vec::<Blob>::new(), name), true);
        state.children.insert(name.to_string(), Node::File(node.clone()));
        tracing::debug!(parent = %self.node.name, name, "memory: created file");
        Ok(Arc::new(MemoryFile { node }))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()> {
        let mut state = self.node.state.write().await;
        if state.deleted {
            return Err(Error::NotFound);
        }
        if !self.node.writable {
            return Err(Error::NotAllowed);
        }

        let child = state.children.get(name).cloned().ok_or(Error::NotFound)?;
        destroy(child, recursive).await?;
        state.children.remove(name);
        tracing::debug!(parent = %self.node.name, name, recursive, "memory: removed entry");
        Ok(())
    }

    fn is_same_entry(&self, other: &dyn DirectoryEntry) -> bool {
        other
            .as_any()
            .downcast_ref::<MemoryDirectory>()
            .is_some_and(|other| Arc::ptr_eq(&self.node, &other.node))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// File in the in-memory store.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    node: Arc<FileNode>,
}

#[async_trait]
impl FileEntry for MemoryFile {
    fn name(&self) -> &str {
        &self.node.name
    }

    fn writable(&self) -> bool {
        self.node.writable
    }

    async fn get_file(&self) -> Result<File> {
        let state = self.node.state.read().await;
        if state.deleted {
            return Err(Error::NotFound);
        }
        Ok(state.file.clone())
    }

    async fn create_writable(&self, keep_existing_data: bool) -> Result<Box<dyn Sink>> {
        if !self.node.writable {
            return Err(Error::NotAllowed);
        }
        let state = self.node.state.read().await;
        if state.deleted {
            return Err(Error::NotFound);
        }

        let staged = if keep_existing_data {
            state.file.as_blob().clone()
        } else {
            Blob::default()
        };
        Ok(Box::new(MemorySink {
            node: self.node.clone(),
            staged,
            position: 0,
        }))
    }

    fn is_same_entry(&self, other: &dyn FileEntry) -> bool {
        other
            .as_any()
            .downcast_ref::<MemoryFile>()
            .is_some_and(|other| Arc::ptr_eq(&self.node, &other.node))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Copy-on-write write session over a [`MemoryFile`].
///
/// The staged blob shares spans with the committed content; each command
/// builds a new part list. The node is touched only by `close`.
struct MemorySink {
    node: Arc<FileNode>,
    staged: Blob,
    position: u64,
}

/// Largest file the memory store holds: 4 GiB, or `isize::MAX` bytes where
/// that is smaller.
const MAX_FILE_SIZE: u64 = if (isize::MAX as u64) < (1 << 32) {
    isize::MAX as u64
} else {
    1 << 32
};

fn check_size(len: u64) -> Result<u64> {
    if len > MAX_FILE_SIZE {
        return Err(Error::QuotaExceeded);
    }
    Ok(len)
}

impl MemorySink {
    /// Zero-extend the staged content to `len` bytes.
    fn extend_to(&mut self, len: u64) -> Result<()> {
        let size = self.staged.size();
        if len > size {
            let padding = Blob::zeroed(check_size(len)? - size);
            self.staged = Blob::concat([&self.staged, &padding]);
        }
        Ok(())
    }

    /// `head + padding + data + tail`, cursor advanced past `data`.
    ///
    /// The caller has already checked the end against [`MAX_FILE_SIZE`].
    fn splice(&mut self, data: Blob) {
        let position = self.position;
        let end = position + data.size();
        let head = self.staged.slice(..position as i64);
        let padding = Blob::zeroed(position.saturating_sub(head.size()));
        let tail = self.staged.slice(end as i64..);
        self.staged = Blob::concat([&head, &padding, &data, &tail]);
        self.position = end;
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Write { position, data } => {
                let start = position.unwrap_or(self.position);
                check_size(start.checked_add(data.size()).ok_or(Error::QuotaExceeded)?)?;
                if let Some(position) = position {
                    self.extend_to(position)?;
                    self.position = position;
                }
                self.splice(data);
            }
            Command::Seek(position) => {
                if position > self.staged.size() {
                    return Err(Error::InvalidState);
                }
                self.position = position;
            }
            Command::Truncate(size) => {
                if size < self.staged.size() {
                    self.staged = self.staged.slice(..size as i64);
                } else {
                    self.extend_to(size)?;
                }
                self.position = self.position.min(size);
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.node.state.write().await;
        if state.deleted {
            return Err(Error::NotFound);
        }
        let staged = std::mem::take(&mut self.staged);
        tracing::debug!(name = %self.node.name, size = staged.size(), "memory: committed write session");
        state.file = File::from_blob(staged, self.node.name.as_str(), now_millis());
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.staged = Blob::default();
        Ok(())
    }
}

enum Draft {
    File(File),
    Directory(BTreeMap<String, Draft>),
}

/// Build a read-only tree from `(relative path, file)` pairs.
///
/// Intermediate directories are created as needed. Every node of the result
/// refuses mutation with `NotAllowed`.
pub fn from_files<I, S>(root_name: &str, files: I) -> Result<MemoryDirectory>
where
    I: IntoIterator<Item = (S, File)>,
    S: AsRef<str>,
{
    let mut root: BTreeMap<String, Draft> = BTreeMap::new();

    for (path, file) in files {
        let path = path.as_ref();
        let mut components: Vec<&str> = path
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .collect();
        if components.contains(&"..") {
            return Err(Error::Argument(format!("path escapes root: {}", path)));
        }
        let leaf = components
            .pop()
            .ok_or_else(|| Error::Argument(format!("empty path for file {}", file.name())))?;

        let mut dir = &mut root;
        for component in components {
            let next = dir
                .entry(component.to_string())
                .or_insert_with(|| Draft::Directory(BTreeMap::new()));
            dir = match next {
                Draft::Directory(children) => children,
                Draft::File(_) => return Err(Error::TypeMismatch),
            };
        }
        if let Some(Draft::Directory(_)) = dir.get(leaf) {
            return Err(Error::TypeMismatch);
        }
        dir.insert(leaf.to_string(), Draft::File(file));
    }

    Ok(MemoryDirectory {
        node: build_read_only(root_name, root),
    })
}

fn build_read_only(name: &str, drafts: BTreeMap<String, Draft>) -> Arc<DirNode> {
    let children = drafts
        .into_iter()
        .map(|(child, draft)| {
            let node = match draft {
                Draft::File(file) => Node::File(FileNode::new(&child, file, false)),
                Draft::Directory(grandchildren) => {
                    Node::Directory(build_read_only(&child, grandchildren))
                }
            };
            (child, node)
        })
        .collect();
    DirNode::new(name, false, children)
}
