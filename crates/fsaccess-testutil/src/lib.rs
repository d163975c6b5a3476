//! Test utilities for fsaccess.
//!
//! Helpers shared by the conformance suites: every one of them goes through
//! the public handle API, so the same test body runs against any store.

use anyhow::{Context, Result, ensure};
use futures::TryStreamExt;

use fsaccess::{DirectoryHandle, FileHandle, Handle, WritableOptions};

/// Install a `tracing` subscriber honouring `RUST_LOG`. Safe to call from
/// every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn get_file_contents(handle: &FileHandle) -> Result<String> {
    Ok(handle.get_file().await?.text())
}

pub async fn get_file_size(handle: &FileHandle) -> Result<u64> {
    Ok(handle.get_file().await?.size())
}

pub async fn get_directory_entry_count(handle: &DirectoryHandle) -> Result<usize> {
    let entries: Vec<_> = handle.entries().try_collect().await?;
    Ok(entries.len())
}

/// Create `name` under `parent` and check it starts out empty.
pub async fn create_empty_file(name: &str, parent: &DirectoryHandle) -> Result<FileHandle> {
    let handle = parent.get_file_handle(name, true).await?;
    ensure!(
        get_file_size(&handle).await? == 0,
        "{} was not empty after creation",
        name
    );
    Ok(handle)
}

pub async fn create_file_with_contents(
    name: &str,
    contents: &str,
    parent: &DirectoryHandle,
) -> Result<FileHandle> {
    let handle = create_empty_file(name, parent).await?;
    let stream = handle.create_writable(WritableOptions::default()).await?;
    stream.write(contents).await?;
    stream.close().await.with_context(|| format!("closing {}", name))?;
    Ok(handle)
}

pub async fn create_directory(name: &str, parent: &DirectoryHandle) -> Result<DirectoryHandle> {
    Ok(parent.get_directory_handle(name, true).await?)
}

/// Sorted child names, directories suffixed with `/`.
pub async fn get_sorted_directory_entries(handle: &DirectoryHandle) -> Result<Vec<String>> {
    let mut names: Vec<String> = handle
        .entries()
        .map_ok(|(name, child)| match child {
            Handle::Directory(_) => format!("{}/", name),
            Handle::File(_) => name,
        })
        .try_collect()
        .await?;
    names.sort();
    Ok(names)
}

/// Remove every child of `root`.
pub async fn cleanup(root: &DirectoryHandle) -> Result<()> {
    let children: Vec<(String, Handle)> = root.entries().try_collect().await?;
    for (name, child) in children {
        let recursive = matches!(child, Handle::Directory(_));
        root.remove_entry(&name, recursive)
            .await
            .with_context(|| format!("removing {}", name))?;
    }
    Ok(())
}
