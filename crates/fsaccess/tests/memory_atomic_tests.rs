//! Commit semantics of the in-memory store: staged writes stay private until
//! close, and close publishes exactly once.

use fsaccess::{DirectoryHandle, ErrorKind, MemoryDirectory, WritableOptions};
use fsaccess_testutil::{create_directory, create_empty_file, create_file_with_contents, get_file_contents, init_tracing};

fn memory_root() -> DirectoryHandle {
    init_tracing();
    DirectoryHandle::new(MemoryDirectory::new())
}

#[tokio::test]
async fn staged_content_is_private_until_close() {
    let root = memory_root();
    let handle = create_file_with_contents("atomic_file_is_not_copied.txt", "very long string", &root)
        .await
        .unwrap();

    let stream = handle.create_writable(WritableOptions::default()).await.unwrap();
    stream.write("bar").await.unwrap();
    assert_eq!(get_file_contents(&handle).await.unwrap(), "very long string");

    stream.close().await.unwrap();
    assert_eq!(get_file_contents(&handle).await.unwrap(), "bar");
}

#[tokio::test]
async fn last_close_wins() {
    let root = memory_root();
    let handle = create_empty_file("race.txt", &root).await.unwrap();

    let a = handle.create_writable(WritableOptions::default()).await.unwrap();
    let b = handle.create_writable(WritableOptions::default()).await.unwrap();
    a.write("foox").await.unwrap();
    b.write("bar").await.unwrap();

    b.close().await.unwrap();
    assert_eq!(get_file_contents(&handle).await.unwrap(), "bar");
    a.close().await.unwrap();
    assert_eq!(get_file_contents(&handle).await.unwrap(), "foox");
}

#[tokio::test]
async fn abort_leaves_file_untouched() {
    let root = memory_root();
    let handle = create_file_with_contents("keep.txt", "original", &root).await.unwrap();

    let stream = handle.create_writable(WritableOptions::keep_existing_data()).await.unwrap();
    stream.write("changed").await.unwrap();
    stream.abort().await.unwrap();

    assert!(stream.is_closed());
    assert_eq!(get_file_contents(&handle).await.unwrap(), "original");
    // Aborting twice is harmless; closing afterwards is not.
    stream.abort().await.unwrap();
    assert_eq!(stream.close().await.unwrap_err().kind(), ErrorKind::StreamClosed);
}

#[tokio::test]
async fn dropped_stream_publishes_nothing() {
    let root = memory_root();
    let handle = create_file_with_contents("dropped.txt", "before", &root).await.unwrap();

    let stream = handle.create_writable(WritableOptions::default()).await.unwrap();
    stream.write("after").await.unwrap();
    drop(stream);
    tokio::task::yield_now().await;

    assert_eq!(get_file_contents(&handle).await.unwrap(), "before");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_closes_succeed_once() {
    let root = memory_root();
    let handle = create_empty_file("once.txt", &root).await.unwrap();
    let stream = handle.create_writable(WritableOptions::default()).await.unwrap();
    stream.write("payload").await.unwrap();

    let closers: Vec<_> = (0..100)
        .map(|_| {
            let stream = stream.clone();
            tokio::spawn(async move { stream.close().await })
        })
        .collect();

    let mut succeeded = 0;
    for closer in closers {
        match closer.await.unwrap() {
            Ok(()) => succeeded += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::StreamClosed),
        }
    }
    assert_eq!(succeeded, 1);
    assert_eq!(get_file_contents(&handle).await.unwrap(), "payload");
}

#[tokio::test]
async fn close_after_parent_removal_fails() {
    let root = memory_root();
    let dir = create_directory("parent_dir", &root).await.unwrap();
    let handle = create_empty_file("orphan.txt", &dir).await.unwrap();
    let stream = handle.create_writable(WritableOptions::default()).await.unwrap();
    stream.write("foo").await.unwrap();
    stream.truncate(0).await.unwrap();

    root.remove_entry("parent_dir", true).await.unwrap();

    let err = stream.close().await.unwrap_err();
    assert_eq!(err.name(), "NotFoundError");
}
