//! Queued writable stream in front of a [`Sink`].
//!
//! Every call enqueues its request synchronously, before the returned future
//! is first polled, so commands apply in issuance order even when callers
//! fire several writes without awaiting them. A single worker task owns the
//! sink and drains the queue.
//!
//! ```text
//! write()/seek()/truncate() ──┐
//! close()/abort()  ───────────┼──► mpsc queue ──► worker ──► Box<dyn Sink>
//!                             │                    │
//!           oneshot replies ◄─┴────────────────────┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::command::{Command, WriteChunk, WriteParams};
use super::Sink;
use crate::error::{Error, Result};

const CLOSED: &str = "Cannot write to a CLOSED writable stream";
const ERRORED: &str = "Cannot write to an ERRORED writable stream";

type Reply = oneshot::Sender<Result<()>>;

enum Request {
    Write(WriteChunk, Reply),
    Close(Reply),
    Abort(Reply),
}

/// Handle to an open write session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct WritableFileStream {
    queue: mpsc::UnboundedSender<Request>,
    closed: Arc<AtomicBool>,
}

impl WritableFileStream {
    /// Spawn the worker for `sink` on the current tokio runtime.
    pub(crate) fn spawn(sink: Box<dyn Sink>) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(drive(sink, rx));
        Self {
            queue,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue raw content or a [`WriteParams`] record.
    pub fn write(&self, chunk: impl Into<WriteChunk>) -> BoxFuture<'static, Result<()>> {
        let chunk = chunk.into();
        let pending = self.enqueue(|reply| Request::Write(chunk, reply));
        settle(pending).boxed()
    }

    /// Queue a cursor move.
    pub fn seek(&self, position: u64) -> BoxFuture<'static, Result<()>> {
        self.write(WriteParams::seek(position))
    }

    /// Queue a resize of the staged content.
    pub fn truncate(&self, size: u64) -> BoxFuture<'static, Result<()>> {
        self.write(WriteParams::truncate(size))
    }

    /// Commit staged content. Only the first call may succeed.
    pub fn close(&self) -> BoxFuture<'static, Result<()>> {
        let pending = if self.claim() {
            self.send(Request::Close)
        } else {
            Err(Error::StreamClosed(CLOSED))
        };
        settle(pending).boxed()
    }

    /// Discard staged content and end the session.
    ///
    /// Aborting an already closed stream is a no-op.
    pub fn abort(&self) -> BoxFuture<'static, Result<()>> {
        if !self.claim() {
            return futures::future::ready(Ok(())).boxed();
        }
        settle(self.send(Request::Abort)).boxed()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Feed every item of `source` into the stream, then close it.
    ///
    /// When `cancel` fires, no further chunks are delivered, the session is
    /// aborted and [`Error::Aborted`] is returned. A failing write leaves the
    /// stream errored and returns that failure.
    pub async fn pipe_from<S>(&self, source: S, cancel: &CancellationToken) -> Result<()>
    where
        S: Stream + Send,
        S::Item: Into<WriteChunk>,
    {
        let mut source = std::pin::pin!(source);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = source.next() => Some(item),
            };
            match next {
                None => {
                    tracing::debug!("pipe cancelled, aborting write session");
                    self.abort().await?;
                    return Err(Error::Aborted);
                }
                Some(Some(chunk)) => self.write(chunk).await?,
                Some(None) => return self.close().await,
            }
        }
    }

    /// Flip the closed flag; true for the caller that flipped it.
    fn claim(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn enqueue(&self, make: impl FnOnce(Reply) -> Request) -> Result<oneshot::Receiver<Result<()>>> {
        if self.is_closed() {
            return Err(Error::StreamClosed(CLOSED));
        }
        self.send(make)
    }

    fn send(&self, make: impl FnOnce(Reply) -> Request) -> Result<oneshot::Receiver<Result<()>>> {
        let (reply, rx) = oneshot::channel();
        self.queue
            .send(make(reply))
            .map_err(|_| Error::StreamClosed(CLOSED))?;
        Ok(rx)
    }
}

impl std::fmt::Debug for WritableFileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritableFileStream")
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn settle(pending: Result<oneshot::Receiver<Result<()>>>) -> Result<()> {
    match pending?.await {
        Ok(result) => result,
        Err(_) => Err(Error::StreamClosed(ERRORED)),
    }
}

/// Worker loop: owns the sink until close, abort, or every handle is dropped.
async fn drive(mut sink: Box<dyn Sink>, mut rx: mpsc::UnboundedReceiver<Request>) {
    let mut errored = false;

    while let Some(request) = rx.recv().await {
        match request {
            Request::Write(chunk, reply) => {
                if errored {
                    let _ = reply.send(Err(Error::StreamClosed(ERRORED)));
                    continue;
                }
                let result = match Command::try_from(chunk) {
                    Ok(command) => {
                        tracing::trace!(?command, "applying write command");
                        sink.write(command).await
                    }
                    Err(e) => Err(e),
                };
                if let Err(e) = &result {
                    tracing::warn!("write session errored, discarding staged data: {}", e);
                    errored = true;
                    if let Err(e) = sink.abort().await {
                        tracing::error!("releasing errored sink failed: {}", e);
                    }
                }
                let _ = reply.send(result);
            }
            Request::Close(reply) => {
                let result = if errored {
                    Err(Error::StreamClosed(ERRORED))
                } else {
                    sink.close().await
                };
                let _ = reply.send(result);
                return;
            }
            Request::Abort(reply) => {
                let result = if errored { Ok(()) } else { sink.abort().await };
                let _ = reply.send(result);
                return;
            }
        }
    }

    // Every handle dropped without close: nothing may be published.
    if !errored {
        tracing::debug!("write session dropped without close, discarding staged data");
        if let Err(e) = sink.abort().await {
            tracing::error!("releasing dropped sink failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Mutex;

    /// Records commands; publishes nothing.
    #[derive(Default, Clone)]
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn entries(&self) -> Vec<String> {
            self.log.lock().map(|l| l.clone()).unwrap_or_default()
        }

        fn push(&self, entry: String) {
            if let Ok(mut log) = self.log.lock() {
                log.push(entry);
            }
        }
    }

    #[async_trait::async_trait]
    impl Sink for Recorder {
        async fn write(&mut self, command: Command) -> Result<()> {
            let entry = match command {
                Command::Write { data, .. } => format!("write:{}", data.text()),
                Command::Seek(p) => format!("seek:{}", p),
                Command::Truncate(s) => format!("truncate:{}", s),
            };
            self.push(entry);
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.push("close".into());
            Ok(())
        }

        async fn abort(&mut self) -> Result<()> {
            self.push("abort".into());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unawaited_commands_keep_order() {
        let recorder = Recorder::default();
        let stream = WritableFileStream::spawn(Box::new(recorder.clone()));
        drop(stream.write("abc"));
        drop(stream.truncate(9));
        drop(stream.seek(0));
        stream.close().await.unwrap();
        assert_eq!(recorder.entries(), vec!["write:abc", "truncate:9", "seek:0", "close"]);
    }

    #[tokio::test]
    async fn test_write_after_close_is_rejected() {
        let stream = WritableFileStream::spawn(Box::new(Recorder::default()));
        stream.close().await.unwrap();
        let err = stream.write("late").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamClosed);
        let err = stream.close().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamClosed);
    }

    #[tokio::test]
    async fn test_failed_command_errors_stream() {
        let recorder = Recorder::default();
        let stream = WritableFileStream::spawn(Box::new(recorder.clone()));
        let err = stream
            .write(WriteParams::Seek { position: None })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        let err = stream.write("more").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamClosed);
        assert!(stream.close().await.is_err());
        assert_eq!(recorder.entries(), vec!["abort"]);
    }

    #[tokio::test]
    async fn test_dropped_stream_aborts() {
        let recorder = Recorder::default();
        let stream = WritableFileStream::spawn(Box::new(recorder.clone()));
        stream.write("x").await.unwrap();
        drop(stream);
        for _ in 0..50 {
            if recorder.entries().last().map(String::as_str) == Some("abort") {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(recorder.entries(), vec!["write:x", "abort"]);
    }

    #[tokio::test]
    async fn test_pipe_cancel_aborts() {
        let recorder = Recorder::default();
        let stream = WritableFileStream::spawn(Box::new(recorder.clone()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = futures::stream::iter(["a", "b"]);
        let err = stream.pipe_from(source, &cancel).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Aborted);
        assert_eq!(recorder.entries(), vec!["abort"]);
    }

    #[tokio::test]
    async fn test_pipe_delivers_then_closes() {
        let recorder = Recorder::default();
        let stream = WritableFileStream::spawn(Box::new(recorder.clone()));
        let source = futures::stream::iter(["a", "b"]);
        stream.pipe_from(source, &CancellationToken::new()).await.unwrap();
        assert_eq!(recorder.entries(), vec!["write:a", "write:b", "close"]);
    }
}
