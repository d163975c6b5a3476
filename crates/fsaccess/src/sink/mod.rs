//! Write sessions.
//!
//! A store hands out a [`Sink`] bound to one file. The sink applies validated
//! [`Command`]s to private staged state and publishes it only on
//! [`Sink::close`]. Callers never drive a sink directly: they go through
//! [`WritableFileStream`], which queues commands and enforces the
//! exactly-once close.

mod command;
mod writable;

pub use command::{Command, WriteChunk, WriteParams};
pub use writable::WritableFileStream;

use async_trait::async_trait;

use crate::error::Result;

/// Store-specific write session.
///
/// Implementations may assume they are driven by a single task and that no
/// method is called after `close` or `abort` returned.
#[async_trait]
pub trait Sink: Send {
    /// Apply one command to the staged state.
    async fn write(&mut self, command: Command) -> Result<()>;

    /// Publish staged state and release resources.
    async fn close(&mut self) -> Result<()>;

    /// Discard staged state and release resources.
    async fn abort(&mut self) -> Result<()>;
}
