//! Error taxonomy shared by every store and façade.
//!
//! Each variant corresponds to one DOM-style failure name. Stores raise these
//! directly; handles validate cheap syntactic constraints (entry names) before
//! a store is ever consulted.

use std::io;

use thiserror::Error;

/// Classification of an [`Error`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Entry absent, or already removed.
    NotFound,
    /// Entry exists but is not of the requested kind.
    TypeMismatch,
    /// Unsafe structural change, e.g. removing a non-empty directory.
    InvalidModification,
    /// Seek past the known end of the staged content.
    InvalidState,
    /// Malformed write command.
    Syntax,
    /// Requested size is beyond what the store can hold.
    QuotaExceeded,
    /// Mutation attempted on a read-only store.
    NotAllowed,
    /// Invalid entry name or missing constructor argument.
    Argument,
    /// Operation on a closed or errored writable stream.
    StreamClosed,
    /// A pipe into a writable stream was cancelled.
    Aborted,
    /// Storage configuration could not be parsed or resolved.
    Config,
    /// Host I/O failure outside the taxonomy.
    Io,
}

/// Errors produced by blobs, stores, sinks and handles.
#[derive(Debug, Error)]
pub enum Error {
    #[error("A requested file or directory could not be found at the time an operation was processed.")]
    NotFound,

    #[error("The path supplied exists, but was not an entry of requested type.")]
    TypeMismatch,

    #[error("The object can not be modified in this way.")]
    InvalidModification,

    #[error("seeking position failed.")]
    InvalidState,

    #[error("Failed to execute 'write' on 'UnderlyingSinkBase': Invalid params passed. {0}")]
    Syntax(String),

    #[error("The requested size exceeds the storage limit of the store.")]
    QuotaExceeded,

    #[error("The request is not allowed by the user agent or the platform in the current context.")]
    NotAllowed,

    #[error("{0}")]
    Argument(String),

    #[error("{0}")]
    StreamClosed(&'static str),

    #[error("The operation was aborted.")]
    Aborted,

    #[error("invalid storage config: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound => ErrorKind::NotFound,
            Error::TypeMismatch => ErrorKind::TypeMismatch,
            Error::InvalidModification => ErrorKind::InvalidModification,
            Error::InvalidState => ErrorKind::InvalidState,
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::QuotaExceeded => ErrorKind::QuotaExceeded,
            Error::NotAllowed => ErrorKind::NotAllowed,
            Error::Argument(_) => ErrorKind::Argument,
            Error::StreamClosed(_) => ErrorKind::StreamClosed,
            Error::Aborted => ErrorKind::Aborted,
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// DOM-style name of the failure, e.g. `"NotFoundError"`.
    pub fn name(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::TypeMismatch => "TypeMismatchError",
            ErrorKind::InvalidModification => "InvalidModificationError",
            ErrorKind::InvalidState => "InvalidStateError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::QuotaExceeded => "QuotaExceededError",
            ErrorKind::NotAllowed => "NotAllowedError",
            ErrorKind::Argument | ErrorKind::StreamClosed => "TypeError",
            ErrorKind::Aborted => "AbortError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Io => "IoError",
        }
    }

    /// Translate a host I/O failure into the taxonomy.
    ///
    /// Conditions without a taxonomy counterpart stay as [`Error::Io`].
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Error::NotFound,
            io::ErrorKind::DirectoryNotEmpty => Error::InvalidModification,
            io::ErrorKind::IsADirectory => Error::TypeMismatch,
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                Error::NotAllowed
            }
            io::ErrorKind::FileTooLarge
            | io::ErrorKind::StorageFull
            | io::ErrorKind::QuotaExceeded => Error::QuotaExceeded,
            _ => Error::Io(err),
        }
    }

    pub(crate) fn syntax(detail: &str) -> Self {
        Error::Syntax(detail.to_string())
    }
}
