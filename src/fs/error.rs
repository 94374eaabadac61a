//! Operation layer errors
//!
//! Lower-layer errors are folded into [`FsError`] so that every failure has a
//! POSIX-facing [`ErrorKind`]. Precondition failures from the index and store
//! (missing tag, occupied id, bad tag name) become their dedicated variants;
//! everything else is an I/O failure.

use thiserror::Error;

use super::types::Operation;
use crate::db::DbError;
use crate::query::{EvalError, ParseError};
use crate::store::StoreError;
use crate::vpath::TagSetError;

/// Failure category reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SyntaxError,
    UnknownTag,
    AlreadyExists,
    NotFound,
    InvalidArgument,
    Unsupported,
    IoFailure,
}

impl ErrorKind {
    /// POSIX status code for this kind
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::SyntaxError | Self::InvalidArgument => libc::EINVAL,
            Self::UnknownTag | Self::NotFound => libc::ENOENT,
            Self::AlreadyExists => libc::EEXIST,
            Self::Unsupported => libc::ENOSYS,
            Self::IoFailure => libc::EIO,
        }
    }
}

/// Operation layer errors
#[derive(Debug, Error)]
pub enum FsError {
    /// Malformed query segment
    #[error("Invalid query: {0}")]
    Syntax(#[from] ParseError),

    /// A query named a tag that does not exist
    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation not supported: {0}")]
    Unsupported(Operation),

    #[error("Index error: {0}")]
    Index(DbError),

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) => ErrorKind::SyntaxError,
            Self::UnknownTag(_) => ErrorKind::UnknownTag,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Index(_) | Self::Store(_) | Self::Config(_) | Self::Io(_) => ErrorKind::IoFailure,
        }
    }

    /// Shorthand for `self.kind().errno()`
    #[must_use]
    pub const fn errno(&self) -> i32 {
        self.kind().errno()
    }
}

impl From<DbError> for FsError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::TagNotFound(tag) => Self::NotFound(format!("tag '{tag}'")),
            DbError::TagExists(tag) => Self::AlreadyExists(format!("tag '{tag}'")),
            DbError::InvalidTagName(tag) => Self::InvalidArgument(format!("invalid tag name '{tag}'")),
            other => Self::Index(other),
        }
    }
}

impl From<StoreError> for FsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(format!("file id {id}")),
            StoreError::AlreadyExists(id) => Self::AlreadyExists(format!("file id {id}")),
            other => Self::Store(other),
        }
    }
}

impl From<EvalError<DbError>> for FsError {
    fn from(err: EvalError<DbError>) -> Self {
        match err {
            EvalError::UnknownTag(tag) => Self::UnknownTag(tag),
            EvalError::Lookup(e) => e.into(),
        }
    }
}

impl From<TagSetError> for FsError {
    fn from(err: TagSetError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
