//! Tag index error types
//!
//! # Error Types
//!
//! - **`SledError`**: Errors from the underlying sled embedded database
//! - **`TransactionAborted`**: A multi-tree update was rolled back
//! - **`CorruptKey`**: A stored key could not be decoded
//! - **`TagNotFound`** / **`TagExists`**: Tag existence preconditions
//! - **`InvalidTagName`**: A name with characters outside the tag alphabet
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.

use thiserror::Error;

/// Tag index errors
#[derive(Debug, Error)]
pub enum DbError {
    /// Represents a sled database error
    #[error("Database error: {0}")]
    SledError(#[from] sled::Error),

    /// A transaction was aborted before commit
    #[error("Index transaction aborted")]
    TransactionAborted,

    /// A key in the index does not follow the expected layout
    #[error("Corrupt index key: {0}")]
    CorruptKey(String),

    /// The named tag does not exist
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// The named tag already exists
    #[error("Tag already exists: {0}")]
    TagExists(String),

    /// Tag names are non-empty and made of ASCII letters, digits and '_'
    #[error("Invalid tag name: '{0}'")]
    InvalidTagName(String),
}

impl From<sled::transaction::TransactionError<()>> for DbError {
    fn from(err: sled::transaction::TransactionError<()>) -> Self {
        match err {
            sled::transaction::TransactionError::Storage(e) => Self::SledError(e),
            sled::transaction::TransactionError::Abort(()) => Self::TransactionAborted,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
