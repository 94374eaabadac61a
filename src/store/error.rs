//! File store error types

use crate::FileId;
use thiserror::Error;

/// File store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Host filesystem error
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata could not be encoded
    #[error("Failed to encode file metadata: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Metadata could not be decoded
    #[error("Failed to decode file metadata: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// The allocation counter could not be persisted
    #[error("Failed to persist allocation counter: {0}")]
    Config(#[from] ::config::ConfigError),

    /// No storage exists for the id
    #[error("No stored file with id {0}")]
    NotFound(FileId),

    /// Storage already exists for the id
    #[error("File id {0} is already in use")]
    AlreadyExists(FileId),
}
