//! Tagfs - a tag-addressable virtual filesystem
//!
//! Files carry tags instead of living in directories. A directory path is a
//! tag query (`/query/music&live`), a file path is a query plus a filename
//! (`/query/music&live/set.flac`). Tags are managed as directories under
//! `/tags`, and the raw storage is exposed read-only under `/files`.
//!
//! The library is layered bottom-up:
//!
//! - [`query`]: tag query parsing and set evaluation
//! - [`vpath`]: splitting request paths into namespace, query and filename
//! - [`db`]: the sled-backed tag index
//! - [`store`]: file content and metadata on the host filesystem
//! - [`config`]: the per-instance configuration record
//! - [`fs`]: the filesystem operations tying them together

use thiserror::Error;

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod fs;
#[cfg(feature = "fuse")]
pub mod fuse;
pub mod output;
pub mod query;
pub mod store;
pub mod vpath;

#[cfg(test)]
pub mod testing;

/// Identifier of a stored file, allocated from a persisted counter
pub type FileId = u64;

/// Error enum, contains all failure states of the program
#[derive(Debug, Error)]
pub enum TagfsError {
    /// Filesystem operation error
    #[error("{0}")]
    Fs(#[from] fs::FsError),
    /// Represents a configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    /// Represents an I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON output could not be produced
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Interactive prompt failed
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TagfsError {
    /// Process exit code: the errno of filesystem errors, 1 otherwise
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Fs(e) => e.errno(),
            _ => 1,
        }
    }
}
