//! Testing utilities for tagfs
//!
//! This module provides a `TestFs` wrapper that opens a filesystem instance
//! in a temporary directory, plus small helpers for seeding files.
//!
//! Only available when compiled with `cfg(test)`.

use std::path::Path;
use tempfile::TempDir;

use crate::fs::TagFs;

/// Wrapper for a temporary filesystem instance that cleans up on drop
///
/// The instance root is a fresh `TempDir`; dropping the wrapper closes the
/// session first and then removes the directory.
pub struct TestFs {
    fs: TagFs,
    dir: TempDir,
}

impl TestFs {
    /// Open a new instance in a fresh temporary directory
    ///
    /// # Panics
    /// Panics if the directory or the instance cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let fs = TagFs::open(dir.path()).expect("Failed to open test filesystem");
        Self { fs, dir }
    }

    #[must_use]
    pub const fn fs(&self) -> &TagFs {
        &self.fs
    }

    pub const fn fs_mut(&mut self) -> &mut TagFs {
        &mut self.fs
    }

    /// Root directory of the instance
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create `path` and write `content` to it
    ///
    /// # Panics
    /// Panics if creating or writing the file fails.
    pub fn put(&mut self, path: &str, content: &[u8]) {
        self.fs.create_file(path, 0o644).expect("Failed to create test file");
        if !content.is_empty() {
            self.fs.write(path, 0, content).expect("Failed to write test file");
        }
    }

    /// Full content of `path`
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    #[must_use]
    pub fn cat(&self, path: &str) -> Vec<u8> {
        let size = self.fs.get_attributes(path).expect("Failed to stat test file").size;
        self.fs
            .read(path, 0, usize::try_from(size).expect("test file too large"))
            .expect("Failed to read test file")
    }

    /// Sorted listing of `path`
    ///
    /// # Panics
    /// Panics if the directory cannot be listed.
    #[must_use]
    pub fn ls(&self, path: &str) -> Vec<String> {
        let mut names = self.fs.list_directory(path).expect("Failed to list test directory");
        names.sort();
        names
    }
}

impl Default for TestFs {
    fn default() -> Self {
        Self::new()
    }
}
