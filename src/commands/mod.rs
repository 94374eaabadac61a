//! Command implementations
//!
//! Each command runs one or more operations against an open `TagFs` and
//! prints the result in the selected [`OutputMode`].

pub mod files;
#[cfg(feature = "fuse")]
pub mod mount;
pub mod query;
pub mod tags;

pub use files::{cat, ls, mv, put, rm, stat, write};
#[cfg(feature = "fuse")]
pub use mount::execute as mount;
pub use query::execute as query;
pub use tags::{list as tags, mkdir, rmdir};

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputMode {
    /// Bare results only
    pub quiet: bool,
    /// Pretty-printed JSON
    pub json: bool,
}

impl OutputMode {
    /// Whether informational messages should be printed
    #[must_use]
    pub const fn chatty(self) -> bool {
        !self.quiet && !self.json
    }
}

/// Join a directory path and an entry name
#[must_use]
pub fn child_path(dir: &str, name: &str) -> String {
    format!("{}/{name}", dir.trim_end_matches('/'))
}
