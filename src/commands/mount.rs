//! Mount command - serve an instance through FUSE

use colored::Colorize;
use std::path::Path;

use super::OutputMode;
use crate::fs::TagFs;
use crate::TagfsError;

/// Mount `fs` at `mountpoint`, blocking until it is unmounted
///
/// # Errors
/// Returns an error if the mountpoint is not a directory or the mount fails.
pub fn execute(fs: TagFs, mountpoint: &Path, allow_other: bool, mode: OutputMode) -> Result<(), TagfsError> {
    if !mountpoint.is_dir() {
        return Err(TagfsError::InvalidInput(format!(
            "Mountpoint '{}' is not a directory",
            mountpoint.display()
        )));
    }

    if mode.chatty() {
        println!(
            "Mounting {} at {} (unmount with fusermount -u)",
            fs.root().display(),
            mountpoint.display().to_string().cyan()
        );
    }
    crate::fuse::mount(fs, mountpoint, allow_other)?;
    Ok(())
}
