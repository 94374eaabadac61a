//! Tag commands - tags, mkdir, rmdir

use colored::Colorize;
use dialoguer::Confirm;

use super::OutputMode;
use crate::fs::{FsError, TagFs};
use crate::output::{self, TagView};
use crate::vpath::{self, Namespace};
use crate::TagfsError;

type Result<T> = std::result::Result<T, TagfsError>;

/// List every tag with its member count
///
/// # Errors
/// Returns an error if the index cannot be read.
pub fn list(fs: &TagFs, mode: OutputMode) -> Result<()> {
    let tags = tag_counts(fs)?;

    if mode.json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }

    if tags.is_empty() {
        if mode.chatty() {
            println!("No tags found.");
        }
        return Ok(());
    }

    if mode.chatty() {
        println!("Tags:");
    }
    for view in &tags {
        println!("{}", output::tag_with_count(&view.tag, view.files, mode.quiet));
    }
    Ok(())
}

/// Create the tag at `path`
///
/// # Errors
/// Returns an error if the tag exists or the path is not a tag path.
pub fn mkdir(fs: &mut TagFs, path: &str, mode: OutputMode) -> Result<()> {
    fs.make_directory(path)?;
    if mode.chatty() {
        println!("{} {}", "Created tag".green(), path);
    }
    Ok(())
}

/// Remove the tag at `path`, asking first if it still has files
///
/// # Errors
/// Returns an error if the tag does not exist or the prompt fails.
pub fn rmdir(fs: &mut TagFs, path: &str, force: bool, mode: OutputMode) -> Result<()> {
    if !force && mode.chatty() {
        let members = tag_member_count(fs, path)?;
        if members > 0 && !confirm(&format!("Tag still holds {members} file(s). Remove {path}?"))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    fs.remove_directory(path)?;
    if mode.chatty() {
        println!("{} {}", "Removed tag".red(), path);
    }
    Ok(())
}

fn tag_counts(fs: &TagFs) -> Result<Vec<TagView>> {
    let index = fs.index();
    index
        .list_tags()
        .map_err(FsError::from)?
        .into_iter()
        .map(|tag| {
            let files = index.members_of(&tag).map_err(FsError::from)?.len();
            Ok(TagView { tag, files })
        })
        .collect()
}

/// Member count of the tag named by a tag-namespace path
fn tag_member_count(fs: &TagFs, path: &str) -> Result<usize> {
    let resolved = vpath::resolve(path, fs.config().namespaces());
    match (&resolved.namespace, resolved.components.as_slice()) {
        (Namespace::Tags, [tag]) => Ok(fs.index().members_of(tag).map_err(FsError::from)?.len()),
        _ => Ok(0),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}
