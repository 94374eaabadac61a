//! Path commands - ls, stat, cat, put, write, rm, mv

use colored::Colorize;
use std::io::{self, Read, Write};
use std::path::Path;

use super::{OutputMode, child_path};
use crate::fs::TagFs;
use crate::output::{self, EntryView};
use crate::TagfsError;

type Result<T> = std::result::Result<T, TagfsError>;

/// List the directory at `path`
///
/// # Errors
/// Returns an error if the directory or one of its entries cannot be read.
pub fn ls(fs: &TagFs, path: &str, long: bool, mode: OutputMode) -> Result<()> {
    let names = fs.list_directory(path)?;

    if mode.json {
        let entries = names
            .iter()
            .map(|name| Ok(EntryView::new(name.as_str(), &fs.get_attributes(&child_path(path, name))?)))
            .collect::<Result<Vec<_>>>()?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if names.is_empty() && mode.chatty() {
        println!("{}", "(empty)".dimmed());
    }

    for name in &names {
        let attr = fs.get_attributes(&child_path(path, name))?;
        if long && !mode.quiet {
            println!("{}", output::long_entry(name, &attr));
        } else {
            println!("{}", output::entry(name, attr.kind, mode.quiet));
        }
    }
    Ok(())
}

/// Print the attributes of `path`
///
/// # Errors
/// Returns an error if the path does not resolve.
pub fn stat(fs: &TagFs, path: &str, mode: OutputMode) -> Result<()> {
    let attr = fs.get_attributes(path)?;

    if mode.json {
        println!("{}", serde_json::to_string_pretty(&EntryView::new(path, &attr))?);
    } else if mode.quiet {
        println!("{}", attr.size);
    } else {
        println!("{}", output::attr_details(path, &attr));
    }
    Ok(())
}

/// Write the full content of `path` to stdout
///
/// # Errors
/// Returns an error if the file cannot be resolved or read.
pub fn cat(fs: &TagFs, path: &str) -> Result<()> {
    let size = fs.get_attributes(path)?.size;
    let len = usize::try_from(size)
        .map_err(|_| TagfsError::InvalidInput(format!("'{path}' is too large to print")))?;
    let data = fs.read(path, 0, len)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

/// Create `path` with the content of `source`, or stdin if `None`
///
/// # Errors
/// Returns an error if the source cannot be read or the file cannot be created.
pub fn put(fs: &mut TagFs, path: &str, source: Option<&Path>, perm: u32, mode: OutputMode) -> Result<()> {
    let data = match source {
        Some(source) => std::fs::read(source)?,
        None => {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf)?;
            buf
        }
    };

    fs.create_file(path, perm)?;
    if !data.is_empty() {
        fs.write(path, 0, &data)?;
    }
    let attr = fs.get_attributes(path)?;

    if mode.json {
        println!("{}", serde_json::to_string_pretty(&EntryView::new(path, &attr))?);
    } else if mode.chatty() {
        println!("{} {} ({})", "Created".green(), path, output::format_size(attr.size));
    }
    Ok(())
}

/// Write `data` into `path` at `offset`
///
/// # Errors
/// Returns an error if the file cannot be resolved or written.
pub fn write(fs: &mut TagFs, path: &str, offset: u64, data: &str, mode: OutputMode) -> Result<()> {
    let written = fs.write(path, offset, data.as_bytes())?;

    if mode.json {
        println!("{}", serde_json::json!({ "path": path, "offset": offset, "written": written }));
    } else if mode.quiet {
        println!("{written}");
    } else {
        println!("Wrote {written} byte(s) to {path} at offset {offset}");
    }
    Ok(())
}

/// Remove the file at `path`
///
/// # Errors
/// Returns an error if the file cannot be resolved or deleted.
pub fn rm(fs: &mut TagFs, path: &str, mode: OutputMode) -> Result<()> {
    fs.remove_file(path)?;
    if mode.chatty() {
        println!("{} {}", "Removed".red(), path);
    }
    Ok(())
}

/// Move the file at `old` to `new`
///
/// # Errors
/// Returns an error if the rename is rejected.
pub fn mv(fs: &mut TagFs, old: &str, new: &str, mode: OutputMode) -> Result<()> {
    fs.rename(old, new)?;
    if mode.chatty() {
        println!("Moved {} -> {}", old, new.cyan());
    }
    Ok(())
}
