//! Output formatting for CLI display
//!
//! Plain text goes through the `format_*` helpers (colored unless quiet);
//! `--json` output goes through the serializable views below.

use byte_unit::{Byte, UnitType};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde::Serialize;
use std::time::SystemTime;

use crate::FileId;
use crate::fs::{FileAttr, FileKind};

/// Human-readable size, e.g. `1.5 KiB`
#[must_use]
pub fn format_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

/// Local timestamp, e.g. `2024-05-01 13:37:00`
#[must_use]
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `rwxr-xr-x` style rendering of permission bits
#[must_use]
pub fn format_perm(kind: FileKind, perm: u16) -> String {
    let mut out = String::with_capacity(10);
    out.push(if kind == FileKind::Directory { 'd' } else { '-' });
    for shift in [6, 3, 0] {
        let bits = (perm >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

/// Directory entry name, directories highlighted
#[must_use]
pub fn entry(name: &str, kind: FileKind, quiet: bool) -> String {
    if quiet {
        name.to_string()
    } else if kind == FileKind::Directory {
        format!("{}/", name.blue().bold())
    } else {
        name.to_string()
    }
}

/// One `ls -l` style line
#[must_use]
pub fn long_entry(name: &str, attr: &FileAttr) -> String {
    format!(
        "{} {:>10}  {}  {}",
        format_perm(attr.kind, attr.perm),
        format_size(attr.size),
        format_time(attr.mtime).dimmed(),
        entry(name, attr.kind, false)
    )
}

/// Multi-line attribute listing for `stat`
#[must_use]
pub fn attr_details(path: &str, attr: &FileAttr) -> String {
    let mut lines = vec![
        format!("{} {}", "Path:".bold(), path),
        format!("{} {}", "Type:".bold(), kind_name(attr.kind)),
        format!("{} {} ({} bytes)", "Size:".bold(), format_size(attr.size), attr.size),
        format!("{} {} ({:o})", "Mode:".bold(), format_perm(attr.kind, attr.perm), attr.perm),
        format!("{} {}", "Links:".bold(), attr.nlink),
        format!("{} {}", "Accessed:".bold(), format_time(attr.atime)),
        format!("{} {}", "Modified:".bold(), format_time(attr.mtime)),
        format!("{} {}", "Changed:".bold(), format_time(attr.ctime)),
    ];
    if let Some(id) = attr.file_id {
        lines.push(format!("{} {}", "File id:".bold(), id));
    }
    lines.join("\n")
}

/// Format a tag with usage count
#[must_use]
pub fn tag_with_count(tag: &str, count: usize, quiet: bool) -> String {
    if quiet {
        tag.to_string()
    } else {
        format!("  {} (used by {count} file(s))", tag.green())
    }
}

const fn kind_name(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Directory => "directory",
        FileKind::RegularFile => "file",
    }
}

/// JSON view of a path and its attributes
#[derive(Debug, Serialize)]
pub struct EntryView {
    pub name: String,
    pub kind: &'static str,
    pub size: u64,
    pub perm: String,
    pub modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
}

impl EntryView {
    #[must_use]
    pub fn new(name: impl Into<String>, attr: &FileAttr) -> Self {
        Self {
            name: name.into(),
            kind: kind_name(attr.kind),
            size: attr.size,
            perm: format!("{:o}", attr.perm),
            modified: attr.mtime.into(),
            file_id: attr.file_id,
        }
    }
}

/// JSON view of a tag and its member count
#[derive(Debug, Serialize)]
pub struct TagView {
    pub tag: String,
    pub files: usize,
}

/// JSON view of a query match
#[derive(Debug, Serialize)]
pub struct MatchView {
    pub id: FileId,
    pub name: String,
}
