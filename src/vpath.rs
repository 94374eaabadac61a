//! Virtual path resolution
//!
//! Every request path starts with one of three namespaces:
//!
//! - **tags** (`/tags/<tag>`): tag administration, one directory per tag
//! - **files** (`/files/...`): the raw file store, read-only passthrough
//! - **query** (`/query/<query>/<filename>`): files addressed by a tag query
//!
//! The namespace names come from the instance configuration. Resolution
//! itself never fails; a path naming no known namespace resolves to
//! [`Namespace::Unknown`] and the caller decides how to reject it.

use crate::query::is_tag_char;
use thiserror::Error;

/// The configured top-level directory names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceNames<'a> {
    pub tags: &'a str,
    pub files: &'a str,
    pub query: &'a str,
}

/// Namespace a path resolved into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Namespace {
    /// The mount root itself
    Root,
    Tags,
    Files,
    Query,
    /// First segment matched none of the configured names
    Unknown(String),
}

/// A request path split into its namespace and the segments after it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPath {
    pub namespace: Namespace,
    /// Non-empty segments following the namespace segment
    pub components: Vec<String>,
}

impl VirtualPath {
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self.namespace, Namespace::Root)
    }

    /// Query segment, only for the query namespace
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match self.namespace {
            Namespace::Query => self.components.first().map(String::as_str),
            _ => None,
        }
    }

    /// Filename segment, only for the query namespace
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match self.namespace {
            Namespace::Query => self.components.get(1).map(String::as_str),
            _ => None,
        }
    }

    /// A query without a filename: a directory that exists only as the query's result
    #[must_use]
    pub fn is_virtual_directory(&self) -> bool {
        self.namespace == Namespace::Query && self.components.len() == 1
    }
}

/// Split `path` into namespace, query and filename
///
/// Empty segments are skipped, so `//query//a+b/` resolves like `/query/a+b`.
///
/// # Examples
/// ```
/// use tagfs::vpath::{resolve, Namespace, NamespaceNames};
///
/// let names = NamespaceNames { tags: "tags", files: "files", query: "query" };
/// let path = resolve("/query/music&live/track01.flac", names);
/// assert_eq!(path.namespace, Namespace::Query);
/// assert_eq!(path.query(), Some("music&live"));
/// assert_eq!(path.filename(), Some("track01.flac"));
///
/// assert!(resolve("/", names).is_root());
/// ```
#[must_use]
pub fn resolve(path: &str, names: NamespaceNames<'_>) -> VirtualPath {
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());

    let Some(first) = segments.next() else {
        return VirtualPath {
            namespace: Namespace::Root,
            components: Vec::new(),
        };
    };

    let namespace = if first == names.tags {
        Namespace::Tags
    } else if first == names.files {
        Namespace::Files
    } else if first == names.query {
        Namespace::Query
    } else {
        Namespace::Unknown(first.to_string())
    };

    VirtualPath {
        namespace,
        components: segments.map(str::to_string).collect(),
    }
}

/// Invalid write-side tag set
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagSetError {
    #[error("Empty tag set")]
    Empty,
    #[error("Invalid character '{0}' in tag set; only tag names joined by '+' are allowed")]
    InvalidChar(char),
    #[error("Empty tag name in tag set")]
    EmptyTag,
}

/// Split a `+`-joined tag list used to create or rename a file
///
/// Only tag characters and `+` are accepted here; the other query operators
/// are read-only. Repeated tags are listed once.
///
/// # Errors
/// Returns `TagSetError` if the list is empty, holds an empty tag, or any
/// character other than a tag character or `+`.
///
/// # Examples
/// ```
/// use tagfs::vpath::split_tag_set;
///
/// assert_eq!(split_tag_set("music+live+music").unwrap(), vec!["music", "live"]);
/// assert!(split_tag_set("music&live").is_err());
/// ```
pub fn split_tag_set(spec: &str) -> Result<Vec<&str>, TagSetError> {
    if spec.is_empty() {
        return Err(TagSetError::Empty);
    }
    if let Some(bad) = spec.chars().find(|&c| c != '+' && !is_tag_char(c)) {
        return Err(TagSetError::InvalidChar(bad));
    }

    let mut tags = Vec::new();
    for tag in spec.split('+') {
        if tag.is_empty() {
            return Err(TagSetError::EmptyTag);
        }
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}
