//! Attribute and call-kind types of the operation layer

use std::fmt;
use std::time::SystemTime;

use crate::FileId;
use crate::store::StoredFile;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
}

/// Attributes reported for a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttr {
    pub kind: FileKind,
    pub size: u64,
    /// Permission bits only (`0o7777` mask)
    pub perm: u16,
    pub nlink: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    /// Set for stored files only
    pub file_id: Option<FileId>,
}

impl FileAttr {
    /// Synthetic directory stamped with `time`
    #[must_use]
    pub const fn directory(time: SystemTime) -> Self {
        Self {
            kind: FileKind::Directory,
            size: 0,
            perm: 0o755,
            nlink: 2,
            atime: time,
            mtime: time,
            ctime: time,
            file_id: None,
        }
    }

    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, FileKind::Directory)
    }
}

impl From<StoredFile> for FileAttr {
    fn from(file: StoredFile) -> Self {
        Self {
            kind: FileKind::RegularFile,
            size: file.size,
            perm: (file.mode & 0o7777) as u16,
            nlink: 1,
            atime: file.accessed,
            mtime: file.modified,
            ctime: file.changed,
            file_id: Some(file.id),
        }
    }
}

/// Every call kind the filesystem receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetAttributes,
    ListDirectory,
    MakeDirectory,
    RemoveDirectory,
    CreateFile,
    RemoveFile,
    Rename,
    Read,
    Write,
    Truncate,
    Chmod,
    Chown,
    Symlink,
    Link,
    ReadLink,
    GetXattr,
    SetXattr,
    ListXattr,
    RemoveXattr,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetAttributes => "getattr",
            Self::ListDirectory => "readdir",
            Self::MakeDirectory => "mkdir",
            Self::RemoveDirectory => "rmdir",
            Self::CreateFile => "create",
            Self::RemoveFile => "unlink",
            Self::Rename => "rename",
            Self::Read => "read",
            Self::Write => "write",
            Self::Truncate => "truncate",
            Self::Chmod => "chmod",
            Self::Chown => "chown",
            Self::Symlink => "symlink",
            Self::Link => "link",
            Self::ReadLink => "readlink",
            Self::GetXattr => "getxattr",
            Self::SetXattr => "setxattr",
            Self::ListXattr => "listxattr",
            Self::RemoveXattr => "removexattr",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
