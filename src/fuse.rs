//! Kernel bridge through `fuser`
//!
//! The operation layer is path based while the kernel speaks inode numbers.
//! [`InodeTable`] hands out an inode per path the kernel has looked up; the
//! [`TagFsFuse`] adapter translates each request to a path, calls the
//! matching [`TagFs`] method and answers with the error kind's errno.
//!
//! The same file is reachable through many query paths, so inode numbers
//! name paths, not files.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::{Duration, SystemTime};

use fuser::{
    FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use tracing::{error, info};

use crate::fs::{FileAttr, FileKind, FsError, TagFs};

const ROOT_INO: u64 = fuser::FUSE_ROOT_ID;
const TTL: Duration = Duration::from_secs(1);
const BLOCK_SIZE: u32 = 512;

/// Bidirectional inode <-> path mapping
///
/// Every inode except the root carries the kernel's lookup count and is
/// dropped once the kernel forgets all of its references.
#[derive(Debug)]
pub struct InodeTable {
    paths: HashMap<u64, Node>,
    inodes: HashMap<String, u64>,
    next: u64,
}

#[derive(Debug)]
struct Node {
    path: String,
    lookups: u64,
}

impl InodeTable {
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            paths: HashMap::new(),
            inodes: HashMap::new(),
            next: ROOT_INO + 1,
        };
        table.paths.insert(
            ROOT_INO,
            Node {
                path: "/".to_string(),
                lookups: 0,
            },
        );
        table.inodes.insert("/".to_string(), ROOT_INO);
        table
    }

    #[must_use]
    pub fn path(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(|node| node.path.as_str())
    }

    /// Number of live inodes, the root included
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Path of `name` inside the directory `parent`
    #[must_use]
    pub fn child(&self, parent: u64, name: &OsStr) -> Option<String> {
        let dir = self.path(parent)?;
        let name = name.to_str()?;
        Some(format!("{}/{name}", dir.trim_end_matches('/')))
    }

    /// Inode of `path` handed to the kernel, counting one more lookup
    pub fn lookup(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.inodes.get(path) {
            if let Some(node) = self.paths.get_mut(&ino) {
                node.lookups += 1;
            }
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(
            ino,
            Node {
                path: path.to_string(),
                lookups: 1,
            },
        );
        self.inodes.insert(path.to_string(), ino);
        ino
    }

    /// Inode number to show for `path` without taking a reference
    ///
    /// Paths the kernel holds no reference to get a number that is never
    /// recorded.
    pub fn peek(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.inodes.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        ino
    }

    /// Release `count` kernel references to `ino`
    pub fn release(&mut self, ino: u64, count: u64) {
        if ino == ROOT_INO {
            return;
        }
        let Some(node) = self.paths.get_mut(&ino) else {
            return;
        };
        node.lookups = node.lookups.saturating_sub(count);
        if node.lookups == 0 {
            if let Some(node) = self.paths.remove(&ino) {
                self.inodes.remove(&node.path);
            }
        }
    }

    /// Detach `path` and every path below it from their inodes
    pub fn remove_tree(&mut self, path: &str) {
        let prefix = format!("{path}/");
        let stale: Vec<u64> = self
            .inodes
            .iter()
            .filter(|&(p, &ino)| ino != ROOT_INO && (p.as_str() == path || p.starts_with(&prefix)))
            .map(|(_, &ino)| ino)
            .collect();
        for ino in stale {
            if let Some(node) = self.paths.remove(&ino) {
                self.inodes.remove(&node.path);
            }
        }
    }

    /// Point the inode of `old` at `new`
    pub fn rename(&mut self, old: &str, new: &str) {
        self.remove_tree(new);
        if let Some(ino) = self.inodes.remove(old) {
            if let Some(node) = self.paths.get_mut(&ino) {
                node.path = new.to_string();
            }
            self.inodes.insert(new.to_string(), ino);
        }
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// `fuser` adapter around a [`TagFs`] session
pub struct TagFsFuse {
    fs: TagFs,
    inodes: InodeTable,
    uid: u32,
    gid: u32,
}

impl TagFsFuse {
    /// Wrap `fs`, reporting files as owned by the owner of its root directory
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the root directory cannot be inspected.
    pub fn new(fs: TagFs) -> std::io::Result<Self> {
        let meta = std::fs::metadata(fs.root())?;
        Ok(Self {
            uid: meta.uid(),
            gid: meta.gid(),
            fs,
            inodes: InodeTable::new(),
        })
    }

    fn to_fuser(&self, ino: u64, attr: &FileAttr) -> fuser::FileAttr {
        fuser::FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: attr.atime,
            mtime: attr.mtime,
            ctime: attr.ctime,
            crtime: attr.ctime,
            kind: match attr.kind {
                FileKind::Directory => FileType::Directory,
                FileKind::RegularFile => FileType::RegularFile,
            },
            perm: attr.perm,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    /// Attributes of `path` for an entry reply, which the kernel counts as a lookup
    fn entry(&mut self, path: &str) -> Result<fuser::FileAttr, FsError> {
        let attr = self.fs.get_attributes(path)?;
        let ino = self.inodes.lookup(path);
        Ok(self.to_fuser(ino, &attr))
    }

    /// Attributes of the inode `ino`, which lives at `path`
    fn attributes(&self, ino: u64, path: &str) -> Result<fuser::FileAttr, FsError> {
        let attr = self.fs.get_attributes(path)?;
        Ok(self.to_fuser(ino, &attr))
    }

    fn path(&self, ino: u64) -> Result<String, FsError> {
        self.inodes
            .path(ino)
            .map(str::to_string)
            .ok_or_else(|| FsError::NotFound(format!("inode {ino}")))
    }

    fn child(&self, parent: u64, name: &OsStr) -> Result<String, FsError> {
        self.inodes
            .child(parent, name)
            .ok_or_else(|| FsError::NotFound(format!("{} in inode {parent}", name.to_string_lossy())))
    }
}

impl Filesystem for TagFsFuse {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        info!(root = %self.fs.root().display(), "Mounted tag filesystem");
        Ok(())
    }

    fn destroy(&mut self) {
        if let Err(e) = self.fs.unmount() {
            error!(error = %e, "Failed to persist state on unmount");
        }
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.child(parent, name).and_then(|path| self.entry(&path)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.inodes.release(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.path(ino).and_then(|path| self.attributes(ino, &path)) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let result = self.path(ino).and_then(|path| {
            if let Some(mode) = mode {
                self.fs.chmod(&path, mode)?;
            }
            if uid.is_some() || gid.is_some() {
                self.fs.chown(&path, uid, gid)?;
            }
            if let Some(size) = size {
                self.fs.truncate(&path, size, fh)?;
            }
            // Timestamps follow the stored content and are not settable
            self.attributes(ino, &path)
        });
        match result {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        match self.path(ino).and_then(|path| self.fs.read_link(&path)) {
            Ok(target) => reply.data(target.as_os_str().as_encoded_bytes()),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mkdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, _mode: u32, _umask: u32, reply: ReplyEntry) {
        let result = self.child(parent, name).and_then(|path| {
            self.fs.make_directory(&path)?;
            self.entry(&path)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self.child(parent, name).and_then(|path| {
            self.fs.remove_file(&path)?;
            self.inodes.remove_tree(&path);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self.child(parent, name).and_then(|path| {
            self.fs.remove_directory(&path)?;
            self.inodes.remove_tree(&path);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn symlink(&mut self, _req: &Request<'_>, parent: u64, link_name: &OsStr, target: &Path, reply: ReplyEntry) {
        let result = self
            .child(parent, link_name)
            .and_then(|link| self.fs.symlink(&target.to_string_lossy(), &link));
        match result {
            Ok(()) => reply.error(libc::ENOSYS),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let result = self.child(parent, name).and_then(|old| {
            let new = self.child(newparent, newname)?;
            self.fs.rename(&old, &new)?;
            self.inodes.rename(&old, &new);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn link(&mut self, _req: &Request<'_>, ino: u64, newparent: u64, newname: &OsStr, reply: ReplyEntry) {
        let result = self.path(ino).and_then(|target| {
            let link = self.child(newparent, newname)?;
            self.fs.link(&target, &link)
        });
        match result {
            Ok(()) => reply.error(libc::ENOSYS),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let result = self.path(ino).and_then(|path| {
            let attr = self.fs.get_attributes(&path)?;
            let fh = attr.file_id.unwrap_or(0);
            if flags & libc::O_TRUNC != 0 {
                self.fs.truncate(&path, 0, Some(fh))?;
            }
            Ok(fh)
        });
        match result {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let offset = u64::try_from(offset).unwrap_or(0);
        match self.path(ino).and_then(|path| self.fs.read(&path, offset, size as usize)) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let offset = u64::try_from(offset).unwrap_or(0);
        match self.path(ino).and_then(|path| self.fs.write(&path, offset, data)) {
            Ok(written) => reply.written(u32::try_from(written).unwrap_or(u32::MAX)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        let listing = self.path(ino).and_then(|path| {
            let names = self.fs.list_directory(&path)?;
            let mut entries = vec![
                (ino, FileType::Directory, ".".to_string()),
                (ino, FileType::Directory, "..".to_string()),
            ];
            for name in names {
                let child = format!("{}/{name}", path.trim_end_matches('/'));
                // An entry that vanished between listing and stat is skipped
                if let Ok(attr) = self.fs.get_attributes(&child) {
                    let kind = match attr.kind {
                        FileKind::Directory => FileType::Directory,
                        FileKind::RegularFile => FileType::RegularFile,
                    };
                    entries.push((self.inodes.peek(&child), kind, name));
                }
            }
            Ok(entries)
        });

        match listing {
            Ok(entries) => {
                let skip = usize::try_from(offset).unwrap_or(0);
                for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(skip) {
                    if reply.add(ino, (i + 1) as i64, kind, &name) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        match self.path(ino).and_then(|path| self.fs.set_xattr(&path, &name.to_string_lossy(), value)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getxattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, _size: u32, reply: ReplyXattr) {
        match self.path(ino).and_then(|path| self.fs.get_xattr(&path, &name.to_string_lossy())) {
            Ok(value) => reply.data(&value),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn listxattr(&mut self, _req: &Request<'_>, ino: u64, _size: u32, reply: ReplyXattr) {
        match self.path(ino).and_then(|path| self.fs.list_xattr(&path)) {
            Ok(names) => reply.data(names.join("\0").as_bytes()),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn removexattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.path(ino).and_then(|path| self.fs.remove_xattr(&path, &name.to_string_lossy())) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let result = self.child(parent, name).and_then(|path| {
            let attr = self.fs.create_file(&path, mode & !umask & 0o7777)?;
            let ino = self.inodes.lookup(&path);
            Ok((self.to_fuser(ino, &attr), attr.file_id.unwrap_or(0)))
        });
        match result {
            Ok((attr, fh)) => reply.created(&TTL, &attr, 0, fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }
}

/// Serve `fs` at `mountpoint` until unmounted
///
/// # Errors
///
/// Returns an I/O error if the mount fails.
pub fn mount(fs: TagFs, mountpoint: &Path, allow_other: bool) -> std::io::Result<()> {
    let mut options = vec![MountOption::FSName("tagfs".to_string()), MountOption::DefaultPermissions];
    if allow_other {
        options.push(MountOption::AllowOther);
    }

    info!(mountpoint = %mountpoint.display(), "Mounting tag filesystem");
    fuser::mount2(TagFsFuse::new(fs)?, mountpoint, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_preassigned() {
        let table = InodeTable::new();
        assert_eq!(table.path(ROOT_INO), Some("/"));
    }

    #[test]
    fn test_child_paths() {
        let mut table = InodeTable::new();
        assert_eq!(table.child(ROOT_INO, OsStr::new("query")).as_deref(), Some("/query"));

        let ino = table.lookup("/query/a+b");
        assert_eq!(table.child(ino, OsStr::new("f")).as_deref(), Some("/query/a+b/f"));
        assert_eq!(table.child(999, OsStr::new("f")), None);
    }

    #[test]
    fn test_lookup_is_stable() {
        let mut table = InodeTable::new();
        let first = table.lookup("/query/a");
        assert_eq!(table.lookup("/query/a"), first);
        assert_ne!(table.lookup("/query/b"), first);
    }

    #[test]
    fn test_release_drops_entry_at_zero() {
        let mut table = InodeTable::new();
        let ino = table.lookup("/query/a");
        table.lookup("/query/a");

        table.release(ino, 1);
        assert_eq!(table.path(ino), Some("/query/a"));

        table.release(ino, 1);
        assert_eq!(table.path(ino), None);
        assert_eq!(table.len(), 1);
        assert_ne!(table.lookup("/query/a"), ino);
    }

    #[test]
    fn test_many_queries_do_not_accumulate() {
        let mut table = InodeTable::new();
        for i in 0..1000 {
            let ino = table.lookup(&format!("/query/t{i}"));
            table.release(ino, 1);
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_root_is_never_released() {
        let mut table = InodeTable::new();
        table.release(ROOT_INO, 5);
        table.remove_tree("/");
        assert_eq!(table.path(ROOT_INO), Some("/"));
    }

    #[test]
    fn test_peek_does_not_record() {
        let mut table = InodeTable::new();
        let known = table.lookup("/tags/a");
        assert_eq!(table.peek("/tags/a"), known);

        table.peek("/tags/b");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_remove_tree() {
        let mut table = InodeTable::new();
        let dir = table.lookup("/tags/a");
        let file = table.lookup("/tags/a/x");
        let other = table.lookup("/tags/ab");

        table.remove_tree("/tags/a");

        assert_eq!(table.path(dir), None);
        assert_eq!(table.path(file), None);
        assert_eq!(table.path(other), Some("/tags/ab"));
        // a late forget for a detached inode is ignored
        table.release(dir, 1);
    }

    #[test]
    fn test_rename_keeps_inode() {
        let mut table = InodeTable::new();
        let ino = table.lookup("/query/a/f");
        table.lookup("/query/b/f");

        table.rename("/query/a/f", "/query/b/f");

        assert_eq!(table.path(ino), Some("/query/b/f"));
        assert_eq!(table.lookup("/query/b/f"), ino);
    }

    #[test]
    fn test_attr_conversion() {
        let dir = tempfile::TempDir::new().unwrap();
        let adapter = TagFsFuse::new(TagFs::open(dir.path()).unwrap()).unwrap();

        let mut attr = FileAttr::directory(SystemTime::UNIX_EPOCH);
        attr.kind = FileKind::RegularFile;
        attr.size = 1025;

        let converted = adapter.to_fuser(7, &attr);
        assert_eq!(converted.ino, 7);
        assert_eq!(converted.kind, FileType::RegularFile);
        assert_eq!(converted.blocks, 3);
    }
}
