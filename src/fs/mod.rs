//! Filesystem operation layer
//!
//! [`TagFs`] is one mounted instance: configuration, tag index and file
//! store under a single root directory. Each filesystem call is one method
//! taking a path string; the path is resolved into a namespace and handled
//! there:
//!
//! | Namespace | Reads | Mutations |
//! |-----------|-------|-----------|
//! | root | the three namespace directories | rejected |
//! | tags | tag directories | `mkdir`/`rmdir` create and remove tags |
//! | files | raw store passthrough | unsupported |
//! | query | files matching a tag query | create, remove, rename, read, write |
//!
//! Read calls take `&self`, mutating calls `&mut self`. Holding the session
//! exclusively is what keeps an allocation or an "evaluate, match, mutate"
//! sequence from interleaving with another call.
//!
//! # Examples
//!
//! ```no_run
//! use tagfs::fs::TagFs;
//!
//! let mut fs = TagFs::open("/tmp/tagfs-demo")?;
//! fs.create_file("/query/music+live/set.flac", 0o644)?;
//! fs.write("/query/music+live/set.flac", 0, b"...")?;
//! assert_eq!(fs.list_directory("/query/music&live")?, vec!["set.flac"]);
//! fs.unmount()?;
//! # Ok::<(), tagfs::fs::FsError>(())
//! ```

pub mod error;
pub mod types;

pub use error::{ErrorKind, FsError};
pub use types::{FileAttr, FileKind, Operation};

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::FileId;
use crate::config::FsConfig;
use crate::db::Database;
use crate::query::{self, FileSet, TagQuery, is_valid_tag_name};
use crate::store::{FileStore, StoreError};
use crate::vpath::{self, Namespace, VirtualPath, split_tag_set};

const INDEX_DIR: &str = "index";

/// A mounted tag filesystem instance
pub struct TagFs {
    root: PathBuf,
    config: FsConfig,
    index: Database,
    store: FileStore,
    mounted_at: SystemTime,
}

impl TagFs {
    /// Open (or initialize) the instance stored under `root`
    ///
    /// # Errors
    ///
    /// Returns `FsError` if the configuration, index or store cannot be opened.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, FsError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let config = FsConfig::load(&root)?;
        let index = Database::open(root.join(INDEX_DIR))?;
        let store = FileStore::open(&root)?;

        info!(root = %root.display(), next_id = config.next_id, "Opened tag filesystem");

        Ok(Self {
            root,
            config,
            index,
            store,
            mounted_at: SystemTime::now(),
        })
    }

    /// Flush the index and persist the configuration
    ///
    /// # Errors
    ///
    /// Returns `FsError` if either write fails.
    pub fn unmount(&mut self) -> Result<(), FsError> {
        self.index.flush()?;
        self.config.save(&self.root)?;
        info!(root = %self.root.display(), "Unmounted tag filesystem");
        Ok(())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn config(&self) -> &FsConfig {
        &self.config
    }

    #[must_use]
    pub const fn index(&self) -> &Database {
        &self.index
    }

    #[must_use]
    pub const fn store(&self) -> &FileStore {
        &self.store
    }

    /// Attributes of the entry at `path`
    ///
    /// # Errors
    ///
    /// `NotFound` for missing entries, `SyntaxError`/`UnknownTag` when the query of a file path is bad.
    /// A query directory always exists, even over tags not created yet.
    pub fn get_attributes(&self, path: &str) -> Result<FileAttr, FsError> {
        debug!(op = %Operation::GetAttributes, path);
        let vpath = self.resolve(path);

        match (&vpath.namespace, vpath.components.as_slice()) {
            (Namespace::Root, _) => Ok(self.directory_attr()),
            (Namespace::Unknown(_), _) => Err(not_found(path)),
            (Namespace::Tags, []) => Ok(self.directory_attr()),
            (Namespace::Tags, [tag]) => {
                check_tag_name(tag)?;
                if self.index.contains_tag(tag)? {
                    Ok(self.directory_attr())
                } else {
                    Err(not_found(path))
                }
            }
            (Namespace::Tags, _) => Err(not_found(path)),
            (Namespace::Files, components) => host_attributes(&self.host_path(components)?),
            (Namespace::Query, [] | [_]) => Ok(self.directory_attr()),
            (Namespace::Query, [query, filename]) => {
                let id = self.resolve_file(query, filename)?;
                Ok(self.store.attributes(id)?.into())
            }
            (Namespace::Query, _) => Err(too_deep(path)),
        }
    }

    /// Names of the entries in the directory at `path`
    ///
    /// # Errors
    ///
    /// `NotFound` for missing directories, `InvalidArgument` for files,
    /// `SyntaxError`/`UnknownTag` for bad queries.
    pub fn list_directory(&self, path: &str) -> Result<Vec<String>, FsError> {
        debug!(op = %Operation::ListDirectory, path);
        let vpath = self.resolve(path);

        match (&vpath.namespace, vpath.components.as_slice()) {
            (Namespace::Root, _) => Ok(vec![
                self.config.tags_namespace.clone(),
                self.config.files_namespace.clone(),
                self.config.action_namespace.clone(),
            ]),
            (Namespace::Unknown(_), _) => Err(not_found(path)),
            (Namespace::Tags | Namespace::Query, []) => Ok(self.index.list_tags()?),
            (Namespace::Tags, [tag]) => {
                check_tag_name(tag)?;
                if self.index.contains_tag(tag)? {
                    Ok(Vec::new())
                } else {
                    Err(not_found(path))
                }
            }
            (Namespace::Tags, _) => Err(not_found(path)),
            (Namespace::Files, components) => host_list(&self.host_path(components)?),
            (Namespace::Query, [query]) => Ok(self
                .query_files(query)?
                .into_iter()
                .map(|(_, name)| name)
                .collect()),
            (Namespace::Query, [query, filename]) => {
                self.resolve_file(query, filename)?;
                Err(FsError::InvalidArgument(format!("'{path}' is not a directory")))
            }
            (Namespace::Query, _) => Err(too_deep(path)),
        }
    }

    /// Create the tag named by `/<tags>/<tag>`
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the tag exists, `InvalidArgument` for any other path shape.
    pub fn make_directory(&mut self, path: &str) -> Result<(), FsError> {
        debug!(op = %Operation::MakeDirectory, path);
        let vpath = self.resolve(path);

        match (&vpath.namespace, vpath.components.as_slice()) {
            (Namespace::Tags, [tag]) => {
                self.index.create_tag(tag)?;
                info!(tag = %tag, "Created tag");
                Ok(())
            }
            (Namespace::Files | Namespace::Query, _) => Err(FsError::Unsupported(Operation::MakeDirectory)),
            (Namespace::Unknown(_), _) => Err(not_found(path)),
            _ => Err(FsError::InvalidArgument(format!("cannot create a directory at '{path}'"))),
        }
    }

    /// Remove the tag named by `/<tags>/<tag>`; its files stay in place
    ///
    /// # Errors
    ///
    /// `NotFound` if the tag does not exist, `InvalidArgument` for any other path shape.
    pub fn remove_directory(&mut self, path: &str) -> Result<(), FsError> {
        debug!(op = %Operation::RemoveDirectory, path);
        let vpath = self.resolve(path);

        match (&vpath.namespace, vpath.components.as_slice()) {
            (Namespace::Tags, [tag]) => {
                check_tag_name(tag)?;
                let members = self.index.remove_tag(tag)?;
                info!(tag = %tag, members = members.len(), "Removed tag");
                Ok(())
            }
            (Namespace::Files | Namespace::Query, _) => Err(FsError::Unsupported(Operation::RemoveDirectory)),
            (Namespace::Unknown(_), _) => Err(not_found(path)),
            _ => Err(FsError::InvalidArgument(format!("cannot remove the directory at '{path}'"))),
        }
    }

    /// Create an empty file at `/<query>/<tag>+<tag>.../<filename>`
    ///
    /// The file gets a fresh id and every named tag, created on demand.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed tag set or filename, `AlreadyExists`
    /// if the filename is already visible under one of the named tags.
    pub fn create_file(&mut self, path: &str, mode: u32) -> Result<FileAttr, FsError> {
        debug!(op = %Operation::CreateFile, path, mode);
        let vpath = self.resolve(path);
        let (tag_set, filename) = self.query_file_parts(&vpath, path, Operation::CreateFile)?;
        let tags = split_tag_set(tag_set)?;
        check_filename(filename)?;

        if self.visible_under(&tags, filename, None)? {
            return Err(FsError::AlreadyExists(path.to_string()));
        }

        let id = self.store.allocate(&mut self.config)?;
        self.store.create(id, filename, mode)?;
        if let Err(e) = self.index.retag(id, &tags) {
            if let Err(cleanup) = self.store.delete(id) {
                warn!(id, error = %cleanup, "Failed to remove storage of untagged file");
            }
            return Err(e.into());
        }

        info!(id, filename, tags = ?tags, "Created file");
        Ok(self.store.attributes(id)?.into())
    }

    /// Remove the file at `/<query>/<expr>/<filename>` from every tag and delete it
    ///
    /// # Errors
    ///
    /// `NotFound` if no file of that name matches the query.
    pub fn remove_file(&mut self, path: &str) -> Result<(), FsError> {
        debug!(op = %Operation::RemoveFile, path);
        let vpath = self.resolve(path);
        let (query, filename) = self.query_file_parts(&vpath, path, Operation::RemoveFile)?;

        let id = self.resolve_file(query, filename)?;
        let tags = self.index.untag_all(id)?;
        if let Err(e) = self.store.delete(id) {
            let names: Vec<&str> = tags.iter().map(String::as_str).collect();
            if let Err(restore) = self.index.retag(id, &names) {
                warn!(id, tags = ?tags, error = %restore, "File left stored without tags");
            }
            return Err(e.into());
        }

        info!(id, filename, tags = ?tags, "Removed file");
        Ok(())
    }

    /// Move a file to a new tag set, keeping its id and content
    ///
    /// `old` is resolved like any query path. The query segment of `new` is a
    /// `+`-joined tag set that replaces the file's tags; a different filename
    /// renames the stored file too.
    ///
    /// # Errors
    ///
    /// `NotFound` if `old` matches nothing, `InvalidArgument` for a malformed
    /// target, `AlreadyExists` if another file of the target name is visible
    /// under the target tags, `Unsupported` outside the query namespace.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), FsError> {
        debug!(op = %Operation::Rename, old, new);
        let old_path = self.resolve(old);
        let new_path = self.resolve(new);
        let (query, filename) = self.query_file_parts(&old_path, old, Operation::Rename)?;
        let (tag_set, new_filename) = self.query_file_parts(&new_path, new, Operation::Rename)?;

        let tags = split_tag_set(tag_set)?;
        check_filename(new_filename)?;
        let id = self.resolve_file(query, filename)?;

        if self.visible_under(&tags, new_filename, Some(id))? {
            return Err(FsError::AlreadyExists(new.to_string()));
        }

        self.index.retag(id, &tags)?;
        if new_filename != filename {
            self.store.set_filename(id, new_filename)?;
        }

        info!(id, from = old, to = new, "Renamed file");
        Ok(())
    }

    /// Read up to `size` bytes at `offset`; short at end of file
    ///
    /// # Errors
    ///
    /// `NotFound` if the file does not resolve, `InvalidArgument` for directories.
    pub fn read(&self, path: &str, offset: u64, size: usize) -> Result<Vec<u8>, FsError> {
        debug!(op = %Operation::Read, path, offset, size);
        let vpath = self.resolve(path);

        match (&vpath.namespace, vpath.components.as_slice()) {
            (Namespace::Query, [query, filename]) => {
                let id = self.resolve_file(query, filename)?;
                Ok(self.store.read_range(id, offset, size)?)
            }
            (Namespace::Files, components) => host_read(&self.host_path(components)?, offset, size),
            (Namespace::Unknown(_), _) => Err(not_found(path)),
            _ => Err(FsError::InvalidArgument(format!("'{path}' is not a file"))),
        }
    }

    /// Write `data` at `offset`, extending the file as needed
    ///
    /// # Errors
    ///
    /// `NotFound` if the file does not resolve, `Unsupported` in the files namespace.
    pub fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<usize, FsError> {
        debug!(op = %Operation::Write, path, offset, len = data.len());
        let vpath = self.resolve(path);
        let (query, filename) = self.query_file_parts(&vpath, path, Operation::Write)?;

        let id = self.resolve_file(query, filename)?;
        Ok(self.store.write_range(id, offset, data)?)
    }

    /// Set the length of an open file
    ///
    /// # Errors
    ///
    /// `Unsupported` without an open handle, otherwise as [`TagFs::write`].
    pub fn truncate(&mut self, path: &str, len: u64, handle: Option<u64>) -> Result<(), FsError> {
        debug!(op = %Operation::Truncate, path, len, handle);
        if handle.is_none() {
            return Err(FsError::Unsupported(Operation::Truncate));
        }

        let vpath = self.resolve(path);
        let (query, filename) = self.query_file_parts(&vpath, path, Operation::Truncate)?;
        let id = self.resolve_file(query, filename)?;
        Ok(self.store.truncate(id, len)?)
    }

    /// # Errors
    ///
    /// Always `Unsupported`.
    pub fn chmod(&mut self, path: &str, mode: u32) -> Result<(), FsError> {
        debug!(op = %Operation::Chmod, path, mode);
        Err(FsError::Unsupported(Operation::Chmod))
    }

    /// # Errors
    ///
    /// Always `Unsupported`.
    pub fn chown(&mut self, path: &str, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError> {
        debug!(op = %Operation::Chown, path, uid, gid);
        Err(FsError::Unsupported(Operation::Chown))
    }

    /// # Errors
    ///
    /// Always `Unsupported`.
    pub fn symlink(&mut self, target: &str, link: &str) -> Result<(), FsError> {
        debug!(op = %Operation::Symlink, target, link);
        Err(FsError::Unsupported(Operation::Symlink))
    }

    /// # Errors
    ///
    /// Always `Unsupported`.
    pub fn link(&mut self, target: &str, link: &str) -> Result<(), FsError> {
        debug!(op = %Operation::Link, target, link);
        Err(FsError::Unsupported(Operation::Link))
    }

    /// # Errors
    ///
    /// Always `Unsupported`.
    pub fn read_link(&self, path: &str) -> Result<PathBuf, FsError> {
        debug!(op = %Operation::ReadLink, path);
        Err(FsError::Unsupported(Operation::ReadLink))
    }

    /// # Errors
    ///
    /// Always `Unsupported`.
    pub fn get_xattr(&self, path: &str, name: &str) -> Result<Vec<u8>, FsError> {
        debug!(op = %Operation::GetXattr, path, name);
        Err(FsError::Unsupported(Operation::GetXattr))
    }

    /// # Errors
    ///
    /// Always `Unsupported`.
    pub fn set_xattr(&mut self, path: &str, name: &str, value: &[u8]) -> Result<(), FsError> {
        debug!(op = %Operation::SetXattr, path, name, len = value.len());
        Err(FsError::Unsupported(Operation::SetXattr))
    }

    /// # Errors
    ///
    /// Always `Unsupported`.
    pub fn list_xattr(&self, path: &str) -> Result<Vec<String>, FsError> {
        debug!(op = %Operation::ListXattr, path);
        Err(FsError::Unsupported(Operation::ListXattr))
    }

    /// # Errors
    ///
    /// Always `Unsupported`.
    pub fn remove_xattr(&mut self, path: &str, name: &str) -> Result<(), FsError> {
        debug!(op = %Operation::RemoveXattr, path, name);
        Err(FsError::Unsupported(Operation::RemoveXattr))
    }

    /// Parse and evaluate a query expression against the index
    ///
    /// # Errors
    ///
    /// `SyntaxError` for malformed queries, `UnknownTag` for missing tags.
    pub fn evaluate(&self, expr: &str) -> Result<FileSet, FsError> {
        let parsed: TagQuery = query::parse(expr)?;
        Ok(query::evaluate(&parsed, &self.index)?)
    }

    /// Files matching `expr` as `(id, filename)` in id order
    ///
    /// Ids without storage are skipped. Each filename appears once, for the
    /// lowest id carrying it.
    ///
    /// # Errors
    ///
    /// As [`TagFs::evaluate`].
    pub fn query_files(&self, expr: &str) -> Result<Vec<(FileId, String)>, FsError> {
        let mut seen = BTreeSet::new();
        let mut files = Vec::new();
        for id in self.evaluate(expr)? {
            let Some(name) = self.stored_name(id)? else {
                continue;
            };
            if seen.insert(name.clone()) {
                files.push((id, name));
            }
        }
        Ok(files)
    }

    fn resolve(&self, path: &str) -> VirtualPath {
        vpath::resolve(path, self.config.namespaces())
    }

    fn directory_attr(&self) -> FileAttr {
        FileAttr::directory(self.mounted_at)
    }

    /// Lowest id matching `query` whose stored filename is `filename`
    fn resolve_file(&self, query: &str, filename: &str) -> Result<FileId, FsError> {
        for id in self.evaluate(query)? {
            if self.stored_name(id)?.as_deref() == Some(filename) {
                return Ok(id);
            }
        }
        Err(FsError::NotFound(format!("'{filename}' in '{query}'")))
    }

    fn stored_name(&self, id: FileId) -> Result<Option<String>, FsError> {
        match self.store.filename_of(id) {
            Ok(name) => Ok(Some(name)),
            Err(StoreError::NotFound(_)) => {
                warn!(id, "Tagged file id has no storage");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a file other than `except` named `filename` carries any of the existing `tags`
    fn visible_under(&self, tags: &[&str], filename: &str, except: Option<FileId>) -> Result<bool, FsError> {
        let mut candidates = FileSet::new();
        for tag in tags {
            if self.index.contains_tag(tag)? {
                candidates.extend(self.index.members_of(tag)?);
            }
        }

        for id in candidates {
            if Some(id) != except && self.stored_name(id)?.as_deref() == Some(filename) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Query and filename segments of a query-namespace file path
    fn query_file_parts<'p>(
        &self,
        vpath: &'p VirtualPath,
        path: &str,
        op: Operation,
    ) -> Result<(&'p str, &'p str), FsError> {
        match (&vpath.namespace, vpath.components.as_slice()) {
            (Namespace::Query, [query, filename]) => Ok((query.as_str(), filename.as_str())),
            (Namespace::Query, components) if components.len() > 2 => Err(too_deep(path)),
            (Namespace::Files, _) => Err(FsError::Unsupported(op)),
            (Namespace::Unknown(_), _) => Err(not_found(path)),
            (Namespace::Root | Namespace::Tags, _) if op == Operation::Rename => Err(FsError::Unsupported(op)),
            _ => Err(FsError::InvalidArgument(format!("'{path}' does not name a query and a filename"))),
        }
    }

    /// Host path under the store directory, refusing to leave it
    fn host_path(&self, components: &[String]) -> Result<PathBuf, FsError> {
        let mut path = self.store.root().to_path_buf();
        for component in components {
            if component == "." || component == ".." {
                return Err(FsError::InvalidArgument(format!(
                    "'{component}' is not allowed in storage paths"
                )));
            }
            path.push(component);
        }
        Ok(path)
    }
}

fn not_found(path: &str) -> FsError {
    FsError::NotFound(path.to_string())
}

fn too_deep(path: &str) -> FsError {
    FsError::InvalidArgument(format!("'{path}' has segments past the filename"))
}

fn check_tag_name(tag: &str) -> Result<(), FsError> {
    if is_valid_tag_name(tag) {
        Ok(())
    } else {
        Err(FsError::InvalidArgument(format!("invalid tag name '{tag}'")))
    }
}

fn check_filename(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return Err(FsError::InvalidArgument(format!("invalid filename '{name}'")));
    }
    Ok(())
}

fn host_error(path: &Path, err: std::io::Error) -> FsError {
    if err.kind() == std::io::ErrorKind::NotFound {
        FsError::NotFound(path.display().to_string())
    } else {
        FsError::Io(err)
    }
}

fn host_attributes(path: &Path) -> Result<FileAttr, FsError> {
    let meta = fs::metadata(path).map_err(|e| host_error(path, e))?;
    let kind = if meta.is_dir() {
        FileKind::Directory
    } else {
        FileKind::RegularFile
    };
    Ok(FileAttr {
        kind,
        size: meta.len(),
        perm: (meta.permissions().mode() & 0o7777) as u16,
        nlink: u32::try_from(meta.nlink()).unwrap_or(u32::MAX),
        atime: meta.accessed()?,
        mtime: meta.modified()?,
        ctime: meta.modified()?,
        file_id: None,
    })
}

fn host_list(path: &Path) -> Result<Vec<String>, FsError> {
    let mut names = fs::read_dir(path)
        .map_err(|e| host_error(path, e))?
        .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, std::io::Error>>()?;
    names.sort();
    Ok(names)
}

fn host_read(path: &Path, offset: u64, size: usize) -> Result<Vec<u8>, FsError> {
    let mut file = File::open(path).map_err(|e| host_error(path, e))?;
    if file.metadata()?.is_dir() {
        return Err(FsError::InvalidArgument(format!("'{}' is a directory", path.display())));
    }
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(size);
    file.take(size as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
