//! Content storage for tagged files
//!
//! Each file id owns a directory under `<root>/files`, nested one level per
//! decimal digit of the id (id 123 lives in `files/1/2/3/`). The directory
//! holds two entries:
//!
//! - `data`: the raw content
//! - `meta`: the bincode-encoded [`FileMeta`] (filename and mode)
//!
//! An id "has storage" when either entry exists. Directories shared with
//! longer ids (`files/1/` is both id 1 and the parent of id 12) are only
//! pruned once empty.

pub mod error;

pub use error::StoreError;

use bincode::{Decode, Encode};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::FileId;
use crate::config::FsConfig;

const FILES_DIR: &str = "files";
const DATA_FILE: &str = "data";
const META_FILE: &str = "meta";

/// Per-file metadata kept next to the content
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub mode: u32,
}

/// Attributes of a stored file as seen on the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    pub id: FileId,
    pub name: String,
    pub mode: u32,
    pub size: u64,
    pub accessed: SystemTime,
    pub modified: SystemTime,
    pub changed: SystemTime,
}

/// Host-directory backed file store
#[derive(Debug, Clone)]
pub struct FileStore {
    instance_root: PathBuf,
    dir: PathBuf,
}

impl FileStore {
    /// Open the store of the instance at `instance_root`, creating `files/`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(instance_root: P) -> Result<Self, StoreError> {
        let instance_root = instance_root.as_ref().to_path_buf();
        let dir = instance_root.join(FILES_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self { instance_root, dir })
    }

    /// Physical directory holding all stored files
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.dir
    }

    /// Storage directory of `id`, whether or not it exists
    #[must_use]
    pub fn path_of(&self, id: FileId) -> PathBuf {
        id.to_string()
            .chars()
            .fold(self.dir.clone(), |path, digit| path.join(digit.to_string()))
    }

    /// Whether `id` has storage
    #[must_use]
    pub fn contains(&self, id: FileId) -> bool {
        let dir = self.path_of(id);
        dir.join(META_FILE).exists() || dir.join(DATA_FILE).exists()
    }

    /// Reserve a fresh id
    ///
    /// Ids come from the configuration counter, which only moves forward.
    /// Ids that already have storage are skipped, so a reset counter never
    /// hands out an id twice. The counter is saved before returning.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if the counter cannot be saved.
    pub fn allocate(&self, config: &mut FsConfig) -> Result<FileId, StoreError> {
        let mut id = config.next_id;
        while self.contains(id) {
            tracing::warn!(id, "Skipping file id that already has storage");
            id += 1;
        }
        config.next_id = id + 1;
        config.save(&self.instance_root)?;
        Ok(id)
    }

    /// Create empty content and metadata for `id`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if `id` has storage, or an I/O or
    /// encoding error.
    pub fn create(&self, id: FileId, name: &str, mode: u32) -> Result<(), StoreError> {
        if self.contains(id) {
            return Err(StoreError::AlreadyExists(id));
        }
        let dir = self.path_of(id);
        fs::create_dir_all(&dir)?;
        File::create(dir.join(DATA_FILE))?;
        self.write_meta(id, &FileMeta { name: name.to_string(), mode })
    }

    /// Delete content and metadata of `id`, pruning emptied directories
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `id` has no storage.
    pub fn delete(&self, id: FileId) -> Result<(), StoreError> {
        self.ensure(id)?;
        let dir = self.path_of(id);
        for entry in [DATA_FILE, META_FILE] {
            match fs::remove_file(dir.join(entry)) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        self.prune(&dir);
        Ok(())
    }

    /// Read up to `len` bytes starting at `offset`
    ///
    /// Reading at or past the end returns fewer bytes, possibly none.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `id` has no storage.
    pub fn read_range(&self, id: FileId, offset: u64, len: usize) -> Result<Vec<u8>, StoreError> {
        let mut file = self.open_data(id, false)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Write `bytes` at `offset`, extending the content as needed
    ///
    /// A gap between the old end and `offset` reads back as zeros.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `id` has no storage.
    pub fn write_range(&self, id: FileId, offset: u64, bytes: &[u8]) -> Result<usize, StoreError> {
        let mut file = self.open_data(id, true)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(bytes.len())
    }

    /// Set the content length of `id`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `id` has no storage.
    pub fn truncate(&self, id: FileId, len: u64) -> Result<(), StoreError> {
        self.open_data(id, true)?.set_len(len)?;
        Ok(())
    }

    /// Stored filename of `id`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `id` has no storage.
    pub fn filename_of(&self, id: FileId) -> Result<String, StoreError> {
        Ok(self.read_meta(id)?.name)
    }

    /// Replace the stored filename of `id`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `id` has no storage.
    pub fn set_filename(&self, id: FileId, name: &str) -> Result<(), StoreError> {
        let mut meta = self.read_meta(id)?;
        meta.name = name.to_string();
        self.write_meta(id, &meta)
    }

    /// Filename, mode, size and timestamps of `id`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `id` has no storage.
    pub fn attributes(&self, id: FileId) -> Result<StoredFile, StoreError> {
        let meta = self.read_meta(id)?;
        let data = fs::metadata(self.path_of(id).join(DATA_FILE)).map_err(|e| not_found(id, e))?;
        let changed = u64::try_from(data.ctime())
            .map(|secs| UNIX_EPOCH + Duration::new(secs, u32::try_from(data.ctime_nsec()).unwrap_or(0)))
            .unwrap_or(UNIX_EPOCH);
        Ok(StoredFile {
            id,
            name: meta.name,
            mode: meta.mode,
            size: data.len(),
            accessed: data.accessed()?,
            modified: data.modified()?,
            changed,
        })
    }

    fn ensure(&self, id: FileId) -> Result<(), StoreError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    fn open_data(&self, id: FileId, write: bool) -> Result<File, StoreError> {
        OpenOptions::new()
            .read(true)
            .write(write)
            .open(self.path_of(id).join(DATA_FILE))
            .map_err(|e| not_found(id, e))
    }

    fn read_meta(&self, id: FileId) -> Result<FileMeta, StoreError> {
        let bytes = fs::read(self.path_of(id).join(META_FILE)).map_err(|e| not_found(id, e))?;
        let (meta, _): (FileMeta, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard())?;
        Ok(meta)
    }

    fn write_meta(&self, id: FileId, meta: &FileMeta) -> Result<(), StoreError> {
        let bytes = bincode::encode_to_vec(meta, bincode::config::standard())?;
        fs::write(self.path_of(id).join(META_FILE), bytes)?;
        Ok(())
    }

    fn prune(&self, dir: &Path) {
        let mut current = Some(dir);
        while let Some(path) = current {
            if path == self.dir || fs::remove_dir(path).is_err() {
                break;
            }
            current = path.parent();
        }
    }
}

fn not_found(id: FileId, err: std::io::Error) -> StoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound(id)
    } else {
        StoreError::Io(err)
    }
}
