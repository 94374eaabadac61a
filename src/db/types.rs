//! Key encodings for the index trees
//!
//! Membership is stored twice, once per lookup direction, as empty-valued
//! marker keys:
//!
//! - **`MemberKey`**: `<tag>/<file id, big-endian u64>` in the `members` tree.
//!   A prefix scan over `<tag>/` lists a tag's members in id order.
//! - **`FileTagKey`**: `<file id, big-endian u64><tag>` in the `file_tags` tree.
//!   A prefix scan over the 8 id bytes lists the tags of one file.
//!
//! Tag names never contain `/`, so the `<tag>/` prefix of one tag is never a
//! prefix of another tag's keys.
//!
//! # Examples
//!
//! ```
//! use tagfs::db::types::MemberKey;
//!
//! let key = MemberKey::new("music", 7);
//! let bytes: Vec<u8> = (&key).into();
//! assert!(bytes.starts_with(&MemberKey::prefix("music")));
//! assert_eq!(MemberKey::try_from(bytes.as_slice()).unwrap(), key);
//! ```

use super::error::DbError;
use crate::FileId;

const ID_LEN: usize = std::mem::size_of::<FileId>();
const TAG_SEPARATOR: u8 = b'/';

fn decode_id(bytes: &[u8]) -> Result<FileId, DbError> {
    let raw: [u8; ID_LEN] = bytes
        .try_into()
        .map_err(|_| DbError::CorruptKey(format!("expected {ID_LEN} id bytes, found {}", bytes.len())))?;
    Ok(FileId::from_be_bytes(raw))
}

fn decode_tag(bytes: &[u8]) -> Result<String, DbError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| DbError::CorruptKey("tag name is not valid UTF-8".into()))
}

/// Membership marker key in the `members` tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberKey {
    pub tag: String,
    pub id: FileId,
}

impl MemberKey {
    pub fn new(tag: impl Into<String>, id: FileId) -> Self {
        Self { tag: tag.into(), id }
    }

    /// Scan prefix covering every member of `tag`
    #[must_use]
    pub fn prefix(tag: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(tag.len() + 1);
        prefix.extend_from_slice(tag.as_bytes());
        prefix.push(TAG_SEPARATOR);
        prefix
    }

    /// Decode only the file id of a key known to start with `prefix(tag)`
    ///
    /// # Errors
    ///
    /// Returns `DbError::CorruptKey` if the key is too short.
    pub fn id_from_bytes(bytes: &[u8]) -> Result<FileId, DbError> {
        let split = bytes
            .len()
            .checked_sub(ID_LEN)
            .ok_or_else(|| DbError::CorruptKey("member key shorter than a file id".into()))?;
        decode_id(&bytes[split..])
    }
}

impl From<&MemberKey> for Vec<u8> {
    fn from(key: &MemberKey) -> Self {
        let mut bytes = MemberKey::prefix(&key.tag);
        bytes.extend_from_slice(&key.id.to_be_bytes());
        bytes
    }
}

impl TryFrom<&[u8]> for MemberKey {
    type Error = DbError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let id = Self::id_from_bytes(bytes)?;
        let head = &bytes[..bytes.len() - ID_LEN];
        let tag = head
            .strip_suffix(&[TAG_SEPARATOR])
            .ok_or_else(|| DbError::CorruptKey("member key missing separator".into()))?;
        Ok(Self::new(decode_tag(tag)?, id))
    }
}

/// Reverse-index marker key in the `file_tags` tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTagKey {
    pub id: FileId,
    pub tag: String,
}

impl FileTagKey {
    pub fn new(id: FileId, tag: impl Into<String>) -> Self {
        Self { id, tag: tag.into() }
    }

    /// Scan prefix covering every tag of `id`
    #[must_use]
    pub const fn prefix(id: FileId) -> [u8; ID_LEN] {
        id.to_be_bytes()
    }
}

impl From<&FileTagKey> for Vec<u8> {
    fn from(key: &FileTagKey) -> Self {
        let mut bytes = Vec::with_capacity(ID_LEN + key.tag.len());
        bytes.extend_from_slice(&key.id.to_be_bytes());
        bytes.extend_from_slice(key.tag.as_bytes());
        bytes
    }
}

impl TryFrom<&[u8]> for FileTagKey {
    type Error = DbError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() <= ID_LEN {
            return Err(DbError::CorruptKey("file-tag key has no tag".into()));
        }
        let (id, tag) = bytes.split_at(ID_LEN);
        Ok(Self::new(decode_id(id)?, decode_tag(tag)?))
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
