//! Tag index backed by sled
//!
//! Stores which files carry which tags, in both directions:
//!
//! - `tags`: one marker per existing tag, so empty tags survive
//! - `members`: tag -> file ids (see [`MemberKey`])
//! - `file_tags`: file id -> tags (see [`FileTagKey`])
//!
//! Membership lookups, existence checks and per-file untagging are prefix
//! scans or point lookups; no operation walks every tag. Changes touching
//! more than one tree are applied in a single sled transaction.

use sled::transaction::TransactionResult;
use sled::{Db, Transactional, Tree};
use std::path::Path;

pub mod error;
pub mod types;

pub use error::DbError;
pub use types::{FileTagKey, MemberKey};

use crate::FileId;
use crate::query::{FileSet, TagMembership, is_valid_tag_name};

const MARKER: &[u8] = &[];

/// Tag index wrapper that encapsulates all sled operations
pub struct Database {
    db: Db,
    tags: Tree,      // tag -> marker
    members: Tree,   // tag/id -> marker
    file_tags: Tree, // id tag -> marker
}

impl Database {
    /// Opens or creates an index at the specified path
    ///
    /// # Examples
    /// ```no_run
    /// use tagfs::db::Database;
    /// let db = Database::open("my_index").unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the database cannot be opened or if the internal trees cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let db = sled::open(path)?;
        let tags = db.open_tree("tags")?;
        let members = db.open_tree("members")?;
        let file_tags = db.open_tree("file_tags")?;
        Ok(Self {
            db,
            tags,
            members,
            file_tags,
        })
    }

    /// Create an empty tag
    ///
    /// # Errors
    ///
    /// Returns `DbError::TagExists` if the tag is already present, or
    /// `DbError::InvalidTagName` if `name` is not a valid tag name.
    pub fn create_tag(&self, name: &str) -> Result<(), DbError> {
        validate_tag(name)?;
        self.tags
            .compare_and_swap(name.as_bytes(), None::<&[u8]>, Some(MARKER))?
            .map_err(|_| DbError::TagExists(name.to_string()))
    }

    /// Remove a tag and every membership record it holds
    ///
    /// Files that were members are left in place.
    ///
    /// # Returns
    /// The ids that were members of the tag
    ///
    /// # Errors
    ///
    /// Returns `DbError::TagNotFound` if the tag does not exist.
    pub fn remove_tag(&self, name: &str) -> Result<FileSet, DbError> {
        let members = self.members_of(name)?;
        let member_keys: Vec<Vec<u8>> = members
            .iter()
            .map(|&id| (&MemberKey::new(name, id)).into())
            .collect();
        let reverse_keys: Vec<Vec<u8>> = members
            .iter()
            .map(|&id| (&FileTagKey::new(id, name)).into())
            .collect();

        let result: TransactionResult<()> = (&self.tags, &self.members, &self.file_tags)
            .transaction(|(tags, members, file_tags)| {
                tags.remove(name.as_bytes())?;
                for key in &member_keys {
                    members.remove(key.as_slice())?;
                }
                for key in &reverse_keys {
                    file_tags.remove(key.as_slice())?;
                }
                Ok(())
            });
        result?;

        Ok(members)
    }

    /// Tag `id` with `tag`, creating the tag if needed
    ///
    /// # Errors
    ///
    /// Returns `DbError::InvalidTagName` for an invalid name, or `DbError` if the
    /// transaction fails.
    pub fn add_member(&self, tag: &str, id: FileId) -> Result<(), DbError> {
        self.retag_with(id, &[], &[tag])
    }

    /// Remove `id` from `tag`; nothing happens if it was not a member
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the transaction fails.
    pub fn remove_member(&self, tag: &str, id: FileId) -> Result<(), DbError> {
        self.retag_with(id, &[tag.to_string()], &[])
    }

    /// Members of `tag`
    ///
    /// # Errors
    ///
    /// Returns `DbError::TagNotFound` if the tag does not exist.
    pub fn members_of(&self, tag: &str) -> Result<FileSet, DbError> {
        self.tag_members(tag)?
            .ok_or_else(|| DbError::TagNotFound(tag.to_string()))
    }

    /// All tag names in byte order
    ///
    /// # Errors
    ///
    /// Returns `DbError` if iteration fails or a stored name is not UTF-8.
    pub fn list_tags(&self) -> Result<Vec<String>, DbError> {
        self.tags
            .iter()
            .keys()
            .map(|key| {
                let key = key?;
                String::from_utf8(key.to_vec())
                    .map_err(|_| DbError::CorruptKey("tag name is not valid UTF-8".into()))
            })
            .collect()
    }

    /// Tags carried by `id`, via the reverse index
    ///
    /// # Errors
    ///
    /// Returns `DbError` if iteration fails or a key is corrupt.
    pub fn tags_of(&self, id: FileId) -> Result<Vec<String>, DbError> {
        self.file_tags
            .scan_prefix(FileTagKey::prefix(id))
            .keys()
            .map(|key| Ok(FileTagKey::try_from(key?.as_ref())?.tag))
            .collect()
    }

    /// Remove `id` from every tag it belongs to
    ///
    /// # Returns
    /// The tags the file was removed from
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the lookup or transaction fails.
    pub fn untag_all(&self, id: FileId) -> Result<Vec<String>, DbError> {
        let old = self.tags_of(id)?;
        self.retag_with(id, &old, &[])?;
        Ok(old)
    }

    /// Replace the tags of `id` with exactly `tags`, creating missing tags
    ///
    /// The old memberships are dropped and the new ones added in one
    /// transaction, so no reader ever sees the file in neither or both sets.
    ///
    /// # Errors
    ///
    /// Returns `DbError::InvalidTagName` if any new tag is invalid, or `DbError`
    /// if the transaction fails.
    pub fn retag(&self, id: FileId, tags: &[&str]) -> Result<(), DbError> {
        let old = self.tags_of(id)?;
        self.retag_with(id, &old, tags)
    }

    fn retag_with(&self, id: FileId, remove: &[String], add: &[&str]) -> Result<(), DbError> {
        for tag in add {
            validate_tag(tag)?;
        }

        let removals: Vec<(Vec<u8>, Vec<u8>)> = remove
            .iter()
            .map(|tag| ((&MemberKey::new(tag.as_str(), id)).into(), (&FileTagKey::new(id, tag.as_str())).into()))
            .collect();
        let additions: Vec<(&str, Vec<u8>, Vec<u8>)> = add
            .iter()
            .map(|&tag| (tag, (&MemberKey::new(tag, id)).into(), (&FileTagKey::new(id, tag)).into()))
            .collect();

        let result: TransactionResult<()> = (&self.tags, &self.members, &self.file_tags)
            .transaction(|(tags, members, file_tags)| {
                for (member_key, reverse_key) in &removals {
                    members.remove(member_key.as_slice())?;
                    file_tags.remove(reverse_key.as_slice())?;
                }
                for (tag, member_key, reverse_key) in &additions {
                    tags.insert(tag.as_bytes(), MARKER)?;
                    members.insert(member_key.as_slice(), MARKER)?;
                    file_tags.insert(reverse_key.as_slice(), MARKER)?;
                }
                Ok(())
            });
        result?;
        Ok(())
    }

    /// Check if a tag exists
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the lookup fails.
    pub fn contains_tag(&self, tag: &str) -> Result<bool, DbError> {
        Ok(self.tags.contains_key(tag.as_bytes())?)
    }

    /// Get the number of tags in the index
    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Flush all pending writes to disk
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the flush operation fails.
    pub fn flush(&self) -> Result<(), DbError> {
        self.db.flush()?;
        Ok(())
    }

    /// Clear all tags and memberships
    ///
    /// # Warning
    /// This operation is irreversible!
    ///
    /// # Errors
    ///
    /// Returns `DbError` if clearing any tree fails.
    pub fn clear(&self) -> Result<(), DbError> {
        self.tags.clear()?;
        self.members.clear()?;
        self.file_tags.clear()?;
        Ok(())
    }
}

impl TagMembership for Database {
    type Error = DbError;

    fn tag_members(&self, tag: &str) -> Result<Option<FileSet>, DbError> {
        if !self.contains_tag(tag)? {
            return Ok(None);
        }

        self.members
            .scan_prefix(MemberKey::prefix(tag))
            .keys()
            .map(|key| MemberKey::id_from_bytes(&key?))
            .collect::<Result<FileSet, _>>()
            .map(Some)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Best-effort flush on drop; callers needing durability call flush()
        let _ = self.db.flush();
    }
}

fn validate_tag(name: &str) -> Result<(), DbError> {
    if is_valid_tag_name(name) {
        Ok(())
    } else {
        Err(DbError::InvalidTagName(name.to_string()))
    }
}
