use super::types::{FileSet, TagQuery};
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use thiserror::Error;

/// Source of tag membership a query is evaluated against
///
/// The evaluator only ever asks for the members of one tag at a time, so any
/// index that can answer that question can back a query.
pub trait TagMembership {
    /// Error raised by the underlying lookup
    type Error;

    /// Members of `tag`, or `None` when no such tag exists
    ///
    /// # Errors
    /// Returns `Self::Error` if the lookup itself fails.
    fn tag_members(&self, tag: &str) -> Result<Option<FileSet>, Self::Error>;
}

impl TagMembership for HashMap<String, FileSet> {
    type Error = Infallible;

    fn tag_members(&self, tag: &str) -> Result<Option<FileSet>, Self::Error> {
        Ok(self.get(tag).cloned())
    }
}

impl TagMembership for BTreeMap<String, FileSet> {
    type Error = Infallible;

    fn tag_members(&self, tag: &str) -> Result<Option<FileSet>, Self::Error> {
        Ok(self.get(tag).cloned())
    }
}

/// Query evaluation failure
#[derive(Debug, Error)]
pub enum EvalError<E> {
    /// A leaf names a tag that does not exist. An existing tag with no
    /// members evaluates to an empty set instead.
    #[error("Unknown tag: {0}")]
    UnknownTag(String),
    /// The membership lookup failed
    #[error("Tag lookup failed: {0}")]
    Lookup(#[source] E),
}

/// Evaluates queries against one membership source
///
/// Member sets are cached per tag for the lifetime of the evaluator, so a
/// query naming the same tag several times reads it once.
pub struct QueryEvaluator<'a, M: ?Sized> {
    index: &'a M,
    cache: HashMap<String, FileSet>,
}

impl<'a, M: TagMembership + ?Sized> QueryEvaluator<'a, M> {
    #[must_use]
    pub fn new(index: &'a M) -> Self {
        Self {
            index,
            cache: HashMap::new(),
        }
    }

    /// Evaluate `query` to the set of matching file ids
    ///
    /// # Errors
    /// Returns `EvalError::UnknownTag` for the first leaf naming a missing tag,
    /// or `EvalError::Lookup` if the membership source fails.
    pub fn evaluate(&mut self, query: &TagQuery) -> Result<FileSet, EvalError<M::Error>> {
        match query {
            TagQuery::Tag(name) => self.members(name),
            TagQuery::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(op.apply(&left, &right))
            }
        }
    }

    fn members(&mut self, tag: &str) -> Result<FileSet, EvalError<M::Error>> {
        if let Some(members) = self.cache.get(tag) {
            return Ok(members.clone());
        }

        let members = self
            .index
            .tag_members(tag)
            .map_err(EvalError::Lookup)?
            .ok_or_else(|| EvalError::UnknownTag(tag.to_string()))?;
        self.cache.insert(tag.to_string(), members.clone());
        Ok(members)
    }
}

/// Evaluate `query` against `index` with a fresh evaluator
///
/// # Errors
/// See [`QueryEvaluator::evaluate`].
pub fn evaluate<M: TagMembership + ?Sized>(
    query: &TagQuery,
    index: &M,
) -> Result<FileSet, EvalError<M::Error>> {
    QueryEvaluator::new(index).evaluate(query)
}
