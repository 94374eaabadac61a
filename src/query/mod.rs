//! Tag query engine
//!
//! A query is a tag-set expression such as `photos&2024-drafts`. Leaves name
//! tags, and the four binary operators combine member sets strictly left to
//! right with no precedence between them:
//!
//! | Operator | Meaning |
//! |---|---|
//! | `+` | union |
//! | `&` | intersection |
//! | `-` | left difference |
//! | `^` | symmetric difference |
//!
//! Parentheses may be used for explicit grouping; unparenthesized input
//! always nests to the left, so `a-b-c` means `(a-b)-c`.
//!
//! # Examples
//! ```
//! use std::collections::{BTreeSet, HashMap};
//! use tagfs::query::{self, FileSet, TagQuery};
//!
//! let mut index: HashMap<String, FileSet> = HashMap::new();
//! index.insert("awesome_tag".to_string(), BTreeSet::from([1, 2]));
//! index.insert("cool_tag".to_string(), BTreeSet::from([2, 3]));
//!
//! let query: TagQuery = "awesome_tag^cool_tag".parse().unwrap();
//! assert_eq!(query::evaluate(&query, &index).unwrap(), BTreeSet::from([1, 3]));
//! ```

pub mod evaluator;
pub mod parser;
pub mod types;

pub use evaluator::{EvalError, QueryEvaluator, TagMembership, evaluate};
pub use parser::{MAX_DEPTH, ParseError, parse};
pub use types::{FileSet, SetOp, TagQuery};

/// Characters allowed in a tag name
///
/// Restricted to ASCII letters, digits and `_` on purpose, so tag names are
/// the same bytes on every host and never need normalization.
#[must_use]
pub const fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Check that `name` is a usable tag name: non-empty and made only of tag characters
#[must_use]
pub fn is_valid_tag_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_tag_char)
}
