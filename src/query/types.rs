use crate::FileId;
use std::collections::BTreeSet;
use std::fmt;

/// Ordered set of file ids produced by evaluating a query
pub type FileSet = BTreeSet<FileId>;

/// Set operator joining two sub-queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    /// `+`: in either operand
    Union,
    /// `&`: in both operands
    Intersect,
    /// `-`: in the left operand but not the right
    Difference,
    /// `^`: in exactly one operand
    SymmetricDifference,
}

impl SetOp {
    /// All operators in symbol order
    pub const ALL: [Self; 4] = [
        Self::Union,
        Self::Intersect,
        Self::Difference,
        Self::SymmetricDifference,
    ];

    /// Operator character used in query text
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Union => '+',
            Self::Intersect => '&',
            Self::Difference => '-',
            Self::SymmetricDifference => '^',
        }
    }

    /// Look up the operator for a query character
    #[must_use]
    pub const fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Union),
            '&' => Some(Self::Intersect),
            '-' => Some(Self::Difference),
            '^' => Some(Self::SymmetricDifference),
            _ => None,
        }
    }

    /// Combine two member sets
    #[must_use]
    pub fn apply(self, left: &FileSet, right: &FileSet) -> FileSet {
        match self {
            Self::Union => left | right,
            Self::Intersect => left & right,
            Self::Difference => left - right,
            Self::SymmetricDifference => left ^ right,
        }
    }
}

impl fmt::Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Parsed tag query
///
/// Built by [`crate::query::parse`]. A query never changes once parsed, and
/// evaluating it only reads tag membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagQuery {
    /// All members of one tag
    Tag(String),
    /// Two sub-queries combined by an operator
    Binary {
        left: Box<TagQuery>,
        op: SetOp,
        right: Box<TagQuery>,
    },
}

impl TagQuery {
    /// Leaf query for a single tag
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    /// Combine two queries with `op`
    #[must_use]
    pub fn binary(left: Self, op: SetOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Tag(_))
    }

    /// Every tag referenced by the query, in first-appearance order, without duplicates
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags = Vec::new();
        self.collect_tags(&mut tags);
        tags
    }

    fn collect_tags<'a>(&'a self, tags: &mut Vec<&'a str>) {
        match self {
            Self::Tag(name) => {
                if !tags.contains(&name.as_str()) {
                    tags.push(name);
                }
            }
            Self::Binary { left, right, .. } => {
                left.collect_tags(tags);
                right.collect_tags(tags);
            }
        }
    }
}

impl fmt::Display for TagQuery {
    /// Canonical text form; parsing the output yields an equal query
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(name) => f.write_str(name),
            Self::Binary { left, op, right } => {
                write!(f, "{left}{op}")?;
                if right.is_leaf() {
                    write!(f, "{right}")
                } else {
                    write!(f, "({right})")
                }
            }
        }
    }
}

impl std::str::FromStr for TagQuery {
    type Err = super::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parse(s)
    }
}
