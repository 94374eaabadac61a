use super::is_tag_char;
use super::types::{SetOp, TagQuery};
use thiserror::Error;

/// Upper bound on operators and on parenthesis nesting in one query.
/// Evaluation recurses once per operator.
pub const MAX_DEPTH: usize = 512;

/// Malformed query text. Positions are byte offsets into the input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty query")]
    Empty,
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },
    #[error("Expected a tag name at position {position}")]
    ExpectedTag { position: usize },
    #[error("Expected an operator at position {position}")]
    ExpectedOperator { position: usize },
    #[error("Unclosed parenthesis opened at position {position}")]
    UnclosedParen { position: usize },
    #[error("Unmatched closing parenthesis at position {position}")]
    UnmatchedParen { position: usize },
    #[error("Query nests too deeply at position {position} (limit {MAX_DEPTH})")]
    TooDeep { position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Tag(&'a str),
    Op(SetOp),
    Open,
    Close,
}

#[derive(Debug, Clone, Copy)]
struct Spanned<'a> {
    token: Token<'a>,
    position: usize,
}

fn tokenize(input: &str) -> Result<Vec<Spanned<'_>>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_ascii_whitespace() {
            chars.next();
            continue;
        }

        if is_tag_char(c) {
            let mut end = input.len();
            while let Some(&(i, c)) = chars.peek() {
                if !is_tag_char(c) {
                    end = i;
                    break;
                }
                chars.next();
            }
            tokens.push(Spanned {
                token: Token::Tag(&input[position..end]),
                position,
            });
            continue;
        }

        chars.next();
        let token = match c {
            '(' => Token::Open,
            ')' => Token::Close,
            _ => Token::Op(
                SetOp::from_symbol(c).ok_or(ParseError::UnexpectedChar { found: c, position })?,
            ),
        };
        tokens.push(Spanned { token, position });
    }

    Ok(tokens)
}

/// Left-associative parser over a token stream
struct QueryParser<'a> {
    tokens: Vec<Spanned<'a>>,
    cursor: usize,
    end: usize,
    operators: usize,
    nesting: usize,
}

impl<'a> QueryParser<'a> {
    fn peek(&self) -> Option<Spanned<'a>> {
        self.tokens.get(self.cursor).copied()
    }

    fn next(&mut self) -> Option<Spanned<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    /// `expr := term (OP term)*`, folded to the left
    fn expr(&mut self) -> Result<TagQuery, ParseError> {
        let mut query = self.term()?;
        while let Some(Spanned { token: Token::Op(op), position }) = self.peek() {
            self.cursor += 1;
            self.operators += 1;
            if self.operators > MAX_DEPTH {
                return Err(ParseError::TooDeep { position });
            }
            let right = self.term()?;
            query = TagQuery::binary(query, op, right);
        }
        Ok(query)
    }

    /// `term := tag | '(' expr ')'`
    fn term(&mut self) -> Result<TagQuery, ParseError> {
        let Some(open) = self.next() else {
            return Err(ParseError::ExpectedTag { position: self.end });
        };

        match open.token {
            Token::Tag(name) => Ok(TagQuery::tag(name)),
            Token::Open => {
                self.nesting += 1;
                if self.nesting > MAX_DEPTH {
                    return Err(ParseError::TooDeep { position: open.position });
                }
                let inner = self.expr()?;
                self.nesting -= 1;
                match self.next() {
                    Some(Spanned { token: Token::Close, .. }) => Ok(inner),
                    Some(other) => Err(ParseError::ExpectedOperator { position: other.position }),
                    None => Err(ParseError::UnclosedParen { position: open.position }),
                }
            }
            Token::Op(_) | Token::Close => Err(ParseError::ExpectedTag { position: open.position }),
        }
    }
}

/// Parse query text into a [`TagQuery`]
///
/// # Errors
///
/// Returns `ParseError` if the input is empty, contains a character that is
/// neither a tag character, an operator, a parenthesis nor whitespace, or if
/// tags and operators do not alternate. Queries with more than [`MAX_DEPTH`]
/// operators or nested parentheses fail with `ParseError::TooDeep`.
///
/// # Examples
/// ```
/// use tagfs::query::{parse, SetOp, TagQuery};
///
/// let query = parse("a+b&c").unwrap();
/// let expected = TagQuery::binary(
///     TagQuery::binary(TagQuery::tag("a"), SetOp::Union, TagQuery::tag("b")),
///     SetOp::Intersect,
///     TagQuery::tag("c"),
/// );
/// assert_eq!(query, expected);
/// ```
pub fn parse(input: &str) -> Result<TagQuery, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = QueryParser {
        tokens,
        cursor: 0,
        end: input.len(),
        operators: 0,
        nesting: 0,
    };
    let query = parser.expr()?;

    match parser.peek() {
        None => Ok(query),
        Some(Spanned { token: Token::Close, position }) => Err(ParseError::UnmatchedParen { position }),
        Some(Spanned { position, .. }) => Err(ParseError::ExpectedOperator { position }),
    }
}
