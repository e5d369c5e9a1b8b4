use compact_str::CompactString;

use crate::Value;
use crate::sql::{SQL, tokens::Token};

/// A piece of an SQL statement.
///
/// - `Token` - keywords, operators and punctuation
/// - `Text` - raw SQL text such as qualified column names or function calls
/// - `Param` - a bound value, rendered as the dialect's placeholder
/// - `Alias` - `{chunk} AS alias`
/// - `Subquery` - a nested statement rendered in parentheses
#[derive(Debug, Clone, PartialEq)]
pub enum SQLChunk {
    Token(Token),
    Text(CompactString),
    Param(Value),
    Alias {
        chunk: Box<SQLChunk>,
        alias: CompactString,
    },
    Subquery(Box<SQL>),
}

impl SQLChunk {
    #[inline]
    pub const fn token(token: Token) -> Self {
        Self::Token(token)
    }

    #[inline]
    pub fn text(text: impl Into<CompactString>) -> Self {
        Self::Text(text.into())
    }

    #[inline]
    pub fn param(value: impl Into<Value>) -> Self {
        Self::Param(value.into())
    }

    pub fn alias(chunk: SQLChunk, alias: impl Into<CompactString>) -> Self {
        Self::Alias {
            chunk: Box::new(chunk),
            alias: alias.into(),
        }
    }

    /// Chunk ends with a character that must be separated from a following word.
    pub(crate) fn ends_word(&self) -> bool {
        match self {
            SQLChunk::Token(t) => !matches!(t, Token::LPAREN | Token::DOT),
            SQLChunk::Text(t) => t
                .chars()
                .last()
                .is_some_and(|c| !c.is_whitespace() && !['(', '.'].contains(&c)),
            SQLChunk::Param(_) | SQLChunk::Alias { .. } | SQLChunk::Subquery(_) => true,
        }
    }

    /// Chunk starts with a character that must be separated from a preceding word.
    pub(crate) fn starts_word(&self) -> bool {
        match self {
            SQLChunk::Token(t) => !matches!(
                t,
                Token::COMMA | Token::RPAREN | Token::SEMI | Token::DOT
            ),
            SQLChunk::Text(t) => t
                .chars()
                .next()
                .is_some_and(|c| !c.is_whitespace() && ![',', ')', ';', '.'].contains(&c)),
            SQLChunk::Param(_) | SQLChunk::Alias { .. } | SQLChunk::Subquery(_) => true,
        }
    }

    pub(crate) fn is_blank(&self) -> bool {
        matches!(self, SQLChunk::Text(t) if t.is_empty())
    }
}

impl From<Token> for SQLChunk {
    #[inline]
    fn from(value: Token) -> Self {
        Self::Token(value)
    }
}

impl From<Value> for SQLChunk {
    #[inline]
    fn from(value: Value) -> Self {
        Self::Param(value)
    }
}

impl From<SQL> for SQLChunk {
    fn from(value: SQL) -> Self {
        Self::Subquery(Box::new(value))
    }
}
