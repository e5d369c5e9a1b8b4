//! The comparison operator allow-list.

use std::str::FromStr;

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::{FluentError, Result, sql::Token};

/// A comparison operator accepted by `where`-family conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Like,
    NotLike,
}

impl Operator {
    /// Parses an operator spelling, case-insensitively for the LIKE forms.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let op = match trimmed {
            "=" => Operator::Eq,
            "!=" => Operator::NotEq,
            "<" => Operator::Lt,
            ">" => Operator::Gt,
            "<=" => Operator::Le,
            ">=" => Operator::Ge,
            "<>" => Operator::Ne,
            other if other.eq_ignore_ascii_case("like") => Operator::Like,
            other if is_not_like(other) => Operator::NotLike,
            _ => return Err(FluentError::InvalidOperator(input.to_owned())),
        };
        Ok(op)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Ne => "<>",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }

    /// Tokens emitted between the column and the placeholder.
    pub(crate) fn tokens(&self) -> &'static [Token] {
        match self {
            Operator::Eq => &[Token::EQ],
            Operator::NotEq => &[Token::NE],
            Operator::Lt => &[Token::LT],
            Operator::Gt => &[Token::GT],
            Operator::Le => &[Token::LE],
            Operator::Ge => &[Token::GE],
            Operator::Ne => &[Token::LTGT],
            Operator::Like => &[Token::LIKE],
            Operator::NotLike => &[Token::NOT, Token::LIKE],
        }
    }
}

/// Remembers operator spellings already validated for one query.
#[derive(Debug, Clone, Default)]
pub struct OperatorCache {
    seen: HashMap<CompactString, Operator>,
}

impl OperatorCache {
    pub fn resolve(&mut self, input: &str) -> Result<Operator> {
        if let Some(op) = self.seen.get(input) {
            return Ok(*op);
        }
        let op = Operator::parse(input)?;
        self.seen.insert(CompactString::from(input), op);
        Ok(op)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

fn is_not_like(input: &str) -> bool {
    let mut parts = input.split_whitespace();
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(not), Some(like), None)
            if not.eq_ignore_ascii_case("not") && like.eq_ignore_ascii_case("like")
    )
}

impl FromStr for Operator {
    type Err = FluentError;

    fn from_str(s: &str) -> Result<Self> {
        Operator::parse(s)
    }
}

impl TryFrom<&str> for Operator {
    type Error = FluentError;

    fn try_from(value: &str) -> Result<Self> {
        Operator::parse(value)
    }
}

impl core::fmt::Display for Operator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
