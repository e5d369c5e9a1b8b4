mod chunk;
mod tokens;

pub use chunk::SQLChunk;
pub use tokens::Token;

use compact_str::CompactString;
use smallvec::{SmallVec, smallvec};
use std::fmt::Display;

use crate::{Dialect, Value};

/// A SQL statement or fragment with its bound parameters.
///
/// Fragments compose by appending chunks; spacing between chunks is decided
/// at render time, so builders never need to pad text with whitespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SQL {
    pub chunks: SmallVec<[SQLChunk; 3]>,
}

impl SQL {
    /// Creates a new empty SQL fragment.
    pub const fn empty() -> Self {
        SQL {
            chunks: SmallVec::new_const(),
        }
    }

    /// Literal SQL text, never bound.
    pub fn raw(sql: impl AsRef<str>) -> Self {
        SQL {
            chunks: smallvec![SQLChunk::Text(CompactString::from(sql.as_ref()))],
        }
    }

    /// Raw SQL text whose `?` markers are replaced by bound values, in order.
    ///
    /// Question marks inside single-quoted literals are left alone. The
    /// number of markers must match the number of values.
    pub fn raw_bound<I>(text: &str, values: I) -> crate::Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut values = values.into_iter().map(Into::into);
        let mut chunks = SmallVec::new();
        let mut in_quote = false;
        let mut start = 0;
        for (i, c) in text.char_indices() {
            match c {
                '\'' => in_quote = !in_quote,
                '?' if !in_quote => {
                    let piece = text[start..i].trim();
                    if !piece.is_empty() {
                        chunks.push(SQLChunk::text(piece));
                    }
                    let value = values.next().ok_or_else(|| {
                        crate::FluentError::InvalidArgument(format!(
                            "not enough bindings for `{text}`"
                        ))
                    })?;
                    chunks.push(SQLChunk::Param(value));
                    start = i + 1;
                }
                _ => {}
            }
        }
        let rest = text[start..].trim();
        if !rest.is_empty() {
            chunks.push(SQLChunk::text(rest));
        }
        if values.next().is_some() {
            return Err(crate::FluentError::InvalidArgument(format!(
                "too many bindings for `{text}`"
            )));
        }
        Ok(SQL { chunks })
    }

    pub fn token(token: Token) -> Self {
        SQL {
            chunks: smallvec![SQLChunk::Token(token)],
        }
    }

    /// A single bound value.
    pub fn parameter(value: impl Into<Value>) -> Self {
        SQL {
            chunks: smallvec![SQLChunk::Param(value.into())],
        }
    }

    /// Comma separated placeholders: `?, ?, ?`
    pub fn parameters<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut chunks = SmallVec::new();
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                chunks.push(SQLChunk::Token(Token::COMMA));
            }
            chunks.push(SQLChunk::Param(value.into()));
        }
        SQL { chunks }
    }

    /// Comma separated column assignments: `a = ?, b = ?`
    pub fn assignments<I, K, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: AsRef<str>,
        T: Into<Value>,
    {
        let mut chunks = SmallVec::new();
        for (i, (column, value)) in pairs.into_iter().enumerate() {
            if i > 0 {
                chunks.push(SQLChunk::Token(Token::COMMA));
            }
            chunks.push(SQLChunk::text(column.as_ref()));
            chunks.push(SQLChunk::Token(Token::EQ));
            chunks.push(SQLChunk::Param(value.into()));
        }
        SQL { chunks }
    }

    /// Joins fragments with a separator token, skipping empty fragments.
    pub fn join<I>(sqls: I, separator: Token) -> Self
    where
        I: IntoIterator<Item = SQL>,
    {
        let mut chunks = SmallVec::new();
        let mut first = true;
        for sql in sqls.into_iter().filter(|sql| !sql.is_empty()) {
            if !first {
                chunks.push(SQLChunk::Token(separator));
            }
            first = false;
            chunks.extend(sql.chunks);
        }
        SQL { chunks }
    }

    /// Appends another SQL fragment to this one.
    pub fn append(mut self, other: impl Into<SQL>) -> Self {
        self.chunks.extend(other.into().chunks);
        self
    }

    pub fn append_mut(&mut self, other: impl Into<SQL>) {
        self.chunks.extend(other.into().chunks);
    }

    /// Appends a raw string to this SQL fragment.
    pub fn append_raw(mut self, sql: impl AsRef<str>) -> Self {
        self.chunks.push(SQLChunk::text(sql.as_ref()));
        self
    }

    pub fn push(mut self, chunk: impl Into<SQLChunk>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    pub fn push_mut(&mut self, chunk: impl Into<SQLChunk>) {
        self.chunks.push(chunk.into());
    }

    /// `{self} AS alias`
    pub fn alias(self, alias: impl Into<CompactString>) -> Self {
        SQL {
            chunks: smallvec![SQLChunk::Alias {
                chunk: Box::new(SQLChunk::Subquery(Box::new(self))),
                alias: alias.into(),
            }],
        }
    }

    /// Wraps this fragment in parentheses.
    pub fn subquery(self) -> Self {
        SQL {
            chunks: smallvec![SQLChunk::Subquery(Box::new(self))],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(SQLChunk::is_blank)
    }

    /// Parameter values in placeholder order.
    pub fn params(&self) -> Vec<&Value> {
        let mut params = Vec::with_capacity(self.chunks.len().min(8));
        for chunk in &self.chunks {
            collect_chunk_params(chunk, &mut params);
        }
        params
    }

    /// Owned parameter values in placeholder order.
    pub fn into_params(self) -> Vec<Value> {
        self.params().into_iter().cloned().collect()
    }

    /// Renders SQL text using the dialect's placeholders.
    pub fn sql(&self, dialect: Dialect) -> String {
        let mut buf = String::with_capacity(self.chunks.len() * 8);
        let mut index = 0;
        self.write_sql(&mut buf, dialect, &mut index);
        buf
    }

    /// Renders SQL text and collects bound values in one pass.
    pub fn build(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let sql = self.sql(dialect);
        let params = self.params().into_iter().cloned().collect();
        (sql, params)
    }

    fn write_sql(&self, buf: &mut String, dialect: Dialect, index: &mut usize) {
        for i in 0..self.chunks.len() {
            write_chunk(buf, &self.chunks[i], dialect, index);
            if self.needs_space(i) {
                buf.push(' ');
            }
        }
    }

    fn needs_space(&self, index: usize) -> bool {
        let current = &self.chunks[index];
        if current.is_blank() {
            return false;
        }
        let Some(next) = self.chunks[index + 1..].iter().find(|c| !c.is_blank()) else {
            return false;
        };
        current.ends_word() && next.starts_word()
    }
}

fn write_chunk(buf: &mut String, chunk: &SQLChunk, dialect: Dialect, index: &mut usize) {
    match chunk {
        SQLChunk::Token(token) => buf.push_str(token.as_str()),
        SQLChunk::Text(text) => buf.push_str(text),
        SQLChunk::Param(_) => {
            *index += 1;
            buf.push_str(&dialect.render_placeholder(*index));
        }
        SQLChunk::Alias { chunk, alias } => {
            write_chunk(buf, chunk, dialect, index);
            buf.push_str(" AS ");
            buf.push_str(alias);
        }
        SQLChunk::Subquery(sql) => {
            buf.push('(');
            sql.write_sql(buf, dialect, index);
            buf.push(')');
        }
    }
}

fn collect_chunk_params<'a>(chunk: &'a SQLChunk, params: &mut Vec<&'a Value>) {
    match chunk {
        SQLChunk::Param(value) => params.push(value),
        SQLChunk::Alias { chunk, .. } => collect_chunk_params(chunk, params),
        SQLChunk::Subquery(sql) => params.extend(sql.params()),
        SQLChunk::Token(_) | SQLChunk::Text(_) => {}
    }
}

impl From<Token> for SQL {
    fn from(value: Token) -> Self {
        SQL::token(value)
    }
}

impl From<&str> for SQL {
    fn from(value: &str) -> Self {
        SQL::raw(value)
    }
}

impl From<String> for SQL {
    fn from(value: String) -> Self {
        SQL::raw(value)
    }
}

impl Display for SQL {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            r#"sql: "{}", params: {:?}"#,
            self.sql(Dialect::SQLite),
            self.params()
        )
    }
}

/// A rendered statement ready for a driver.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Statement {
    pub sql: String,
    #[serde(serialize_with = "serialize_params")]
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: &SQL, dialect: Dialect) -> Self {
        let (sql, params) = sql.build(dialect);
        Statement { sql, params }
    }
}

fn serialize_params<S: serde::Serializer>(params: &[Value], serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(params.len()))?;
    for param in params {
        seq.serialize_element(&param.clone().into_json())?;
    }
    seq.end()
}
