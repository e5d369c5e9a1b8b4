//! First-class query state and statement compilation.
//!
//! [`SelectQuery`] owns every fragment a fluent query accumulates. It is a
//! plain value: cloning it deep-copies the fragment buffers, so a sub-query or
//! a traversal snapshot can branch off without leaking changes back.

use compact_str::{CompactString, format_compact};

use crate::{
    Boolean, Condition, Conditions, Dialect, Join, Value,
    sql::{SQL, Token},
};

/// Soft-delete visibility of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashedMode {
    /// Exclude soft-deleted rows
    #[default]
    Without,
    /// Include every row
    With,
    /// Only soft-deleted rows
    Only,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parses `asc`/`desc`, defaulting to ascending.
    pub fn parse(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    const fn token(self) -> Token {
        match self {
            Direction::Asc => Token::ASC,
            Direction::Desc => Token::DESC,
        }
    }
}

/// Index hint attached to the FROM table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexHint {
    Use(Vec<CompactString>),
    Force(Vec<CompactString>),
    Ignore(Vec<CompactString>),
}

impl IndexHint {
    /// Renders the hint for `dialect`, or `None` where the dialect has no
    /// equivalent.
    pub fn render(&self, dialect: Dialect) -> Option<String> {
        match (dialect, self) {
            (Dialect::MySQL, IndexHint::Use(names)) => Some(format!("USE INDEX ({})", names.join(", "))),
            (Dialect::MySQL, IndexHint::Force(names)) => {
                Some(format!("FORCE INDEX ({})", names.join(", ")))
            }
            (Dialect::MySQL, IndexHint::Ignore(names)) => {
                Some(format!("IGNORE INDEX ({})", names.join(", ")))
            }
            // SQLite can only pin a single index.
            (Dialect::SQLite, IndexHint::Use(names) | IndexHint::Force(names)) => {
                names.first().map(|name| format!("INDEXED BY {name}"))
            }
            (Dialect::SQLite, IndexHint::Ignore(_)) => Some("NOT INDEXED".to_owned()),
            (Dialect::PostgreSQL, _) => None,
        }
    }
}

/// The accumulated state of one SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub dialect: Dialect,
    pub table: CompactString,
    /// Column expressions as written by `select`, already qualified
    pub columns: Vec<CompactString>,
    /// Expressions carrying their own bindings (`select_raw`, aggregates)
    pub raw_columns: Vec<SQL>,
    pub distinct: bool,
    pub index_hint: Option<IndexHint>,
    pub joins: Vec<Join>,
    pub wheres: Conditions,
    /// Predicates always AND-ed after the caller's conditions
    pub guards: Vec<Condition>,
    pub groups: Vec<SQL>,
    pub havings: Conditions,
    pub orders: Vec<(SQL, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub trashed: TrashedMode,
    /// Deleted-at column when the table soft deletes
    pub soft_delete: Option<CompactString>,
}

impl SelectQuery {
    pub fn new(table: impl Into<CompactString>, dialect: Dialect) -> Self {
        SelectQuery {
            dialect,
            table: table.into(),
            columns: Vec::new(),
            raw_columns: Vec::new(),
            distinct: false,
            index_hint: None,
            joins: Vec::new(),
            wheres: Conditions::new(),
            guards: Vec::new(),
            groups: Vec::new(),
            havings: Conditions::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            trashed: TrashedMode::Without,
            soft_delete: None,
        }
    }

    /// `table.column`
    pub fn column(&self, column: &str) -> CompactString {
        format_compact!("{}.{}", self.table, column)
    }

    /// Prefixes a bare column with the table name.
    ///
    /// Tokens that already contain a dot, an `AS` alias or a function call
    /// are left as they are, and so are numeric literals.
    pub fn qualify(&self, column: &str) -> CompactString {
        let column = column.trim();
        if column.contains('.')
            || column.to_ascii_lowercase().contains(" as ")
            || looks_like_call(column)
            || column.parse::<f64>().is_ok()
            || column.starts_with('\'')
        {
            return column.into();
        }
        self.column(column)
    }

    /// Adds columns to the projection. A single entry may itself be a
    /// comma separated list.
    pub fn select<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in columns {
            for column in split_top_level(entry.as_ref()) {
                if !column.is_empty() {
                    let qualified = self.qualify(column);
                    self.columns.push(qualified);
                }
            }
        }
    }

    /// True when `column` (bare or table-qualified) is explicitly selected.
    pub fn selects(&self, column: &str) -> bool {
        let qualified = self.column(column);
        self.columns
            .iter()
            .any(|c| c.as_str() == column || *c == qualified)
    }

    pub fn has_projection(&self) -> bool {
        !self.columns.is_empty() || !self.raw_columns.is_empty()
    }

    /// Soft-delete predicate for the current visibility mode.
    pub fn trashed_condition(&self) -> Option<Condition> {
        let deleted_at = self.soft_delete.as_ref()?;
        let negated = match self.trashed {
            TrashedMode::With => return None,
            TrashedMode::Without => false,
            TrashedMode::Only => true,
        };
        Some(Condition::Null {
            column: self.column(deleted_at),
            negated,
        })
    }

    /// The complete WHERE condition list: the caller's conditions, grouped
    /// when they contain a top-level OR, followed by guards and the
    /// soft-delete filter.
    pub fn where_conditions(&self) -> Conditions {
        let trashed = self.trashed_condition();
        let has_extras = !self.guards.is_empty() || trashed.is_some();

        let mut conditions = if has_extras && self.wheres.has_or() {
            Conditions::new().and(Condition::Group {
                conditions: self.wheres.clone(),
                negated: false,
            })
        } else {
            self.wheres.clone()
        };
        for guard in &self.guards {
            conditions.push(Boolean::And, guard.clone());
        }
        if let Some(trashed) = trashed {
            conditions.push(Boolean::And, trashed);
        }
        conditions
    }

    fn from_sql(&self) -> SQL {
        let mut sql = SQL::token(Token::FROM).append_raw(&self.table);
        if let Some(hint) = self.index_hint.as_ref().and_then(|h| h.render(self.dialect)) {
            sql.append_mut(SQL::raw(hint));
        }
        for join in &self.joins {
            sql.append_mut(join.to_sql());
        }
        sql
    }

    fn where_sql(&self) -> SQL {
        let conditions = self.where_conditions().to_sql();
        if conditions.is_empty() {
            return SQL::empty();
        }
        SQL::token(Token::WHERE).append(conditions)
    }

    fn projection_sql(&self) -> SQL {
        let mut items: Vec<SQL> = self.columns.iter().map(SQL::raw).collect();
        if items.is_empty() {
            items.push(SQL::raw(format_compact!("{}.*", self.table)));
        }
        items.extend(self.raw_columns.iter().cloned());
        SQL::join(items, Token::COMMA)
    }

    fn group_sql(&self) -> SQL {
        if self.groups.is_empty() {
            return SQL::empty();
        }
        let mut sql = SQL::token(Token::GROUP_BY).append(SQL::join(self.groups.iter().cloned(), Token::COMMA));
        let having = self.havings.to_sql();
        if !having.is_empty() {
            sql = sql.push(Token::HAVING).append(having);
        }
        sql
    }

    fn order_sql(&self) -> SQL {
        if self.orders.is_empty() {
            return SQL::empty();
        }
        let items = self
            .orders
            .iter()
            .map(|(expr, direction)| expr.clone().push(direction.token()));
        SQL::token(Token::ORDER_BY).append(SQL::join(items, Token::COMMA))
    }

    fn limit_sql(&self) -> SQL {
        match (self.limit, self.offset) {
            (None, None) => SQL::empty(),
            (Some(limit), None) => SQL::token(Token::LIMIT).append_raw(limit.to_string()),
            (Some(limit), Some(offset)) => SQL::token(Token::LIMIT)
                .append_raw(limit.to_string())
                .push(Token::OFFSET)
                .append_raw(offset.to_string()),
            (None, Some(offset)) => {
                let sql = match self.dialect.unbounded_limit() {
                    Some(all) => SQL::token(Token::LIMIT).append_raw(all),
                    None => SQL::empty(),
                };
                sql.push(Token::OFFSET).append_raw(offset.to_string())
            }
        }
    }

    /// Compiles the full SELECT statement.
    pub fn to_sql(&self) -> SQL {
        let select = if self.distinct {
            SQL::token(Token::SELECT).push(Token::DISTINCT)
        } else {
            SQL::token(Token::SELECT)
        };
        select
            .append(self.projection_sql())
            .append(self.from_sql())
            .append(self.where_sql())
            .append(self.group_sql())
            .append(self.order_sql())
            .append(self.limit_sql())
    }

    /// Compiles `SELECT COUNT(*)` over the same filters, ignoring ordering and
    /// paging. Grouped or distinct queries are counted through a sub-query.
    pub fn count_sql(&self) -> SQL {
        if !self.groups.is_empty() || self.distinct {
            let mut inner = self.clone();
            inner.orders.clear();
            inner.limit = None;
            inner.offset = None;
            return SQL::raw("SELECT COUNT(*) AS aggregate")
                .push(Token::FROM)
                .append(inner.to_sql().alias("count_sub"));
        }
        SQL::raw("SELECT COUNT(*) AS aggregate")
            .append(self.from_sql())
            .append(self.where_sql())
    }

    /// `UPDATE table SET .. WHERE ..` using the caller's conditions only.
    pub fn update_sql<I, K, V>(&self, assignments: I) -> SQL
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let sql = SQL::token(Token::UPDATE)
            .append_raw(&self.table)
            .push(Token::SET)
            .append(SQL::assignments(assignments));
        let conditions = self.wheres.to_sql();
        if conditions.is_empty() {
            return sql;
        }
        sql.push(Token::WHERE).append(conditions)
    }

    /// `DELETE FROM table WHERE ..` using the caller's conditions only.
    pub fn delete_sql(&self) -> SQL {
        let sql = SQL::token(Token::DELETE_FROM).append_raw(&self.table);
        let conditions = self.wheres.to_sql();
        if conditions.is_empty() {
            return sql;
        }
        sql.push(Token::WHERE).append(conditions)
    }
}

/// `INSERT INTO table (a, b) VALUES (?, ?), (?, ?)`
///
/// Every row must supply a value for each of `columns`, in order.
pub fn insert_sql<C, R>(table: &str, columns: &[C], rows: R) -> SQL
where
    C: AsRef<str>,
    R: IntoIterator<Item = Vec<Value>>,
{
    let names = SQL::join(columns.iter().map(|c| SQL::raw(c.as_ref())), Token::COMMA);
    let tuples = rows
        .into_iter()
        .map(|row| SQL::parameters(row).subquery());
    SQL::token(Token::INSERT_INTO)
        .append_raw(table)
        .append(names.subquery())
        .push(Token::VALUES)
        .append(SQL::join(tuples, Token::COMMA))
}

fn looks_like_call(column: &str) -> bool {
    match column.find('(') {
        Some(open) => {
            let name = column[..open].trim_end();
            !name.is_empty()
                && name.chars().all(|c| c.is_alphanumeric() || c == '_')
                && column.trim_end().ends_with(')')
        }
        None => false,
    }
}

/// Splits on commas that are not nested inside parentheses.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(input[start..].trim());
    parts
}
