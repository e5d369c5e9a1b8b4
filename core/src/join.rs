//! JOIN clauses.

use compact_str::CompactString;

use crate::{
    Boolean, Condition, Conditions, Operator, Result, Value,
    sql::{SQL, Token},
};

/// The type of JOIN operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    /// `FULL OUTER JOIN`
    Outer,
    Cross,
}

impl JoinType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Outer => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// Builder for one JOIN clause and its ON conditions.
///
/// ```ignore
/// let join = Join::new(JoinType::Left, "items")
///     .on("items.order_id", "=", "orders.id")?
///     .r#where("items.qty", ">", 0)?;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: CompactString,
    conditions: Conditions,
}

impl Join {
    pub fn new(join_type: JoinType, table: impl Into<CompactString>) -> Self {
        Join {
            join_type,
            table: table.into(),
            conditions: Conditions::new(),
        }
    }

    fn column(mut self, boolean: Boolean, first: &str, op: &str, second: &str) -> Result<Self> {
        let op = Operator::parse(op)?;
        self.conditions.push(
            boolean,
            Condition::Column {
                first: first.into(),
                op,
                second: second.into(),
            },
        );
        Ok(self)
    }

    fn value(mut self, boolean: Boolean, column: &str, op: &str, value: Value) -> Result<Self> {
        let op = Operator::parse(op)?;
        self.conditions.push(
            boolean,
            Condition::Compare {
                column: column.into(),
                op,
                value,
            },
        );
        Ok(self)
    }

    /// `ON first op second`, AND-ed with previous ON conditions.
    pub fn on(self, first: &str, op: &str, second: &str) -> Result<Self> {
        self.column(Boolean::And, first, op, second)
    }

    pub fn or_on(self, first: &str, op: &str, second: &str) -> Result<Self> {
        self.column(Boolean::Or, first, op, second)
    }

    /// Compares a column with a bound value inside the ON clause.
    pub fn r#where(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.value(Boolean::And, column, op, value.into())
    }

    pub fn or_where(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.value(Boolean::Or, column, op, value.into())
    }

    /// `column IS NULL` inside the ON clause.
    pub fn where_null(mut self, column: &str) -> Self {
        self.conditions.push(
            Boolean::And,
            Condition::Null {
                column: column.into(),
                negated: false,
            },
        );
        self
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    pub fn to_sql(&self) -> SQL {
        let sql = SQL::raw(self.join_type.as_str()).append_raw(&self.table);
        if self.conditions.is_empty() {
            return sql;
        }
        sql.push(Token::ON).append(self.conditions.to_sql())
    }
}
