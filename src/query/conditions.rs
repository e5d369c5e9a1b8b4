//! Chainable condition and clause builders.

use compact_str::CompactString;

use fluentql_core::{
    Boolean, Condition, DatePart, Direction, IndexHint, Join, JoinType, Operator, SQL, TrashedMode,
    Value, validate_date_part,
};

use super::Query;
use crate::error::Result;

impl<'db> Query<'db> {
    fn push(&mut self, boolean: Boolean, condition: Condition) {
        self.state.wheres.push(boolean, condition);
    }

    fn operator(&mut self, op: &str) -> Result<Operator> {
        self.operators.resolve(op)
    }

    fn compare(mut self, boolean: Boolean, column: &str, op: &str, value: Value) -> Result<Self> {
        let op = self.operator(op)?;
        self.push(
            boolean,
            Condition::Compare {
                column: column.into(),
                op,
                value,
            },
        );
        Ok(self)
    }

    /// `column op ?`. The operator must be one of `=`, `!=`, `<`, `>`, `<=`,
    /// `>=`, `<>`, `LIKE` or `NOT LIKE`.
    pub fn r#where(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.compare(Boolean::And, column, op, value.into())
    }

    pub fn or_where(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.compare(Boolean::Or, column, op, value.into())
    }

    /// `column = ?`
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.push(
            Boolean::And,
            Condition::Compare {
                column: column.into(),
                op: Operator::Eq,
                value: value.into(),
            },
        );
        self
    }

    pub fn or_where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.push(
            Boolean::Or,
            Condition::Compare {
                column: column.into(),
                op: Operator::Eq,
                value: value.into(),
            },
        );
        self
    }

    /// Every `(column, value)` pair as an AND-ed equality.
    pub fn where_map<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in pairs {
            self = self.where_eq(column.as_ref(), value);
        }
        self
    }

    /// The AND-ed equalities of `pairs`, grouped and OR-ed onto the query.
    pub fn or_where_map<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let group = self.fresh().where_map(pairs);
        self.push(
            Boolean::Or,
            Condition::Group {
                conditions: group.state.wheres,
                negated: false,
            },
        );
        self
    }

    fn group<F>(mut self, boolean: Boolean, negated: bool, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        let nested = f(self.fresh())?;
        self.push(
            boolean,
            Condition::Group {
                conditions: nested.state.wheres,
                negated,
            },
        );
        Ok(self)
    }

    /// Parenthesized group built by `f` on a fresh query.
    ///
    /// ```ignore
    /// db.table("orders")?
    ///     .where_eq("customer_id", 7)
    ///     .where_group(|q| Ok(q.where_eq("status", "paid").or_where_eq("status", "sent")))?
    /// ```
    pub fn where_group<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        self.group(Boolean::And, false, f)
    }

    pub fn or_where_group<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        self.group(Boolean::Or, false, f)
    }

    /// `NOT (...)` over the conditions built by `f`.
    pub fn where_not<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        self.group(Boolean::And, true, f)
    }

    pub fn or_where_not<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        self.group(Boolean::Or, true, f)
    }

    fn null(mut self, boolean: Boolean, column: &str, negated: bool) -> Self {
        self.push(
            boolean,
            Condition::Null {
                column: column.into(),
                negated,
            },
        );
        self
    }

    pub fn where_null(self, column: &str) -> Self {
        self.null(Boolean::And, column, false)
    }

    pub fn or_where_null(self, column: &str) -> Self {
        self.null(Boolean::Or, column, false)
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.null(Boolean::And, column, true)
    }

    pub fn or_where_not_null(self, column: &str) -> Self {
        self.null(Boolean::Or, column, true)
    }

    fn within<I>(mut self, boolean: Boolean, column: &str, values: I, negated: bool) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.push(
            boolean,
            Condition::In {
                column: column.into(),
                values: values.into_iter().map(Into::into).collect(),
                negated,
            },
        );
        self
    }

    /// `column IN (...)`. An empty list matches no rows.
    pub fn where_in<I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.within(Boolean::And, column, values, false)
    }

    pub fn or_where_in<I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.within(Boolean::Or, column, values, false)
    }

    pub fn where_not_in<I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.within(Boolean::And, column, values, true)
    }

    pub fn or_where_not_in<I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.within(Boolean::Or, column, values, true)
    }

    fn between(
        mut self,
        boolean: Boolean,
        column: &str,
        low: Value,
        high: Value,
        negated: bool,
    ) -> Self {
        self.push(
            boolean,
            Condition::Between {
                column: column.into(),
                low,
                high,
                negated,
            },
        );
        self
    }

    pub fn where_between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.between(Boolean::And, column, low.into(), high.into(), false)
    }

    pub fn or_where_between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.between(Boolean::Or, column, low.into(), high.into(), false)
    }

    pub fn where_not_between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.between(Boolean::And, column, low.into(), high.into(), true)
    }

    pub fn or_where_not_between(
        self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.between(Boolean::Or, column, low.into(), high.into(), true)
    }

    fn exists_clause<F>(mut self, boolean: Boolean, negated: bool, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        let mut sub = f(self.fresh())?.state;
        if !sub.has_projection() {
            sub.select(["1"]);
        }
        self.push(
            boolean,
            Condition::Exists {
                query: sub.to_sql(),
                negated,
            },
        );
        Ok(self)
    }

    /// `EXISTS (...)` over a sub-query on the same table. Reference the
    /// outer row through [`where_column`](Self::where_column) to correlate.
    pub fn where_exists<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        self.exists_clause(Boolean::And, false, f)
    }

    pub fn or_where_exists<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        self.exists_clause(Boolean::Or, false, f)
    }

    pub fn where_not_exists<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        self.exists_clause(Boolean::And, true, f)
    }

    pub fn or_where_not_exists<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        self.exists_clause(Boolean::Or, true, f)
    }

    fn date_part(
        mut self,
        boolean: Boolean,
        part: DatePart,
        column: &str,
        op: &str,
        value: Value,
    ) -> Result<Self> {
        let op = self.operator(op)?;
        let value = validate_date_part(part, &value)?;
        let column = self.state.dialect.date_part(part, column);
        self.push(
            boolean,
            Condition::Compare {
                column: column.into(),
                op,
                value,
            },
        );
        Ok(self)
    }

    /// Compares the date portion of `column`.
    pub fn where_date(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::And, DatePart::Date, column, op, value.into())
    }

    pub fn or_where_date(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::Or, DatePart::Date, column, op, value.into())
    }

    pub fn where_time(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::And, DatePart::Time, column, op, value.into())
    }

    pub fn or_where_time(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::Or, DatePart::Time, column, op, value.into())
    }

    /// Compares the year of `column`; the year must have four digits.
    pub fn where_year(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::And, DatePart::Year, column, op, value.into())
    }

    pub fn or_where_year(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::Or, DatePart::Year, column, op, value.into())
    }

    /// Compares the month of `column`, 1 through 12.
    pub fn where_month(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::And, DatePart::Month, column, op, value.into())
    }

    pub fn or_where_month(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::Or, DatePart::Month, column, op, value.into())
    }

    /// Compares the day of month of `column`, 1 through 31.
    pub fn where_day(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::And, DatePart::Day, column, op, value.into())
    }

    pub fn or_where_day(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.date_part(Boolean::Or, DatePart::Day, column, op, value.into())
    }

    fn column_compare(mut self, boolean: Boolean, first: &str, op: &str, second: &str) -> Result<Self> {
        let op = self.operator(op)?;
        self.push(
            boolean,
            Condition::Column {
                first: first.into(),
                op,
                second: second.into(),
            },
        );
        Ok(self)
    }

    /// `first op second` where both sides are columns.
    pub fn where_column(self, first: &str, op: &str, second: &str) -> Result<Self> {
        self.column_compare(Boolean::And, first, op, second)
    }

    pub fn or_where_column(self, first: &str, op: &str, second: &str) -> Result<Self> {
        self.column_compare(Boolean::Or, first, op, second)
    }

    fn json_contains(mut self, boolean: Boolean, column: &str, value: serde_json::Value) -> Self {
        let (prefix, suffix) = self.state.dialect.json_contains(column);
        let sql = SQL::raw(prefix)
            .push(Value::Text(value.to_string()))
            .append_raw(suffix);
        self.push(boolean, Condition::Raw(sql));
        self
    }

    /// Matches rows whose JSON `column` contains `value`.
    pub fn where_json_contains(self, column: &str, value: serde_json::Value) -> Self {
        self.json_contains(Boolean::And, column, value)
    }

    pub fn or_where_json_contains(self, column: &str, value: serde_json::Value) -> Self {
        self.json_contains(Boolean::Or, column, value)
    }

    fn raw(mut self, boolean: Boolean, sql: &str, bindings: Vec<Value>) -> Result<Self> {
        let sql = SQL::raw_bound(sql, bindings)?;
        self.push(boolean, Condition::Raw(sql));
        Ok(self)
    }

    /// Raw predicate whose `?` markers bind `bindings` in order.
    pub fn where_raw<I>(self, sql: &str, bindings: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.raw(Boolean::And, sql, bindings.into_iter().map(Into::into).collect())
    }

    pub fn or_where_raw<I>(self, sql: &str, bindings: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.raw(Boolean::Or, sql, bindings.into_iter().map(Into::into).collect())
    }

    fn like(mut self, boolean: Boolean, column: &str, op: Operator, pattern: &str) -> Self {
        self.push(
            boolean,
            Condition::Compare {
                column: column.into(),
                op,
                value: Value::Text(pattern.to_owned()),
            },
        );
        self
    }

    /// `column LIKE ?`. `%` and `_` in `pattern` are wildcards.
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.like(Boolean::And, column, Operator::Like, pattern)
    }

    pub fn or_where_like(self, column: &str, pattern: &str) -> Self {
        self.like(Boolean::Or, column, Operator::Like, pattern)
    }

    pub fn where_not_like(self, column: &str, pattern: &str) -> Self {
        self.like(Boolean::And, column, Operator::NotLike, pattern)
    }

    /// Applies `f` only when `condition` holds.
    pub fn when<F>(self, condition: bool, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        if condition { f(self) } else { Ok(self) }
    }

    /// Adds columns to the projection. Bare names are qualified with the
    /// table; dotted names, aliases and function calls are kept verbatim.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.select(columns);
        self
    }

    /// Projects a raw expression with its own bindings.
    pub fn select_raw<I>(mut self, expression: &str, bindings: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let sql = SQL::raw_bound(expression, bindings)?;
        self.state.raw_columns.push(sql);
        Ok(self)
    }

    pub fn distinct(mut self) -> Self {
        self.state.distinct = true;
        self
    }

    /// Adds a join configured by `f`.
    ///
    /// ```ignore
    /// query.join_with("items", JoinType::Left, |j| {
    ///     j.on("items.order_id", "=", "orders.id")?.r#where("items.qty", ">", 0)
    /// })?
    /// ```
    pub fn join_with<F>(mut self, table: &str, join_type: JoinType, f: F) -> Result<Self>
    where
        F: FnOnce(Join) -> Result<Join>,
    {
        let join = f(Join::new(join_type, table))?;
        self.state.joins.push(join);
        Ok(self)
    }

    fn simple_join(self, join_type: JoinType, table: &str, first: &str, op: &str, second: &str) -> Result<Self> {
        self.join_with(table, join_type, |join| join.on(first, op, second))
    }

    /// `INNER JOIN table ON first op second`
    pub fn join(self, table: &str, first: &str, op: &str, second: &str) -> Result<Self> {
        self.simple_join(JoinType::Inner, table, first, op, second)
    }

    pub fn inner_join(self, table: &str, first: &str, op: &str, second: &str) -> Result<Self> {
        self.simple_join(JoinType::Inner, table, first, op, second)
    }

    pub fn left_join(self, table: &str, first: &str, op: &str, second: &str) -> Result<Self> {
        self.simple_join(JoinType::Left, table, first, op, second)
    }

    pub fn right_join(self, table: &str, first: &str, op: &str, second: &str) -> Result<Self> {
        self.simple_join(JoinType::Right, table, first, op, second)
    }

    /// `FULL OUTER JOIN`
    pub fn outer_join(self, table: &str, first: &str, op: &str, second: &str) -> Result<Self> {
        self.simple_join(JoinType::Outer, table, first, op, second)
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            let column = self.state.qualify(column.as_ref());
            self.state.groups.push(SQL::raw(column));
        }
        self
    }

    pub fn group_by_raw(mut self, expression: &str) -> Self {
        self.state.groups.push(SQL::raw(expression));
        self
    }

    fn having_compare(mut self, boolean: Boolean, column: &str, op: &str, value: Value) -> Result<Self> {
        let op = self.operator(op)?;
        self.state.havings.push(
            boolean,
            Condition::Compare {
                column: column.into(),
                op,
                value,
            },
        );
        Ok(self)
    }

    /// HAVING predicate; only rendered alongside a GROUP BY.
    pub fn having(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.having_compare(Boolean::And, column, op, value.into())
    }

    pub fn or_having(self, column: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
        self.having_compare(Boolean::Or, column, op, value.into())
    }

    pub fn having_raw<I>(mut self, sql: &str, bindings: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let sql = SQL::raw_bound(sql, bindings)?;
        self.state.havings.push(Boolean::And, Condition::Raw(sql));
        Ok(self)
    }

    /// Orders by `column`; `direction` is `asc` or `desc`.
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        let column = self.state.qualify(column);
        self.state
            .orders
            .push((SQL::raw(column), Direction::parse(direction)));
        self
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, "desc")
    }

    pub fn order_by_raw(mut self, expression: &str, direction: Direction) -> Self {
        self.state.orders.push((SQL::raw(expression), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.state.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.state.offset = Some(offset);
        self
    }

    fn hint(mut self, hint: fn(Vec<CompactString>) -> IndexHint, names: &[&str]) -> Self {
        self.state.index_hint = Some(hint(names.iter().map(|n| CompactString::from(*n)).collect()));
        self
    }

    pub fn use_index(self, names: &[&str]) -> Self {
        self.hint(IndexHint::Use, names)
    }

    pub fn force_index(self, names: &[&str]) -> Self {
        self.hint(IndexHint::Force, names)
    }

    pub fn ignore_index(self, names: &[&str]) -> Self {
        self.hint(IndexHint::Ignore, names)
    }

    /// Includes soft-deleted rows.
    pub fn with_trashed(mut self) -> Self {
        self.state.trashed = TrashedMode::With;
        self
    }

    /// Only soft-deleted rows.
    pub fn only_trashed(mut self) -> Self {
        self.state.trashed = TrashedMode::Only;
        self
    }

    pub fn without_trashed(mut self) -> Self {
        self.state.trashed = TrashedMode::Without;
        self
    }
}
