//! Read terminals.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use fluentql_core::{Direction, Row, SQL, Statement, Value};

use super::Query;
use crate::error::{FluentError, Result};
use crate::format;
use crate::relations::eager;

impl<'db> Query<'db> {
    /// Rows as the driver returns them, aggregates included, before eager
    /// loading and formatting.
    pub(crate) fn fetch_rows(&self) -> Result<Vec<Row>> {
        let state = self.compiled()?;
        self.db.select(&state.to_sql())
    }

    /// Eager loads and formats rows fetched by this query.
    pub(crate) fn finish(&self, rows: Vec<Row>) -> Result<Vec<Row>> {
        let rows = eager::attach(self.db, self.entity, &self.eager, rows)?;
        Ok(format::format_rows(self.entity, rows, self.show_hidden))
    }

    /// Runs the query: fetch, eager load, then format.
    pub fn get(self) -> Result<Vec<Row>> {
        let rows = self.fetch_rows()?;
        self.finish(rows)
    }

    /// Deserializes every row into `T`.
    pub fn get_as<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        self.get()?
            .into_iter()
            .map(|row| serde_json::from_value(JsonValue::Object(row)).map_err(FluentError::from))
            .collect()
    }

    /// The formatted rows as a JSON array.
    pub fn to_json(self) -> Result<String> {
        Ok(serde_json::to_string(&self.get()?)?)
    }

    /// First row by primary key unless the query is already ordered.
    pub fn first(mut self) -> Result<Option<Row>> {
        if self.state.orders.is_empty() {
            let pk = self.state.column(&self.entity.primary_key);
            self.state.orders.push((SQL::raw(pk), Direction::Asc));
        }
        self.state.limit = Some(1);
        Ok(self.get()?.into_iter().next())
    }

    /// Alias of [`first`](Self::first).
    pub fn fetch(self) -> Result<Option<Row>> {
        self.first()
    }

    /// Row with the highest primary key.
    pub fn last(mut self) -> Result<Option<Row>> {
        let pk = self.state.column(&self.entity.primary_key);
        self.state.orders = vec![(SQL::raw(pk), Direction::Desc)];
        self.state.limit = Some(1);
        Ok(self.get()?.into_iter().next())
    }

    /// Row whose primary key equals `id`.
    pub fn find(self, id: impl Into<Value>) -> Result<Option<Row>> {
        let pk = self.state.column(&self.entity.primary_key);
        self.where_eq(&pk, id).first()
    }

    /// Like [`find`](Self::find), failing with [`FluentError::NotFound`].
    pub fn find_or_fail(self, id: impl Into<Value>) -> Result<Row> {
        self.find(id)?.ok_or(FluentError::NotFound)
    }

    /// Number of rows matching the filters; ordering and paging are ignored.
    pub fn count(&self) -> Result<u64> {
        let rows = self.db.select(&self.state.count_sql())?;
        Ok(rows
            .first()
            .and_then(|row| row.get("aggregate"))
            .and_then(as_count)
            .unwrap_or(0))
    }

    pub fn exists(mut self) -> Result<bool> {
        self.state.columns = vec!["1".into()];
        self.state.raw_columns.clear();
        self.state.orders.clear();
        self.state.limit = Some(1);
        Ok(!self.db.select(&self.state.to_sql())?.is_empty())
    }

    pub fn doesnt_exist(self) -> Result<bool> {
        Ok(!self.exists()?)
    }

    /// The SELECT this query would run.
    pub fn to_sql(&self) -> Result<Statement> {
        Ok(Statement::new(&self.compiled()?.to_sql(), self.db.dialect()))
    }
}

/// Reads a count returned as a number or as numeric text.
pub(crate) fn as_count(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
