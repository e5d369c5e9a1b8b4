//! The seams between the query engine and a database connection.

use crate::{Dialect, Result, Row, Value};

/// Answers whether a column carries a secondary (non-primary) index.
pub trait IndexCatalog {
    fn is_column_indexed(&self, table: &str, column: &str) -> Result<bool>;
}

/// A single synchronous connection handle.
///
/// The engine only asks a driver to run compiled statements and answer
/// catalog questions; it never reaches into driver state.
pub trait Driver: IndexCatalog {
    fn dialect(&self) -> Dialect;

    /// Short name used in log events, e.g. `sqlite.rusqlite`.
    fn name(&self) -> &'static str;

    /// Runs a query and returns every row keyed by column name.
    fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Runs a statement and returns the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Row id generated by the most recent successful insert.
    fn last_insert_id(&self) -> Value;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Whether a transaction is currently open on this handle.
    fn in_transaction(&self) -> bool;

    fn list_columns(&self, table: &str) -> Result<Vec<String>>;

    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Human readable plan lines for a query. Drivers without a plan
    /// explainer return nothing.
    fn explain(&self, _sql: &str, _params: &[Value]) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Renders a value as an SQL literal.
    fn escape(&self, value: &Value) -> String {
        value.to_string()
    }
}
