//! The rusqlite-backed [`Driver`].

use rusqlite::types::ValueRef;
use rusqlite::{Connection, params_from_iter};
use serde_json::Value as JsonValue;

use fluentql_core::{Dialect, Driver, IndexCatalog, Row, Value};

use crate::error::Result;

/// A single SQLite connection.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    pub const fn new(conn: Connection) -> Self {
        SqliteDriver { conn }
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(SqliteDriver::new(Connection::open_in_memory()?))
    }

    /// Gets a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// BLOBs come back as arrays of byte values; non-finite reals as null.
fn json_of(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(text) => JsonValue::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => bytes.iter().copied().map(JsonValue::from).collect(),
    }
}

impl IndexCatalog for SqliteDriver {
    /// True when a non-primary-key index leads with `column`.
    fn is_column_indexed(&self, table: &str, column: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare(
            "SELECT 1 FROM pragma_index_list(?1) AS il \
             JOIN pragma_index_info(il.name) AS ii \
             WHERE il.origin != 'pk' AND ii.seqno = 0 AND ii.name = ?2 LIMIT 1",
        )?;
        Ok(stmt.exists([table, column])?)
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    fn name(&self) -> &'static str {
        "sqlite.rusqlite"
    }

    fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
        let mut rows = stmt.query(params_from_iter(params))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, name) in names.iter().enumerate() {
                record.insert(name.clone(), json_of(row.get_ref(i)?));
            }
            results.push(record);
        }
        Ok(results)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let affected = self.conn.execute(sql, params_from_iter(params))?;
        Ok(affected as u64)
    }

    fn last_insert_id(&self) -> Value {
        Value::Integer(self.conn.last_insert_rowid())
    }

    fn begin(&self) -> Result<()> {
        Ok(self.conn.execute_batch("BEGIN")?)
    }

    fn commit(&self) -> Result<()> {
        Ok(self.conn.execute_batch("COMMIT")?)
    }

    fn rollback(&self) -> Result<()> {
        Ok(self.conn.execute_batch("ROLLBACK")?)
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt.query_map([table], |row| row.get::<_, String>(0))?;
        Ok(names.collect::<rusqlite::Result<_>>()?)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        Ok(stmt.exists([table])?)
    }

    fn explain(&self, sql: &str, params: &[Value]) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        let lines = stmt.query_map(params_from_iter(params), |row| row.get::<_, String>("detail"))?;
        Ok(lines.collect::<rusqlite::Result<_>>()?)
    }
}
