#![cfg(feature = "rusqlite")]

use std::cell::RefCell;
use std::rc::Rc;

use fluentql::core::{Dialect, Driver, IndexCatalog, Row, Value};
use fluentql::sqlite::SqliteDriver;
use fluentql::validation::rules;
use fluentql::{Db, DbConfig, Entity, Result, Schema};

pub const DDL: &str = "
    CREATE TABLE customers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT,
        updated_at TEXT
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL,
        status TEXT NOT NULL,
        total REAL NOT NULL DEFAULT 0,
        created_at TEXT,
        updated_at TEXT,
        deleted_at TEXT
    );
    CREATE TABLE items (
        id INTEGER PRIMARY KEY,
        order_id INTEGER NOT NULL,
        sku TEXT NOT NULL,
        qty INTEGER NOT NULL
    );
    CREATE INDEX orders_customer_id ON orders (customer_id);
    CREATE INDEX items_order_id ON items (order_id);
";

/// Three customers; order 3 is trashed, order 4 has no items, Cy has no orders.
pub const SEED: &str = "
    INSERT INTO customers (id, name, email, active) VALUES
        (1, 'Ana', 'ana@example.com', 1),
        (2, 'Ben', 'ben@example.com', 1),
        (3, 'Cy', NULL, 0);
    INSERT INTO orders (id, customer_id, status, total, deleted_at) VALUES
        (1, 1, 'paid', 10.0, NULL),
        (2, 1, 'sent', 20.0, NULL),
        (3, 2, 'paid', 5.0, '2024-01-01 00:00:00'),
        (4, 2, 'pending', 7.5, NULL);
    INSERT INTO items (id, order_id, sku, qty) VALUES
        (1, 1, 'pen', 2),
        (2, 1, 'ink', 1),
        (3, 2, 'pad', 5),
        (4, 3, 'cap', 1);
";

pub fn schema() -> Schema {
    Schema::new()
        .register(
            Entity::new("customers")
                .fillable(["name", "email", "active"])
                .hidden(["email"])
                .paginate_columns(["name", "email"])
                .rules(rules([("name", "required|min_length[2]"), ("email", "valid_email")]).unwrap())
                .has_many("orders", "orders", "customer_id"),
        )
        .register(
            Entity::new("orders")
                .fillable(["customer_id", "status", "total"])
                .soft_deletes()
                .has_many("items", "items", "order_id")
                .belongs_to("customer", "customers", "customer_id"),
        )
        .register(
            Entity::new("items")
                .without_timestamps()
                .fillable(["order_id", "sku", "qty"])
                .belongs_to("order", "orders", "order_id"),
        )
}

/// SELECT statements seen by a [`RecordingDriver`].
#[derive(Debug, Clone, Default)]
pub struct QueryLog(Rc<RefCell<Vec<String>>>);

impl QueryLog {
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn selects(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Number of recorded selects reading from `table`.
    pub fn reads_from(&self, table: &str) -> usize {
        let needle = format!("FROM {table}");
        self.0
            .borrow()
            .iter()
            .filter(|sql| sql.starts_with("SELECT") && sql.contains(&needle))
            .count()
    }
}

/// Delegates to SQLite and records every SELECT.
pub struct RecordingDriver {
    inner: SqliteDriver,
    log: QueryLog,
}

impl IndexCatalog for RecordingDriver {
    fn is_column_indexed(&self, table: &str, column: &str) -> Result<bool> {
        self.inner.is_column_indexed(table, column)
    }
}

impl Driver for RecordingDriver {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn name(&self) -> &'static str {
        "sqlite.recording"
    }

    fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.log.0.borrow_mut().push(sql.to_owned());
        self.inner.select(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.inner.execute(sql, params)
    }

    fn last_insert_id(&self) -> Value {
        self.inner.last_insert_id()
    }

    fn begin(&self) -> Result<()> {
        self.inner.begin()
    }

    fn commit(&self) -> Result<()> {
        self.inner.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.inner.rollback()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        self.inner.list_columns(table)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        self.inner.table_exists(table)
    }
}

pub struct Fixture {
    pub db: Db,
    pub log: QueryLog,
}

pub fn setup() -> Fixture {
    setup_with("", DbConfig::default())
}

/// Seeded database with `extra` SQL run after the fixtures.
pub fn setup_with(extra: &str, config: DbConfig) -> Fixture {
    let inner = SqliteDriver::open_in_memory().expect("Failed to create in-memory database");
    inner
        .conn()
        .execute_batch(&format!("{DDL}{SEED}{extra}"))
        .expect("Failed to seed fixtures");
    let log = QueryLog::default();
    let driver = RecordingDriver {
        inner,
        log: log.clone(),
    };
    Fixture {
        db: Db::new(driver, schema()).with_config(config),
        log,
    }
}

pub fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}

/// Primary keys of `rows`, sorted.
pub fn ids(rows: &[Row]) -> Vec<i64> {
    let mut ids = ordered_ids(rows);
    ids.sort_unstable();
    ids
}

/// Primary keys of `rows` in the order they were returned.
pub fn ordered_ids(rows: &[Row]) -> Vec<i64> {
    rows.iter().filter_map(|r| r.get("id").and_then(|v| v.as_i64())).collect()
}

/// Seeded database whose only entity is `items` with its key hidden.
pub fn hidden_key_db(extra: &str) -> Db {
    let driver = SqliteDriver::open_in_memory().expect("Failed to create in-memory database");
    driver
        .conn()
        .execute_batch(&format!("{DDL}{SEED}{extra}"))
        .expect("Failed to seed fixtures");
    let schema = Schema::new().register(Entity::new("items").without_timestamps().hidden(["id"]));
    Db::new(driver, schema)
}
