//! The connection handle every query runs through.

use std::time::Instant;

use fluentql_core::{Dialect, Driver, Row, SQL, Value};

use crate::config::DbConfig;
use crate::entity::{Entity, Schema};
use crate::error::{FluentError, Result};
use crate::query::Query;
use crate::validation::{RuleValidator, Validator};

/// A driver plus the schema and settings queries are built against.
///
/// ```ignore
/// let db = Db::new(SqliteDriver::open_in_memory()?, schema);
/// let paid = db.table("orders")?.where_eq("status", "paid").with("items")?.get()?;
/// ```
pub struct Db {
    driver: Box<dyn Driver>,
    schema: Schema,
    config: DbConfig,
    validator: Box<dyn Validator>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("driver", &self.driver.name())
            .field("schema", &self.schema)
            .field("config", &self.config)
            .finish()
    }
}

impl Db {
    pub fn new(driver: impl Driver + 'static, schema: Schema) -> Self {
        Db {
            driver: Box::new(driver),
            schema,
            config: DbConfig::default(),
            validator: Box::new(RuleValidator),
        }
    }

    pub fn with_config(mut self, config: DbConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the built-in rule validator.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Starts a fresh query against a registered entity.
    pub fn table(&self, entity: &str) -> Result<Query<'_>> {
        let entity = self.schema.entity(entity)?;
        Ok(Query::new(self, entity))
    }

    /// Starts a fresh query against an entity descriptor.
    pub fn query<'db>(&'db self, entity: &'db Entity) -> Query<'db> {
        Query::new(self, entity)
    }

    #[inline]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    #[inline]
    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub(crate) fn validator(&self) -> &dyn Validator {
        self.validator.as_ref()
    }

    /// Runs a SELECT and returns its rows.
    pub fn select(&self, sql: &SQL) -> Result<Vec<Row>> {
        let (text, params) = sql.build(self.dialect());
        fluentql_core::fluent_trace_query!(&text, params.len());
        self.diagnose(&text, &params);

        let started = Instant::now();
        let rows = self.driver.select(&text, &params)?;
        self.report_slow(&text, started);
        Ok(rows)
    }

    /// Runs a statement and returns the number of affected rows.
    pub fn execute(&self, sql: &SQL) -> Result<u64> {
        let (text, params) = sql.build(self.dialect());
        fluentql_core::fluent_trace_query!(&text, params.len());

        let started = Instant::now();
        let affected = self.driver.execute(&text, &params)?;
        self.report_slow(&text, started);
        Ok(affected)
    }

    pub fn last_insert_id(&self) -> Value {
        self.driver.last_insert_id()
    }

    fn report_slow(&self, sql: &str, started: Instant) {
        if !self.config.debug {
            return;
        }
        let elapsed = started.elapsed();
        if elapsed.as_millis() >= u128::from(self.config.slow_query_ms) {
            fluentql_core::fluent_warn!(
                sql = %sql,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow query"
            );
        }
    }

    /// Logs full table scans reported by the driver's plan explainer.
    fn diagnose(&self, sql: &str, params: &[Value]) {
        if !self.config.debug {
            return;
        }
        match self.driver.explain(sql, params) {
            Ok(plan) => {
                for line in plan.iter().filter(|line| is_full_scan(line)) {
                    fluentql_core::fluent_warn!(sql = %sql, plan = %line, "full table scan");
                }
            }
            Err(_error) => {
                fluentql_core::fluent_debug!(error = %_error, "query plan unavailable");
            }
        }
    }

    /// Opens a transaction that rolls back unless committed.
    pub fn begin(&self) -> Result<TransactionGuard<'_>> {
        if self.driver.in_transaction() {
            return Err(FluentError::ExecutionFailed(
                "a transaction is already open on this connection".into(),
            ));
        }
        self.driver.begin()?;
        fluentql_core::fluent_trace_tx!("begin", self.driver.name());
        Ok(TransactionGuard {
            db: self,
            finished: false,
        })
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on
    /// `Err`.
    pub fn transaction<T>(&self, f: impl FnOnce(&Db) -> Result<T>) -> Result<T> {
        let guard = self.begin()?;
        let value = f(self)?;
        guard.commit()?;
        Ok(value)
    }
}

fn is_full_scan(line: &str) -> bool {
    let upper = line.to_ascii_uppercase();
    (upper.starts_with("SCAN ") || upper.contains(" SCAN ")) && !upper.contains("USING")
}

/// An open transaction. Dropping it without [`commit`](Self::commit) rolls
/// back, so the transaction never outlives the call that opened it.
#[must_use = "dropping the guard rolls the transaction back"]
pub struct TransactionGuard<'db> {
    db: &'db Db,
    finished: bool,
}

impl TransactionGuard<'_> {
    pub fn commit(mut self) -> Result<()> {
        // A failed commit falls through to the rollback in `drop`.
        self.db.driver.commit()?;
        self.finished = true;
        fluentql_core::fluent_trace_tx!("commit", self.db.driver.name());
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.db.driver.rollback()?;
        fluentql_core::fluent_trace_tx!("rollback", self.db.driver.name());
        Ok(())
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.db.driver.rollback() {
            Ok(()) => {
                fluentql_core::fluent_trace_tx!("rollback", self.db.driver.name());
            }
            Err(_error) => {
                fluentql_core::fluent_error!(error = %_error, "rollback failed");
            }
        }
    }
}
