//! # fluentql
//!
//! A fluent data-access layer over a single synchronous connection: chainable
//! conditions, batched eager loading of declared relations, relation
//! existence filters and aggregates, and bounded-memory traversal that picks
//! keyset or offset paging per query.
//!
//! ## Quick Start
//!
//! ```rust
//! use fluentql::{Db, Entity, Schema};
//! use fluentql::sqlite::SqliteDriver;
//!
//! # fn main() -> fluentql::Result<()> {
//! let driver = SqliteDriver::open_in_memory()?;
//! driver.conn().execute_batch(
//!     "CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT);
//!      CREATE TABLE items (id INTEGER PRIMARY KEY, order_id INTEGER, qty INTEGER);
//!      INSERT INTO orders (status) VALUES ('paid');
//!      INSERT INTO items (order_id, qty) VALUES (1, 2), (1, 5);",
//! )?;
//!
//! let schema = Schema::new()
//!     .register(Entity::new("orders").without_timestamps().has_many("items", "items", "order_id"))
//!     .register(Entity::new("items").without_timestamps());
//! let db = Db::new(driver, schema);
//!
//! let orders = db.table("orders")?.with("items").where_eq("status", "paid").get()?;
//! assert_eq!(orders[0]["items"].as_array().map(Vec::len), Some(2));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module         | Contents                                                   |
//! |----------------|------------------------------------------------------------|
//! | [`query`]      | The chainable [`Query`] facade and read terminals          |
//! | [`relations`]  | `with`, `where_has`, `with_count` and friends              |
//! | [`iterate`]    | `chunk`, `cursor`, `lazy` and strategy selection           |
//! | [`mutation`]   | create, patch, destroy, restore and their batch forms      |
//! | [`paginate`]   | page-number pagination with search and filters             |
//! | [`sqlite`]     | the rusqlite driver (feature `rusqlite`)                   |

pub mod collection;
pub mod config;
pub mod db;
pub mod entity;
mod format;
pub mod iterate;
pub mod mutation;
pub mod paginate;
pub mod query;
pub mod relations;
#[cfg(feature = "rusqlite")]
pub mod sqlite;
pub mod validation;

/// Error types
pub mod error {
    pub use fluentql_core::error::*;
}

/// Result type for fluentql operations
pub use fluentql_core::Result;

/// Core building blocks re-exported from `fluentql-core`.
pub mod core {
    pub use fluentql_core::{
        Boolean, Condition, Conditions, DatePart, Dialect, Direction, Driver, IndexCatalog,
        IndexHint, Join, JoinType, Operator, Row, SQL, SQLChunk, SelectQuery, Statement, Token,
        TrashedMode, Value, key_of,
    };
}

pub use collection::Comparison;
pub use config::DbConfig;
pub use db::{Db, TransactionGuard};
pub use entity::{Entity, RelationDef, RelationKind, Schema, Timestamps};
pub use error::{FieldErrors, FluentError};
pub use fluentql_core::{Dialect, Direction, Driver, JoinType, Row, Statement, Value};
pub use iterate::{Cursor, LazySequence, Marker, PageSource, Strategy};
pub use mutation::{Action, MutationResult};
pub use paginate::{Filter, MatchType, Page};
pub use query::{Aggregate, Query, Scope, scope};
pub use validation::{Rule, RuleSet, RuleValidator, Validator};
