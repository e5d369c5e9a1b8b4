pub mod conditions;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod join;
pub mod operator;
pub mod query;
pub mod sql;
pub mod tracing;
pub mod value;

// Re-export key types and traits
pub use conditions::{Boolean, Condition, Conditions, validate_date_part};
pub use dialect::{DatePart, Dialect};
pub use driver::{Driver, IndexCatalog};
pub use error::{FieldErrors, FluentError, Result};
pub use join::{Join, JoinType};
pub use operator::{Operator, OperatorCache};
pub use query::{Direction, IndexHint, SelectQuery, TrashedMode, insert_sql};
pub use sql::{SQL, SQLChunk, Statement, Token};
pub use value::{Row, Value, key_of};
