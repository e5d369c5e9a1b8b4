//! Bounded-memory traversal: chunk callbacks, row cursors and lazy
//! sequences over one paged source.
//!
//! Every traversal picks its paging strategy once. Keyset paging seeks past
//! the last primary key seen and is stable under concurrent inserts. Offset
//! paging is the fallback when the key carries no secondary index; rows
//! written during an offset traversal can be skipped or visited twice.

mod cursor;
mod lazy;

pub use cursor::Cursor;
pub use lazy::{LazyIter, LazySequence};

use std::cell::RefCell;
use std::fmt;
use std::ops::ControlFlow;
use std::time::Instant;

use serde_json::Value as JsonValue;

use fluentql_core::{Condition, Direction, Operator, Row, SQL, Value};

use crate::error::{FluentError, Result};
use crate::query::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `WHERE pk > last ORDER BY pk ASC LIMIT n`
    Keyset,
    /// `LIMIT n OFFSET k`
    Offset,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Keyset => "keyset",
            Strategy::Offset => "offset",
        })
    }
}

/// Position of the next page in a paged source.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Start,
    /// Rows already consumed
    Offset(u64),
    /// Key of the last row seen
    After(JsonValue),
}

/// A source of pages addressed by [`Marker`]s.
pub trait PageSource {
    /// Fetches at most `size` rows starting at `marker`.
    fn fetch(&self, size: u64, marker: &Marker) -> Result<Vec<Row>>;

    /// Marker of the page following `page`, or `None` when the source
    /// cannot continue past it.
    fn advance(&self, marker: &Marker, page: &[Row], size: u64) -> Option<Marker>;
}

/// Pages of a query, fetched with the strategy chosen for it.
#[derive(Debug)]
pub struct QueryPages<'db> {
    query: Query<'db>,
    strategy: Strategy,
    consumer: &'static str,
    /// Key of the last raw row fetched. Read before formatting, which may
    /// strip a hidden primary key.
    last_key: RefCell<Option<JsonValue>>,
}

impl<'db> QueryPages<'db> {
    pub(crate) fn new(query: Query<'db>, consumer: &'static str) -> Result<Self> {
        let strategy = select_strategy(&query)?;
        fluentql_core::fluent_debug!(
            consumer = consumer,
            table = %query.entity.table,
            strategy = %strategy,
            "traversal strategy"
        );
        Ok(QueryPages {
            query,
            strategy,
            consumer,
            last_key: RefCell::new(None),
        })
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn primary_key(&self) -> &str {
        &self.query.entity.primary_key
    }
}

/// Keyset iff the primary key is explicitly selected and carries a
/// secondary index.
pub fn select_strategy(query: &Query<'_>) -> Result<Strategy> {
    let table = &query.entity.table;
    let pk = &query.entity.primary_key;
    if !query.state.selects(pk) {
        return Ok(Strategy::Offset);
    }
    let indexed = query.db.driver().is_column_indexed(table, pk)?;
    fluentql_core::fluent_debug!(table = %table, column = %pk, indexed, "index probe");
    if indexed {
        Ok(Strategy::Keyset)
    } else {
        fluentql_core::fluent_warn!(
            table = %table,
            column = %pk,
            "no secondary index on the key, falling back to offset paging"
        );
        Ok(Strategy::Offset)
    }
}

impl PageSource for QueryPages<'_> {
    fn fetch(&self, size: u64, marker: &Marker) -> Result<Vec<Row>> {
        let started = Instant::now();
        let mut query = self.query.clone();
        let pk = query.state.column(self.primary_key());
        match self.strategy {
            Strategy::Keyset => {
                if let Marker::After(last) = marker {
                    query.state.guards.push(Condition::Compare {
                        column: pk.clone(),
                        op: Operator::Gt,
                        value: Value::from_json(last),
                    });
                }
                query.state.orders = vec![(SQL::raw(pk), Direction::Asc)];
                query.state.offset = None;
            }
            Strategy::Offset => {
                let offset = match marker {
                    Marker::Offset(offset) => *offset,
                    _ => 0,
                };
                if query.state.orders.is_empty() {
                    query.state.orders.push((SQL::raw(pk), Direction::Asc));
                }
                query.state.offset = (offset > 0).then_some(offset);
            }
        }
        query.state.limit = Some(size);

        let rows = query.fetch_rows()?;
        *self.last_key.borrow_mut() = rows
            .last()
            .and_then(|row| row.get(self.primary_key()))
            .filter(|key| !key.is_null())
            .cloned();
        let rows = query.finish(rows)?;
        fluentql_core::fluent_trace_page!(self.consumer, self.strategy, rows.len(), started.elapsed());
        Ok(rows)
    }

    fn advance(&self, marker: &Marker, page: &[Row], size: u64) -> Option<Marker> {
        match self.strategy {
            Strategy::Keyset if page.is_empty() => None,
            Strategy::Keyset => self.last_key.borrow().clone().map(Marker::After),
            Strategy::Offset => {
                let consumed = match marker {
                    Marker::Offset(offset) => *offset,
                    _ => 0,
                };
                Some(Marker::Offset(consumed + size))
            }
        }
    }
}

fn check_size(size: u64) -> Result<u64> {
    if size == 0 {
        return Err(FluentError::InvalidArgument("chunk size must be positive".into()));
    }
    Ok(size)
}

impl<'db> Query<'db> {
    /// The paging strategy a traversal of this query would use.
    pub fn strategy(&self) -> Result<Strategy> {
        select_strategy(self)
    }

    /// Calls `f` with consecutive pages of at most `size` rows until a page
    /// comes back empty or `f` breaks.
    ///
    /// ```ignore
    /// db.table("items")?.select(["id", "qty"]).chunk(200, |page| {
    ///     total += page.len();
    ///     ControlFlow::Continue(())
    /// })?;
    /// ```
    pub fn chunk<F>(self, size: u64, mut f: F) -> Result<()>
    where
        F: FnMut(Vec<Row>) -> ControlFlow<()>,
    {
        let size = check_size(size)?;
        let pages = QueryPages::new(self, "chunk")?;
        let mut marker = Marker::Start;
        loop {
            let page = pages.fetch(size, &marker)?;
            if page.is_empty() {
                return Ok(());
            }
            let next = pages.advance(&marker, &page, size);
            if f(page).is_break() {
                return Ok(());
            }
            match next {
                Some(next) => marker = next,
                None => return Ok(()),
            }
        }
    }

    /// Yields one row at a time, holding at most one page in memory.
    pub fn cursor(self, size: u64) -> Result<Cursor<'db>> {
        let size = check_size(size)?;
        Ok(Cursor::new(QueryPages::new(self, "cursor")?, size))
    }

    /// A restartable lazy sequence over this query's rows.
    pub fn lazy(self, size: u64) -> Result<LazySequence<'db>> {
        let size = check_size(size)?;
        Ok(LazySequence::new(QueryPages::new(self, "lazy")?, size))
    }
}
