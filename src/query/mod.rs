//! The chainable query facade.
//!
//! A [`Query`] is a disposable value: every builder method consumes it and
//! returns the next state, and terminal methods consume it for good. Reusing
//! a handle for the next query means starting a new one from [`Db::table`].

mod conditions;
mod fetch;

use std::rc::Rc;

use compact_str::CompactString;

use fluentql_core::{OperatorCache, SelectQuery};

use crate::db::Db;
use crate::entity::Entity;
use crate::error::Result;
use crate::validation::RuleSet;

/// A constraint applied to a related-entity query (eager load, existence
/// filter or aggregate).
pub type Scope<'db> = Rc<dyn Fn(Query<'db>) -> Result<Query<'db>> + 'db>;

/// Wraps a closure as a [`Scope`].
pub fn scope<'db, F>(f: F) -> Scope<'db>
where
    F: Fn(Query<'db>) -> Result<Query<'db>> + 'db,
{
    Rc::new(f)
}

/// An eager-load request, consumed by the next `get`.
#[derive(Clone)]
pub(crate) struct EagerLoad<'db> {
    pub(crate) path: CompactString,
    pub(crate) scope: Option<Scope<'db>>,
    pub(crate) columns: Option<Vec<CompactString>>,
}

/// Aggregate function of a `with_aggregate` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl Aggregate {
    pub const fn name(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Avg => "avg",
        }
    }

    pub const fn sql(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Avg => "AVG",
        }
    }
}

#[derive(Clone)]
pub(crate) struct AggregateRequest<'db> {
    pub(crate) path: CompactString,
    pub(crate) function: Aggregate,
    pub(crate) column: Option<CompactString>,
    pub(crate) alias: CompactString,
    pub(crate) scope: Option<Scope<'db>>,
}

/// A query against one entity.
#[derive(Clone)]
pub struct Query<'db> {
    pub(crate) db: &'db Db,
    pub(crate) entity: &'db Entity,
    pub(crate) state: SelectQuery,
    pub(crate) operators: OperatorCache,
    pub(crate) eager: Vec<EagerLoad<'db>>,
    pub(crate) aggregates: Vec<AggregateRequest<'db>>,
    pub(crate) skip_validation: bool,
    pub(crate) rules_override: Option<RuleSet>,
    pub(crate) show_hidden: bool,
}

impl std::fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("entity", &self.entity.name)
            .field("state", &self.state)
            .field("eager", &self.eager.iter().map(|e| e.path.as_str()).collect::<Vec<_>>())
            .field(
                "aggregates",
                &self.aggregates.iter().map(|a| a.alias.as_str()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl<'db> Query<'db> {
    pub(crate) fn new(db: &'db Db, entity: &'db Entity) -> Self {
        let mut state = SelectQuery::new(entity.table.clone(), db.dialect());
        state.soft_delete = entity.soft_delete.clone();
        Query {
            db,
            entity,
            state,
            operators: OperatorCache::default(),
            eager: Vec::new(),
            aggregates: Vec::new(),
            skip_validation: false,
            rules_override: None,
            show_hidden: false,
        }
    }

    /// A fresh query on the same entity, used for nested groups and
    /// sub-queries.
    pub(crate) fn fresh(&self) -> Query<'db> {
        Query::new(self.db, self.entity)
    }

    pub fn entity(&self) -> &'db Entity {
        self.entity
    }

    pub fn db(&self) -> &'db Db {
        self.db
    }

    /// The accumulated query state.
    pub fn state(&self) -> &SelectQuery {
        &self.state
    }

    /// Bypasses validation for the next mutation.
    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    /// Replaces the entity's rules for the next mutation.
    pub fn validation_rules(mut self, rules: RuleSet) -> Self {
        self.rules_override = Some(rules);
        self
    }

    /// Keeps hidden columns in the output.
    pub fn show_hidden(mut self) -> Self {
        self.show_hidden = true;
        self
    }
}
