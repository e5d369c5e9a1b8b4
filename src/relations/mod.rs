//! Relation-aware query building: eager loads, existence filters and
//! aggregate sub-queries.

pub(crate) mod eager;
pub(crate) mod path;

use compact_str::{CompactString, format_compact};

use fluentql_core::{Boolean, Condition, JoinType, SelectQuery};

use crate::error::Result;
use crate::query::{Aggregate, AggregateRequest, EagerLoad, Query, Scope};

impl<'db> Query<'db> {
    /// Eager loads a relation, or every segment of a dotted path.
    ///
    /// Paths are checked against the schema when the rows are loaded.
    pub fn with(mut self, path: &str) -> Self {
        self.eager.push(EagerLoad {
            path: path.into(),
            scope: None,
            columns: None,
        });
        self
    }

    /// Eager loads `path`, constraining the final segment with `scope`.
    pub fn with_scope(mut self, path: &str, scope: Scope<'db>) -> Self {
        self.eager.push(EagerLoad {
            path: path.into(),
            scope: Some(scope),
            columns: None,
        });
        self
    }

    /// Eager loads `path` fetching only `columns` of the final segment.
    /// The primary key and the join key are always fetched.
    pub fn with_columns<I, S>(mut self, path: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.eager.push(EagerLoad {
            path: path.into(),
            scope: None,
            columns: Some(columns.into_iter().map(|c| CompactString::from(c.as_ref())).collect()),
        });
        self
    }

    fn has(mut self, boolean: Boolean, negated: bool, path: &str, scope: Option<Scope<'db>>) -> Result<Self> {
        let join_type = match boolean {
            Boolean::And => JoinType::Inner,
            Boolean::Or => JoinType::Left,
        };
        let mut sub = path::correlated(self.db, self.entity, path, join_type, scope.as_ref())?;
        sub.select(["1"]);
        self.state.wheres.push(
            boolean,
            Condition::Exists {
                query: sub.to_sql(),
                negated,
            },
        );
        Ok(self)
    }

    /// Keeps rows with at least one related row along `path`.
    pub fn where_has(self, path: &str) -> Result<Self> {
        self.has(Boolean::And, false, path, None)
    }

    /// Keeps rows with at least one related row matching `scope`.
    ///
    /// ```ignore
    /// db.table("orders")?
    ///     .where_has_scope("items", scope(|q| q.r#where("qty", ">", 3)))?
    ///     .get()?;
    /// ```
    pub fn where_has_scope(self, path: &str, scope: Scope<'db>) -> Result<Self> {
        self.has(Boolean::And, false, path, Some(scope))
    }

    pub fn or_where_has(self, path: &str) -> Result<Self> {
        self.has(Boolean::Or, false, path, None)
    }

    pub fn or_where_has_scope(self, path: &str, scope: Scope<'db>) -> Result<Self> {
        self.has(Boolean::Or, false, path, Some(scope))
    }

    pub fn where_doesnt_have(self, path: &str) -> Result<Self> {
        self.has(Boolean::And, true, path, None)
    }

    pub fn where_doesnt_have_scope(self, path: &str, scope: Scope<'db>) -> Result<Self> {
        self.has(Boolean::And, true, path, Some(scope))
    }

    pub fn or_where_doesnt_have(self, path: &str) -> Result<Self> {
        self.has(Boolean::Or, true, path, None)
    }

    pub fn or_where_doesnt_have_scope(self, path: &str, scope: Scope<'db>) -> Result<Self> {
        self.has(Boolean::Or, true, path, Some(scope))
    }

    /// Adds a correlated aggregate column over the rows along `path`.
    ///
    /// The alias defaults to `path_function[_column]` with dots replaced by
    /// underscores. Requesting the same aggregate again replaces it.
    pub fn with_aggregate(
        mut self,
        path: &str,
        function: Aggregate,
        column: Option<&str>,
        alias: Option<&str>,
        scope: Option<Scope<'db>>,
    ) -> Result<Self> {
        // Resolve now so a bad path fails at the call site.
        self.db.schema().relation_path(self.entity, path)?;

        let alias = match alias {
            Some(alias) => CompactString::from(alias),
            None => {
                let base = path.replace('.', "_");
                match column {
                    Some(column) => format_compact!("{base}_{}_{column}", function.name()),
                    None => format_compact!("{base}_{}", function.name()),
                }
            }
        };
        let request = AggregateRequest {
            path: path.into(),
            function,
            column: column.map(CompactString::from),
            alias,
            scope,
        };
        let duplicate = self.aggregates.iter().position(|existing| {
            existing.path == request.path
                && existing.function == request.function
                && existing.column == request.column
                && existing.alias == request.alias
        });
        match duplicate {
            Some(index) => self.aggregates[index] = request,
            None => self.aggregates.push(request),
        }
        Ok(self)
    }

    /// Appends `path_count`, the number of related rows.
    pub fn with_count(self, path: &str) -> Result<Self> {
        self.with_aggregate(path, Aggregate::Count, None, None, None)
    }

    pub fn with_count_scope(self, path: &str, scope: Scope<'db>) -> Result<Self> {
        self.with_aggregate(path, Aggregate::Count, None, None, Some(scope))
    }

    /// Appends `path_sum_column`.
    pub fn with_sum(self, path: &str, column: &str) -> Result<Self> {
        self.with_aggregate(path, Aggregate::Sum, Some(column), None, None)
    }

    pub fn with_min(self, path: &str, column: &str) -> Result<Self> {
        self.with_aggregate(path, Aggregate::Min, Some(column), None, None)
    }

    pub fn with_max(self, path: &str, column: &str) -> Result<Self> {
        self.with_aggregate(path, Aggregate::Max, Some(column), None, None)
    }

    pub fn with_avg(self, path: &str, column: &str) -> Result<Self> {
        self.with_aggregate(path, Aggregate::Avg, Some(column), None, None)
    }

    /// The query state with aggregate sub-queries spliced into the
    /// projection.
    pub(crate) fn compiled(&self) -> Result<SelectQuery> {
        let mut state = self.state.clone();
        for request in &self.aggregates {
            let mut sub = path::correlated(
                self.db,
                self.entity,
                &request.path,
                JoinType::Inner,
                request.scope.as_ref(),
            )?;
            let target = match &request.column {
                Some(column) => {
                    let table = self.final_table(&request.path)?;
                    format!("{table}.{column}")
                }
                None => "*".to_owned(),
            };
            sub.columns
                .push(format_compact!("{}({target})", request.function.sql()));
            state
                .raw_columns
                .push(sub.to_sql().alias(request.alias.clone()));
        }
        Ok(state)
    }

    fn final_table(&self, path: &str) -> Result<CompactString> {
        let relations = self.db.schema().relation_path(self.entity, path)?;
        Ok(relations
            .last()
            .map_or_else(|| self.entity.table.clone(), |r| r.related.table.clone()))
    }
}
