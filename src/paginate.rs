//! Page-number pagination with free-text search and field filters.

use serde::Serialize;
use serde_json::Value as JsonValue;

use fluentql_core::{Condition, Direction, Row, SQL, Value};

use crate::error::{FluentError, Result};
use crate::query::Query;

/// How [`Filter`] values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    /// `column = value`
    #[default]
    Exact,
    /// `column LIKE 'value%'`
    Prefix,
    /// `column LIKE '%value%'`
    Anywhere,
}

/// Field filters AND-ed onto a paginated query. Null and empty-string
/// values are ignored; zero is kept.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub match_type: MatchType,
    pub fields: Row,
}

impl Filter {
    pub fn new(match_type: MatchType) -> Self {
        Filter {
            match_type,
            fields: Row::new(),
        }
    }

    pub fn field(mut self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.fields.insert(column.to_owned(), value.into());
        self
    }

    fn active(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.fields.iter().filter(|(_, value)| match value {
            JsonValue::Null => false,
            JsonValue::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    }
}

/// One page of results and its position among the others.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Rows before search and filters
    pub records_total: u64,
    /// Rows after search and filters
    pub records_filtered: u64,
    pub data: Vec<Row>,
    pub current_page: u64,
    pub next_page: Option<u64>,
    pub previous_page: Option<u64>,
    pub last_page: u64,
    /// Set when `current_page` is past the last page
    pub error: Option<String>,
}

fn text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<'db> Query<'db> {
    /// ANDs the group built by `f` onto the whole query, whatever OR chain
    /// the caller's conditions hold.
    fn narrow<F>(mut self, f: F) -> Result<Self>
    where
        F: FnOnce(Query<'db>) -> Result<Query<'db>>,
    {
        let nested = f(self.fresh())?;
        self.state.guards.push(Condition::Group {
            conditions: nested.state.wheres,
            negated: false,
        });
        Ok(self)
    }

    /// Runs one page of the query.
    ///
    /// `search` is matched with `LIKE '%search%'` against the entity's
    /// paginate columns, or every table column when none are configured.
    /// Pages are 1-based; page 0 is read as page 1.
    ///
    /// ```ignore
    /// let page = db.table("customers")?
    ///     .paginate(20, 2, Some("ana"), Some(&Filter::new(MatchType::Exact).field("active", 1)))?;
    /// ```
    pub fn paginate(
        mut self,
        per_page: u64,
        page: u64,
        search: Option<&str>,
        filter: Option<&Filter>,
    ) -> Result<Page> {
        if per_page == 0 {
            return Err(FluentError::InvalidArgument("per_page must be positive".into()));
        }
        let page = page.max(1);
        let records_total = self.count()?;

        if let Some(filter) = filter
            && filter.active().next().is_some()
        {
            self = self.narrow(|mut group| {
                for (column, value) in filter.active() {
                    let column = group.state.column(column);
                    group = match filter.match_type {
                        MatchType::Exact => group.where_eq(&column, Value::from_json(value)),
                        MatchType::Prefix => group.where_like(&column, &format!("{}%", text(value))),
                        MatchType::Anywhere => group.where_like(&column, &format!("%{}%", text(value))),
                    };
                }
                Ok(group)
            })?;
        }

        let search = search.map(str::trim).unwrap_or_default();
        if !search.is_empty() {
            let columns: Vec<String> = if self.entity.paginate_columns.is_empty() {
                self.db.driver().list_columns(&self.entity.table)?
            } else {
                self.entity.paginate_columns.iter().map(|c| c.to_string()).collect()
            };
            let pattern = format!("%{search}%");
            self = self.narrow(|mut group| {
                for (i, column) in columns.iter().filter(|c| !c.is_empty()).enumerate() {
                    let column = group.state.column(column);
                    group = if i == 0 {
                        group.where_like(&column, &pattern)
                    } else {
                        group.or_where_like(&column, &pattern)
                    };
                }
                Ok(group)
            })?;
        }

        let records_filtered = self.count()?;
        let last_page = records_filtered.div_ceil(per_page);

        // Past the last page nothing can match, and the offset may not fit.
        let data = if page > last_page {
            Vec::new()
        } else {
            if self.state.orders.is_empty() {
                let pk = self.state.column(&self.entity.primary_key);
                self.state.orders.push((SQL::raw(pk), Direction::Asc));
            }
            self.limit(per_page).offset((page - 1) * per_page).get()?
        };

        Ok(Page {
            records_total,
            records_filtered,
            data,
            current_page: page,
            next_page: (page < last_page).then_some(page + 1),
            previous_page: (page > 1).then(|| page - 1),
            last_page,
            error: (page > last_page)
                .then(|| format!("Current page ({page}) is more than total pages ({last_page})")),
        })
    }
}
