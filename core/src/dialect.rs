//! SQL dialect differences the engine has to render around.

use std::borrow::Cow;

use serde::Deserialize;

/// The database family a driver speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    SQLite,
    MySQL,
    PostgreSQL,
}

/// Date/time part extracted by the `where_date`-family helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Date,
    Time,
    Year,
    Month,
    Day,
}

impl Dialect {
    /// Renders a placeholder for this dialect with the given 1-based index.
    ///
    /// - PostgreSQL: `$1`, `$2`, `$3`
    /// - SQLite/MySQL: `?`
    #[inline]
    pub fn render_placeholder(&self, index: usize) -> Cow<'static, str> {
        match self {
            Dialect::PostgreSQL => Cow::Owned(format!("${index}")),
            Dialect::SQLite | Dialect::MySQL => Cow::Borrowed("?"),
        }
    }

    /// Wraps `column` in the scalar function that extracts `part`.
    pub fn date_part(&self, part: DatePart, column: &str) -> String {
        match (self, part) {
            (Dialect::MySQL, DatePart::Date) => format!("DATE({column})"),
            (Dialect::MySQL, DatePart::Time) => format!("TIME({column})"),
            (Dialect::MySQL, DatePart::Year) => format!("YEAR({column})"),
            (Dialect::MySQL, DatePart::Month) => format!("MONTH({column})"),
            (Dialect::MySQL, DatePart::Day) => format!("DAY({column})"),
            (Dialect::SQLite, DatePart::Date) => format!("date({column})"),
            (Dialect::SQLite, DatePart::Time) => format!("time({column})"),
            (Dialect::SQLite, DatePart::Year) => {
                format!("CAST(strftime('%Y', {column}) AS INTEGER)")
            }
            (Dialect::SQLite, DatePart::Month) => {
                format!("CAST(strftime('%m', {column}) AS INTEGER)")
            }
            (Dialect::SQLite, DatePart::Day) => {
                format!("CAST(strftime('%d', {column}) AS INTEGER)")
            }
            (Dialect::PostgreSQL, DatePart::Date) => format!("CAST({column} AS DATE)"),
            (Dialect::PostgreSQL, DatePart::Time) => format!("CAST({column} AS TIME)"),
            (Dialect::PostgreSQL, DatePart::Year) => format!("EXTRACT(YEAR FROM {column})"),
            (Dialect::PostgreSQL, DatePart::Month) => format!("EXTRACT(MONTH FROM {column})"),
            (Dialect::PostgreSQL, DatePart::Day) => format!("EXTRACT(DAY FROM {column})"),
        }
    }

    /// Predicate testing whether the JSON document in `column` contains the
    /// bound JSON value. The value is rendered as a single placeholder.
    pub fn json_contains(&self, column: &str) -> (String, String) {
        match self {
            Dialect::MySQL => (format!("JSON_CONTAINS({column}, "), ")".to_owned()),
            Dialect::PostgreSQL => (format!("CAST({column} AS JSONB) @> CAST("), " AS JSONB)".to_owned()),
            Dialect::SQLite => (
                format!("EXISTS (SELECT 1 FROM json_each({column}) WHERE json_each.value = json_extract("),
                ", '$'))".to_owned(),
            ),
        }
    }

    /// LIMIT value meaning "no limit", needed when only OFFSET is set.
    pub fn unbounded_limit(&self) -> Option<&'static str> {
        match self {
            Dialect::SQLite => Some("-1"),
            Dialect::MySQL => Some("18446744073709551615"),
            Dialect::PostgreSQL => None,
        }
    }
}
