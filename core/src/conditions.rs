//! Condition trees shared by WHERE, HAVING and JOIN ON clauses.

use compact_str::CompactString;

use crate::{
    DatePart, FluentError, Operator, Result, Value,
    sql::{SQL, Token},
};

/// How a clause attaches to the clause before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boolean {
    #[default]
    And,
    Or,
}

impl Boolean {
    const fn token(self) -> Token {
        match self {
            Boolean::And => Token::AND,
            Boolean::Or => Token::OR,
        }
    }
}

/// A single predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column op ?`
    Compare {
        column: CompactString,
        op: Operator,
        value: Value,
    },
    /// `first op second`, both sides column references
    Column {
        first: CompactString,
        op: Operator,
        second: CompactString,
    },
    /// `column IS [NOT] NULL`
    Null { column: CompactString, negated: bool },
    /// `column [NOT] IN (?, ...)`
    In {
        column: CompactString,
        values: Vec<Value>,
        negated: bool,
    },
    /// `column [NOT] BETWEEN ? AND ?`
    Between {
        column: CompactString,
        low: Value,
        high: Value,
        negated: bool,
    },
    /// `[NOT] EXISTS (subquery)`
    Exists { query: SQL, negated: bool },
    /// `[NOT] (nested)`
    Group {
        conditions: Conditions,
        negated: bool,
    },
    /// Caller-provided SQL with its own bindings
    Raw(SQL),
}

impl Condition {
    pub fn to_sql(&self) -> SQL {
        match self {
            Condition::Compare { column, op, value } => {
                let mut sql = SQL::raw(column);
                for token in op.tokens() {
                    sql.push_mut(*token);
                }
                sql.push(value.clone())
            }
            Condition::Column { first, op, second } => {
                let mut sql = SQL::raw(first);
                for token in op.tokens() {
                    sql.push_mut(*token);
                }
                sql.append_raw(second)
            }
            Condition::Null { column, negated } => {
                let sql = SQL::raw(column).push(Token::IS);
                let sql = if *negated { sql.push(Token::NOT) } else { sql };
                sql.push(Token::NULL)
            }
            Condition::In {
                column,
                values,
                negated,
            } => {
                // An empty list matches nothing, and its negation everything.
                if values.is_empty() {
                    return SQL::raw(if *negated { "1 = 1" } else { "0 = 1" });
                }
                let sql = SQL::raw(column);
                let sql = if *negated { sql.push(Token::NOT) } else { sql };
                sql.push(Token::IN)
                    .append(SQL::parameters(values.iter().cloned()).subquery())
            }
            Condition::Between {
                column,
                low,
                high,
                negated,
            } => {
                let sql = SQL::raw(column);
                let sql = if *negated { sql.push(Token::NOT) } else { sql };
                sql.push(Token::BETWEEN)
                    .push(low.clone())
                    .push(Token::AND)
                    .push(high.clone())
            }
            Condition::Exists { query, negated } => {
                let sql = if *negated {
                    SQL::token(Token::NOT).push(Token::EXISTS)
                } else {
                    SQL::token(Token::EXISTS)
                };
                sql.append(query.clone().subquery())
            }
            Condition::Group {
                conditions,
                negated,
            } => {
                let inner = conditions.to_sql();
                if inner.is_empty() {
                    return SQL::empty();
                }
                if *negated {
                    SQL::token(Token::NOT).append(inner.subquery())
                } else {
                    inner.subquery()
                }
            }
            Condition::Raw(sql) => sql.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    boolean: Boolean,
    condition: Condition,
}

/// An ordered list of predicates joined by AND/OR.
///
/// The boolean of the first clause is never rendered, so an `or_where`
/// issued first behaves like a plain `where`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    clauses: Vec<Clause>,
}

impl Conditions {
    pub const fn new() -> Self {
        Conditions {
            clauses: Vec::new(),
        }
    }

    pub fn push(&mut self, boolean: Boolean, condition: Condition) {
        self.clauses.push(Clause { boolean, condition });
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.push(Boolean::And, condition);
        self
    }

    pub fn or(mut self, condition: Condition) -> Self {
        self.push(Boolean::Or, condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// True when any top-level clause attaches with OR.
    pub fn has_or(&self) -> bool {
        self.clauses.iter().skip(1).any(|c| c.boolean == Boolean::Or)
    }

    pub fn extend(&mut self, other: Conditions) {
        self.clauses.extend(other.clauses);
    }

    pub fn to_sql(&self) -> SQL {
        let mut sql = SQL::empty();
        let mut first = true;
        for clause in &self.clauses {
            let fragment = clause.condition.to_sql();
            if fragment.is_empty() {
                continue;
            }
            if !first {
                sql.push_mut(clause.boolean.token());
            }
            first = false;
            sql.append_mut(fragment);
        }
        sql
    }
}

/// Checks a date-part argument before it is bound.
///
/// Days must fall in 1..=31, months in 1..=12 and years must be written
/// with exactly four digits. Dates and times pass through untouched.
pub fn validate_date_part(part: DatePart, value: &Value) -> Result<Value> {
    let (low, high) = match part {
        DatePart::Date | DatePart::Time => return Ok(value.clone()),
        DatePart::Day => (1, 31),
        DatePart::Month => (1, 12),
        DatePart::Year => {
            let digits = match value {
                Value::Integer(i) => i.to_string(),
                Value::Text(s) => s.trim().to_owned(),
                other => {
                    return Err(FluentError::InvalidArgument(format!(
                        "year must be a four digit number, got {other}"
                    )));
                }
            };
            if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(FluentError::InvalidArgument(format!(
                    "year must be a four digit number, got {digits}"
                )));
            }
            return digits
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| FluentError::InvalidArgument(e.to_string()));
        }
    };

    let number = match value {
        Value::Integer(i) => Some(*i),
        Value::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if (low..=high).contains(&n) => Ok(Value::Integer(n)),
        _ => Err(FluentError::InvalidArgument(format!(
            "{part:?} must be between {low} and {high}, got {value}"
        ))),
    }
}
