//! Field validation run before every write.

use std::collections::BTreeMap;

use compact_str::CompactString;
use serde_json::Value as JsonValue;

use crate::error::{FieldErrors, FluentError, Result};
use fluentql_core::Row;

/// Rules keyed by field name.
pub type RuleSet = BTreeMap<CompactString, Vec<Rule>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Required,
    Numeric,
    Integer,
    MinLength(usize),
    MaxLength(usize),
    ValidEmail,
    InList(Vec<String>),
}

impl Rule {
    /// Parses a pipe separated rule string such as
    /// `required|min_length[3]|in_list[a,b]`.
    pub fn parse_list(input: &str) -> Result<Vec<Rule>> {
        input
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Rule::parse)
            .collect()
    }

    pub fn parse(input: &str) -> Result<Rule> {
        let (name, arg) = match input.split_once('[') {
            Some((name, rest)) => (name, rest.strip_suffix(']')),
            None => (input, None),
        };
        let length = |arg: Option<&str>| -> Result<usize> {
            arg.and_then(|a| a.trim().parse().ok())
                .ok_or_else(|| FluentError::InvalidArgument(format!("rule `{input}` needs a length")))
        };
        Ok(match name {
            "required" => Rule::Required,
            "numeric" => Rule::Numeric,
            "integer" => Rule::Integer,
            "valid_email" => Rule::ValidEmail,
            "min_length" => Rule::MinLength(length(arg)?),
            "max_length" => Rule::MaxLength(length(arg)?),
            "in_list" => Rule::InList(
                arg.unwrap_or_default()
                    .split(',')
                    .map(|s| s.trim().to_owned())
                    .collect(),
            ),
            _ => return Err(FluentError::InvalidArgument(format!("unknown rule `{input}`"))),
        })
    }

    fn check(&self, value: &JsonValue) -> bool {
        let text = match value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        };
        match self {
            Rule::Required => !text.trim().is_empty(),
            // Optional rules pass on empty input; `required` covers presence.
            _ if text.is_empty() => true,
            Rule::Numeric => text.trim().parse::<f64>().is_ok(),
            Rule::Integer => text.trim().parse::<i64>().is_ok(),
            Rule::MinLength(n) => text.chars().count() >= *n,
            Rule::MaxLength(n) => text.chars().count() <= *n,
            Rule::ValidEmail => text
                .split_once('@')
                .is_some_and(|(user, host)| !user.is_empty() && host.contains('.') && !host.starts_with('.')),
            Rule::InList(options) => options.iter().any(|o| *o == text),
        }
    }

    fn message(&self, field: &str, locale: &str) -> String {
        match (locale, self) {
            ("ms", Rule::Required) => format!("Medan {field} diperlukan."),
            ("ms", Rule::Numeric) => format!("Medan {field} mesti mengandungi nombor sahaja."),
            ("ms", Rule::Integer) => format!("Medan {field} mesti mengandungi integer."),
            ("ms", Rule::MinLength(n)) => format!("Medan {field} mesti sekurang-kurangnya {n} aksara."),
            ("ms", Rule::MaxLength(n)) => format!("Medan {field} tidak boleh melebihi {n} aksara."),
            ("ms", Rule::ValidEmail) => format!("Medan {field} mesti mengandungi alamat e-mel yang sah."),
            ("ms", Rule::InList(options)) => {
                format!("Medan {field} mesti salah satu daripada: {}.", options.join(", "))
            }
            (_, Rule::Required) => format!("The {field} field is required."),
            (_, Rule::Numeric) => format!("The {field} field must contain only numbers."),
            (_, Rule::Integer) => format!("The {field} field must contain an integer."),
            (_, Rule::MinLength(n)) => format!("The {field} field must be at least {n} characters in length."),
            (_, Rule::MaxLength(n)) => format!("The {field} field cannot exceed {n} characters in length."),
            (_, Rule::ValidEmail) => format!("The {field} field must contain a valid email address."),
            (_, Rule::InList(options)) => {
                format!("The {field} field must be one of: {}.", options.join(", "))
            }
        }
    }
}

/// Builds a [`RuleSet`] from `(field, "rule|rule")` pairs.
pub fn rules<I, F>(pairs: I) -> Result<RuleSet>
where
    I: IntoIterator<Item = (F, &'static str)>,
    F: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(field, spec)| Ok((CompactString::from(field.as_ref()), Rule::parse_list(spec)?)))
        .collect()
}

/// Accepts a rule set plus a record and reports failing fields.
pub trait Validator {
    fn validate(&self, rules: &RuleSet, record: &Row, locale: &str) -> std::result::Result<(), FieldErrors>;
}

/// The built-in validator.
///
/// Only fields present in the record are checked, so partial updates are
/// not rejected for columns they do not touch. The first failing rule of
/// each field produces its message.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl Validator for RuleValidator {
    fn validate(&self, rules: &RuleSet, record: &Row, locale: &str) -> std::result::Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for (field, field_rules) in rules {
            let Some(value) = record.get(field.as_str()) else {
                continue;
            };
            if let Some(rule) = field_rules.iter().find(|rule| !rule.check(value)) {
                errors.insert(field.to_string(), rule.message(field, locale));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
