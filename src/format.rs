//! Output formatting: computed attributes and hidden columns.

use serde_json::Value as JsonValue;

use fluentql_core::Row;

use crate::entity::Entity;

/// Adds the entity's computed attributes to each row, then strips hidden
/// columns at every nesting depth unless `show_hidden` is set.
pub(crate) fn format_rows(entity: &Entity, rows: Vec<Row>, show_hidden: bool) -> Vec<Row> {
    if entity.appends.is_empty() && (show_hidden || entity.hidden.is_empty()) {
        return rows;
    }
    rows.into_iter()
        .map(|mut row| {
            for (name, compute) in &entity.appends {
                let value = compute(&row);
                row.insert(name.to_string(), value);
            }
            if !show_hidden {
                strip_hidden(&mut row, entity);
            }
            row
        })
        .collect()
}

fn strip_hidden(row: &mut Row, entity: &Entity) {
    row.retain(|key, _| !entity.hidden.iter().any(|hidden| hidden == key));
    for value in row.values_mut() {
        strip_value(value, entity);
    }
}

fn strip_value(value: &mut JsonValue, entity: &Entity) {
    match value {
        JsonValue::Object(nested) => strip_hidden(nested, entity),
        JsonValue::Array(items) => items.iter_mut().for_each(|item| strip_value(item, entity)),
        _ => {}
    }
}
