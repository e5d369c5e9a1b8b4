//! Batched eager loading.
//!
//! Each relation level issues one query per batch of distinct keys, never one
//! per row. Nested paths load the deeper levels against the related rows
//! before they are merged into their owners.

use compact_str::CompactString;
use hashbrown::{HashMap, HashSet};
use serde_json::Value as JsonValue;

use fluentql_core::{Row, Value, key_of};

use crate::db::Db;
use crate::entity::{Entity, Relation};
use crate::error::Result;
use crate::query::{EagerLoad, Query, Scope};

/// One relation name in the eager-load tree.
struct Node<'db> {
    name: CompactString,
    scope: Option<Scope<'db>>,
    columns: Option<Vec<CompactString>>,
    children: Vec<Node<'db>>,
}

impl Node<'_> {
    fn new(name: &str) -> Self {
        Node {
            name: name.into(),
            scope: None,
            columns: None,
            children: Vec::new(),
        }
    }
}

/// Folds dotted paths into a tree so shared prefixes load once.
fn tree<'db>(requests: &[EagerLoad<'db>]) -> Vec<Node<'db>> {
    let mut roots: Vec<Node<'db>> = Vec::new();
    for request in requests {
        let segments: Vec<&str> = request.path.split('.').collect();
        let mut level = &mut roots;
        for (i, segment) in segments.iter().enumerate() {
            let position = match level.iter().position(|node| node.name == *segment) {
                Some(position) => position,
                None => {
                    level.push(Node::new(segment));
                    level.len() - 1
                }
            };
            let node = &mut level[position];
            if i + 1 == segments.len() {
                if request.scope.is_some() {
                    node.scope = request.scope.clone();
                }
                if request.columns.is_some() {
                    node.columns = request.columns.clone();
                }
            }
            level = &mut node.children;
        }
    }
    roots
}

/// Loads `requests` into `rows`, failing on the first resolution or
/// driver error.
pub(crate) fn load<'db>(
    db: &'db Db,
    owner: &'db Entity,
    requests: &[EagerLoad<'db>],
    rows: &mut [Row],
) -> Result<()> {
    let nodes = tree(requests);
    load_level(db, owner, &nodes, rows.iter_mut().collect())
}

/// Loads `requests` into `rows`. Unless relations are strict, a failure is
/// logged and the rows come back as they were fetched.
pub(crate) fn attach<'db>(
    db: &'db Db,
    owner: &'db Entity,
    requests: &[EagerLoad<'db>],
    rows: Vec<Row>,
) -> Result<Vec<Row>> {
    if requests.is_empty() || rows.is_empty() {
        return Ok(rows);
    }
    let mut loaded = rows.clone();
    match load(db, owner, requests, &mut loaded) {
        Ok(()) => Ok(loaded),
        Err(error) if db.config().strict_relations => Err(error),
        Err(_error) => {
            fluentql_core::fluent_error!(
                entity = %owner.name,
                error = %_error,
                "eager load failed, returning rows without relations"
            );
            Ok(rows)
        }
    }
}

fn load_level<'db>(db: &'db Db, owner: &'db Entity, nodes: &[Node<'db>], mut rows: Vec<&mut Row>) -> Result<()> {
    for node in nodes {
        let relation = db.schema().relation(owner, &node.name)?;
        let owner_column = relation.owner_column();
        let related_column = relation.related_column();

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for row in &rows {
            let Some(value) = row.get(owner_column) else {
                continue;
            };
            if let Some(key) = key_of(value)
                && seen.insert(key)
            {
                keys.push(Value::from_json(value));
            }
        }

        let mut related_rows = Vec::new();
        for batch in keys.chunks(db.config().relation_batch_size.max(1)) {
            related_rows.extend(fetch(db, &relation, node, batch)?);
        }
        fluentql_core::fluent_debug!(
            relation = relation.name,
            keys = keys.len(),
            rows = related_rows.len(),
            "eager load"
        );

        if !node.children.is_empty() {
            load_level(db, relation.related, &node.children, related_rows.iter_mut().collect())?;
        }

        let mut grouped: HashMap<CompactString, Vec<Row>> = HashMap::new();
        for row in related_rows {
            if let Some(key) = row.get(related_column).and_then(key_of) {
                grouped.entry(key).or_default().push(row);
            }
        }

        for row in rows.iter_mut() {
            let matches = row
                .get(owner_column)
                .and_then(key_of)
                .and_then(|key| grouped.get(&key));
            let merged = if relation.kind.is_many() {
                JsonValue::Array(
                    matches
                        .map(|found| found.iter().cloned().map(JsonValue::Object).collect())
                        .unwrap_or_default(),
                )
            } else {
                matches
                    .and_then(|found| found.first())
                    .cloned()
                    .map_or(JsonValue::Null, JsonValue::Object)
            };
            row.insert(relation.name.to_owned(), merged);
        }
    }
    Ok(())
}

/// Fetches the related rows for one batch of owner keys.
fn fetch<'db>(db: &'db Db, relation: &Relation<'db>, node: &Node<'db>, keys: &[Value]) -> Result<Vec<Row>> {
    let related = relation.related;
    let mut query = Query::new(db, related);
    if let Some(scope) = &node.scope {
        query = scope(query)?;
    }
    if let Some(columns) = &node.columns {
        query = query.select(columns);
    }
    if !query.state.columns.is_empty() {
        for forced in [related.primary_key.as_str(), relation.related_column()] {
            if !query.state.selects(forced) {
                query = query.select([forced]);
            }
        }
    }

    let column = query.state.column(relation.related_column());
    query = match keys {
        [key] => query.where_eq(&column, key.clone()),
        _ => query.where_in(&column, keys.iter().cloned()),
    };
    if query.state.orders.is_empty() {
        query = query.order_by(&related.primary_key, "asc");
    }

    let state = query.compiled()?;
    db.select(&state.to_sql())
}
