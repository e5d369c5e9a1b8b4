//! Compiles a relation path into a sub-query correlated with its root table.

use compact_str::format_compact;

use fluentql_core::{Boolean, Condition, Join, JoinType, Operator, SelectQuery, TrashedMode};

use crate::db::Db;
use crate::entity::{Entity, Relation};
use crate::error::Result;
use crate::query::{Query, Scope};

/// `table.deleted_at IS [NOT] NULL` for a visibility mode.
fn trashed_guard(entity: &Entity, mode: TrashedMode) -> Option<Condition> {
    let column = entity.soft_delete.as_ref()?;
    let negated = match mode {
        TrashedMode::With => return None,
        TrashedMode::Without => false,
        TrashedMode::Only => true,
    };
    Some(Condition::Null {
        column: format_compact!("{}.{}", entity.table, column),
        negated,
    })
}

/// Joins the related table of one path segment. Intermediate segments only
/// join live rows.
fn join_for(relation: &Relation<'_>, join_type: JoinType, live_only: bool) -> Result<Join> {
    let related = relation.related;
    let mut join = Join::new(join_type, related.table.clone()).on(
        &format!("{}.{}", related.table, relation.related_column()),
        "=",
        &format!("{}.{}", relation.owner.table, relation.owner_column()),
    )?;
    if let (true, Some(column)) = (live_only, &related.soft_delete) {
        join = join.where_null(&format!("{}.{}", related.table, column));
    }
    Ok(join)
}

/// Builds `SELECT .. FROM first WHERE first.key = root.key ..` for `path`.
///
/// Intermediate segments are joined with `join_type` and filtered to live
/// rows. The scope runs against the final entity; its conditions and
/// soft-delete mode apply to the final segment only.
pub(crate) fn correlated<'db>(
    db: &'db Db,
    root: &'db Entity,
    path: &str,
    join_type: JoinType,
    scope: Option<&Scope<'db>>,
) -> Result<SelectQuery> {
    let relations = db.schema().relation_path(root, path)?;
    let Some((first, rest)) = relations.split_first() else {
        return Err(crate::error::FluentError::relation_not_found(root.name.as_str(), path));
    };
    let last = rest.last().unwrap_or(first);

    let scoped = match scope {
        Some(scope) => Some(scope(Query::new(db, last.related))?),
        None => None,
    };
    let final_mode = scoped
        .as_ref()
        .map_or(TrashedMode::Without, |q| q.state.trashed);

    let mut sub = SelectQuery::new(first.related.table.clone(), db.dialect());
    sub.soft_delete = first.related.soft_delete.clone();
    sub.trashed = if rest.is_empty() { final_mode } else { TrashedMode::Without };
    sub.guards.push(Condition::Column {
        first: sub.column(first.related_column()),
        op: Operator::Eq,
        second: format_compact!("{}.{}", root.table, first.owner_column()),
    });

    for (i, relation) in rest.iter().enumerate() {
        let is_last = i + 1 == rest.len();
        sub.joins.push(join_for(relation, join_type, !is_last)?);
        if is_last && let Some(guard) = trashed_guard(relation.related, final_mode) {
            sub.guards.push(guard);
        }
    }

    if let Some(scoped) = scoped {
        if !scoped.state.wheres.is_empty() {
            sub.wheres.push(
                Boolean::And,
                Condition::Group {
                    conditions: scoped.state.wheres,
                    negated: false,
                },
            );
        }
        sub.joins.extend(scoped.state.joins);
    }
    Ok(sub)
}
