//! Entity descriptors and the relation registry.

use std::fmt;

use compact_str::CompactString;
use hashbrown::HashMap;
use serde_json::Value as JsonValue;

use crate::error::{FluentError, Result};
use crate::validation::RuleSet;
use fluentql_core::Row;

/// Computed attribute added to every formatted row.
pub type Append = fn(&Row) -> JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    HasMany,
    HasOne,
    BelongsTo,
}

impl RelationKind {
    /// Whether a merged relation holds a list rather than a single row.
    pub const fn is_many(&self) -> bool {
        matches!(self, RelationKind::HasMany)
    }
}

/// A declared relation, as registered on its owning entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    pub kind: RelationKind,
    /// Name of the related entity in the [`Schema`]
    pub related: CompactString,
    /// Column holding the reference: on the related table for
    /// `HasMany`/`HasOne`, on the owning table for `BelongsTo`
    pub foreign_key: CompactString,
    /// Referenced column: the owner's local key for `HasMany`/`HasOne`, the
    /// related owner key for `BelongsTo`. Defaults to the primary key of the
    /// entity that holds it.
    pub local_key: Option<CompactString>,
}

impl RelationDef {
    fn new(kind: RelationKind, related: &str, foreign_key: &str) -> Self {
        RelationDef {
            kind,
            related: related.into(),
            foreign_key: foreign_key.into(),
            local_key: None,
        }
    }

    pub fn has_many(related: &str, foreign_key: &str) -> Self {
        Self::new(RelationKind::HasMany, related, foreign_key)
    }

    pub fn has_one(related: &str, foreign_key: &str) -> Self {
        Self::new(RelationKind::HasOne, related, foreign_key)
    }

    pub fn belongs_to(related: &str, foreign_key: &str) -> Self {
        Self::new(RelationKind::BelongsTo, related, foreign_key)
    }

    /// Overrides the local key (or owner key for `BelongsTo`).
    pub fn local_key(mut self, column: &str) -> Self {
        self.local_key = Some(column.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamps {
    pub created_at: CompactString,
    pub updated_at: CompactString,
}

impl Default for Timestamps {
    fn default() -> Self {
        Timestamps {
            created_at: "created_at".into(),
            updated_at: "updated_at".into(),
        }
    }
}

/// Table-level metadata the engine needs to build and resolve queries.
///
/// ```ignore
/// let orders = Entity::new("orders")
///     .fillable(["customer_id", "status", "total"])
///     .soft_deletes()
///     .has_many("items", "items", "order_id")
///     .belongs_to("customer", "customers", "customer_id");
/// ```
#[derive(Clone)]
pub struct Entity {
    pub name: CompactString,
    pub table: CompactString,
    pub primary_key: CompactString,
    pub fillable: Vec<CompactString>,
    pub protected: Vec<CompactString>,
    /// Deleted-at column when the entity soft deletes
    pub soft_delete: Option<CompactString>,
    pub timestamps: Option<Timestamps>,
    pub hidden: Vec<CompactString>,
    pub appends: Vec<(CompactString, Append)>,
    pub rules: RuleSet,
    pub insert_rules: Option<RuleSet>,
    pub update_rules: Option<RuleSet>,
    /// Columns searched by `paginate`; all table columns when empty
    pub paginate_columns: Vec<CompactString>,
    relations: HashMap<CompactString, RelationDef>,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("soft_delete", &self.soft_delete)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn names<I, S>(items: I) -> Vec<CompactString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().map(|s| CompactString::from(s.as_ref())).collect()
}

impl Entity {
    /// An entity named after its table, keyed by `id`, with timestamps on.
    pub fn new(table: &str) -> Self {
        Entity {
            name: table.into(),
            table: table.into(),
            primary_key: "id".into(),
            fillable: Vec::new(),
            protected: Vec::new(),
            soft_delete: None,
            timestamps: Some(Timestamps::default()),
            hidden: Vec::new(),
            appends: Vec::new(),
            rules: RuleSet::new(),
            insert_rules: None,
            update_rules: None,
            paginate_columns: Vec::new(),
            relations: HashMap::new(),
        }
    }

    /// Registers the entity under a name other than its table.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.into();
        self
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn fillable<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, columns: I) -> Self {
        self.fillable = names(columns);
        self
    }

    pub fn protected<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, columns: I) -> Self {
        self.protected = names(columns);
        self
    }

    /// Soft deletes through a `deleted_at` column.
    pub fn soft_deletes(self) -> Self {
        self.soft_deletes_column("deleted_at")
    }

    pub fn soft_deletes_column(mut self, column: &str) -> Self {
        self.soft_delete = Some(column.into());
        self
    }

    pub fn timestamps(mut self, created_at: &str, updated_at: &str) -> Self {
        self.timestamps = Some(Timestamps {
            created_at: created_at.into(),
            updated_at: updated_at.into(),
        });
        self
    }

    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = None;
        self
    }

    pub fn hidden<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, columns: I) -> Self {
        self.hidden = names(columns);
        self
    }

    pub fn append(mut self, name: &str, compute: Append) -> Self {
        self.appends.push((name.into(), compute));
        self
    }

    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn insert_rules(mut self, rules: RuleSet) -> Self {
        self.insert_rules = Some(rules);
        self
    }

    pub fn update_rules(mut self, rules: RuleSet) -> Self {
        self.update_rules = Some(rules);
        self
    }

    pub fn paginate_columns<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, columns: I) -> Self {
        self.paginate_columns = names(columns);
        self
    }

    /// Declares a named relation. A second declaration under the same name
    /// replaces the first.
    pub fn relation(mut self, name: &str, def: RelationDef) -> Self {
        self.relations.insert(name.into(), def);
        self
    }

    pub fn has_many(self, name: &str, related: &str, foreign_key: &str) -> Self {
        self.relation(name, RelationDef::has_many(related, foreign_key))
    }

    pub fn has_one(self, name: &str, related: &str, foreign_key: &str) -> Self {
        self.relation(name, RelationDef::has_one(related, foreign_key))
    }

    pub fn belongs_to(self, name: &str, related: &str, foreign_key: &str) -> Self {
        self.relation(name, RelationDef::belongs_to(related, foreign_key))
    }

    pub fn relation_def(&self, name: &str) -> Option<&RelationDef> {
        self.relations.get(name)
    }

    /// Keeps only fillable columns, then drops protected ones. `include`
    /// is always kept, even when protected.
    pub fn filter_data(&self, mut data: Row, include: Option<&str>) -> Row {
        if !self.fillable.is_empty() {
            data.retain(|column, _| {
                include == Some(column.as_str()) || self.fillable.iter().any(|f| f == column)
            });
        }
        if !self.protected.is_empty() {
            data.retain(|column, _| {
                include == Some(column.as_str()) || !self.protected.iter().any(|p| p == column)
            });
        }
        data
    }
}

/// A relation with its keys resolved against both entities.
#[derive(Debug, Clone, Copy)]
pub struct Relation<'s> {
    pub name: &'s str,
    pub kind: RelationKind,
    pub owner: &'s Entity,
    pub related: &'s Entity,
    pub foreign_key: &'s str,
    pub local_key: &'s str,
}

impl Relation<'_> {
    /// Column on the owner row whose value is matched.
    pub fn owner_column(&self) -> &str {
        match self.kind {
            RelationKind::HasMany | RelationKind::HasOne => self.local_key,
            RelationKind::BelongsTo => self.foreign_key,
        }
    }

    /// Column on the related row that must equal the owner column.
    pub fn related_column(&self) -> &str {
        match self.kind {
            RelationKind::HasMany | RelationKind::HasOne => self.foreign_key,
            RelationKind::BelongsTo => self.local_key,
        }
    }
}

/// Registry of entities keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: HashMap<CompactString, Entity>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, entity: Entity) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    pub fn entity(&self, name: &str) -> Result<&Entity> {
        self.entities
            .get(name)
            .ok_or_else(|| FluentError::EntityNotFound(name.to_owned()))
    }

    /// Looks up `name` on `owner` and resolves its keys.
    pub fn relation<'s>(&'s self, owner: &'s Entity, name: &str) -> Result<Relation<'s>> {
        let (name, def) = owner
            .relations
            .get_key_value(name)
            .ok_or_else(|| FluentError::relation_not_found(owner.name.as_str(), name))?;
        let related = self.entity(&def.related).map_err(|_| {
            FluentError::relation_not_found(owner.name.as_str(), format!("{name} -> {}", def.related))
        })?;
        let local_key = match (&def.local_key, def.kind) {
            (Some(column), _) => column.as_str(),
            (None, RelationKind::HasMany | RelationKind::HasOne) => owner.primary_key.as_str(),
            (None, RelationKind::BelongsTo) => related.primary_key.as_str(),
        };
        Ok(Relation {
            name: name.as_str(),
            kind: def.kind,
            owner,
            related,
            foreign_key: def.foreign_key.as_str(),
            local_key,
        })
    }

    /// Resolves every segment of a dotted path, starting at `root`.
    pub fn relation_path<'s>(&'s self, root: &'s Entity, path: &str) -> Result<Vec<Relation<'s>>> {
        let mut owner = root;
        let mut relations = Vec::new();
        for segment in path.split('.') {
            let relation = self.relation(owner, segment)?;
            owner = relation.related;
            relations.push(relation);
        }
        Ok(relations)
    }
}
