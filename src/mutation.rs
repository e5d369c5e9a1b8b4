//! Writes: create, patch, destroy, restore and their batch forms.
//!
//! Mutations never return `Err`. Every outcome, including validation and
//! driver failures, comes back as a [`MutationResult`] so batch endpoints can
//! report partial failure. Batch writes run in one transaction that is rolled
//! back on any failure.

use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use fluentql_core::{
    Boolean, Condition, FieldErrors, Operator, Row, SQL, SelectQuery, Statement, Value, insert_sql,
};

use crate::error::{FluentError, Result};
use crate::query::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
    Restore,
}

impl Action {
    const fn verb(&self) -> &'static str {
        match self {
            Action::Create => "Create",
            Action::Update => "Update",
            Action::Delete => "Delete",
            Action::Restore => "Restore",
        }
    }
}

/// Outcome of a mutation, shaped for an API response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationResult {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    pub message: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Field errors of a failed validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl MutationResult {
    fn success(code: u16, action: Action, id: JsonValue, data: JsonValue, message: &str) -> Self {
        MutationResult {
            code,
            id: Some(id),
            data: Some(data),
            message: message.to_owned(),
            action,
            error: None,
            errors: None,
        }
    }

    fn failure(action: Action, error: FluentError, message: &str, data: Option<JsonValue>) -> Self {
        let code = error.code();
        match error {
            FluentError::ValidationFailed(errors) => MutationResult {
                code,
                id: None,
                data,
                message: format!(
                    "{} operation failed: {}",
                    action.verb(),
                    errors.values().cloned().collect::<Vec<_>>().join(" ")
                ),
                action,
                error: Some("validation failed".to_owned()),
                errors: Some(errors),
            },
            error => MutationResult {
                code,
                id: None,
                data,
                message: message.to_owned(),
                action,
                error: Some(error.to_string()),
                errors: None,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Turns an internal outcome into a result, logging failures.
fn settle(action: Action, message: &str, outcome: Result<MutationResult>) -> MutationResult {
    match outcome {
        Ok(result) => result,
        Err(error) => {
            fluentql_core::fluent_error!(action = ?action, error = %error, "{message}");
            MutationResult::failure(action, error, message, None)
        }
    }
}

fn require_id(id: &Value, action: Action) -> Result<()> {
    if id.is_null() || id.as_str().is_some_and(|s| s.trim().is_empty()) {
        let verb = match action {
            Action::Delete => "delete",
            Action::Restore => "restore",
            _ => "update",
        };
        return Err(FluentError::InvalidArgument(format!("Please provide id to {verb}.")));
    }
    Ok(())
}

fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn assignments(data: &Row) -> Vec<(&str, Value)> {
    data.iter()
        .map(|(column, value)| (column.as_str(), Value::from_json(value)))
        .collect()
}

impl<'db> Query<'db> {
    /// Runs the validator for `action`, unless validation is skipped.
    fn check(&self, data: &Row, action: Action) -> Result<()> {
        if self.skip_validation {
            return Ok(());
        }
        let rules = match (&self.rules_override, action) {
            (Some(rules), _) => rules,
            (None, Action::Create) => self.entity.insert_rules.as_ref().unwrap_or(&self.entity.rules),
            (None, _) => self.entity.update_rules.as_ref().unwrap_or(&self.entity.rules),
        };
        if rules.is_empty() {
            return Ok(());
        }
        self.db
            .validator()
            .validate(rules, data, &self.db.config().validation_locale)
            .map_err(FluentError::ValidationFailed)
    }

    /// Sets created-at on create and updated-at otherwise.
    fn stamp(&self, data: &mut Row, action: Action) {
        if let Some(timestamps) = &self.entity.timestamps {
            let column = match action {
                Action::Create => &timestamps.created_at,
                _ => &timestamps.updated_at,
            };
            data.insert(column.to_string(), JsonValue::String(self.db.config().now()));
        }
    }

    /// Filters, validates and stamps a record for insertion.
    fn prepare_create(&self, data: Row) -> std::result::Result<Row, (FluentError, Row)> {
        let mut data = self.entity.filter_data(data, None);
        if data.is_empty() {
            let error = FluentError::InvalidArgument("No fillable columns to insert.".into());
            return Err((error, data));
        }
        if let Err(error) = self.check(&data, Action::Create) {
            return Err((error, data));
        }
        self.stamp(&mut data, Action::Create);
        Ok(data)
    }

    fn insert_statement(&self, data: &Row) -> SQL {
        let columns: Vec<&str> = data.keys().map(String::as_str).collect();
        let values = data.values().map(Value::from_json).collect();
        insert_sql(&self.entity.table, &columns, [values])
    }

    /// `WHERE key = id` against this entity's table.
    fn target(&self, key: &str, id: Value) -> SelectQuery {
        let mut target = SelectQuery::new(self.entity.table.clone(), self.db.dialect());
        target.wheres.push(
            Boolean::And,
            Condition::Compare {
                column: key.into(),
                op: Operator::Eq,
                value: id,
            },
        );
        target
    }

    fn mutation_base(&self) -> Query<'db> {
        let mut base = self.fresh();
        base.skip_validation = self.skip_validation;
        base.rules_override = self.rules_override.clone();
        base
    }

    /// Inserts one record. Returns 201 with the generated id.
    pub fn create(self, data: Row) -> MutationResult {
        const FAILED: &str = "Failed to insert new data";
        if data.is_empty() {
            let error = FluentError::InvalidArgument("Please provide data to insert.".into());
            return MutationResult::failure(Action::Create, error, FAILED, None);
        }
        let data = match self.prepare_create(data) {
            Ok(data) => data,
            Err((error, data)) => {
                return MutationResult::failure(Action::Create, error, FAILED, Some(JsonValue::Object(data)));
            }
        };
        let outcome = (|| -> Result<MutationResult> {
            self.db.execute(&self.insert_statement(&data))?;
            let id = self.db.last_insert_id().into_json();
            Ok(MutationResult::success(
                201,
                Action::Create,
                id,
                JsonValue::Object(data),
                "Inserted successfully",
            ))
        })();
        settle(Action::Create, FAILED, outcome)
    }

    /// Inserts every record in one transaction. Nothing is written when any
    /// record fails validation.
    pub fn batch_create(self, rows: Vec<Row>) -> MutationResult {
        const FAILED: &str = "Failed to create data";
        if rows.is_empty() {
            let error = FluentError::InvalidArgument("Please provide data to insert.".into());
            return MutationResult::failure(Action::Create, error, FAILED, None);
        }
        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            match self.prepare_create(row) {
                Ok(row) => prepared.push(row),
                Err((error, row)) => {
                    return MutationResult::failure(Action::Create, error, FAILED, Some(JsonValue::Object(row)));
                }
            }
        }

        let outcome = self.db.transaction(|db| {
            for row in &prepared {
                db.execute(&self.insert_statement(row))?;
            }
            Ok(db.last_insert_id().into_json())
        });
        let outcome = outcome.map(|id| {
            MutationResult::success(
                200,
                Action::Create,
                id,
                JsonValue::Array(prepared.into_iter().map(JsonValue::Object).collect()),
                "Batch creation successful",
            )
        });
        settle(Action::Create, FAILED, outcome)
    }

    /// Updates the record whose primary key equals `id`.
    pub fn patch(self, data: Row, id: impl Into<Value>) -> MutationResult {
        const FAILED: &str = "Failed to update data";
        let id = id.into();
        if data.is_empty() {
            let error = FluentError::InvalidArgument("Please provide data to update.".into());
            return MutationResult::failure(Action::Update, error, FAILED, None);
        }
        let mut data = self.entity.filter_data(data, None);
        if data.is_empty() {
            let error = FluentError::InvalidArgument("No fillable columns to update.".into());
            return MutationResult::failure(Action::Update, error, FAILED, None);
        }
        if let Err(error) = self.check(&data, Action::Update) {
            return MutationResult::failure(Action::Update, error, FAILED, Some(JsonValue::Object(data)));
        }
        let outcome = (|| -> Result<MutationResult> {
            require_id(&id, Action::Update)?;
            self.stamp(&mut data, Action::Update);
            let target = self.target(&self.entity.primary_key, id.clone());
            self.db.execute(&target.update_sql(assignments(&data)))?;
            Ok(MutationResult::success(
                200,
                Action::Update,
                id.into_json(),
                JsonValue::Object(data),
                "Updated successfully",
            ))
        })();
        settle(Action::Update, FAILED, outcome)
    }

    /// Applies `data` to every row matching the query, in batches of 1000
    /// keys through [`batch_patch`](Self::batch_patch).
    pub fn patch_all(self, data: Row) -> MutationResult {
        const FAILED: &str = "Failed to update data";
        let base = self.mutation_base();
        let pk = self.entity.primary_key.clone();
        let outcome = (|| -> Result<MutationResult> {
            let ids = self.select([pk.as_str()]).show_hidden().pluck(&pk)?;
            if ids.is_empty() {
                return Err(FluentError::NotFound);
            }

            let mut succeeded = Vec::new();
            let mut failed = Vec::new();
            for batch in ids.chunks(1000) {
                let rows = batch
                    .iter()
                    .map(|id| {
                        let mut row = data.clone();
                        row.insert(pk.to_string(), id.clone());
                        row
                    })
                    .collect();
                let result = base.clone().batch_patch(rows, None);
                match (result.code, result.id) {
                    (200, Some(JsonValue::Array(ids))) => succeeded.extend(ids),
                    _ => failed.extend(batch.iter().cloned()),
                }
            }

            let updated = !succeeded.is_empty();
            Ok(MutationResult {
                code: if updated { 200 } else { 422 },
                id: updated.then(|| JsonValue::Array(succeeded.clone())),
                data: Some(json!({
                    "successful_ids": succeeded,
                    "failed_ids": failed,
                    "success_count": succeeded.len(),
                    "fail_count": failed.len(),
                })),
                message: if updated { "Updated successfully" } else { "No records updated" }.to_owned(),
                action: Action::Update,
                error: None,
                errors: None,
            })
        })();
        settle(Action::Update, FAILED, outcome)
    }

    /// Updates each row by `key_column` (the primary key by default) in one
    /// transaction. Rows without a key are skipped.
    pub fn batch_patch(self, rows: Vec<Row>, key_column: Option<&str>) -> MutationResult {
        const FAILED: &str = "Failed to update data";
        let key = key_column.unwrap_or(self.entity.primary_key.as_str()).to_owned();
        if rows.is_empty() {
            let error = FluentError::InvalidArgument("Please provide data to update.".into());
            return MutationResult::failure(Action::Update, error, FAILED, None);
        }

        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            let mut row = self.entity.filter_data(row, Some(&key));
            if let Err(error) = self.check(&row, Action::Update) {
                return MutationResult::failure(Action::Update, error, FAILED, Some(JsonValue::Object(row)));
            }
            if is_blank(row.get(&key)) {
                continue;
            }
            self.stamp(&mut row, Action::Update);
            prepared.push(row);
        }
        if prepared.is_empty() {
            let error = FluentError::InvalidArgument("No records to update.".into());
            return MutationResult::failure(Action::Update, error, FAILED, None);
        }

        let outcome = self.db.transaction(|db| {
            for row in &prepared {
                let id = row.get(&key).map(Value::from_json).unwrap_or_default();
                let mut fields = row.clone();
                fields.remove(&key);
                if fields.is_empty() {
                    continue;
                }
                db.execute(&self.target(&key, id).update_sql(assignments(&fields)))?;
            }
            Ok(())
        });
        let outcome = outcome.map(|()| {
            let ids = prepared
                .iter()
                .map(|row| row.get(&key).cloned().unwrap_or(JsonValue::Null))
                .collect();
            MutationResult::success(
                200,
                Action::Update,
                JsonValue::Array(ids),
                JsonValue::Array(prepared.into_iter().map(JsonValue::Object).collect()),
                "Updated successfully",
            )
        });
        settle(Action::Update, FAILED, outcome)
    }

    /// Looks a record up by primary key regardless of soft-delete state.
    fn locate(&self, id: &Value) -> Result<Row> {
        self.fresh()
            .with_trashed()
            .show_hidden()
            .find_or_fail(id.clone())
    }

    /// Soft deletes the record, or removes it when it is already trashed or
    /// the entity does not soft delete.
    pub fn destroy(self, id: impl Into<Value>) -> MutationResult {
        const FAILED: &str = "Failed to delete records";
        let id = id.into();
        let outcome = (|| -> Result<MutationResult> {
            require_id(&id, Action::Delete)?;
            let row = self.locate(&id)?;
            let target = self.target(&self.entity.primary_key, id.clone());
            let statement = match &self.entity.soft_delete {
                Some(column) if is_blank(row.get(column.as_str())) => {
                    target.update_sql([(column.as_str(), Value::Text(self.db.config().now()))])
                }
                _ => target.delete_sql(),
            };
            self.db.execute(&statement)?;
            Ok(MutationResult::success(
                200,
                Action::Delete,
                id.clone().into_json(),
                JsonValue::Object(row),
                "Removed successfully",
            ))
        })();
        settle(Action::Delete, FAILED, outcome)
    }

    /// Soft deletes (or removes) every row matching the query's conditions.
    pub fn destroy_all(self) -> MutationResult {
        const FAILED: &str = "Failed to delete records";
        let outcome = (|| -> Result<MutationResult> {
            let rows = self.clone().with_trashed().show_hidden().get()?;
            if rows.is_empty() {
                return Err(FluentError::NotFound);
            }
            self.db.execute(&self.destroy_sql())?;
            let pk = self.entity.primary_key.as_str();
            let ids = rows
                .iter()
                .map(|row| row.get(pk).cloned().unwrap_or(JsonValue::Null))
                .collect();
            Ok(MutationResult::success(
                200,
                Action::Delete,
                JsonValue::Array(ids),
                JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect()),
                "Removed successfully",
            ))
        })();
        settle(Action::Delete, FAILED, outcome)
    }

    /// Removes the record even when the entity soft deletes.
    pub fn force_destroy(self, id: impl Into<Value>) -> MutationResult {
        const FAILED: &str = "Failed to remove data";
        let id = id.into();
        let outcome = (|| -> Result<MutationResult> {
            require_id(&id, Action::Delete)?;
            let row = self.locate(&id)?;
            let target = self.target(&self.entity.primary_key, id.clone());
            self.db.execute(&target.delete_sql())?;
            Ok(MutationResult::success(
                200,
                Action::Delete,
                id.clone().into_json(),
                JsonValue::Object(row),
                "Removed successfully",
            ))
        })();
        settle(Action::Delete, FAILED, outcome)
    }

    /// Clears the deleted-at column of a trashed record.
    pub fn restore(self, id: impl Into<Value>) -> MutationResult {
        const FAILED: &str = "Failed to restore data";
        let id = id.into();
        let outcome = (|| -> Result<MutationResult> {
            require_id(&id, Action::Restore)?;
            let Some(column) = &self.entity.soft_delete else {
                return Err(FluentError::InvalidArgument(format!(
                    "`{}` does not soft delete",
                    self.entity.name
                )));
            };
            let row = self
                .fresh()
                .only_trashed()
                .show_hidden()
                .find_or_fail(id.clone())?;
            let target = self.target(&self.entity.primary_key, id.clone());
            self.db
                .execute(&target.update_sql([(column.as_str(), Value::Null)]))?;
            Ok(MutationResult::success(
                200,
                Action::Restore,
                id.clone().into_json(),
                JsonValue::Object(row),
                "Restore successfully",
            ))
        })();
        settle(Action::Restore, FAILED, outcome)
    }

    /// Patches the record matching `conditions` (or carrying a primary key),
    /// creating it when none exists.
    pub fn insert_or_update(self, conditions: Row, values: Row) -> MutationResult {
        let pk = self.entity.primary_key.to_string();
        let mut data = conditions.clone();
        data.extend(values);

        let mut id = data.get(&pk).filter(|v| !is_blank(Some(*v))).map(Value::from_json);
        if id.is_none() {
            let mut lookup = conditions;
            lookup.remove(&pk);
            let existing = self
                .fresh()
                .select([pk.as_str()])
                .show_hidden()
                .where_map(lookup.iter().map(|(k, v)| (k.as_str(), Value::from_json(v))))
                .first();
            match existing {
                Ok(found) => id = found.and_then(|row| row.get(&pk).map(Value::from_json)),
                Err(error) => {
                    return MutationResult::failure(Action::Create, error, "Failed to insert new data", None);
                }
            }
        }
        match id {
            Some(id) => self.patch(data, id),
            None => self.create(data),
        }
    }

    /// The INSERT [`create`](Self::create) would run for `data`.
    pub fn to_sql_create(&self, data: Row) -> Result<Statement> {
        let data = self.prepare_create(data).map_err(|(error, _)| error)?;
        Ok(Statement::new(&self.insert_statement(&data), self.db.dialect()))
    }

    /// An UPDATE applying `data` to every row matching the conditions.
    pub fn to_sql_patch(&self, data: Row) -> Result<Statement> {
        let mut data = self.entity.filter_data(data, None);
        self.check(&data, Action::Update)?;
        self.stamp(&mut data, Action::Update);
        Ok(Statement::new(&self.state.update_sql(assignments(&data)), self.db.dialect()))
    }

    fn destroy_sql(&self) -> SQL {
        match &self.entity.soft_delete {
            Some(column) => self
                .state
                .update_sql([(column.as_str(), Value::Text(self.db.config().now()))]),
            None => self.state.delete_sql(),
        }
    }

    /// The statement [`destroy_all`](Self::destroy_all) would run.
    pub fn to_sql_destroy(&self) -> Statement {
        Statement::new(&self.destroy_sql(), self.db.dialect())
    }
}
