use fluentql::{Action, Value};
use serde_json::json;

use crate::common::{hidden_key_db, ids, row, setup};

#[test]
fn create_keeps_fillable_columns_and_stamps() {
    let fx = setup();
    let result = fx.db.table("customers").unwrap().create(row(json!({
        "id": 99,
        "name": "Dee",
        "email": "dee@example.com",
        "bogus": true
    })));

    assert_eq!(result.code, 201);
    assert_eq!(result.action, Action::Create);
    assert_eq!(result.message, "Inserted successfully");
    assert_eq!(result.id, Some(json!(4)));
    let data = result.data.unwrap();
    assert!(data.get("bogus").is_none());
    assert!(data["created_at"].is_string());

    let dee = fx.db.table("customers").unwrap().find(4).unwrap().unwrap();
    assert_eq!(dee["name"], json!("Dee"));
}

#[test]
fn validation_failures_write_nothing() {
    let fx = setup();
    let customers = || fx.db.table("customers").unwrap();
    let result = customers().create(row(json!({"name": "D", "email": "nope"})));

    assert_eq!(result.code, 422);
    assert!(!result.is_success());
    assert_eq!(result.error.as_deref(), Some("validation failed"));
    assert!(result.message.starts_with("Create operation failed: "));
    let errors = result.errors.unwrap();
    assert_eq!(errors["name"], "The name field must be at least 2 characters in length.");
    assert_eq!(errors["email"], "The email field must contain a valid email address.");
    assert_eq!(customers().count().unwrap(), 3);

    let skipped = customers()
        .skip_validation()
        .create(row(json!({"name": "D", "email": "nope"})));
    assert_eq!(skipped.code, 201);
}

#[test]
fn driver_failures_come_back_as_results() {
    let fx = setup();
    // name is NOT NULL and not present to validate.
    let result = fx.db.table("customers").unwrap().create(row(json!({"email": "x@example.com"})));
    assert_eq!(result.code, 500);
    assert_eq!(result.message, "Failed to insert new data");
    assert!(result.error.is_some());

    let empty = fx.db.table("customers").unwrap().create(row(json!({})));
    assert_eq!(empty.code, 422);
}

#[test]
fn batch_create_is_all_or_nothing() {
    let fx = setup();
    let items = || fx.db.table("items").unwrap();

    let result = items().batch_create(vec![
        row(json!({"order_id": 4, "sku": "tape", "qty": 1})),
        row(json!({"order_id": 4, "sku": "glue", "qty": 2})),
    ]);
    assert_eq!(result.code, 200);
    assert_eq!(result.message, "Batch creation successful");
    assert_eq!(items().count().unwrap(), 6);

    // The second row breaks NOT NULL on sku.
    let result = items().batch_create(vec![
        row(json!({"order_id": 4, "sku": "clip", "qty": 1})),
        row(json!({"order_id": 4, "qty": 1})),
    ]);
    assert_eq!(result.code, 500);
    assert_eq!(result.message, "Failed to create data");
    assert_eq!(items().count().unwrap(), 6);
    assert!(!fx.db.driver().in_transaction());

    let customers = fx
        .db
        .table("customers")
        .unwrap()
        .batch_create(vec![row(json!({"name": "Eve"})), row(json!({"name": "X"}))]);
    assert_eq!(customers.code, 422);
    assert_eq!(fx.db.table("customers").unwrap().count().unwrap(), 3);
}

#[test]
fn patch_updates_one_record() {
    let fx = setup();
    let orders = || fx.db.table("orders").unwrap();

    let result = orders().patch(row(json!({"status": "sent", "bogus": 1})), 4);
    assert_eq!(result.code, 200);
    assert_eq!(result.message, "Updated successfully");
    assert_eq!(result.id, Some(json!(4)));

    let order = orders().find(4).unwrap().unwrap();
    assert_eq!(order["status"], json!("sent"));
    assert!(order["updated_at"].is_string());
    assert_eq!(orders().find(1).unwrap().unwrap()["status"], json!("paid"));

    let missing_id = orders().patch(row(json!({"status": "sent"})), "");
    assert_eq!(missing_id.code, 422);
    assert_eq!(missing_id.error.as_deref(), Some("Invalid argument: Please provide id to update."));
}

#[test]
fn patch_all_reports_each_key() {
    let fx = setup();
    let orders = || fx.db.table("orders").unwrap();

    let result = orders().where_eq("customer_id", 1).patch_all(row(json!({"status": "archived"})));
    assert_eq!(result.code, 200);
    let data = result.data.unwrap();
    assert_eq!(data["success_count"], json!(2));
    assert_eq!(data["fail_count"], json!(0));
    assert_eq!(ids(&orders().where_eq("status", "archived").get().unwrap()), vec![1, 2]);

    // Trashed order 3 is outside the query.
    let result = orders().where_eq("customer_id", 2).patch_all(row(json!({"status": "held"})));
    assert_eq!(result.id, Some(json!([4])));
    assert_eq!(orders().with_trashed().find(3).unwrap().unwrap()["status"], json!("paid"));

    let none = orders().where_eq("customer_id", 9).patch_all(row(json!({"status": "x"})));
    assert_eq!(none.code, 422);
}

#[test]
fn batch_patch_skips_rows_without_a_key() {
    let fx = setup();
    let items = || fx.db.table("items").unwrap();

    let result = items().batch_patch(
        vec![
            row(json!({"id": 1, "qty": 9})),
            row(json!({"id": "", "qty": 3})),
            row(json!({"id": 2, "qty": 8})),
        ],
        None,
    );
    assert_eq!(result.code, 200);
    assert_eq!(result.id, Some(json!([1, 2])));
    assert_eq!(items().find(1).unwrap().unwrap()["qty"], json!(9));
    assert_eq!(items().find(2).unwrap().unwrap()["qty"], json!(8));

    let by_sku = items().batch_patch(vec![row(json!({"sku": "pad", "qty": 7}))], Some("sku"));
    assert_eq!(by_sku.code, 200);
    assert_eq!(items().find(3).unwrap().unwrap()["qty"], json!(7));

    let blank = items().batch_patch(vec![row(json!({"qty": 1}))], None);
    assert_eq!(blank.code, 422);
    assert_eq!(blank.error.as_deref(), Some("Invalid argument: No records to update."));
}

#[test]
fn destroy_soft_deletes_then_removes() {
    let fx = setup();
    let orders = || fx.db.table("orders").unwrap();

    let first = orders().destroy(1);
    assert_eq!(first.code, 200);
    assert_eq!(first.message, "Removed successfully");
    assert_eq!(ids(&orders().get().unwrap()), vec![2, 4]);
    assert!(orders().with_trashed().find(1).unwrap().unwrap()["deleted_at"].is_string());

    let second = orders().destroy(1);
    assert_eq!(second.code, 200);
    assert!(orders().with_trashed().find(1).unwrap().is_none());

    assert_eq!(fx.db.table("items").unwrap().destroy(1).code, 200);
    assert_eq!(fx.db.table("items").unwrap().count().unwrap(), 3);

    let missing = orders().destroy(99);
    assert_eq!(missing.code, 422);
    assert_eq!(missing.message, "Failed to delete records");
    assert_eq!(orders().destroy(Value::Null).code, 422);
}

#[test]
fn force_destroy_skips_the_trash() {
    let fx = setup();
    let orders = || fx.db.table("orders").unwrap();
    assert_eq!(orders().force_destroy(2).code, 200);
    assert_eq!(ids(&orders().with_trashed().get().unwrap()), vec![1, 3, 4]);
}

#[test]
fn restore_clears_the_deletion_stamp() {
    let fx = setup();
    let orders = || fx.db.table("orders").unwrap();

    let result = orders().restore(3);
    assert_eq!(result.code, 200);
    assert_eq!(result.action, Action::Restore);
    assert_eq!(result.message, "Restore successfully");
    assert_eq!(ids(&orders().get().unwrap()), vec![1, 2, 3, 4]);

    assert_eq!(orders().restore(1).code, 422);
    assert_eq!(fx.db.table("items").unwrap().restore(1).code, 422);
}

#[test]
fn destroy_all_acts_on_the_conditions() {
    let fx = setup();
    let orders = || fx.db.table("orders").unwrap();

    let result = orders().where_eq("customer_id", 2).destroy_all();
    assert_eq!(result.code, 200);
    let mut removed: Vec<i64> = result
        .id
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|id| id.as_i64())
        .collect();
    removed.sort_unstable();
    assert_eq!(removed, vec![3, 4]);
    assert_eq!(ids(&orders().only_trashed().get().unwrap()), vec![3, 4]);
    assert_eq!(ids(&orders().get().unwrap()), vec![1, 2]);

    assert_eq!(orders().where_eq("customer_id", 9).destroy_all().code, 422);
}

#[test]
fn insert_or_update_matches_on_conditions() {
    let fx = setup();
    let customers = || fx.db.table("customers").unwrap();

    let updated = customers().insert_or_update(row(json!({"name": "Ben"})), row(json!({"email": "ben@new.example"})));
    assert_eq!(updated.code, 200);
    assert_eq!(updated.id, Some(json!(2)));
    let ben = customers().show_hidden().find(2).unwrap().unwrap();
    assert_eq!(ben["email"], json!("ben@new.example"));

    let created = customers().insert_or_update(row(json!({"name": "Zed"})), row(json!({"email": "zed@example.com"})));
    assert_eq!(created.code, 201);
    assert_eq!(customers().count().unwrap(), 4);

    let by_key = customers().insert_or_update(row(json!({"id": 3})), row(json!({"name": "Cyd"})));
    assert_eq!(by_key.code, 200);
    assert_eq!(customers().find(3).unwrap().unwrap()["name"], json!("Cyd"));
}

#[test]
fn statements_without_running_them() {
    let fx = setup();
    let items = fx.db.table("items").unwrap();

    let insert = items
        .to_sql_create(row(json!({"order_id": 1, "sku": "tag", "qty": 2})))
        .unwrap();
    assert_eq!(insert.sql, "INSERT INTO items (order_id, qty, sku) VALUES (?, ?, ?)");
    assert_eq!(insert.params, vec![Value::from(1), Value::from(2), Value::from("tag")]);

    let scoped = items.where_eq("order_id", 1);
    let update = scoped.to_sql_patch(row(json!({"qty": 3}))).unwrap();
    assert_eq!(update.sql, "UPDATE items SET qty = ? WHERE order_id = ?");
    assert_eq!(scoped.to_sql_destroy().sql, "DELETE FROM items WHERE order_id = ?");

    let orders = fx.db.table("orders").unwrap().where_eq("id", 2);
    assert!(orders.to_sql_destroy().sql.starts_with("UPDATE orders SET deleted_at = ?"));

    assert_eq!(fx.db.table("items").unwrap().count().unwrap(), 4);
}

#[test]
fn results_serialize_for_responses() {
    let fx = setup();
    let result = fx.db.table("items").unwrap().destroy(4);
    let body = serde_json::to_value(&result).unwrap();
    assert_eq!(body["action"], json!("delete"));
    assert_eq!(body["code"], json!(200));
    assert!(body.get("errors").is_none());
    assert!(body.get("error").is_none());
}

#[test]
fn patch_all_reads_hidden_keys() {
    let db = hidden_key_db("");
    let result = db.table("items").unwrap().where_eq("order_id", 1).patch_all(row(json!({"qty": 0})));
    assert_eq!(result.code, 200);
    assert_eq!(result.id, Some(json!([1, 2])));
    assert_eq!(db.table("items").unwrap().where_eq("qty", 0).count().unwrap(), 2);

    let upsert = db
        .table("items")
        .unwrap()
        .insert_or_update(row(json!({"sku": "pad"})), row(json!({"qty": 6})));
    assert_eq!(upsert.code, 200);
    assert_eq!(upsert.id, Some(json!(3)));
}

#[test]
fn writes_with_no_fillable_columns_are_rejected() {
    let fx = setup();
    let customers = || fx.db.table("customers").unwrap();

    let created = customers().create(row(json!({"id": 9, "bogus": true})));
    assert_eq!(created.code, 422);
    assert_eq!(created.error.as_deref(), Some("Invalid argument: No fillable columns to insert."));
    assert_eq!(customers().count().unwrap(), 3);

    let patched = customers().patch(row(json!({"bogus": true})), 1);
    assert_eq!(patched.code, 422);
    assert_eq!(patched.error.as_deref(), Some("Invalid argument: No fillable columns to update."));
}
