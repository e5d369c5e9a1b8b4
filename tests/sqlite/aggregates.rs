use fluentql::{Aggregate, FluentError, Row, scope};
use serde_json::{Value as JsonValue, json};

use crate::common::setup;

fn column(rows: &[Row], name: &str) -> Vec<JsonValue> {
    rows.iter().map(|row| row[name].clone()).collect()
}

#[test]
fn counts_related_rows_per_owner() {
    let fx = setup();
    let orders = fx
        .db
        .table("orders")
        .unwrap()
        .with_count("items")
        .unwrap()
        .order_by("id", "asc")
        .get()
        .unwrap();
    assert_eq!(column(&orders, "items_count"), vec![json!(2), json!(1), json!(0)]);
    assert_eq!(column(&orders, "status"), vec![json!("paid"), json!("sent"), json!("pending")]);
}

#[test]
fn counts_skip_trashed_related_rows() {
    let fx = setup();
    let customers = fx
        .db
        .table("customers")
        .unwrap()
        .with_count("orders")
        .unwrap()
        .with_count("orders.items")
        .unwrap()
        .order_by("id", "asc")
        .get()
        .unwrap();
    assert_eq!(column(&customers, "orders_count"), vec![json!(2), json!(1), json!(0)]);
    assert_eq!(column(&customers, "orders_items_count"), vec![json!(3), json!(0), json!(0)]);
}

#[test]
fn sum_min_max_avg() {
    let fx = setup();
    let orders = fx
        .db
        .table("orders")
        .unwrap()
        .with_sum("items", "qty")
        .unwrap()
        .with_min("items", "qty")
        .unwrap()
        .with_max("items", "qty")
        .unwrap()
        .with_avg("items", "qty")
        .unwrap()
        .order_by("id", "asc")
        .get()
        .unwrap();

    assert_eq!(column(&orders, "items_sum_qty"), vec![json!(3), json!(5), JsonValue::Null]);
    assert_eq!(column(&orders, "items_min_qty"), vec![json!(1), json!(5), JsonValue::Null]);
    assert_eq!(column(&orders, "items_max_qty"), vec![json!(2), json!(5), JsonValue::Null]);
    assert_eq!(column(&orders, "items_avg_qty"), vec![json!(1.5), json!(5.0), JsonValue::Null]);
}

#[test]
fn scoped_counts_and_custom_aliases() {
    let fx = setup();
    let orders = fx
        .db
        .table("orders")
        .unwrap()
        .with_count_scope("items", scope(|q| q.r#where("qty", ">", 1)))
        .unwrap()
        .with_aggregate("items", Aggregate::Count, None, Some("lines"), None)
        .unwrap()
        .order_by("id", "asc")
        .get()
        .unwrap();
    assert_eq!(column(&orders, "items_count"), vec![json!(1), json!(1), json!(0)]);
    assert_eq!(column(&orders, "lines"), vec![json!(2), json!(1), json!(0)]);
}

#[test]
fn repeated_requests_replace_each_other() {
    let fx = setup();
    let query = fx
        .db
        .table("orders")
        .unwrap()
        .with_count("items")
        .unwrap()
        .with_count("items")
        .unwrap();
    let statement = query.to_sql().unwrap();
    assert_eq!(statement.sql.matches("AS items_count").count(), 1);
}

#[test]
fn aggregates_follow_an_explicit_projection() {
    let fx = setup();
    let rows = fx
        .db
        .table("orders")
        .unwrap()
        .select(["id"])
        .with_count("items")
        .unwrap()
        .where_eq("id", 1)
        .get()
        .unwrap();
    assert_eq!(rows, vec![crate::common::row(json!({"id": 1, "items_count": 2}))]);
}

#[test]
fn unknown_paths_fail_at_the_call_site() {
    let fx = setup();
    let result = fx.db.table("orders").unwrap().with_count("refunds");
    assert!(matches!(result, Err(FluentError::RelationNotFound { .. })));
}
