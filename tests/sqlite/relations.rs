use fluentql::{DbConfig, FluentError, Row, scope};
use serde_json::json;

use crate::common::{ids, setup, setup_with};

fn related_ids(row: &Row, relation: &str) -> Vec<i64> {
    row[relation]
        .as_array()
        .expect("relation should merge as a list")
        .iter()
        .filter_map(|r| r["id"].as_i64())
        .collect()
}

#[test]
fn has_many_merges_a_list_per_row() {
    let fx = setup();
    let customers = fx
        .db
        .table("customers")
        .unwrap()
        .with("orders")
        .order_by("id", "asc")
        .get()
        .unwrap();

    assert_eq!(related_ids(&customers[0], "orders"), vec![1, 2]);
    // Order 3 is trashed.
    assert_eq!(related_ids(&customers[1], "orders"), vec![4]);
    assert_eq!(customers[2]["orders"], json!([]));
}

#[test]
fn belongs_to_merges_a_single_row() {
    let fx = setup();
    let orders = fx
        .db
        .table("orders")
        .unwrap()
        .with("customer")
        .order_by("id", "asc")
        .get()
        .unwrap();

    assert_eq!(orders.len(), 3);
    assert_eq!(orders[0]["customer"]["name"], json!("Ana"));
    assert_eq!(orders[2]["customer"]["name"], json!("Ben"));
}

#[test]
fn nested_paths_load_every_level() {
    let fx = setup();
    let customers = fx
        .db
        .table("customers")
        .unwrap()
        .with("orders.items")
        .order_by("id", "asc")
        .get()
        .unwrap();

    let ana_orders = customers[0]["orders"].as_array().unwrap();
    let skus: Vec<Vec<&str>> = ana_orders
        .iter()
        .map(|order| {
            order["items"]
                .as_array()
                .unwrap()
                .iter()
                .filter_map(|item| item["sku"].as_str())
                .collect()
        })
        .collect();
    assert_eq!(skus, vec![vec!["pen", "ink"], vec!["pad"]]);

    let ben_orders = customers[1]["orders"].as_array().unwrap();
    assert_eq!(ben_orders.len(), 1);
    assert_eq!(ben_orders[0]["items"], json!([]));
}

#[test]
fn keys_are_fetched_in_batches() {
    let config = DbConfig {
        relation_batch_size: 2,
        ..DbConfig::default()
    };
    let fx = setup_with("", config);
    fx.db.table("customers").unwrap().with("orders").get().unwrap();
    // Three distinct customer keys, two per batch.
    assert_eq!(fx.log.reads_from("orders"), 2);

    let fx = setup();
    fx.db.table("customers").unwrap().with("orders").get().unwrap();
    assert_eq!(fx.log.reads_from("orders"), 1);
}

#[test]
fn batched_loads_merge_like_one_fetch() {
    for batch in [1, 2] {
        let config = DbConfig {
            relation_batch_size: batch,
            ..DbConfig::default()
        };
        let batched = setup_with("", config);
        let whole = setup();
        for relations in ["orders", "orders.items"] {
            let left = batched.db.table("customers").unwrap().with(relations).get().unwrap();
            let right = whole.db.table("customers").unwrap().with(relations).get().unwrap();
            assert_eq!(left, right, "batch size {batch}, relation {relations}");
        }
        let left = batched.db.table("orders").unwrap().with("customer").get().unwrap();
        let right = whole.db.table("orders").unwrap().with("customer").get().unwrap();
        assert_eq!(left, right);
    }
    // Ana's orders 1 and 2 land on her even when split across batches.
    let fx = setup_with("", DbConfig { relation_batch_size: 1, ..DbConfig::default() });
    let customers = fx.db.table("customers").unwrap().with("orders").get().unwrap();
    assert_eq!(related_ids(&customers[0], "orders"), vec![1, 2]);
    assert_eq!(related_ids(&customers[2], "orders"), Vec::<i64>::new());
}

#[test]
fn duplicate_owner_keys_are_fetched_once() {
    let fx = setup();
    let orders = fx.db.table("orders").unwrap().with("customer").get().unwrap();
    assert_eq!(orders.len(), 3);
    assert_eq!(fx.log.reads_from("customers"), 1);

    let statement = fx
        .log
        .selects()
        .into_iter()
        .find(|sql| sql.contains("FROM customers"))
        .unwrap();
    assert_eq!(statement.matches('?').count(), 2);
}

#[test]
fn scoped_and_projected_relations() {
    let fx = setup();
    let customers = fx
        .db
        .table("customers")
        .unwrap()
        .with_scope("orders", scope(|q| Ok(q.where_eq("status", "paid"))))
        .order_by("id", "asc")
        .get()
        .unwrap();
    assert_eq!(related_ids(&customers[0], "orders"), vec![1]);
    assert_eq!(customers[1]["orders"], json!([]));

    let orders = fx
        .db
        .table("orders")
        .unwrap()
        .with_columns("items", ["sku"])
        .where_eq("id", 1)
        .get()
        .unwrap();
    let item = orders[0]["items"][0].as_object().unwrap();
    let mut keys: Vec<&str> = item.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["id", "order_id", "sku"]);
}

#[test]
fn unknown_relations_are_logged_unless_strict() {
    let fx = setup();
    let rows = fx.db.table("orders").unwrap().with("notes").get().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| !row.contains_key("notes")));

    let strict = DbConfig {
        strict_relations: true,
        ..DbConfig::default()
    };
    let fx = setup_with("", strict);
    let result = fx.db.table("orders").unwrap().with("notes").get();
    assert!(matches!(result, Err(FluentError::RelationNotFound { .. })));
}

#[test]
fn existence_filters() {
    let fx = setup();
    let orders = || fx.db.table("orders").unwrap();

    assert_eq!(ids(&orders().where_has("items").unwrap().get().unwrap()), vec![1, 2]);
    assert_eq!(ids(&orders().where_doesnt_have("items").unwrap().get().unwrap()), vec![4]);

    let bulky = orders()
        .where_has_scope("items", scope(|q| q.r#where("qty", ">", 3)))
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(ids(&bulky), vec![2]);

    let without_bulky = orders()
        .where_doesnt_have_scope("items", scope(|q| q.r#where("qty", ">", 3)))
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(ids(&without_bulky), vec![1, 4]);
}

#[test]
fn existence_through_nested_paths_skips_trashed_intermediates() {
    let fx = setup();
    // Ben's only order with items is trashed.
    let rows = fx
        .db
        .table("customers")
        .unwrap()
        .where_has("orders.items")
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(ids(&rows), vec![1]);
}

#[test]
fn or_existence_filters() {
    let fx = setup();
    let rows = fx
        .db
        .table("customers")
        .unwrap()
        .where_eq("name", "Cy")
        .or_where_has("orders")
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(ids(&rows), vec![1, 2, 3]);

    let rows = fx
        .db
        .table("customers")
        .unwrap()
        .where_eq("name", "Ana")
        .or_where_doesnt_have("orders")
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(ids(&rows), vec![1, 3]);
}

#[test]
fn unknown_existence_paths_fail_at_the_call_site() {
    let fx = setup();
    let result = fx.db.table("orders").unwrap().where_has("items.supplier");
    assert!(matches!(result, Err(FluentError::RelationNotFound { .. })));
}

#[test]
fn eager_loading_an_empty_result_issues_no_relation_query() {
    let fx = setup();
    let rows = fx
        .db
        .table("orders")
        .unwrap()
        .where_eq("status", "void")
        .with("items")
        .get()
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(fx.log.reads_from("items"), 0);
}
