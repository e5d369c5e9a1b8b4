use std::ops::ControlFlow;

use fluentql::{DbConfig, FluentError, Strategy};
use proptest::prelude::*;

use crate::common::{Fixture, hidden_key_db, ordered_ids, setup, setup_with};

/// Items 5..=54 on order 4, on top of the four seeded items.
const BULK: &str = "
    WITH RECURSIVE n(i) AS (SELECT 5 UNION ALL SELECT i + 1 FROM n WHERE i < 54)
    INSERT INTO items (id, order_id, sku, qty) SELECT i, 4, 'bulk', i FROM n;
";

fn indexed() -> Fixture {
    setup_with(&format!("{BULK} CREATE INDEX items_id ON items (id);"), DbConfig::default())
}

fn unindexed() -> Fixture {
    setup_with(BULK, DbConfig::default())
}

fn collect_chunks(fx: &Fixture, size: u64) -> (Vec<i64>, usize) {
    let mut seen = Vec::new();
    let mut pages = 0;
    fx.db
        .table("items")
        .unwrap()
        .select(["id", "sku"])
        .chunk(size, |page| {
            assert!(page.len() as u64 <= size);
            pages += 1;
            seen.extend(ordered_ids(&page));
            ControlFlow::Continue(())
        })
        .unwrap();
    (seen, pages)
}

#[test]
fn keyset_needs_a_selected_and_indexed_key() {
    let fx = indexed();
    let items = fx.db.table("items").unwrap();
    assert_eq!(items.clone().select(["id", "sku"]).strategy().unwrap(), Strategy::Keyset);
    assert_eq!(items.clone().select(["items.id"]).strategy().unwrap(), Strategy::Keyset);
    assert_eq!(items.clone().select(["sku"]).strategy().unwrap(), Strategy::Offset);
    assert_eq!(items.strategy().unwrap(), Strategy::Offset);

    let fx = unindexed();
    let items = fx.db.table("items").unwrap();
    assert_eq!(items.select(["id", "sku"]).strategy().unwrap(), Strategy::Offset);
}

#[test]
fn keyset_chunks_seek_past_the_last_key() {
    let fx = indexed();
    let (seen, pages) = collect_chunks(&fx, 10);
    assert_eq!(seen, (1..=54).collect::<Vec<_>>());
    // Five full pages, one partial page, then the empty page that ends it.
    assert_eq!(pages, 6);

    let selects = fx.log.selects();
    assert_eq!(selects.len(), 7);
    assert!(!selects[0].contains("items.id > ?"));
    assert!(selects[1..].iter().all(|sql| sql.contains("items.id > ?")));
    assert!(selects.iter().all(|sql| !sql.contains("OFFSET")));
}

#[test]
fn offset_chunks_step_by_the_page_size() {
    let fx = unindexed();
    let (seen, pages) = collect_chunks(&fx, 10);
    assert_eq!(seen, (1..=54).collect::<Vec<_>>());
    assert_eq!(pages, 6);

    let selects = fx.log.selects();
    assert!(selects[0].ends_with("LIMIT 10"));
    assert!(selects[1].ends_with("LIMIT 10 OFFSET 10"));
    assert!(selects[6].ends_with("LIMIT 10 OFFSET 60"));
}

#[test]
fn chunks_keep_the_base_filters() {
    let fx = indexed();
    let mut total = 0;
    fx.db
        .table("items")
        .unwrap()
        .select(["id"])
        .where_eq("order_id", 4)
        .chunk(7, |page| {
            total += page.len();
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(total, 50);
}

#[test]
fn breaking_stops_further_fetches() {
    let fx = indexed();
    let mut calls = 0;
    fx.db
        .table("items")
        .unwrap()
        .select(["id"])
        .chunk(5, |_| {
            calls += 1;
            ControlFlow::Break(())
        })
        .unwrap();
    assert_eq!(calls, 1);
    assert_eq!(fx.log.reads_from("items"), 1);
}

#[test]
fn empty_results_never_reach_the_callback() {
    let fx = setup();
    let mut calls = 0;
    fx.db
        .table("items")
        .unwrap()
        .where_eq("sku", "none")
        .chunk(10, |_| {
            calls += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(calls, 0);
}

#[test]
fn zero_sized_pages_are_rejected() {
    let fx = setup();
    let items = fx.db.table("items").unwrap();
    let result = items.clone().chunk(0, |_| ControlFlow::Continue(()));
    assert!(matches!(result, Err(FluentError::InvalidArgument(_))));
    assert!(matches!(items.clone().cursor(0), Err(FluentError::InvalidArgument(_))));
    assert!(matches!(items.lazy(0), Err(FluentError::InvalidArgument(_))));
}

#[test]
fn cursor_yields_rows_one_page_at_a_time() {
    let fx = indexed();
    let mut cursor = fx.db.table("items").unwrap().select(["id"]).cursor(20).unwrap();
    assert_eq!(cursor.strategy(), Strategy::Keyset);

    let first = cursor.next().unwrap().unwrap();
    assert_eq!(first["id"], 1);
    assert_eq!(fx.log.reads_from("items"), 1);

    let rest: Vec<i64> = cursor.map(|row| row.unwrap()["id"].as_i64().unwrap()).collect();
    assert_eq!(rest, (2..=54).collect::<Vec<_>>());
}

#[test]
fn traversal_respects_soft_deletes() {
    let fx = setup();
    let ids: Vec<i64> = fx
        .db
        .table("orders")
        .unwrap()
        .cursor(2)
        .unwrap()
        .map(|row| row.unwrap()["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 4]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn keyset_and_offset_visit_the_same_rows(size in 1u64..25) {
        let (keyset, _) = collect_chunks(&indexed(), size);
        let (offset, _) = collect_chunks(&unindexed(), size);
        prop_assert_eq!(&keyset, &offset);
        prop_assert_eq!(keyset, (1..=54).collect::<Vec<_>>());
    }
}

#[test]
fn hidden_keys_still_advance_keyset_pages() {
    let db = hidden_key_db(&format!("{BULK} CREATE INDEX items_id ON items (id);"));
    let items = || db.table("items").unwrap().select(["id", "sku"]);
    assert_eq!(items().strategy().unwrap(), Strategy::Keyset);

    let mut chunked = 0;
    items()
        .chunk(10, |page| {
            assert!(page.iter().all(|row| !row.contains_key("id")));
            chunked += page.len();
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(chunked, 54);
    assert_eq!(items().cursor(10).unwrap().filter(Result::is_ok).count(), 54);
    assert_eq!(items().lazy(10).unwrap().count().unwrap(), 54);
}
