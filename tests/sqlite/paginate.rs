use fluentql::{Filter, FluentError, MatchType};

use crate::common::{ordered_ids, setup};

#[test]
fn pages_carry_their_neighbours() {
    let fx = setup();
    let customers = || fx.db.table("customers").unwrap();

    let first = customers().paginate(2, 1, None, None).unwrap();
    assert_eq!((first.records_total, first.records_filtered), (3, 3));
    assert_eq!(ordered_ids(&first.data), vec![1, 2]);
    assert_eq!((first.current_page, first.last_page), (1, 2));
    assert_eq!((first.previous_page, first.next_page), (None, Some(2)));
    assert!(first.error.is_none());

    let second = customers().paginate(2, 2, None, None).unwrap();
    assert_eq!(ordered_ids(&second.data), vec![3]);
    assert_eq!((second.previous_page, second.next_page), (Some(1), None));

    let zero = customers().paginate(2, 0, None, None).unwrap();
    assert_eq!(zero.current_page, 1);
}

#[test]
fn search_matches_any_paginate_column() {
    let fx = setup();
    let customers = || fx.db.table("customers").unwrap();

    let page = customers().paginate(10, 1, Some("EXAMPLE.com"), None).unwrap();
    assert_eq!(page.records_total, 3);
    assert_eq!(page.records_filtered, 2);
    assert_eq!(ordered_ids(&page.data), vec![1, 2]);
    // Email is searchable but still hidden.
    assert!(page.data.iter().all(|row| !row.contains_key("email")));

    let blank = customers().paginate(10, 1, Some("   "), None).unwrap();
    assert_eq!(blank.records_filtered, 3);
}

#[test]
fn search_falls_back_to_every_column() {
    let fx = setup();
    let page = fx.db.table("orders").unwrap().paginate(10, 1, Some("pend"), None).unwrap();
    assert_eq!(page.records_total, 3);
    assert_eq!(ordered_ids(&page.data), vec![4]);
}

#[test]
fn filters_narrow_the_page() {
    let fx = setup();
    let customers = || fx.db.table("customers").unwrap();

    let exact = Filter::new(MatchType::Exact).field("active", 0).field("name", "");
    let page = customers().paginate(10, 1, None, Some(&exact)).unwrap();
    assert_eq!(ordered_ids(&page.data), vec![3]);
    assert_eq!((page.records_total, page.records_filtered), (3, 1));

    let prefix = Filter::new(MatchType::Prefix).field("name", "B");
    let page = customers().paginate(10, 1, None, Some(&prefix)).unwrap();
    assert_eq!(ordered_ids(&page.data), vec![2]);

    let anywhere = Filter::new(MatchType::Anywhere).field("name", "n");
    let page = customers().paginate(10, 1, Some("a"), Some(&anywhere)).unwrap();
    assert_eq!(ordered_ids(&page.data), vec![1, 2]);
}

#[test]
fn filters_combine_with_or_conditions_safely() {
    let fx = setup();
    let page = fx
        .db
        .table("orders")
        .unwrap()
        .where_eq("status", "paid")
        .or_where_eq("status", "pending")
        .paginate(10, 1, None, Some(&Filter::new(MatchType::Exact).field("customer_id", 2)))
        .unwrap();
    assert_eq!(page.records_total, 2);
    assert_eq!(ordered_ids(&page.data), vec![4]);
}

#[test]
fn pages_past_the_end_report_an_error() {
    let fx = setup();
    let page = fx.db.table("customers").unwrap().paginate(2, 5, None, None).unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.error.as_deref(), Some("Current page (5) is more than total pages (2)"));
    assert_eq!(page.next_page, None);
}

#[test]
fn huge_page_numbers_are_past_the_end() {
    let fx = setup();
    let page = fx.db.table("customers").unwrap().paginate(10, u64::MAX, None, None).unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.current_page, u64::MAX);
    assert_eq!((page.previous_page, page.next_page), (Some(u64::MAX - 1), None));
    assert_eq!(page.error, Some(format!("Current page ({}) is more than total pages (1)", u64::MAX)));

    let huge = fx.db.table("customers").unwrap().paginate(u64::MAX, 2, None, None).unwrap();
    assert_eq!(huge.last_page, 1);
    assert!(huge.data.is_empty());
}

#[test]
fn zero_per_page_is_rejected() {
    let fx = setup();
    let result = fx.db.table("customers").unwrap().paginate(0, 1, None, None);
    assert!(matches!(result, Err(FluentError::InvalidArgument(_))));
}
