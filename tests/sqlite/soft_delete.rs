use fluentql::Value;
use proptest::prelude::*;

use crate::common::{ids, setup};

#[test]
fn visibility_modes() {
    let fx = setup();
    let orders = || fx.db.table("orders").unwrap();
    assert_eq!(ids(&orders().get().unwrap()), vec![1, 2, 4]);
    assert_eq!(ids(&orders().without_trashed().get().unwrap()), vec![1, 2, 4]);
    assert_eq!(ids(&orders().only_trashed().get().unwrap()), vec![3]);
    assert_eq!(ids(&orders().with_trashed().get().unwrap()), vec![1, 2, 3, 4]);
    assert_eq!(orders().with_trashed().count().unwrap(), 4);
}

#[test]
fn trashed_filter_applies_to_find_and_counts() {
    let fx = setup();
    let orders = || fx.db.table("orders").unwrap();
    assert!(orders().find(3).unwrap().is_none());
    assert!(orders().with_trashed().find(3).unwrap().is_some());
    assert_eq!(orders().where_eq("status", "paid").count().unwrap(), 1);
}

#[test]
fn date_parts_on_the_deletion_stamp() {
    let fx = setup();
    let trashed = fx
        .db
        .table("orders")
        .unwrap()
        .only_trashed()
        .where_date("deleted_at", "=", "2024-01-01")
        .unwrap()
        .where_year("deleted_at", "=", 2024)
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(ids(&trashed), vec![3]);
}

#[test]
fn entities_without_soft_deletes_ignore_the_mode() {
    let fx = setup();
    let items = fx.db.table("items").unwrap();
    assert_eq!(items.clone().only_trashed().count().unwrap(), 4);
    assert!(!items.only_trashed().to_sql().unwrap().sql.contains("deleted_at"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn modes_partition_the_table(trashed in prop::collection::vec(any::<bool>(), 4)) {
        let fx = setup();
        for (i, gone) in trashed.iter().enumerate() {
            let stamp = if *gone { Value::from("2024-06-01 00:00:00") } else { Value::Null };
            fx.db
                .driver()
                .execute("UPDATE orders SET deleted_at = ? WHERE id = ?", &[stamp, Value::from(i + 1)])
                .unwrap();
        }

        let orders = || fx.db.table("orders").unwrap();
        let live = ids(&orders().get().unwrap());
        let gone = ids(&orders().only_trashed().get().unwrap());
        let all = ids(&orders().with_trashed().get().unwrap());

        prop_assert!(live.iter().all(|id| !gone.contains(id)));
        let mut union = [live.clone(), gone.clone()].concat();
        union.sort_unstable();
        prop_assert_eq!(union, all);
        prop_assert_eq!(gone.len(), trashed.iter().filter(|t| **t).count());
    }
}
