//! Paging, filtering and sorting laws over generated and fixture collections.

use ledgerview_protocol::{Collection, FieldValue, RecordId, ID_FIELD};
use ledgerview_testkit::{
    filter_strategy, moment_collection, moments_json, records_strategy, PropTestConfig,
};
use ledgerview_view::{page_count, FilterSpec, PagedView, SortScope, SortSpec};
use proptest::prelude::*;
use std::sync::Arc;

fn ids(view: &PagedView) -> Vec<RecordId> {
    view.visible_ids()
}

#[test]
fn test_twenty_five_moments_in_pages_of_twenty() {
    let mut view = PagedView::new(Arc::new(moment_collection(25)), 20).unwrap();

    assert_eq!(view.page_count(), 2);
    assert_eq!(view.visible_records().len(), 20);
    view.set_page_index(1);
    assert_eq!(view.visible_records().len(), 5);
    assert_eq!(ids(&view).first(), Some(&RecordId::from(20u64)));
}

#[test]
fn test_view_over_decoded_json() {
    let collection = Collection::from_json_array(&moments_json(25), ID_FIELD).unwrap();
    let mut view = PagedView::new(Arc::new(collection), 5).unwrap();

    // every seventh moment is a Lakers moment: 0, 7, 14, 21
    view.set_filter(FilterSpec::new("play.TeamAtMoment", "los"));
    assert_eq!(view.filtered_count(), 4);
    assert_eq!(view.page_count(), 1);
    assert_eq!(
        ids(&view),
        [0u64, 7, 14, 21].map(RecordId::from).to_vec()
    );

    view.set_sort(Some(SortSpec::descending("id")));
    assert_eq!(
        ids(&view),
        [21u64, 14, 7, 0].map(RecordId::from).to_vec()
    );
}

#[test]
fn test_refetched_collection_keeps_filter_and_sort() {
    let mut view = PagedView::new(Arc::new(moment_collection(25)), 20).unwrap();
    view.set_filter(FilterSpec::new("play.FullName", "lebron"));
    view.set_sort(Some(SortSpec::descending("serialNumber")));
    let before = view.filtered_count();

    view.set_collection(Arc::new(moment_collection(50)));

    assert_eq!(view.filter(), &FilterSpec::new("play.FullName", "lebron"));
    assert!(view.sort().is_some());
    assert!(view.filtered_count() > before);
    let serials: Vec<FieldValue> = view
        .visible_records()
        .iter()
        .filter_map(|r| r.get("serialNumber").cloned())
        .collect();
    assert!(serials
        .windows(2)
        .all(|w| w[0].compare(&w[1]) != std::cmp::Ordering::Less));
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn pages_partition_the_filtered_set(
        records in records_strategy(60),
        (field, query) in filter_strategy(),
        page_size in 1usize..15,
        sorted in any::<bool>(),
    ) {
        let mut view = PagedView::new(Arc::new(Collection::from_records(records)), page_size).unwrap();
        view.set_filter(FilterSpec::new(field, query));
        if sorted {
            view.set_sort(Some(SortSpec::ascending("serialNumber")));
        }

        let expected: Vec<RecordId> = view.filtered_records().iter().map(|r| r.id().clone()).collect();
        prop_assert_eq!(view.page_count(), page_count(expected.len(), page_size));

        let mut joined = Vec::new();
        for index in 0..view.page_count() {
            view.set_page_index(index);
            let page = view.visible_ids();
            prop_assert!(!page.is_empty());
            prop_assert!(page.len() <= page_size);
            joined.extend(page);
        }
        prop_assert_eq!(joined, expected);

        view.set_page_index(view.page_count());
        prop_assert!(view.visible_records().is_empty());
    }

    #[test]
    fn empty_query_is_identity(records in records_strategy(40), field in "[a-zA-Z.]{0,10}") {
        let collection = Arc::new(Collection::from_records(records));
        let mut view = PagedView::new(Arc::clone(&collection), 10).unwrap();
        view.set_filter(FilterSpec::new(field, ""));

        prop_assert_eq!(view.filtered_count(), collection.len());
        let filtered: Vec<RecordId> = view.filtered_records().iter().map(|r| r.id().clone()).collect();
        prop_assert_eq!(filtered, collection.ids());
    }

    #[test]
    fn filter_keeps_collection_order(
        records in records_strategy(40),
        (field, query) in filter_strategy(),
    ) {
        let collection = Arc::new(Collection::from_records(records));
        let mut view = PagedView::new(Arc::clone(&collection), 10).unwrap();
        view.set_filter(FilterSpec::new(field, query));

        let mut remaining = collection.ids().into_iter();
        for record in view.filtered_records() {
            prop_assert!(remaining.any(|id| &id == record.id()));
        }
    }

    #[test]
    fn sort_scope_only_reorders(
        records in records_strategy(40),
        page_size in 1usize..10,
        page_index in 0usize..6,
    ) {
        let collection = Arc::new(Collection::from_records(records));
        let mut whole = PagedView::new(Arc::clone(&collection), page_size).unwrap();
        let mut page_only = whole.clone().with_sort_scope(SortScope::VisiblePage);
        let mut unsorted = whole.clone();
        for view in [&mut whole, &mut page_only, &mut unsorted] {
            view.set_page_index(page_index);
        }
        whole.set_sort(Some(SortSpec::descending("flag")));
        page_only.set_sort(Some(SortSpec::descending("flag")));

        let mut a = whole.filtered_records().iter().map(|r| r.id().clone()).collect::<Vec<_>>();
        a.sort();
        prop_assert_eq!(a, { let mut ids = collection.ids(); ids.sort(); ids });

        let mut b = page_only.visible_ids();
        let mut c = unsorted.visible_ids();
        b.sort();
        c.sort();
        prop_assert_eq!(b, c);
    }
}
