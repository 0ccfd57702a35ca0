mod common;

use common::{seed, setup};
use rowkeep_core::{ErrorKind, Filter, PageQuery, SortDirection, SortFallback};
use std::collections::HashSet;

fn names(page: &rowkeep_core::PageResult<common::UserView>) -> Vec<&str> {
    page.items.iter().map(|view| view.user.name.as_str()).collect()
}

#[test]
fn descending_first_page_holds_top_two() {
    let fixture = setup();
    seed(&fixture, &["a", "b", "c"]);

    let query = PageQuery::new("name", SortDirection::Descending).with_page(2, 0);
    let page = fixture
        .store
        .page_blocking(&Filter::all(), &query, None)
        .data
        .unwrap();

    assert_eq!(names(&page), vec!["c", "b"]);
    assert_eq!(page.total_items, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.page_index, 0);
    assert_eq!(page.page_size, 2);

    let last = fixture
        .store
        .page_blocking(&Filter::all(), &query.clone().with_page(2, 1), None)
        .data
        .unwrap();
    assert_eq!(names(&last), vec!["a"]);
}

#[test]
fn pages_cover_every_row_exactly_once() {
    let fixture = setup();
    // Duplicated sort values exercise the key tiebreak.
    seed(&fixture, &["m", "k", "m", "a", "k", "z", "m"]);

    let mut seen = HashSet::new();
    let mut total = 0;
    for index in 0..3 {
        let query = PageQuery::new("name", SortDirection::Ascending).with_page(3, index);
        let page = fixture
            .store
            .page_blocking(&Filter::all(), &query, None)
            .data
            .unwrap();
        assert_eq!(page.total_pages, 3);
        total += page.items.len();
        seen.extend(page.items.iter().map(|view| view.user.id));
    }

    assert_eq!(total, 7);
    assert_eq!(seen.len(), 7);
}

#[test]
fn page_past_the_end_is_empty_but_reports_totals() {
    let fixture = setup();
    seed(&fixture, &["a", "b"]);

    let query = PageQuery::new("name", SortDirection::Ascending).with_page(2, 5);
    let page = fixture
        .store
        .page_blocking(&Filter::all(), &query, None)
        .data
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total_items, 2);
    assert_eq!(page.total_pages, 1);
}

#[test]
fn filter_applies_before_totals() {
    let fixture = setup();
    seed(&fixture, &["a", "b", "c", "d"]);

    let query = PageQuery::new("age", SortDirection::Descending).with_page(10, 0);
    let page = fixture
        .store
        .page_blocking(&Filter::gt("age", 21), &query, None)
        .data
        .unwrap();

    assert_eq!(page.total_items, 2);
    assert_eq!(names(&page), vec!["d", "c"]);
}

#[test]
fn without_page_size_everything_is_one_page() {
    let fixture = setup();
    seed(&fixture, &["b", "a"]);

    let query = PageQuery::new("name", SortDirection::Ascending);
    let page = fixture
        .store
        .page_blocking(&Filter::all(), &query, None)
        .data
        .unwrap();
    assert_eq!(names(&page), vec!["a", "b"]);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.page_index, 0);
    assert_eq!(page.page_size, 2);

    let empty = fixture
        .store
        .page_blocking(&Filter::eq("name", "zed"), &query, None)
        .data
        .unwrap();
    assert!(empty.items.is_empty());
    assert_eq!(empty.total_pages, 0);
}

#[test]
fn zero_page_size_behaves_like_no_page_size() {
    let fixture = setup();
    seed(&fixture, &["a", "b", "c"]);

    let query = PageQuery::new("name", SortDirection::Ascending).with_page(0, 4);
    let page = fixture
        .store
        .page_blocking(&Filter::all(), &query, None)
        .data
        .unwrap();

    assert_eq!(page.items.len(), 3);
    assert_eq!(page.page_index, 0);
    assert_eq!(page.total_pages, 1);
}

#[test]
fn unknown_sort_field_falls_back_to_first_declared_field() {
    let fixture = setup();
    let users = seed(&fixture, &["c", "a", "b"]);

    let query = PageQuery::new("nickname", SortDirection::Descending).with_page(3, 0);
    let outcome = fixture.store.page_blocking(&Filter::all(), &query, None);

    assert!(outcome.succeeded);
    let ids: Vec<i64> = outcome
        .data
        .unwrap()
        .items
        .iter()
        .map(|view| view.user.id)
        .collect();
    let mut expected: Vec<i64> = users.iter().map(|user| user.id).collect();
    expected.reverse();
    assert_eq!(ids, expected);
}

#[test]
fn unknown_sort_field_is_rejected_when_configured() {
    let fixture = setup();
    seed(&fixture, &["a"]);
    let store = fixture.store.with_sort_fallback(SortFallback::Reject);

    let query = PageQuery::new("nickname", SortDirection::Ascending).with_page(3, 0);
    let outcome = store.page_blocking(&Filter::all(), &query, None);

    assert!(!outcome.succeeded);
    assert!(outcome.data.is_none());
    assert_eq!(
        outcome.error_kind(),
        Some(ErrorKind::FieldResolutionFailure)
    );
}

#[test]
fn page_query_reads_wire_shape() {
    let query: PageQuery = serde_json::from_str(
        r#"{ "orderByField": "name", "direction": 1, "pageSize": 2, "pageIndex": 0 }"#,
    )
    .unwrap();

    assert_eq!(query.direction, SortDirection::Descending);
    assert_eq!(query.page_size, Some(2));
}
