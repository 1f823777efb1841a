//! Forward/backward paging across the title and description phases.

use bazaar::config::{RelevancePaging, SearchConfig};
use bazaar::test_utils::fixtures::{furniture_catalog, iphone_catalog, seeded, service};
use bazaar::test_utils::logging;

use super::{ids, page, search};

fn iphones(models: std::ops::RangeInclusive<u32>) -> Vec<String> {
    models.map(|m| format!("iphone-{m}")).collect()
}

#[test]
fn iphone_pages_chain_forward_until_exhausted() {
    logging::init();
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());

    let p1 = search(&svc, &db, &page("iPhone", 3, "price_asc", None));
    assert_eq!(ids(&p1), iphones(14..=16));
    assert!(p1.cursor_before.is_none());

    let p2 = search(&svc, &db, &page("iPhone", 3, "price_asc", p1.cursor_after.as_ref()));
    assert_eq!(ids(&p2), iphones(17..=19));

    let p3 = search(&svc, &db, &page("iPhone", 3, "price_asc", p2.cursor_after.as_ref()));
    assert_eq!(ids(&p3), iphones(20..=22));
    assert!(p3.cursor_after.is_some());

    let p4 = search(&svc, &db, &page("iPhone", 3, "price_asc", p3.cursor_after.as_ref()));
    assert!(p4.results.is_empty());
    assert!(p4.cursor_after.is_none());
    assert!(p4.cursor_before.is_none());
}

#[test]
fn negative_limit_with_after_cursor_is_idempotent() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());

    let p1 = search(&svc, &db, &page("iPhone", 3, "price_asc", None));
    let p2 = search(&svc, &db, &page("iPhone", 3, "price_asc", p1.cursor_after.as_ref()));
    // cursor after listing 6
    let after_six = p2.cursor_after.as_ref();

    for _ in 0..3 {
        let back = search(&svc, &db, &page("iPhone", -3, "price_asc", after_six));
        assert_eq!(ids(&back), iphones(17..=19));
    }
}

#[test]
fn cursor_before_retraces_earlier_pages() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());

    let p1 = search(&svc, &db, &page("iPhone", 3, "price_desc", None));
    let p2 = search(&svc, &db, &page("iPhone", 3, "price_desc", p1.cursor_after.as_ref()));
    let p3 = search(&svc, &db, &page("iPhone", 3, "price_desc", p2.cursor_after.as_ref()));
    assert_eq!(ids(&p3), ["iphone-16", "iphone-15", "iphone-14"]);

    let b2 = search(&svc, &db, &page("iPhone", -3, "price_desc", p3.cursor_before.as_ref()));
    assert_eq!(ids(&b2), ids(&p2));
    let b1 = search(&svc, &db, &page("iPhone", -3, "price_desc", b2.cursor_before.as_ref()));
    assert_eq!(ids(&b1), ids(&p1));
}

#[test]
fn before_cursor_going_forward_repeats_its_page() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());

    let p1 = search(&svc, &db, &page("iPhone", 4, "newest", None));
    let p2 = search(&svc, &db, &page("iPhone", 4, "newest", p1.cursor_after.as_ref()));
    let again = search(&svc, &db, &page("iPhone", 4, "newest", p2.cursor_before.as_ref()));
    assert_eq!(ids(&again), ids(&p2));
}

#[test]
fn title_matches_precede_description_matches() {
    logging::init();
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());

    let all = search(&svc, &db, &page("oak table", 10, "relevance", None));
    assert_eq!(ids(&all), ["oak-table", "brass-lamp"]);
    assert!(all.cursor_after.is_none());
}

#[test]
fn paging_crosses_from_title_into_description_and_back() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());

    let p1 = search(&svc, &db, &page("oak table", 1, "price_asc", None));
    assert_eq!(ids(&p1), ["oak-table"]);

    let p2 = search(&svc, &db, &page("oak table", 1, "price_asc", p1.cursor_after.as_ref()));
    assert_eq!(ids(&p2), ["brass-lamp"]);
    assert!(p2.cursor_after.is_some());

    let p3 = search(&svc, &db, &page("oak table", 1, "price_asc", p2.cursor_after.as_ref()));
    assert!(p3.results.is_empty());
    assert!(p3.cursor_after.is_none());

    let back = search(&svc, &db, &page("oak table", -1, "price_asc", p2.cursor_before.as_ref()));
    assert_eq!(ids(&back), ids(&p1));
}

#[test]
fn pages_never_repeat_a_listing() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let response = search(&svc, &db, &page("oak table", 1, "newest", cursor.as_ref()));
        seen.extend(ids(&response));
        match response.cursor_after {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), seen.len(), "duplicates in {seen:?}");
    assert_eq!(seen.len(), 2);
}

#[test]
fn relevance_pages_are_exact_under_keyset_mode() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());

    let full = search(&svc, &db, &page("iPhone", 9, "relevance", None));
    let p1 = search(&svc, &db, &page("iPhone", 5, "relevance", None));
    let p2 = search(&svc, &db, &page("iPhone", 5, "relevance", p1.cursor_after.as_ref()));
    let mut chained = ids(&p1);
    chained.extend(ids(&p2));
    assert_eq!(chained, ids(&full));
}

#[test]
fn approximate_relevance_paging_has_no_cursor_bound() {
    let db = iphone_catalog();
    let config = SearchConfig {
        relevance_paging: RelevancePaging::Approximate,
        ..SearchConfig::default()
    };
    let svc = service(&config);
    let p1 = search(&svc, &db, &page("iPhone", 4, "relevance", None));
    let p2 = search(&svc, &db, &page("iPhone", 4, "relevance", p1.cursor_after.as_ref()));
    assert_eq!(p1.results.len(), 4);
    assert!(p1.cursor_after.is_some());
    // the cursor row is not excluded, so the scan restarts from the top
    assert_eq!(ids(&p2), ids(&p1));
}

#[test]
fn empty_query_browses_newest_first() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());
    let mut request = page("", 2, "newest", None);
    request.sort_order = None;
    let response = search(&svc, &db, &request);
    assert_eq!(ids(&response), ["iphone-22", "iphone-21"]);
}

#[test]
fn soft_deleted_listings_disappear() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());
    assert!(db.soft_delete_listing("iphone-14").unwrap());
    let response = search(&svc, &db, &page("iPhone", 3, "price_asc", None));
    assert_eq!(ids(&response), iphones(15..=17));
}
