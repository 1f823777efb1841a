//! Pagination over random catalogs: no duplicates, full coverage, symmetry.

use std::collections::HashSet;

use bazaar::config::SearchConfig;
use bazaar::search::{SearchRequest, SearchResponse, SearchService};
use bazaar::storage::{Catalog, Database, NewListing};
use bazaar::test_utils::fixtures::{seeded, service};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

/// `(matches by title, price)` per listing; the rest match by description.
fn arb_catalog() -> impl Strategy<Value = Vec<(bool, i64)>> {
    prop::collection::vec((any::<bool>(), 1i64..50), 1..14)
}

fn build(shape: &[(bool, i64)]) -> Database {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let listings = shape
        .iter()
        .enumerate()
        .map(|(n, &(by_title, price))| {
            let (title, description) = if by_title {
                (format!("Widget {n}"), "boxed".to_string())
            } else {
                (format!("Gadget {n}"), "works like a widget".to_string())
            };
            let mut listing = NewListing::new(title, price);
            listing.id = Some(format!("item-{n:02}"));
            listing.description = description;
            listing.created_at = Some(base + Duration::minutes(i64::try_from(n).unwrap()));
            listing
        })
        .collect();
    seeded(&Catalog {
        categories: Vec::new(),
        listings,
    })
}

fn run(svc: &SearchService, db: &Database, limit: i64, sort: &str, cursor: Option<&String>) -> SearchResponse {
    let request = SearchRequest {
        limit: Some(limit),
        sort_order: Some(sort.to_string()),
        cursor: cursor.cloned(),
        ..SearchRequest::new("widget")
    };
    svc.search(db, &request).unwrap()
}

fn ids(response: &SearchResponse) -> Vec<String> {
    response.results.iter().map(|l| l.id.clone()).collect()
}

fn arb_sort() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("price_asc"),
        Just("price_desc"),
        Just("newest"),
        Just("relevance"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn forward_walk_covers_everything_once(shape in arb_catalog(), limit in 1i64..5, sort in arb_sort()) {
        let db = build(&shape);
        let svc = service(&SearchConfig::default());

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        let mut titles_done = false;
        for _ in 0..=shape.len() {
            let page = run(&svc, &db, limit, sort, cursor.as_ref());
            prop_assert!(page.results.len() <= usize::try_from(limit).unwrap());
            for listing in &page.results {
                // title rows never follow description rows
                let by_title = listing.title.starts_with("Widget");
                prop_assert!(!(titles_done && by_title));
                titles_done |= !by_title;
            }
            seen.extend(ids(&page));
            match page.cursor_after {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let unique: HashSet<&String> = seen.iter().collect();
        prop_assert_eq!(unique.len(), seen.len());
        prop_assert_eq!(seen.len(), shape.len());
    }

    #[test]
    fn backward_walk_retraces_forward_pages(shape in arb_catalog(), limit in 1i64..5, sort in arb_sort()) {
        let db = build(&shape);
        let svc = service(&SearchConfig::default());

        let mut pages = vec![run(&svc, &db, limit, sort, None)];
        while let Some(next) = pages.last().and_then(|p| p.cursor_after.clone()) {
            pages.push(run(&svc, &db, limit, sort, Some(&next)));
        }

        for i in (1..pages.len()).rev() {
            let Some(before) = pages[i].cursor_before.as_ref() else {
                prop_assert!(pages[i].results.is_empty());
                continue;
            };
            let back = run(&svc, &db, -limit, sort, Some(before));
            prop_assert_eq!(ids(&back), ids(&pages[i - 1]));
        }
    }
}
