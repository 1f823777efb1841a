//! Search sessions (`search_id` / `qid`) and token errors.

use std::sync::Arc;
use std::time::Duration;

use bazaar::config::{CacheConfig, SearchConfig};
use bazaar::error::{BazaarError, ErrorCode, Recovery};
use bazaar::search::{RawFilter, SearchCache, SearchRequest, SearchService};
use bazaar::test_utils::fixtures::{TEST_SECRET, furniture_catalog, iphone_catalog, seeded, service};
use serde_json::json;

use super::{ids, page, search};

#[test]
fn session_carries_filters_to_later_pages() {
    let db = seeded(&furniture_catalog());
    let svc = service(&SearchConfig::default());

    let first = SearchRequest {
        limit: Some(1),
        sort_order: Some("price_asc".into()),
        filters: vec![RawFilter {
            role: "color".into(),
            value: json!(["brown", "grey"]),
        }],
        ..SearchRequest::new("")
    };
    let p1 = search(&svc, &db, &first);
    assert_eq!(ids(&p1), ["oak-table"]);

    // no filters repeated: the session supplies them
    let second = SearchRequest {
        limit: Some(1),
        cursor: p1.cursor_after.clone(),
        qid: Some(p1.search_id.clone()),
        ..SearchRequest::new("")
    };
    let p2 = search(&svc, &db, &second);
    assert_eq!(ids(&p2), ["grey-sofa"]);
}

#[test]
fn identical_sessions_share_a_search_id() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());
    let a = search(&svc, &db, &page("iPhone", 2, "price_asc", None));
    let b = search(&svc, &db, &page("iPhone", 2, "price_asc", None));
    assert_eq!(a.search_id, b.search_id);
    assert_eq!(a.cursor_after, b.cursor_after);

    let c = search(&svc, &db, &page("iPhone", 2, "price_desc", None));
    assert_ne!(a.search_id, c.search_id);
}

#[test]
fn cursor_from_another_process_is_not_found() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());
    let token = search(&svc, &db, &page("iPhone", 2, "price_asc", None))
        .cursor_after
        .unwrap();

    let other = service(&SearchConfig::default());
    let err = other
        .search(&db, &page("iPhone", 2, "price_asc", Some(&token)))
        .unwrap_err();
    assert!(matches!(err, BazaarError::CursorNotFound(_)));
    let structured = err.to_structured();
    assert_eq!(structured.code, ErrorCode::CursorNotFound);
    assert_eq!(structured.recovery, Recovery::FreshSearch);
}

#[test]
fn session_token_is_not_a_cursor() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());
    let response = search(&svc, &db, &page("iPhone", 2, "price_asc", None));
    let err = svc
        .search(&db, &page("iPhone", 2, "price_asc", Some(&response.search_id)))
        .unwrap_err();
    assert!(matches!(err, BazaarError::CursorNotFound(_)));
}

#[test]
fn expired_cursor_reports_expiry() {
    let db = iphone_catalog();
    let cache = Arc::new(SearchCache::with_secret(
        &TEST_SECRET,
        &CacheConfig {
            ttl: Duration::from_millis(20),
            sweep_interval: Duration::ZERO,
            ..CacheConfig::default()
        },
    ));
    let svc = SearchService::new(&SearchConfig::default(), Arc::clone(&cache));
    let token = search(&svc, &db, &page("iPhone", 2, "price_asc", None))
        .cursor_after
        .unwrap();
    std::thread::sleep(Duration::from_millis(60));

    let err = svc
        .search(&db, &page("iPhone", 2, "price_asc", Some(&token)))
        .unwrap_err();
    assert!(matches!(err, BazaarError::CursorExpired(_)));
    assert_eq!(err.code(), ErrorCode::CursorExpired);
}

#[test]
fn expired_session_degrades_gracefully() {
    let db = iphone_catalog();
    let cache = Arc::new(SearchCache::with_secret(
        &TEST_SECRET,
        &CacheConfig {
            ttl: Duration::from_millis(20),
            sweep_interval: Duration::ZERO,
            ..CacheConfig::default()
        },
    ));
    let svc = SearchService::new(&SearchConfig::default(), cache);
    let qid = search(&svc, &db, &page("iPhone", 1, "price_desc", None)).search_id;
    std::thread::sleep(Duration::from_millis(60));

    let request = SearchRequest {
        qid: Some(qid),
        ..page("iPhone", 1, "price_asc", None)
    };
    assert_eq!(ids(&search(&svc, &db, &request)), ["iphone-14"]);
}

#[test]
fn sweeper_drops_expired_tokens() {
    let db = iphone_catalog();
    let cache = Arc::new(SearchCache::with_secret(
        &TEST_SECRET,
        &CacheConfig {
            ttl: Duration::from_millis(10),
            sweep_interval: Duration::from_millis(20),
            ..CacheConfig::default()
        },
    ));
    let svc = SearchService::new(&SearchConfig::default(), Arc::clone(&cache));
    search(&svc, &db, &page("iPhone", 2, "price_asc", None));
    assert!(cache.stats().cursors > 0);

    std::thread::sleep(Duration::from_millis(200));
    let stats = cache.stats();
    assert_eq!(stats.cursors, 0);
    assert_eq!(stats.sessions, 0);
    assert!(stats.sweeps > 0);

    cache.close();
    assert!(cache.is_closed());
}

#[test]
fn timeout_zero_disables_deadline() {
    let db = iphone_catalog();
    let svc = service(&SearchConfig::default());
    let request = SearchRequest {
        timeout_ms: Some(0),
        ..page("iPhone", 3, "price_asc", None)
    };
    assert_eq!(search(&svc, &db, &request).results.len(), 3);
}
