//! Cursor/session token round-trips and tamper detection.

use bazaar::config::CacheConfig;
use bazaar::error::BazaarError;
use bazaar::search::filters::{Filter, PriceRange};
use bazaar::search::{Block, CursorEdge, FilterSet, SearchCache, SearchCursor, SearchSession, SortOrder};
use proptest::prelude::*;

fn cache() -> SearchCache {
    let config = CacheConfig {
        sweep_interval: std::time::Duration::ZERO,
        ..CacheConfig::default()
    };
    SearchCache::with_secret(&[3; 32], &config)
}

fn arb_cursor() -> impl Strategy<Value = SearchCursor> {
    (
        prop_oneof![Just(Block::Title), Just(Block::Description)],
        prop::option::of("[a-z0-9-]{1,36}"),
        prop_oneof![Just(CursorEdge::After), Just(CursorEdge::Before)],
    )
        .prop_map(|(block, last_index, edge)| SearchCursor {
            block,
            last_index,
            edge,
        })
}

fn arb_session() -> impl Strategy<Value = SearchSession> {
    (
        "[a-z]{0,12}",
        prop::option::of((0i64..10_000, 0i64..10_000)),
        prop::collection::vec("[a-z]{1,8}", 0..3),
        prop::option::of(any::<bool>()),
        prop_oneof![
            Just(SortOrder::PriceAsc),
            Just(SortOrder::PriceDesc),
            Just(SortOrder::Newest),
            Just(SortOrder::Relevance),
        ],
    )
        .prop_map(|(category, price, mut colors, checkbox, sort_order)| {
            let mut filters = FilterSet::new();
            if let Some((a, b)) = price {
                filters.insert(Filter::Price(PriceRange {
                    min: Some(a.min(b)),
                    max: Some(a.max(b)),
                }));
            }
            colors.sort();
            colors.dedup();
            if !colors.is_empty() {
                filters.insert(Filter::Color(colors));
            }
            if let Some(flag) = checkbox {
                filters.insert(Filter::Checkbox(flag));
            }
            SearchSession {
                category,
                filters,
                sort_order,
                location: None,
            }
        })
}

/// Replace the hex digit at `pos` with a different one.
fn flip_hex(token: &str, pos: usize) -> String {
    let mut chars: Vec<char> = token.chars().collect();
    chars[pos] = if chars[pos] == '0' { '1' } else { '0' };
    chars.into_iter().collect()
}

proptest! {
    #[test]
    fn cursor_round_trips(cursor in arb_cursor()) {
        let cache = cache();
        let token = cache.store_cursor(&cursor).unwrap();
        prop_assert_eq!(cache.get_cursor(&token).unwrap(), cursor);
    }

    #[test]
    fn session_round_trips(session in arb_session()) {
        let cache = cache();
        let token = cache.store_session(&session).unwrap();
        prop_assert_eq!(cache.get_session(&token).unwrap(), session);
    }

    #[test]
    fn storing_twice_reuses_the_token(cursor in arb_cursor()) {
        let cache = cache();
        let a = cache.store_cursor(&cursor).unwrap();
        let b = cache.store_cursor(&cursor).unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(cache.stats().cursors, 1);
    }

    #[test]
    fn tampered_token_is_not_found(
        cursors in prop::collection::vec(arb_cursor(), 1..6),
        pos in 0usize..96,
    ) {
        let cache = cache();
        let tokens: Vec<String> = cursors
            .iter()
            .map(|c| cache.store_cursor(c).unwrap())
            .collect();
        let forged = flip_hex(&tokens[0], pos);
        prop_assume!(!tokens.contains(&forged));
        let result = cache.get_cursor(&forged);
        prop_assert!(matches!(result, Err(BazaarError::CursorNotFound(_))));
    }

    #[test]
    fn arbitrary_strings_never_resolve(token in "[0-9a-f]{0,120}") {
        let cache = cache();
        cache.store_cursor(&SearchCursor::start_of(Block::Title)).unwrap();
        let miss = matches!(cache.get_cursor(&token), Err(BazaarError::CursorNotFound(_)));
        prop_assert!(miss);
    }
}
