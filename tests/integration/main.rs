//! Integration test suite: searches against seeded in-memory databases.

mod filter_tests;
mod pagination_tests;
mod session_tests;

use bazaar::search::{SearchRequest, SearchResponse, SearchService};
use bazaar::storage::Database;

/// Run a search, panicking with the error text on failure.
pub fn search(service: &SearchService, db: &Database, request: &SearchRequest) -> SearchResponse {
    service
        .search(db, request)
        .unwrap_or_else(|err| panic!("search {request:?} failed: {err}"))
}

pub fn ids(response: &SearchResponse) -> Vec<String> {
    response.results.iter().map(|l| l.id.clone()).collect()
}

pub fn page(query: &str, limit: i64, sort: &str, cursor: Option<&String>) -> SearchRequest {
    SearchRequest {
        limit: Some(limit),
        sort_order: Some(sort.to_string()),
        cursor: cursor.cloned(),
        ..SearchRequest::new(query)
    }
}
