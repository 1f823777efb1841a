//! Listing search with two-phase cursor pagination
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                 SearchRequest (query, filters, cursor, qid)    │
//! └────────────────────────────────────────────────────────────────┘
//!                     │                          │
//!                     ▼                          ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────────┐
//! │   Strategy selector          │  │   SearchCache                │
//! │   (strategy.rs)              │  │   (cursor + session tokens)  │
//! └──────────────────────────────┘  └──────────────────────────────┘
//!                     │                          │
//!                     └──────────┬───────────────┘
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │  Pagination (pagination.rs)   │
//!                │  title phase → description    │
//!                └───────────────────────────────┘
//!                                │  QueryBuilder → AST → SQL
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │  Materializer (side reads)    │
//!                └───────────────────────────────┘
//!                                │
//!                                ▼
//!                 SearchResponse + minted tokens
//! ```

pub mod cache;
pub mod cursor;
pub mod filters;
pub mod materialize;
pub mod pagination;
pub mod query;
pub mod service;
pub mod strategy;
pub mod text;

// Re-export main types
pub use cache::{CacheStats, SearchCache};
pub use cursor::{Block, CursorEdge, GeoFilter, SearchCursor, SearchSession, SortOrder};
pub use filters::{Filter, FilterRole, FilterSet, RawFilter};
pub use materialize::Listing;
pub use pagination::{Page, Phases, paginate};
pub use service::{SearchRequest, SearchResponse, SearchService};
pub use strategy::{SearchStrategy, select_strategy};
