//! Search request/response surface.
//!
//! Ties together the strategy selector, the pagination orchestrator, the
//! materializer and the token cache. A [`SearchService`] holds no
//! per-request state and can be cloned into worker threads.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{BazaarError, Result};
use crate::storage::cancel::Cancellation;
use crate::storage::sqlite::Database;

use super::cache::SearchCache;
use super::cursor::{GeoFilter, SearchSession, SortOrder};
use super::filters::{FilterSet, RawFilter};
use super::materialize::{Listing, materialize};
use super::pagination::{DbPhases, Phases, paginate};
use super::query::{QueryBuilder, SearchParams};
use super::strategy::select_strategy;

/// A search request as it arrives from a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<RawFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoFilter>,
    /// Overrides `search.query_timeout` for this request. Zero disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<Listing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_before: Option<String>,
    pub search_id: String,
}

/// Executes searches against a [`Database`] using a shared token cache.
#[derive(Debug, Clone)]
pub struct SearchService {
    config: SearchConfig,
    builder: QueryBuilder,
    cache: Arc<SearchCache>,
}

impl SearchService {
    #[must_use]
    pub fn new(config: &SearchConfig, cache: Arc<SearchCache>) -> Self {
        Self {
            config: config.clone(),
            builder: QueryBuilder::new(config),
            cache,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    /// Run a search under the request's deadline.
    pub fn search(&self, db: &Database, request: &SearchRequest) -> Result<SearchResponse> {
        let timeout = request
            .timeout_ms
            .map_or(self.config.query_timeout, Duration::from_millis);
        let cancel = if timeout.is_zero() {
            Cancellation::new()
        } else {
            Cancellation::with_timeout(timeout)
        };
        self.search_with(db, request, &cancel)
    }

    /// Run a search that aborts as soon as `cancel` fires.
    ///
    /// Either the whole page is returned or an error is; no partial results
    /// and no cursors are handed out after a cancellation.
    pub fn search_with(
        &self,
        db: &Database,
        request: &SearchRequest,
        cancel: &Cancellation,
    ) -> Result<SearchResponse> {
        let limit = self.resolve_limit(request.limit)?;
        let session = self.resolve_session(request)?;
        let cursor = match non_empty(request.cursor.as_deref()) {
            Some(token) => Some(self.cache.get_cursor(token)?),
            None => None,
        };
        let search_id = self.cache.store_session(&session)?;

        if limit == 0 {
            return Ok(SearchResponse {
                results: Vec::new(),
                cursor_after: None,
                cursor_before: None,
                search_id,
            });
        }

        let query = request.query.trim();
        let strategy = select_strategy(query);
        let params = SearchParams {
            query,
            strategy,
            category: non_empty(Some(session.category.as_str())),
            geo: session.location.as_ref().filter(|geo| geo.is_active()),
            filters: &session.filters,
            sort: session.sort_order,
        };
        let phases = if query.is_empty() {
            Phases::TitleOnly
        } else {
            Phases::Both
        };
        debug!(%strategy, sort = %session.sort_order, limit, ?phases, "searching");

        cancel.check()?;
        let source = DbPhases {
            db,
            builder: &self.builder,
            params,
            cancel,
        };
        let page = paginate(&source, cursor.as_ref(), limit, phases)?;
        cancel.check()?;

        let rows = page.rows.into_iter().map(|entry| entry.row).collect();
        let results = materialize(db, rows, cancel)?;
        cancel.check()?;

        let cursor_after = page
            .cursor_after
            .map(|c| self.cache.store_cursor(&c))
            .transpose()?;
        let cursor_before = page
            .cursor_before
            .map(|c| self.cache.store_cursor(&c))
            .transpose()?;

        info!(
            results = results.len(),
            has_after = cursor_after.is_some(),
            has_before = cursor_before.is_some(),
            "search complete"
        );
        Ok(SearchResponse {
            results,
            cursor_after,
            cursor_before,
            search_id,
        })
    }

    fn resolve_limit(&self, requested: Option<i64>) -> Result<i64> {
        let limit = requested.unwrap_or(self.config.default_limit);
        let max = self.config.max_limit;
        if !(-max..=max).contains(&limit) {
            return Err(BazaarError::InvalidRequest(format!(
                "limit {limit} is outside -{max}..={max}"
            )));
        }
        Ok(limit)
    }

    /// A resolvable `qid` wins over request values; a stale one degrades.
    fn resolve_session(&self, request: &SearchRequest) -> Result<SearchSession> {
        let filters = FilterSet::decode(&request.filters, self.config.unknown_filters)?;
        let sort_order = match non_empty(request.sort_order.as_deref()) {
            Some(raw) => SortOrder::parse(raw)?,
            None => SortOrder::default_for(&request.query),
        };

        if let Some(qid) = non_empty(request.qid.as_deref()) {
            match self.cache.get_session(qid) {
                Ok(session) => return Ok(session),
                Err(err @ (BazaarError::SessionNotFound(_) | BazaarError::SessionExpired(_))) => {
                    warn!(error = %err, "search session unavailable, using request values");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(SearchSession {
            category: request.category.clone().unwrap_or_default(),
            filters,
            sort_order,
            location: request.location,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
