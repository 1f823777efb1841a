//! Assemble the per-phase query tree from search parameters.

use rusqlite::types::Value;

use crate::config::{RelevancePaging, SearchConfig};
use crate::search::cursor::{Block, CursorEdge, GeoFilter, SearchCursor, SortOrder};
use crate::search::filters::{Filter, FilterSet};
use crate::search::strategy::SearchStrategy;

use super::ast::{CmpOp, Column, Direction, Expr, PhaseQuery, Predicate, SortKey, SqlFn, Subquery};
use super::render::{RenderedQuery, render};

/// Weights of the combined rank: trigram similarity, word similarity, text rank.
const COMBINED_WEIGHTS: (f64, f64, f64) = (0.6, 0.4, 0.4);

/// Everything about a search that stays fixed across its pages.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams<'a> {
    pub query: &'a str,
    pub strategy: SearchStrategy,
    pub category: Option<&'a str>,
    pub geo: Option<&'a GeoFilter>,
    pub filters: &'a FilterSet,
    pub sort: SortOrder,
}

impl SearchParams<'_> {
    fn is_browse(&self) -> bool {
        self.query.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    similarity_threshold: f64,
    word_similarity_threshold: f64,
    relevance_paging: RelevancePaging,
}

impl QueryBuilder {
    #[must_use]
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            word_similarity_threshold: config.word_similarity_threshold,
            relevance_paging: config.relevance_paging,
        }
    }

    /// Build and render the query for one phase.
    ///
    /// `limit` is signed: a negative value reads the page that ends at the
    /// cursor instead of the one that starts after it. It must not be zero.
    #[must_use]
    pub fn build(
        &self,
        params: &SearchParams<'_>,
        block: Block,
        cursor: Option<&SearchCursor>,
        limit: i64,
    ) -> RenderedQuery {
        render(&self.phase(params, block, cursor, limit))
    }

    #[must_use]
    pub fn phase(
        &self,
        params: &SearchParams<'_>,
        block: Block,
        cursor: Option<&SearchCursor>,
        limit: i64,
    ) -> PhaseQuery {
        let backward = limit < 0;
        let rank = self.rank(params, block);
        let (order, direction) = ordering(params.sort);

        let mut parts = vec![Predicate::IsNull(Expr::column(Column::DeletedAt))];
        if let Some(category) = params.category.map(str::trim).filter(|c| !c.is_empty()) {
            parts.push(Predicate::IdIn(Subquery::CategorySubtree(category.to_string())));
        }
        if let Some(geo) = params.geo.filter(|g| g.is_active()) {
            parts.push(Predicate::IdIn(Subquery::GeoRadius {
                latitude: geo.latitude,
                longitude: geo.longitude,
                radius_km: geo.radius_km,
            }));
        }
        parts.extend(params.filters.iter().flat_map(filter_predicates));
        parts.push(self.phase_match(params, block));

        let anchor = cursor
            .filter(|c| c.block == block)
            .and_then(|c| c.last_index.as_deref().map(|id| (id, c.edge)));
        if let Some((anchor_id, edge)) = anchor {
            if self.keyset_applies(params) {
                let keys = order
                    .iter()
                    .map(|key| match key {
                        SortKey::Price => Expr::column(Column::Price),
                        SortKey::CreatedAt => Expr::column(Column::CreatedAt),
                        SortKey::Rank => rank.clone(),
                        SortKey::Id => Expr::column(Column::Id),
                    })
                    .collect();
                parts.push(Predicate::Keyset {
                    keys,
                    op: keyset_op(direction, edge, backward),
                    anchor_id: anchor_id.to_string(),
                });
            }
        }

        PhaseQuery {
            filter: Predicate::and(parts),
            rank,
            order,
            direction,
            limit: u32::try_from(limit.unsigned_abs()).unwrap_or(u32::MAX),
            backward,
        }
    }

    fn keyset_applies(&self, params: &SearchParams<'_>) -> bool {
        !(params.sort == SortOrder::Relevance
            && !params.is_browse()
            && self.relevance_paging == RelevancePaging::Approximate)
    }

    fn rank(&self, params: &SearchParams<'_>, block: Block) -> Expr {
        if params.sort != SortOrder::Relevance || params.is_browse() {
            return Expr::Const(0.0);
        }
        let column = block_column(block);
        let query = params.query;
        match params.strategy {
            SearchStrategy::Fuzzy => similarity(column, query),
            SearchStrategy::FullText => text_rank(column, query),
            SearchStrategy::Combined => {
                let (w_sim, w_word, w_text) = COMBINED_WEIGHTS;
                Expr::Weighted(vec![
                    (w_sim, similarity(column, query)),
                    (w_word, word_similarity(column, query)),
                    (w_text, text_rank(column, query)),
                ])
            }
        }
    }

    /// Text predicate for a phase. Description rows exclude title matches so
    /// each listing belongs to exactly one phase.
    fn phase_match(&self, params: &SearchParams<'_>, block: Block) -> Predicate {
        if params.is_browse() {
            return Predicate::Const(block == Block::Title);
        }
        match block {
            Block::Title => self.text_match(params, Column::Title),
            Block::Description => Predicate::and(vec![
                self.text_match(params, Column::Description),
                Predicate::not(self.text_match(params, Column::Title)),
            ]),
        }
    }

    fn text_match(&self, params: &SearchParams<'_>, column: Column) -> Predicate {
        let query = params.query;
        let fuzzy = || {
            Predicate::Or(vec![
                Predicate::Compare(
                    similarity(column, query),
                    CmpOp::Ge,
                    Expr::param(self.similarity_threshold),
                ),
                Predicate::Compare(
                    word_similarity(column, query),
                    CmpOp::Ge,
                    Expr::param(self.word_similarity_threshold),
                ),
            ])
        };
        let full_text = || {
            Predicate::Truthy(Expr::call(
                SqlFn::FtsMatch,
                vec![Expr::column(column), Expr::param(query.to_string())],
            ))
        };
        match params.strategy {
            SearchStrategy::Fuzzy => fuzzy(),
            SearchStrategy::FullText => full_text(),
            SearchStrategy::Combined => Predicate::Or(vec![fuzzy(), full_text()]),
        }
    }
}

const fn block_column(block: Block) -> Column {
    match block {
        Block::Title => Column::Title,
        Block::Description => Column::Description,
    }
}

fn similarity(column: Column, query: &str) -> Expr {
    Expr::call(
        SqlFn::TrgmSimilarity,
        vec![Expr::column(column), Expr::param(query.to_string())],
    )
}

fn word_similarity(column: Column, query: &str) -> Expr {
    Expr::call(
        SqlFn::TrgmWordSimilarity,
        vec![Expr::param(query.to_string()), Expr::column(column)],
    )
}

fn text_rank(column: Column, query: &str) -> Expr {
    Expr::call(SqlFn::FtsRank, vec![Expr::column(column), Expr::param(query.to_string())])
}

/// Natural ordering keys; the id tie-breaker makes the order total.
#[must_use]
pub fn ordering(sort: SortOrder) -> (Vec<SortKey>, Direction) {
    let (key, direction) = match sort {
        SortOrder::PriceAsc => (SortKey::Price, Direction::Asc),
        SortOrder::PriceDesc => (SortKey::Price, Direction::Desc),
        SortOrder::Newest => (SortKey::CreatedAt, Direction::Desc),
        SortOrder::Relevance => (SortKey::Rank, Direction::Desc),
    };
    (vec![key, SortKey::Id], direction)
}

/// Comparison selecting rows on the scanned side of the anchor.
///
/// An `After` cursor excludes its anchor going forward and includes it going
/// backward; a `Before` cursor does the opposite.
const fn keyset_op(direction: Direction, edge: CursorEdge, backward: bool) -> CmpOp {
    let inclusive = matches!(
        (edge, backward),
        (CursorEdge::Before, false) | (CursorEdge::After, true)
    );
    let later = matches!(
        (direction, backward),
        (Direction::Asc, false) | (Direction::Desc, true)
    );
    match (later, inclusive) {
        (true, false) => CmpOp::Gt,
        (true, true) => CmpOp::Ge,
        (false, false) => CmpOp::Lt,
        (false, true) => CmpOp::Le,
    }
}

fn filter_predicates(filter: &Filter) -> Vec<Predicate> {
    fn bounds(target: &Expr, min: Option<Value>, max: Option<Value>) -> Vec<Predicate> {
        let mut out = Vec::with_capacity(2);
        if let Some(min) = min {
            out.push(Predicate::Compare(target.clone(), CmpOp::Ge, Expr::Param(min)));
        }
        if let Some(max) = max {
            out.push(Predicate::Compare(target.clone(), CmpOp::Le, Expr::Param(max)));
        }
        out
    }

    let field = |role: &str| Expr::Characteristic(format!("$.{role}"));

    match filter {
        Filter::Price(range) => bounds(
            &Expr::column(Column::Price),
            range.min.map(Value::Integer),
            range.max.map(Value::Integer),
        ),
        Filter::Color(values) | Filter::Dropdown(values) => vec![Predicate::InList(
            field(filter.role().as_str()),
            values.iter().cloned().map(Value::Text).collect(),
        )],
        Filter::Checkbox(flag) => vec![Predicate::Compare(
            field(filter.role().as_str()),
            CmpOp::Eq,
            Expr::param(i64::from(*flag)),
        )],
        Filter::Dimension(dim, range) => {
            let (min, max) = range.base_bounds();
            bounds(
                &field(dim.role().as_str()),
                min.map(Value::Real),
                max.map(Value::Real),
            )
        }
    }
}
