//! Predicate and ranking tree for one phase query.
//!
//! Every value a caller can influence lives in a [`Expr::Param`] or a
//! list of bound values; the only text the renderer emits verbatim comes
//! from the closed enums below.

use rusqlite::types::Value;

/// Listing columns reachable from a phase query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Title,
    Description,
    Price,
    CreatedAt,
    DeletedAt,
}

impl Column {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Description => "description",
            Self::Price => "price",
            Self::CreatedAt => "created_at",
            Self::DeletedAt => "deleted_at",
        }
    }
}

/// Registered SQL functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlFn {
    TrgmSimilarity,
    TrgmWordSimilarity,
    FtsMatch,
    FtsRank,
}

impl SqlFn {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TrgmSimilarity => "trgm_similarity",
            Self::TrgmWordSimilarity => "trgm_word_similarity",
            Self::FtsMatch => "fts_match",
            Self::FtsRank => "fts_rank",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(Column),
    /// Bound parameter.
    Param(Value),
    /// Numeric constant fixed in code (ranking weights).
    Const(f64),
    Call(SqlFn, Vec<Self>),
    /// Weighted sum `Σ wᵢ·eᵢ`.
    Weighted(Vec<(f64, Self)>),
    /// Value at a bound JSON path in the listing's characteristics document.
    Characteristic(String),
}

impl Expr {
    #[must_use]
    pub const fn column(column: Column) -> Self {
        Self::Column(column)
    }

    pub fn param(value: impl Into<Value>) -> Self {
        Self::Param(value.into())
    }

    #[must_use]
    pub const fn call(func: SqlFn, args: Vec<Self>) -> Self {
        Self::Call(func, args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Sets a listing id can be tested against.
#[derive(Debug, Clone, PartialEq)]
pub enum Subquery {
    /// Listings filed under the category (matched by id or name) or any descendant.
    CategorySubtree(String),
    /// Listings located within `radius_km` of a point.
    GeoRadius {
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Const(bool),
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(Expr, CmpOp, Expr),
    IsNull(Expr),
    /// Boolean-valued expression.
    Truthy(Expr),
    InList(Expr, Vec<Value>),
    IdIn(Subquery),
    /// Row-value comparison of `keys` against the same keys read from the
    /// anchor listing.
    Keyset {
        keys: Vec<Expr>,
        op: CmpOp,
        anchor_id: String,
    },
}

impl Predicate {
    /// Conjunction that flattens nested `And`s and drops `Const(true)`.
    #[must_use]
    pub fn and(parts: Vec<Self>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Self::Const(true) => {}
                Self::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::Const(true),
            1 => flat.pop().unwrap_or(Self::Const(true)),
            _ => Self::And(flat),
        }
    }

    #[must_use]
    pub fn or(parts: Vec<Self>) -> Self {
        if parts.len() == 1 {
            return parts.into_iter().next().unwrap_or(Self::Const(false));
        }
        Self::Or(parts)
    }

    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Output column an ordering key reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Price,
    CreatedAt,
    Rank,
    Id,
}

impl SortKey {
    #[must_use]
    pub const fn output_name(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::CreatedAt => "created_at",
            Self::Rank => "rank",
            Self::Id => "id",
        }
    }
}

/// A complete phase query: filter, rank, ordering and row bound.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseQuery {
    pub filter: Predicate,
    pub rank: Expr,
    /// Natural order. Every key shares `direction`.
    pub order: Vec<SortKey>,
    pub direction: Direction,
    pub limit: u32,
    /// Read the last `limit` rows before the keyset bound instead of the first after it.
    pub backward: bool,
}
