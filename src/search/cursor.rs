//! Pagination state and search sessions.
//!
//! Both are plain values: they carry no token and no expiry. The cache in
//! [`super::cache`] turns them into opaque tokens and back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BazaarError, Result};

use super::filters::FilterSet;

/// Result phase a row came from. Title rows always precede description rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Title,
    Description,
}

/// Which side of the anchor row a cursor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorEdge {
    /// Just after the anchor: the next page excludes it, the previous page ends at it.
    #[default]
    After,
    /// Just before the anchor: the previous page excludes it, the next page starts at it.
    Before,
}

/// Resume point inside the two-phase scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchCursor {
    pub block: Block,
    /// Anchor listing id; absent until a row of `block` has been returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_index: Option<String>,
    #[serde(default)]
    pub edge: CursorEdge,
}

impl SearchCursor {
    /// Cursor just after `id`, the shape minted as `cursor_after`.
    #[must_use]
    pub fn after(block: Block, id: impl Into<String>) -> Self {
        Self {
            block,
            last_index: Some(id.into()),
            edge: CursorEdge::After,
        }
    }

    /// Cursor just before `id`, the shape minted as `cursor_before`.
    #[must_use]
    pub fn before(block: Block, id: impl Into<String>) -> Self {
        Self {
            block,
            last_index: Some(id.into()),
            edge: CursorEdge::Before,
        }
    }

    /// Start of a block, with no anchor row.
    #[must_use]
    pub const fn start_of(block: Block) -> Self {
        Self {
            block,
            last_index: None,
            edge: CursorEdge::After,
        }
    }
}

/// Result ordering. Direction is part of the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    Newest,
    Relevance,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Newest => "newest",
            Self::Relevance => "relevance",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "newest" => Ok(Self::Newest),
            "relevance" => Ok(Self::Relevance),
            other => Err(BazaarError::InvalidRequest(format!(
                "unknown sort_order '{other}' (expected price_asc, price_desc, newest or relevance)"
            ))),
        }
    }

    /// Default order: newest when browsing, relevance for a text query.
    #[must_use]
    pub fn default_for(query: &str) -> Self {
        if query.trim().is_empty() {
            Self::Newest
        } else {
            Self::Relevance
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Radius around a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFilter {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl GeoFilter {
    /// A radius of zero or a point at (0, 0) means "no location constraint".
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.radius_km > 0.0 && !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}

/// Everything needed to reproduce a result ordering on later pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSession {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub filters: FilterSet,
    pub sort_order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoFilter>,
}

impl SearchSession {
    #[must_use]
    pub fn new(sort_order: SortOrder) -> Self {
        Self {
            category: String::new(),
            filters: FilterSet::new(),
            sort_order,
            location: None,
        }
    }
}
