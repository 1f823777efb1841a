//! Search-type selection from the shape of the query.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::text::token_count;

/// Punctuation that forces fuzzy matching.
pub const SPECIAL_CHARS: &str = "!@#$%^&*()-_+=[]{}|\\:;'\"<>,.?/";

/// How free text is matched and ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Trigram similarity, tolerant of typos.
    Fuzzy,
    /// Term matching with a frequency rank.
    FullText,
    /// Blend of both.
    Combined,
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fuzzy => "fuzzy",
            Self::FullText => "full_text",
            Self::Combined => "combined",
        };
        f.write_str(name)
    }
}

/// Classify a query. Rules are checked in order; the first hit wins.
#[must_use]
pub fn select_strategy(query: &str) -> SearchStrategy {
    let tokens = token_count(query);
    // blank queries count zero tokens
    if tokens <= 2 {
        return SearchStrategy::Fuzzy;
    }
    if query.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return SearchStrategy::Fuzzy;
    }
    if tokens >= 4 {
        return SearchStrategy::FullText;
    }
    SearchStrategy::Combined
}
