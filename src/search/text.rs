//! Text primitives behind the ranking functions.
//!
//! Trigram semantics follow pg_trgm: text is lowercased, split into words on
//! non-alphanumeric characters, and every word is padded with two leading
//! blanks and one trailing blank before trigrams are taken. Similarities are
//! computed over trigram *sets*.
//!
//! Full-text terms are normalized words minus a small stopword list, with a
//! light suffix-stripping stemmer so "phones" and "phone" meet.

use std::collections::{BTreeSet, HashMap};

use unicode_normalization::UnicodeNormalization;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "the", "to", "with",
];

/// NFKC-normalize and lowercase.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Split normalized text into alphanumeric words.
pub fn words(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Number of whitespace-delimited tokens, the unit the strategy selector counts.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// pg_trgm-style trigram set of `text`.
pub fn trigrams(text: &str) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    for word in words(text) {
        let padded: Vec<char> = "  ".chars().chain(word.chars()).chain(" ".chars()).collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }
    set
}

/// `|A ∩ B| / |A ∪ B|` over trigram sets, 0 when both are empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    let ta = trigrams(a);
    let tb = trigrams(b);
    let shared = ta.intersection(&tb).count();
    let union = ta.len() + tb.len() - shared;
    if union == 0 {
        return 0.0;
    }
    shared as f64 / union as f64
}

/// Share of the needle's trigrams found in the haystack.
///
/// Equals pg_trgm's `word_similarity(needle, haystack)` whenever the best
/// matching extent covers every matched trigram, which holds for ordinary
/// listing titles.
pub fn word_similarity(needle: &str, haystack: &str) -> f64 {
    let tn = trigrams(needle);
    if tn.is_empty() {
        return 0.0;
    }
    let th = trigrams(haystack);
    tn.intersection(&th).count() as f64 / tn.len() as f64
}

fn stem(word: &str) -> String {
    let len = word.chars().count();
    for suffix in ["ing", "ed"] {
        if len > suffix.len() + 3 && word.ends_with(suffix) {
            return word[..word.len() - suffix.len()].to_string();
        }
    }
    if len > 3 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Full-text terms of `text`, in order, duplicates kept.
pub fn terms(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|w| stem(&w))
        .collect()
}

/// Whether every distinct query term occurs in the document.
pub fn text_match(document: &str, query: &str) -> bool {
    let query_terms: BTreeSet<String> = terms(query).into_iter().collect();
    if query_terms.is_empty() {
        return false;
    }
    let doc_terms: BTreeSet<String> = terms(document).into_iter().collect();
    query_terms.is_subset(&doc_terms)
}

/// Frequency-saturated rank in `[0, 1)`: mean over distinct query terms of `tf / (tf + 1)`.
pub fn text_rank(document: &str, query: &str) -> f64 {
    let query_terms: BTreeSet<String> = terms(query).into_iter().collect();
    if query_terms.is_empty() {
        return 0.0;
    }
    let mut tf: HashMap<String, usize> = HashMap::new();
    for term in terms(document) {
        *tf.entry(term).or_default() += 1;
    }
    let total: f64 = query_terms
        .iter()
        .map(|term| {
            let n = tf.get(term).copied().unwrap_or(0) as f64;
            n / (n + 1.0)
        })
        .sum();
    total / query_terms.len() as f64
}
