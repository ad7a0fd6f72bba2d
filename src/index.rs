//! Token index over the flattened dataset.
//!
//! Decklists are typed by hand, in French or English, with or without
//! accents, and often abbreviated ("Elsa snow", "Mickey - Brave"). The index
//! matches them strictly enough to avoid false positives and loosely enough to
//! forgive case, diacritics, dash styles and truncated words.
//!
//! ## Normalization
//!
//! [`normalize`] lowercases, unifies `–` `—` `−` to `-`, strips combining
//! marks after canonical decomposition (`é` → `e`), and trims. It is
//! idempotent.
//!
//! ## Matching
//!
//! [`CardIndex::search`] applies, in order:
//!
//! 1. **Exact title**: if the normalized query equals some entries' normalized
//!    full title (`name – subtitle`), only those entries are returned.
//! 2. **Token match**: otherwise an entry matches when *every* query token
//!    matches *some* entry token, either exactly or, for query tokens of three
//!    characters or more, as a prefix. No scoring, no edit distance.
//! 3. An empty query, or one without tokens, returns nothing.
//!
//! Results keep index order and are deduplicated by identifier.

use crate::card::{Card, TITLE_SEPARATOR};
use std::collections::{BTreeSet, HashSet};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Minimum query-token length for prefix matching.
const MIN_PREFIX_LEN: usize = 3;

/// Fold a string for comparison. See the [module docs](self).
pub fn normalize(text: &str) -> String {
    let unified: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            other => other,
        })
        .collect();
    let stripped: String = unified.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped.trim().to_string()
}

/// Split a string into normalized word tokens.
///
/// Any run of characters outside `[a-z0-9]` separates tokens, so letters
/// that survive normalization without an ASCII form (`ß`, `ø`) split words.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn token_matches(query: &str, candidate: &str) -> bool {
    query == candidate || (query.len() >= MIN_PREFIX_LEN && candidate.starts_with(query))
}

/// One searchable record, derived once at build time.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub card: Card,
    pub title: String,
    pub tokens: BTreeSet<String>,
}

impl IndexEntry {
    pub fn new(card: Card) -> Self {
        let name = card.name().to_string();
        let subtitle = card.subtitle().unwrap_or("").to_string();
        let full_title = if subtitle.is_empty() {
            name.clone()
        } else {
            format!("{name}{TITLE_SEPARATOR}{subtitle}")
        };

        let mut tokens: BTreeSet<String> = tokenize(&full_title).into_iter().collect();
        tokens.extend(tokenize(&name));
        tokens.extend(tokenize(&subtitle));
        for keyword in card.keywords() {
            tokens.extend(tokenize(keyword));
        }

        Self {
            title: normalize(&full_title),
            tokens,
            card,
        }
    }

    /// Whether every query token matches at least one entry token.
    pub fn matches_tokens(&self, query_tokens: &[String]) -> bool {
        query_tokens
            .iter()
            .all(|q| self.tokens.iter().any(|c| token_matches(q, c)))
    }
}

/// Immutable search structure over a flattened dataset.
#[derive(Debug, Clone, Default)]
pub struct CardIndex {
    entries: Vec<IndexEntry>,
}

impl CardIndex {
    /// Build the index. Entry order follows `cards` order.
    pub fn build(cards: Vec<Card>) -> Self {
        Self {
            entries: cards.into_iter().map(IndexEntry::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Find the cards matching a free-text query, best rule first.
    pub fn search(&self, query: &str) -> Vec<&Card> {
        let q_norm = normalize(query);
        if q_norm.is_empty() {
            return Vec::new();
        }
        let q_tokens = tokenize(&q_norm);
        if q_tokens.is_empty() {
            return Vec::new();
        }

        let exact: Vec<&Card> = self
            .entries
            .iter()
            .filter(|e| e.title == q_norm)
            .map(|e| &e.card)
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| e.matches_tokens(&q_tokens))
            .map(|e| &e.card)
            .filter(|card| seen.insert(card.identifier()))
            .collect()
    }
}
