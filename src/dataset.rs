//! Dataset loading and flattening.
//!
//! The source dataset is a JSON document with a top-level `cards` key:
//!
//! ```text
//! {"cards": [ {card}, {card}, ... ]}                       # plain list
//! {"cards": {"TFC": [ {card}, ... ], "promo": {card}}}     # named subsets
//! ```
//!
//! Cards may carry other cards inside list- or object-valued fields
//! (`variants`, `promos`, reprints). [`flatten`] walks each root card depth
//! first and emits every object it reaches exactly once, keyed by
//! [`Card::identifier`]. A card is emitted *before* its descendants, and all
//! of its descendants are visited before the walk moves on to its next
//! sibling, so the output order is deterministic first-discovery order.
//!
//! Flattening is idempotent: feeding an already-flat list back through
//! [`flatten`] returns the same records in the same order.
//!
//! [`DatasetLoader::load`] reuses the flattened cache when the configured
//! [`CachePolicy`] allows it and skips shape validation on that path.

use crate::cache::{CachePolicy, DatasetCache, dataset_cache_path};
use crate::card::Card;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset file not found: {0}")]
    NotFound(PathBuf),
    #[error("Malformed dataset: {0}")]
    Malformed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads the flattened card list, going through the dataset cache.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    source: PathBuf,
    cache_dir: PathBuf,
    policy: CachePolicy,
}

impl DatasetLoader {
    pub fn new(source: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        Self {
            source: source.into(),
            cache_dir: cache_dir.into(),
            policy,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_path(&self) -> PathBuf {
        dataset_cache_path(&self.cache_dir)
    }

    /// Return the flattened dataset, from cache when allowed.
    pub fn load(&self) -> Result<Vec<Card>, DatasetError> {
        let cache_path = self.cache_path();
        if let Some(cache) = DatasetCache::load(&cache_path) {
            let fresh = if self.source.exists() {
                match self.policy.fingerprint(&self.source) {
                    Ok(current) => cache.is_fresh(self.policy, current.as_deref()),
                    Err(e) => {
                        tracing::warn!(error = %e, "cannot fingerprint dataset, using cache");
                        true
                    }
                }
            } else {
                // Nothing to compare against: the cache is all we have.
                true
            };
            if fresh {
                tracing::debug!(
                    cards = cache.cards.len(),
                    path = %cache_path.display(),
                    "dataset cache loaded"
                );
                return Ok(cache.cards);
            }
            tracing::info!(policy = %self.policy, "dataset changed since cache was written");
        }
        self.load_fresh()
    }

    /// Read and flatten the source dataset, then rewrite the cache.
    ///
    /// Failing to write the cache is logged, not returned.
    pub fn load_fresh(&self) -> Result<Vec<Card>, DatasetError> {
        if !self.source.exists() {
            return Err(DatasetError::NotFound(self.source.clone()));
        }
        let raw = std::fs::read_to_string(&self.source)?;
        let document: Value = serde_json::from_str(raw.trim())?;
        let cards = flatten_document(&document)?;
        tracing::info!(
            cards = cards.len(),
            source = %self.source.display(),
            "dataset flattened (variants and promos included)"
        );

        let fingerprint = match self.policy.fingerprint(&self.source) {
            Ok(fp) => fp,
            Err(e) => {
                tracing::warn!(error = %e, "cannot fingerprint dataset");
                None
            }
        };
        let cache_path = self.cache_path();
        let written = std::fs::create_dir_all(&self.cache_dir)
            .and_then(|_| DatasetCache::new(fingerprint, cards.clone()).save(&cache_path));
        match written {
            Ok(()) => tracing::info!(path = %cache_path.display(), "dataset cache updated"),
            Err(e) => tracing::warn!(path = %cache_path.display(), error = %e, "cannot write dataset cache"),
        }
        Ok(cards)
    }
}

/// Validate the `cards` section of a dataset document and flatten it.
pub fn flatten_document(document: &Value) -> Result<Vec<Card>, DatasetError> {
    let section = document
        .get("cards")
        .ok_or_else(|| DatasetError::Malformed("missing top-level 'cards' key".into()))?;

    let roots: Vec<&Map<String, Value>> = match section {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(subsets) => subsets
            .values()
            .flat_map(|subset| match subset {
                Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
                Value::Object(single) => vec![single],
                _ => Vec::new(),
            })
            .collect(),
        other => {
            return Err(DatasetError::Malformed(format!(
                "'cards' must be a list or a mapping of subsets, found {}",
                json_kind(other)
            )));
        }
    };
    Ok(flatten(roots))
}

/// Depth-first, identifier-deduplicated flattening of nested card objects.
pub fn flatten<'a>(roots: impl IntoIterator<Item = &'a Map<String, Value>>) -> Vec<Card> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for root in roots {
        visit(root, &mut out, &mut seen);
    }
    out
}

fn visit(object: &Map<String, Value>, out: &mut Vec<Card>, seen: &mut HashSet<String>) {
    let card = Card::new(object.clone());
    if seen.insert(card.identifier()) {
        out.push(card);
    }
    for value in object.values() {
        match value {
            Value::Array(items) => {
                for nested in items.iter().filter_map(Value::as_object) {
                    visit(nested, out, seen);
                }
            }
            Value::Object(nested) => visit(nested, out, seen),
            _ => {}
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
