//! Card records as they appear in the dataset.
//!
//! The dataset is irregular: fields come and go between sets, promos nest
//! whole card objects inside other cards, and numeric stats are sometimes
//! strings. A [`Card`] therefore keeps the raw JSON object untouched (so the
//! flattened cache round-trips every field) and exposes typed accessors for
//! the handful of fields the pipeline actually reads.
//!
//! ## Identity
//!
//! A record is identified by `card_id`, falling back to `id`. Records with
//! neither get a synthetic identifier derived from a SHA-256 of their
//! canonical JSON content (`syn-` + 16 hex chars). Content-derived ids are
//! stable across loads and across machines, which keeps flattening idempotent.
//! The cost: two unidentified records with byte-identical content (the same
//! `{"name": "Elsa"}` object in two subsets) share an id, so flattening keeps
//! only the first. Such duplicates are indistinguishable to search anyway.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Separator between name and subtitle in a display title.
pub const TITLE_SEPARATOR: &str = " \u{2013} ";

/// One dataset entry. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card(Map<String, Value>);

impl Card {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Borrow the underlying JSON object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Stable identifier: `card_id`, then `id`, then a content hash.
    ///
    /// Empty strings, `false`, `0` and `null` do not count as identifiers.
    pub fn identifier(&self) -> String {
        ["card_id", "id"]
            .iter()
            .filter_map(|key| self.0.get(*key).and_then(identifier_text))
            .next()
            .unwrap_or_else(|| synthetic_identifier(&self.0))
    }

    pub fn name(&self) -> &str {
        self.text("name").unwrap_or("")
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.text("subtitle").filter(|s| !s.is_empty())
    }

    /// `name – subtitle`, or just the name when there is no subtitle.
    pub fn full_title(&self) -> String {
        match self.subtitle() {
            Some(sub) => format!("{}{}{}", self.name(), TITLE_SEPARATOR, sub),
            None => self.name().to_string(),
        }
    }

    pub fn card_type(&self) -> &str {
        self.text("type").unwrap_or("")
    }

    pub fn rules_text(&self) -> &str {
        self.text("rules_text").unwrap_or("")
    }

    pub fn strength(&self) -> Option<String> {
        self.scalar_text("strength")
    }

    pub fn willpower(&self) -> Option<String> {
        self.scalar_text("willpower")
    }

    pub fn ink_cost(&self) -> Option<String> {
        self.scalar_text("ink_cost")
    }

    pub fn ink_convertible(&self) -> bool {
        matches!(self.0.get("ink_convertible"), Some(Value::Bool(true)))
    }

    pub fn quest_value(&self) -> u32 {
        match self.0.get("quest_value") {
            Some(Value::Number(n)) => n.as_u64().map(|v| v as u32).unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// String entries of `searchable_keywords`; other entries are ignored.
    pub fn keywords(&self) -> Vec<&str> {
        match self.0.get("searchable_keywords") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Image to print for this card.
    ///
    /// The first variant carrying a non-empty `detail_image_url` wins; the
    /// top-level `thumbnail_url` is the fallback.
    pub fn pick_image_url(&self) -> Option<&str> {
        if let Some(Value::Array(variants)) = self.0.get("variants") {
            let detail = variants
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|v| v.get("detail_image_url").and_then(Value::as_str))
                .find(|url| !url.is_empty());
            if detail.is_some() {
                return detail;
            }
        }
        self.text("thumbnail_url").filter(|url| !url.is_empty())
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Numbers and non-empty strings, rendered as display text.
    fn scalar_text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Card {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

fn identifier_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn synthetic_identifier(fields: &Map<String, Value>) -> String {
    // serde_json serialization of a Map is deterministic for a given key order.
    let canonical = serde_json::to_vec(fields).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    let hex = format!("{:x}", digest);
    format!("syn-{}", &hex[..16])
}
