//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is **card-centric, not file-centric**. The primary display for every
//! card is its positional index and full title; identifiers and origins are
//! secondary context.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Loading cards from data/full.json
//! Resolved 3 decklist lines
//! 001 Elsa – Snow Queen (fetched)
//! 002 Elsa – Snow Queen (cached)
//! 003 Stitch – Rock Star (text)
//! Composed 1 page
//! Wrote /home/me/Downloads/deck.pdf
//!
//! Not found:
//!     2 Maleficent
//! Images: 1 cached, 1 fetched, 1 text (3 total)
//! ```
//!
//! ## Search
//!
//! ```text
//! 001 Elsa – Snow Queen [1]
//! 002 Elsa – Ice Maker [2]
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::card::Card;
use crate::imaging::ImageOrigin;
use crate::pipeline::{GenerationReport, ProgressEvent};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn origin_label(origin: ImageOrigin) -> &'static str {
    match origin {
        ImageOrigin::Cached => "cached",
        ImageOrigin::Fetched => "fetched",
        ImageOrigin::Synthesized => "text",
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Generate
// ============================================================================

/// Format one progress event. Per-line resolution progress is summarized once,
/// on the last line.
pub fn format_progress_event(event: &ProgressEvent) -> Vec<String> {
    match event {
        ProgressEvent::Loading { source } => {
            vec![format!("Loading cards from {}", source.display())]
        }
        ProgressEvent::LineParsed { processed, total } if processed == total => {
            vec![format!("Resolved {}", plural(*total, "decklist line", "decklist lines"))]
        }
        ProgressEvent::LineParsed { .. } => Vec::new(),
        ProgressEvent::CardRendered {
            index,
            name,
            origin,
            ..
        } => vec![format!(
            "{} {} ({})",
            format_index(*index),
            name,
            origin_label(*origin)
        )],
        ProgressEvent::PagesComposed { pages } => {
            vec![format!("Composed {}", plural(*pages, "page", "pages"))]
        }
        ProgressEvent::Emitted { path } => vec![format!("Wrote {}", path.display())],
    }
}

/// Format the end-of-run summary: unmatched lines, then image origins.
pub fn format_report(report: &GenerationReport) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.unresolved.is_empty() {
        lines.push(String::new());
        lines.push("Not found:".to_string());
        for line in &report.unresolved {
            lines.push(format!("    {} {}", line.quantity, line.fragment));
        }
    }
    lines.push(format!("Images: {}", report.stats));
    lines
}

pub fn print_report(report: &GenerationReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Search
// ============================================================================

/// Format search hits in result order, each with its identifier.
pub fn format_search_results(query: &str, hits: &[&Card]) -> Vec<String> {
    if hits.is_empty() {
        return vec![format!("No cards match \"{}\"", query.trim())];
    }
    hits.iter()
        .enumerate()
        .map(|(i, card)| {
            format!(
                "{} {} [{}]",
                format_index(i + 1),
                card.full_title(),
                card.identifier()
            )
        })
        .collect()
}

pub fn print_search_results(query: &str, hits: &[&Card]) {
    for line in format_search_results(query, hits) {
        println!("{}", line);
    }
}

// ============================================================================
// Flatten
// ============================================================================

pub fn format_flatten_output(cards: usize, cache_path: &Path) -> Vec<String> {
    vec![format!(
        "Flattened {} → {}",
        plural(cards, "card", "cards"),
        cache_path.display()
    )]
}
