//! Decklist parsing and resolution.
//!
//! A decklist is plain text, one entry per line:
//!
//! ```text
//! 4 Elsa - Snow Queen
//! 2 mickey brave
//! Stitch rock star          # quantity defaults to 1
//! ```
//!
//! A leading token made only of ASCII digits is the quantity; anything else
//! belongs to the name fragment. Blank lines are ignored, and so is a line
//! whose quantity overflows `u32` (with a warning).
//!
//! Each line resolves to the *first* hit of [`CardIndex::search`], repeated
//! `quantity` times. Lines without a hit contribute nothing and do not fail
//! the run on their own; only an entirely empty result is an error.

use crate::card::Card;
use crate::index::CardIndex;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No cards found for this decklist")]
    NoCardsResolved,
}

/// One non-blank decklist line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckLine {
    pub quantity: u32,
    pub fragment: String,
}

/// Parse a single line. Returns `None` for blank lines and for quantities
/// that do not fit a `u32`.
///
/// - `"3 Elsa"` → quantity 3, fragment `"Elsa"`
/// - `"Elsa"` → quantity 1, fragment `"Elsa"`
/// - `"3x Elsa"` → quantity 1, fragment `"3x Elsa"` (not all digits)
pub fn parse_line(line: &str) -> Option<DeckLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some((head, rest)) = line.split_once(' ')
        && !head.is_empty()
        && head.chars().all(|c| c.is_ascii_digit())
    {
        let Ok(quantity) = head.parse::<u32>() else {
            tracing::warn!(line, "quantity out of range, line skipped");
            return None;
        };
        return Some(DeckLine {
            quantity,
            fragment: rest.trim().to_string(),
        });
    }
    Some(DeckLine {
        quantity: 1,
        fragment: line.to_string(),
    })
}

/// Parse every non-blank line of a decklist, in order.
pub fn parse_decklist(text: &str) -> Vec<DeckLine> {
    text.lines().filter_map(parse_line).collect()
}

/// Outcome of resolving a decklist.
#[derive(Debug)]
pub struct Resolution<'a> {
    /// Resolved cards, expanded by quantity, in decklist order.
    pub cards: Vec<&'a Card>,
    /// Lines that matched nothing.
    pub unresolved: Vec<DeckLine>,
}

/// Resolve decklist lines against the index.
///
/// `progress` is called once per line with `(processed, total)`, before that
/// line is searched; the last call is always `(total, total)`.
pub fn resolve<'a>(
    index: &'a CardIndex,
    lines: &[DeckLine],
    mut progress: impl FnMut(usize, usize),
) -> Result<Resolution<'a>, ResolveError> {
    let total = lines.len();
    let mut cards = Vec::new();
    let mut unresolved = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        progress(i + 1, total);
        match index.search(&line.fragment).first() {
            Some(card) => {
                tracing::debug!(
                    fragment = %line.fragment,
                    quantity = line.quantity,
                    card = %card.full_title(),
                    "line resolved"
                );
                cards.extend(std::iter::repeat_n(*card, line.quantity as usize));
            }
            None => {
                tracing::warn!(fragment = %line.fragment, "no card matches decklist line");
                unresolved.push(line.clone());
            }
        }
    }

    if cards.is_empty() {
        return Err(ResolveError::NoCardsResolved);
    }
    Ok(Resolution { cards, unresolved })
}
