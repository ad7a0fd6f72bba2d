//! # Lorcy
//!
//! Turns a trading-card decklist into print-ready A4 proxy sheets. A decklist
//! is plain text: a quantity followed by any fragment of a card's name. Every
//! resolved copy becomes one 63 × 88 mm card face, nine to a page, in a single
//! multi-page PDF.
//!
//! # Architecture: One Pass, Five Stages
//!
//! ```text
//! 1. Load      full.json   →  [Card]             (flatten, dedup, cache)
//! 2. Resolve   decklist    →  [&Card] + misses   (token containment over names)
//! 3. Render    [&Card]     →  [RgbImage]         (photo or synthesized face)
//! 4. Compose   [RgbImage]  →  [page]             (3 × 3 grid per A4 page)
//! 5. Emit      [page]      →  <name>.pdf         (one JPEG per PDF page)
//! ```
//!
//! Stages 1 and 3 are backed by on-disk caches: the flattened dataset and the
//! fetched card photos. A warm run touches neither the source dataset nor the
//! network.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`card`] | `Card` record over a JSON object, with typed accessors |
//! | [`dataset`] | Dataset loading: shape check, depth-first flatten, identifier dedup, cache reuse |
//! | [`cache`] | Flattened-dataset cache, content-addressed image cache, `CacheStats` |
//! | [`index`] | Name normalization and token search over the flattened dataset |
//! | [`deck`] | Decklist parsing and resolution |
//! | [`imaging`] | Fetching, pixel operations, text-card synthesis, geometry |
//! | [`render`] | One card → one card-sized image, per render mode |
//! | [`layout`] | Grid placement of card images onto A4 pages |
//! | [`document`] | Multi-page PDF emission |
//! | [`pipeline`] | The end-to-end run, progress events, background execution |
//! | [`config`] | `lorcy.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Pixels First, PDF Last
//!
//! Every page is a raster at 300 DPI before it reaches the PDF writer. Card
//! faces, synthesized or photographic, share one code path through the
//! compositor, and the PDF is only a container: one full-bleed image per page.
//!
//! ## Fetch Failures Are Fatal
//!
//! A card without an image URL gets a synthesized text face. A card *with* a
//! URL whose fetch fails aborts the run. Silently printing a text face in
//! place of a photo the user asked for would produce a sheet that looks
//! complete but isn't.
//!
//! ## Search Is Containment, Not Ranking
//!
//! A fragment matches a card when its normalized text equals the card's full
//! title, or else when every one of its tokens matches one of the card's name
//! tokens (exactly, or as a prefix of three characters or more). The first
//! match in dataset order wins. Dataset order is therefore meaningful, and
//! flattening preserves first-discovery order.

pub mod cache;
pub mod card;
pub mod config;
pub mod dataset;
pub mod deck;
pub mod document;
pub mod imaging;
pub mod index;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod render;

#[cfg(test)]
pub(crate) mod test_helpers;
