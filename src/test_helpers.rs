//! Shared test utilities for the lorcy test suite.
//!
//! Provides card builders, identifier extractors, on-disk dataset fixtures,
//! synthetic images, and a best-effort font loader for text-card tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let index = CardIndex::build(vec![
//!     card(json!({"card_id": "1", "name": "Elsa"})),
//! ]);
//! assert_eq!(ids_of(&index.search("elsa")), vec!["1"]);
//! ```

use crate::card::Card;
use crate::imaging::{FontPaths, Fonts};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::path::{Path, PathBuf};

// =========================================================================
// Cards
// =========================================================================

/// Build a card from a JSON object literal. Panics on non-objects.
pub fn card(value: Value) -> Card {
    match value {
        Value::Object(map) => Card::new(map),
        other => panic!("card fixture must be a JSON object, got {other}"),
    }
}

/// Identifiers of a card list, in order.
pub fn ids(cards: &[Card]) -> Vec<String> {
    cards.iter().map(Card::identifier).collect()
}

/// Identifiers of a list of card references, in order.
pub fn ids_of(cards: &[&Card]) -> Vec<String> {
    cards.iter().map(|c| c.identifier()).collect()
}

/// Write `document` as `full.json` under `dir` and return its path.
pub fn write_dataset(dir: &Path, document: &Value) -> PathBuf {
    let path = dir.join("full.json");
    std::fs::write(&path, serde_json::to_vec_pretty(document).unwrap()).unwrap();
    path
}

// =========================================================================
// Images
// =========================================================================

pub fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(rgb))
}

/// PNG bytes, as a server would send them.
pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

// =========================================================================
// Fonts
// =========================================================================

/// Bold/regular pairs tried in order: the bundled fonts, then common system
/// fonts.
const FONT_CANDIDATES: &[(&str, &str)] = &[
    ("assets/fonts/comicbd.ttf", "assets/fonts/comic.ttf"),
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    ),
    (
        "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    ),
    (
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    ),
    (
        "/Library/Fonts/Arial Bold.ttf",
        "/Library/Fonts/Arial.ttf",
    ),
];

/// Font paths usable on this machine, if any.
pub fn test_font_paths() -> Option<FontPaths> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    FONT_CANDIDATES.iter().find_map(|(bold, regular)| {
        let paths = FontPaths {
            bold: root.join(bold),
            regular: root.join(regular),
        };
        (paths.bold.exists() && paths.regular.exists()).then_some(paths)
    })
}

/// Loaded fonts, or `None` when the machine has none we know of.
/// Tests that draw text skip themselves on `None`.
pub fn test_fonts() -> Option<Fonts> {
    test_font_paths().and_then(|paths| Fonts::load(&paths).ok())
}
