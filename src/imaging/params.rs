//! Print constants and parameter types for card images.
//!
//! Everything is sized for print at [`DPI`]: a card is 63 × 88 mm and a page
//! is A4 (210 × 297 mm). Millimetre sizes convert to pixels by truncation,
//! so a card is 744 × 1039 px and a page 2480 × 3507 px.
//!
//! ## Types
//!
//! - [`RenderMode`]: how a card face is produced (photo, grayscale photo, text).
//! - [`ImageOrigin`]: where a rendered card image came from.
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Print resolution in dots per inch.
pub const DPI: u32 = 300;

pub const MM_PER_INCH: f64 = 25.4;

pub const CARD_WIDTH_MM: f64 = 63.0;
pub const CARD_HEIGHT_MM: f64 = 88.0;
pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;

/// Card size in pixels at [`DPI`].
pub const CARD_WIDTH_PX: u32 = 744;
pub const CARD_HEIGHT_PX: u32 = 1039;

/// A4 page size in pixels at [`DPI`].
pub const PAGE_WIDTH_PX: u32 = 2480;
pub const PAGE_HEIGHT_PX: u32 = 3507;

/// Convert a physical length to whole pixels at `dpi` (truncating).
pub fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    (mm / MM_PER_INCH * dpi as f64) as u32
}

/// How a card face is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Fetched card photo, cover-fit to card size.
    Color,
    /// Fetched card photo, cover-fit, grayscale with auto-contrast.
    Bw,
    /// Card face synthesized from the card's text fields.
    #[default]
    Text,
}

impl RenderMode {
    /// Whether this mode prints a fetched photo when the card has one.
    pub fn uses_photo(self) -> bool {
        matches!(self, RenderMode::Color | RenderMode::Bw)
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Color => write!(f, "color"),
            RenderMode::Bw => write!(f, "bw"),
            RenderMode::Text => write!(f, "text"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "color" | "colour" => Ok(RenderMode::Color),
            "bw" | "gray" | "grey" => Ok(RenderMode::Bw),
            "text" => Ok(RenderMode::Text),
            other => Err(format!("unknown render mode '{other}' (expected color, bw or text)")),
        }
    }
}

/// Where a rendered card image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Read from the on-disk image cache.
    Cached,
    /// Downloaded during this run.
    Fetched,
    /// Drawn from text fields.
    Synthesized,
}

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}
