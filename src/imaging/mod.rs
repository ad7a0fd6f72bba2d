//! Card images, pure Rust, no external tools.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Fetch** | `reqwest::blocking` behind the [`Fetcher`] trait |
//! | **Decode / cache** | `image` (JPEG, PNG, WebP in; JPEG out) |
//! | **Cover-fit** | Lanczos3 resize + centered crop |
//! | **Print grayscale** | luma + auto-contrast |
//! | **Text faces** | `ab_glyph` fonts drawn with `imageproc` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and grid math (unit testable)
//! - **Parameters**: Print constants, [`RenderMode`], [`Quality`]
//! - **Fetch**: [`Fetcher`] trait + [`HttpFetcher`], cache-first [`fetch_image`]
//! - **Operations**: Pixel transforms on decoded images
//! - **Text card**: Synthesized faces for cards without a photo

pub mod calculations;
pub mod fetch;
pub mod operations;
mod params;
pub mod text_card;

pub use fetch::{FetchError, Fetcher, HttpFetcher, fetch_image};
pub use operations::{autocontrast, cover_fit, luma, print_grayscale};
pub use params::{
    CARD_HEIGHT_MM, CARD_HEIGHT_PX, CARD_WIDTH_MM, CARD_WIDTH_PX, DPI, ImageOrigin, MM_PER_INCH,
    PAGE_HEIGHT_MM, PAGE_HEIGHT_PX, PAGE_WIDTH_MM, PAGE_WIDTH_PX, Quality, RenderMode, mm_to_px,
};
pub use text_card::{FontError, FontPaths, Fonts, draw_text_card};
