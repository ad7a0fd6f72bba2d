//! Card-to-image rendering.
//!
//! [`ImageSource`] turns one resolved card into one card-sized RGB image:
//!
//! | Mode | Card has image URL | Result |
//! |---|---|---|
//! | `color` | yes | fetched (or cached) photo, cover-fit |
//! | `bw` | yes | same, then grayscale + auto-contrast |
//! | any | no | synthesized text face |
//! | `text` | either | synthesized text face |
//!
//! A fetch failure is fatal for the run; there is no silent fallback to a
//! text face for a card that *has* a URL.

use crate::cache::ImageCache;
use crate::card::Card;
use crate::imaging::{
    CARD_HEIGHT_PX, CARD_WIDTH_PX, FetchError, Fetcher, FontError, FontPaths, Fonts, ImageOrigin,
    RenderMode, cover_fit, draw_text_card, fetch_image, print_grayscale,
};
use image::RgbImage;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Font(#[from] FontError),
}

/// One rendered card face.
#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub image: RgbImage,
    pub origin: ImageOrigin,
}

/// Renders cards through a fetcher, an image cache, and lazily loaded fonts.
pub struct ImageSource {
    fetcher: Box<dyn Fetcher>,
    cache: ImageCache,
    font_paths: FontPaths,
    fonts: OnceLock<Fonts>,
}

impl ImageSource {
    pub fn new(fetcher: Box<dyn Fetcher>, cache: ImageCache, font_paths: FontPaths) -> Self {
        Self {
            fetcher,
            cache,
            font_paths,
            fonts: OnceLock::new(),
        }
    }

    /// Use already-loaded fonts instead of reading them from `font_paths`.
    pub fn with_fonts(self, fonts: Fonts) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(fonts);
        Self { fonts: cell, ..self }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Fonts are read on the first text face; a failed load is retried on
    /// the next one.
    fn fonts(&self) -> Result<&Fonts, FontError> {
        if let Some(fonts) = self.fonts.get() {
            return Ok(fonts);
        }
        let loaded = Fonts::load(&self.font_paths)?;
        tracing::debug!(
            bold = %self.font_paths.bold.display(),
            regular = %self.font_paths.regular.display(),
            "fonts loaded"
        );
        Ok(self.fonts.get_or_init(|| loaded))
    }

    pub fn render(&self, card: &Card, mode: RenderMode) -> Result<RenderedCard, RenderError> {
        let target = (CARD_WIDTH_PX, CARD_HEIGHT_PX);

        if mode.uses_photo()
            && let Some(url) = card.pick_image_url()
        {
            let (photo, origin) = fetch_image(self.fetcher.as_ref(), &self.cache, url)?;
            let fitted = cover_fit(&photo, target);
            let image = match mode {
                RenderMode::Bw => print_grayscale(&fitted),
                _ => fitted,
            };
            return Ok(RenderedCard { image, origin });
        }

        if mode.uses_photo() {
            tracing::debug!(card = %card.full_title(), "no image URL, drawing text face");
        }
        let image = draw_text_card(card, self.fonts()?);
        Ok(RenderedCard {
            image,
            origin: ImageOrigin::Synthesized,
        })
    }
}
