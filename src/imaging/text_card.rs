//! Text-mode card faces.
//!
//! When a card is printed in text mode, or has no usable image URL, its face
//! is drawn from the dataset fields on a white card-sized canvas:
//!
//! ```text
//! ╭──────────────────────────────╮
//! │ ┌──┐ ENCRABLE                │  cost box + inkable tag (green / red)
//! │ │ 3│                         │
//! │ └──┘                         │
//! │ Elsa                         │  name (bold)
//! │ Snow Queen                   │  subtitle
//! │ ──────────────────────────── │
//! │ Character · Hero             │  type (bold)
//! │ FREEZE                   ◇ 2 │  ability name, lore value column
//! │ Exert chosen opposing        │  wrapped rules text
//! │ character.                   │
//! │                          4/5 │  strength/willpower
//! ╰──────────────────────────────╯
//! ```
//!
//! Fonts are TrueType files configured by path and loaded once, on first use.
//! Missing fonts are an error for the card being drawn, never a crash at
//! startup.

use super::params::{CARD_HEIGHT_PX, CARD_WIDTH_PX};
use crate::card::Card;
use ab_glyph::{Font, FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PADDING: i32 = 26;
const COST_BOX: i32 = 82;
const LORE_COLUMN_WIDTH: i32 = 56;
const BORDER_INSET: i32 = 5;
const BORDER_WIDTH: u32 = 3;
const BORDER_RADIUS: u32 = 22;
const COST_BOX_RADIUS: u32 = 6;
const COST_BOX_WIDTH: u32 = 4;
const BODY_LINE_GAP: i32 = 8;

const NAME_SIZE: f32 = 50.0;
const SUBTITLE_SIZE: f32 = 36.0;
const TYPE_SIZE: f32 = 32.0;
const ABILITY_SIZE: f32 = 44.0;
const BODY_SIZE: f32 = 40.0;
const STAT_SIZE: f32 = 46.0;
const COST_SIZE: f32 = 40.0;
const TAG_SIZE: f32 = 32.0;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const FRAME_GRAY: Rgb<u8> = Rgb([0xB0, 0xB8, 0xC0]);
const INKABLE_GREEN: Rgb<u8> = Rgb([0x10, 0xB9, 0x81]);
const UNINKABLE_RED: Rgb<u8> = Rgb([0xFF, 0x00, 0x00]);

/// Probe string for line heights: one ascender, one descender.
const LINE_PROBE: &str = "Hg";

#[derive(Error, Debug)]
pub enum FontError {
    #[error("Font not found: {}", .0.display())]
    Unavailable(PathBuf),
    #[error("Not a usable TrueType font: {}", .0.display())]
    Invalid(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where to find the two faces used on text cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontPaths {
    pub bold: PathBuf,
    pub regular: PathBuf,
}

/// Loaded bold and regular faces.
pub struct Fonts {
    bold: FontVec,
    regular: FontVec,
}

impl Fonts {
    pub fn load(paths: &FontPaths) -> Result<Self, FontError> {
        Ok(Self {
            bold: load_font(&paths.bold)?,
            regular: load_font(&paths.regular)?,
        })
    }
}

fn load_font(path: &Path) -> Result<FontVec, FontError> {
    if !path.exists() {
        return Err(FontError::Unavailable(path.to_path_buf()));
    }
    let data = std::fs::read(path)?;
    FontVec::try_from_vec(data).map_err(|_| FontError::Invalid(path.to_path_buf()))
}

/// `PxScale` whose em square is `em_px` pixels tall.
///
/// `PxScale` measures ascent-to-descent height, which is usually taller than
/// the em square.
fn em_scale(font: &impl Font, em_px: f32) -> PxScale {
    let height = font.height_unscaled();
    match font.units_per_em() {
        Some(upem) if height > 0.0 => PxScale::from(em_px * height / upem),
        _ => PxScale::from(em_px),
    }
}

/// A font at a given size.
struct Face<'a> {
    font: &'a FontVec,
    scale: PxScale,
}

impl<'a> Face<'a> {
    /// `size` is the em size in pixels.
    fn new(font: &'a FontVec, size: f32) -> Self {
        Self {
            font,
            scale: em_scale(font, size),
        }
    }

    fn width(&self, text: &str) -> u32 {
        text_size(self.scale, self.font, text).0
    }

    fn size(&self, text: &str) -> (i32, i32) {
        let (w, h) = text_size(self.scale, self.font, text);
        (w as i32, h as i32)
    }

    fn line_height(&self) -> i32 {
        self.size(LINE_PROBE).1
    }

    fn draw(&self, img: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
        if !text.is_empty() {
            draw_text_mut(img, color, x, y, self.scale, self.font, text);
        }
    }
}

/// Inkable tag label and color.
pub fn ink_tag(card: &Card) -> (&'static str, Rgb<u8>) {
    if card.ink_convertible() {
        ("ENCRABLE", INKABLE_GREEN)
    } else {
        ("NON-ENCRABLE", UNINKABLE_RED)
    }
}

/// Split rules text into an optional ability name (first line) and body.
pub fn split_rules(rules: &str) -> (Option<&str>, &str) {
    let rules = rules.trim();
    match rules.split_once('\n') {
        Some((ability, body)) if !ability.trim().is_empty() => (Some(ability.trim()), body.trim()),
        _ => (None, rules),
    }
}

/// `strength/willpower`, or whichever of the two is present.
pub fn stats_label(card: &Card) -> Option<String> {
    match (card.strength(), card.willpower()) {
        (Some(s), Some(w)) => Some(format!("{s}/{w}")),
        (Some(one), None) | (None, Some(one)) => Some(one),
        (None, None) => None,
    }
}

/// Greedy word wrap.
///
/// Words are separated by any whitespace. A word is appended to the current
/// line while `measure(line)` stays within `max_width`; a single word wider
/// than `max_width` gets a line of its own rather than an empty line before
/// it.
pub fn wrap_words(text: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let probe = format!("{line} {word}");
        if measure(&probe) <= max_width {
            line = probe;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn inside_rounded_rect(x: f32, y: f32, bounds: (f32, f32, f32, f32), radius: f32) -> bool {
    let (x0, y0, x1, y1) = bounds;
    if x < x0 || x > x1 || y < y0 || y > y1 {
        return false;
    }
    let r = radius.min((x1 - x0) / 2.0).min((y1 - y0) / 2.0).max(0.0);
    let cx = x.clamp(x0 + r, x1 - r);
    let cy = y.clamp(y0 + r, y1 - r);
    (x - cx).powi(2) + (y - cy).powi(2) <= r * r
}

/// Stroke a rounded rectangle outline, `width` pixels thick, inward from the
/// inclusive bounds `(x0, y0, x1, y1)`.
pub fn draw_rounded_rect_outline(
    img: &mut RgbImage,
    bounds: (i32, i32, i32, i32),
    radius: u32,
    width: u32,
    color: Rgb<u8>,
) {
    let (x0, y0, x1, y1) = bounds;
    if x1 < x0 || y1 < y0 || width == 0 {
        return;
    }
    let w = width as i32;
    let outer = (x0 as f32, y0 as f32, x1 as f32, y1 as f32);
    let inner = ((x0 + w) as f32, (y0 + w) as f32, (x1 - w) as f32, (y1 - w) as f32);
    let inner_radius = radius.saturating_sub(width) as f32;

    let (img_w, img_h) = img.dimensions();
    for y in y0.max(0)..=y1.min(img_h as i32 - 1) {
        for x in x0.max(0)..=x1.min(img_w as i32 - 1) {
            let (fx, fy) = (x as f32, y as f32);
            if inside_rounded_rect(fx, fy, outer, radius as f32)
                && !inside_rounded_rect(fx, fy, inner, inner_radius)
            {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Draw a card-sized text face for `card`.
pub fn draw_text_card(card: &Card, fonts: &Fonts) -> RgbImage {
    let (w, h) = (CARD_WIDTH_PX as i32, CARD_HEIGHT_PX as i32);
    let mut img = RgbImage::from_pixel(CARD_WIDTH_PX, CARD_HEIGHT_PX, WHITE);

    draw_rounded_rect_outline(
        &mut img,
        (BORDER_INSET, BORDER_INSET, w - BORDER_INSET, h - BORDER_INSET),
        BORDER_RADIUS,
        BORDER_WIDTH,
        FRAME_GRAY,
    );

    let f_name = Face::new(&fonts.bold, NAME_SIZE);
    let f_sub = Face::new(&fonts.regular, SUBTITLE_SIZE);
    let f_type = Face::new(&fonts.bold, TYPE_SIZE);
    let f_ability = Face::new(&fonts.bold, ABILITY_SIZE);
    let f_body = Face::new(&fonts.regular, BODY_SIZE);
    let f_stat = Face::new(&fonts.bold, STAT_SIZE);
    let f_cost = Face::new(&fonts.bold, COST_SIZE);
    let f_tag = Face::new(&fonts.regular, TAG_SIZE);

    // Cost box and inkable tag.
    let (tag_text, tag_color) = ink_tag(card);
    let (cost_x, cost_y) = (PADDING, PADDING);
    draw_rounded_rect_outline(
        &mut img,
        (cost_x, cost_y, cost_x + COST_BOX, cost_y + COST_BOX),
        COST_BOX_RADIUS,
        COST_BOX_WIDTH,
        tag_color,
    );
    let cost = card.ink_cost().unwrap_or_else(|| "?".to_string());
    let (cw, ch) = f_cost.size(&cost);
    f_cost.draw(
        &mut img,
        tag_color,
        cost_x + (COST_BOX - cw) / 2,
        cost_y + (COST_BOX - ch) / 2,
        &cost,
    );
    f_tag.draw(&mut img, tag_color, cost_x + COST_BOX + 14, cost_y + 8, tag_text);

    // Title block.
    let title_y = cost_y + COST_BOX + 14;
    f_name.draw(&mut img, BLACK, PADDING, title_y, card.name());
    let sub_y = title_y + f_name.line_height() - 6;
    f_sub.draw(&mut img, BLACK, PADDING, sub_y, card.subtitle().unwrap_or(""));

    let sep_y = sub_y + f_sub.line_height() + 8;
    draw_filled_rect_mut(
        &mut img,
        Rect::at(PADDING, sep_y).of_size((w - 2 * PADDING) as u32 + 1, 2),
        FRAME_GRAY,
    );

    let type_y = sep_y + 8;
    f_type.draw(&mut img, BLACK, PADDING, type_y, card.card_type());

    // Rules text, with the lore value in the right-hand column.
    let mut text_top = type_y + f_type.line_height() + 18;
    let lore = card.quest_value();
    if lore > 0 {
        let label = lore.to_string();
        let (lw, _) = f_stat.size(&label);
        let lore_x = w - PADDING - LORE_COLUMN_WIDTH + (LORE_COLUMN_WIDTH - lw) / 2;
        f_stat.draw(&mut img, BLACK, lore_x, text_top, &label);
    }

    let (ability, body) = split_rules(card.rules_text());
    if let Some(ability) = ability {
        f_ability.draw(&mut img, BLACK, PADDING, text_top, ability);
        text_top += f_ability.line_height() + 8;
    }

    let text_max_w = (w - 2 * PADDING - LORE_COLUMN_WIDTH) as u32;
    let body_line_h = f_body.line_height();
    let mut cy = text_top;
    for line in wrap_words(body, text_max_w, |s| f_body.width(s)) {
        f_body.draw(&mut img, BLACK, PADDING, cy, &line);
        cy += body_line_h + BODY_LINE_GAP;
    }

    if let Some(stats) = stats_label(card) {
        let (tw, th) = f_stat.size(&stats);
        f_stat.draw(&mut img, BLACK, w - PADDING - tw, h - PADDING - th, &stats);
    }

    img
}
