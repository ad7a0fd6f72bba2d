//! Pixel operations on card images.
//!
//! | Operation | Implementation |
//! |---|---|
//! | **Cover-fit** | [`calculate_fill_dimensions`] + `imageops::resize` (Lanczos3) + centered `crop_imm` |
//! | **Print grayscale** | [`luma`] (ITU-R 601) + [`autocontrast`], back to RGB |
//!
//! Dimension math lives in [`super::calculations`]; this module only moves
//! pixels.

use super::calculations::{calculate_fill_dimensions, center_crop_offset};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// Scale `img` to cover `target` and crop the overflow evenly from both sides.
///
/// The result is exactly `target` in size. A degenerate (zero-sized) source
/// yields a white image.
pub fn cover_fit(img: &RgbImage, target: (u32, u32)) -> RgbImage {
    let (src_w, src_h) = img.dimensions();
    if src_w == 0 || src_h == 0 {
        return RgbImage::from_pixel(target.0, target.1, Rgb([255, 255, 255]));
    }

    let (fill_w, fill_h) = calculate_fill_dimensions((src_w, src_h), target);
    let resized = if (fill_w, fill_h) == (src_w, src_h) {
        img.clone()
    } else {
        imageops::resize(img, fill_w, fill_h, FilterType::Lanczos3)
    };
    let (x, y) = center_crop_offset((fill_w, fill_h), target);
    imageops::crop_imm(&resized, x, y, target.0, target.1).to_image()
}

/// Stretch luminance linearly so the darkest pixel maps to 0 and the lightest
/// to 255. A flat image is left unchanged.
pub fn autocontrast(img: &mut GrayImage) {
    let Some((lo, hi)) = img.pixels().fold(None, |acc: Option<(u8, u8)>, p| {
        let v = p.0[0];
        Some(match acc {
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
            None => (v, v),
        })
    }) else {
        return;
    };
    if hi <= lo {
        return;
    }

    let range = (hi - lo) as f32;
    for p in img.pixels_mut() {
        let v = (p.0[0] - lo) as f32 * 255.0 / range;
        p.0[0] = v.round().clamp(0.0, 255.0) as u8;
    }
}

/// ITU-R 601 luma (`0.299 R + 0.587 G + 0.114 B`) in 16-bit fixed point,
/// rounded to nearest.
pub fn luma(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let v = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        Luma([v as u8])
    })
}

/// Grayscale with auto-contrast, returned as a three-channel image so it can
/// share the page pipeline with color cards.
pub fn print_grayscale(img: &RgbImage) -> RgbImage {
    let mut gray = luma(img);
    autocontrast(&mut gray);
    DynamicImage::ImageLuma8(gray).to_rgb8()
}
