//! PDF output.
//!
//! Each composed page becomes one PDF page holding a single full-bleed JPEG
//! image. The page's media box is the image size converted from pixels to
//! points at the print resolution, so a 2480 × 3507 px page at 300 DPI is
//! exactly A4 (595.2 × 841.68 pt).
//!
//! Object layout: catalog `1`, page tree `2`, document info `3`, then three
//! objects per page (page, content stream, image).

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};
use std::path::{Path, PathBuf};
use thiserror::Error;

const POINTS_PER_INCH: f32 = 72.0;
const IMAGE_NAME: Name<'static> = Name(b"Im1");

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Document has no pages")]
    Empty,
}

/// Pixel length to PDF points at `dpi`.
pub fn px_to_pt(px: u32, dpi: u32) -> f32 {
    px as f32 * POINTS_PER_INCH / dpi as f32
}

/// Output file for a document name: `<output_dir>/<name>.pdf`.
///
/// An existing `.pdf` extension (any case) is kept rather than doubled.
pub fn document_path(output_dir: &Path, name: &str) -> PathBuf {
    let name = name.trim();
    let has_ext = Path::new(name)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if has_ext {
        output_dir.join(name)
    } else {
        output_dir.join(format!("{name}.pdf"))
    }
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    Ok(buf)
}

/// Serialize pages into PDF bytes.
pub fn render_pdf(
    pages: &[RgbImage],
    title: &str,
    dpi: u32,
    quality: u8,
) -> Result<Vec<u8>, DocumentError> {
    if pages.is_empty() {
        return Err(DocumentError::Empty);
    }

    let catalog_id = Ref::new(1);
    let tree_id = Ref::new(2);
    let info_id = Ref::new(3);
    let page_ids: Vec<Ref> = (0..pages.len())
        .map(|i| Ref::new(4 + 3 * i as i32))
        .collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().copied())
        .count(pages.len() as i32);
    pdf.document_info(info_id)
        .title(TextStr(title))
        .producer(TextStr(concat!("lorcy ", env!("CARGO_PKG_VERSION"))));

    for (page_img, page_id) in pages.iter().zip(&page_ids) {
        let content_id = Ref::new(page_id.get() + 1);
        let image_id = Ref::new(page_id.get() + 2);
        let (w_px, h_px) = page_img.dimensions();
        let (w_pt, h_pt) = (px_to_pt(w_px, dpi), px_to_pt(h_px, dpi));

        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, w_pt, h_pt));
        page.parent(tree_id);
        page.contents(content_id);
        page.resources().x_objects().pair(IMAGE_NAME, image_id);
        page.finish();

        let jpeg = encode_jpeg(page_img, quality)?;
        let mut image = pdf.image_xobject(image_id, &jpeg);
        image.filter(Filter::DctDecode);
        image.width(w_px as i32);
        image.height(h_px as i32);
        image.color_space().device_rgb();
        image.bits_per_component(8);
        image.finish();

        let mut content = Content::new();
        content.save_state();
        content.transform([w_pt, 0.0, 0.0, h_pt, 0.0, 0.0]);
        content.x_object(IMAGE_NAME);
        content.restore_state();
        pdf.stream(content_id, &content.finish());
    }

    Ok(pdf.finish())
}

/// Write pages to `path` as a PDF, creating the parent directory.
pub fn write_pdf(
    pages: &[RgbImage],
    path: &Path,
    dpi: u32,
    quality: u8,
) -> Result<(), DocumentError> {
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = render_pdf(pages, &title, dpi, quality)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    tracing::debug!(path = %path.display(), pages = pages.len(), "document written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::solid_image;
    use tempfile::TempDir;

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn px_to_pt_at_300_dpi() {
        assert!((px_to_pt(2480, 300) - 595.2).abs() < 0.01);
        assert!((px_to_pt(3507, 300) - 841.68).abs() < 0.01);
    }

    #[test]
    fn document_path_appends_extension_once() {
        let dir = Path::new("/out");
        assert_eq!(document_path(dir, "deck"), PathBuf::from("/out/deck.pdf"));
        assert_eq!(document_path(dir, "deck.pdf"), PathBuf::from("/out/deck.pdf"));
        assert_eq!(document_path(dir, "deck.PDF"), PathBuf::from("/out/deck.PDF"));
        assert_eq!(document_path(dir, " my deck "), PathBuf::from("/out/my deck.pdf"));
    }

    #[test]
    fn render_pdf_has_one_page_object_per_page() {
        let pages = vec![solid_image(40, 50, [255, 255, 255]); 3];
        let bytes = render_pdf(&pages, "deck", 300, 90).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let pages_and_tree = count(&bytes, b"/Type /Page");
        assert_eq!(pages_and_tree - count(&bytes, b"/Type /Pages"), 3);
        assert_eq!(count(&bytes, b"/DCTDecode"), 3);
        assert_eq!(count(&bytes, b"%%EOF"), 1);
    }

    #[test]
    fn render_pdf_empty_is_error() {
        assert!(matches!(render_pdf(&[], "deck", 300, 90), Err(DocumentError::Empty)));
    }

    #[test]
    fn write_pdf_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/out/deck.pdf");
        write_pdf(&[solid_image(10, 10, [0, 0, 0])], &path, 300, 90).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
