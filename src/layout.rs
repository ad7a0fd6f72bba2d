//! Page composition.
//!
//! Card images are placed row-major on white pages, `columns × rows` per
//! page, with a fixed gutter between cells and the whole grid centered. The
//! default [`PageGeometry::a4`] is a 3 × 3 grid of 63 × 88 mm cards with a
//! 30 px gutter on a 300 DPI A4 page, which puts the first card at (94, 165).
//!
//! N images make `ceil(N / 9)` pages; unused cells on the last page stay
//! white.

use crate::imaging::calculations::{grid_origin, slot_position};
use crate::imaging::{CARD_HEIGHT_PX, CARD_WIDTH_PX, PAGE_HEIGHT_PX, PAGE_WIDTH_PX};
use image::{Rgb, RgbImage, imageops};

pub const COLUMNS: u32 = 3;
pub const ROWS: u32 = 3;
pub const GUTTER_PX: u32 = 30;

/// Page and grid dimensions, all in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub page: (u32, u32),
    pub cell: (u32, u32),
    pub gutter: u32,
    pub columns: u32,
    pub rows: u32,
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            page: (PAGE_WIDTH_PX, PAGE_HEIGHT_PX),
            cell: (CARD_WIDTH_PX, CARD_HEIGHT_PX),
            gutter: GUTTER_PX,
            columns: COLUMNS,
            rows: ROWS,
        }
    }

    pub fn per_page(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    /// Number of pages needed for `count` images.
    pub fn pages_for(&self, count: usize) -> usize {
        count.div_ceil(self.per_page())
    }

    /// Top-left pixel of the cell at (`row`, `col`).
    pub fn cell_origin(&self, row: u32, col: u32) -> (u32, u32) {
        let (x0, y0) = grid_origin(self.page, self.cell, self.gutter, self.columns, self.rows);
        (
            x0 + col * (self.cell.0 + self.gutter),
            y0 + row * (self.cell.1 + self.gutter),
        )
    }

    /// Lay out `images` on as many pages as needed.
    pub fn compose(&self, images: &[RgbImage]) -> Vec<RgbImage> {
        let mut pages: Vec<RgbImage> = Vec::with_capacity(self.pages_for(images.len()));
        for (i, image) in images.iter().enumerate() {
            let (page, row, col) = slot_position(i, self.columns as usize, self.rows as usize);
            if page == pages.len() {
                pages.push(RgbImage::from_pixel(self.page.0, self.page.1, Rgb([255, 255, 255])));
            }
            let (x, y) = self.cell_origin(row as u32, col as u32);
            imageops::replace(&mut pages[page], image, x as i64, y as i64);
        }
        pages
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// Compose card images onto A4 pages.
pub fn compose(images: &[RgbImage]) -> Vec<RgbImage> {
    PageGeometry::a4().compose(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::solid_image;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    /// Small geometry with the same shape as A4: 3×3 cells of 10×14, gutter 2,
    /// on a 40×50 page → origin (3, 2).
    fn mini() -> PageGeometry {
        PageGeometry {
            page: (40, 50),
            cell: (10, 14),
            gutter: 2,
            columns: 3,
            rows: 3,
        }
    }

    #[test]
    fn a4_first_cell_is_centered() {
        let g = PageGeometry::a4();
        assert_eq!(g.cell_origin(0, 0), (94, 165));
        assert_eq!(g.cell_origin(0, 1), (94 + 744 + 30, 165));
        assert_eq!(g.cell_origin(2, 2), (94 + 2 * 774, 165 + 2 * 1069));
    }

    #[test]
    fn a4_geometry_matches_physical_sizes() {
        use crate::imaging::{CARD_HEIGHT_MM, CARD_WIDTH_MM, DPI, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, mm_to_px};
        let g = PageGeometry::a4();
        assert_eq!(g.page, (mm_to_px(PAGE_WIDTH_MM, DPI), mm_to_px(PAGE_HEIGHT_MM, DPI)));
        assert_eq!(g.cell, (mm_to_px(CARD_WIDTH_MM, DPI), mm_to_px(CARD_HEIGHT_MM, DPI)));
    }

    #[test]
    fn page_count_is_ceiling_of_nine() {
        let g = PageGeometry::a4();
        assert_eq!(g.pages_for(0), 0);
        assert_eq!(g.pages_for(1), 1);
        assert_eq!(g.pages_for(9), 1);
        assert_eq!(g.pages_for(10), 2);
        assert_eq!(g.pages_for(18), 2);
        assert_eq!(g.pages_for(19), 3);
    }

    #[test]
    fn compose_empty_is_no_pages() {
        assert!(mini().compose(&[]).is_empty());
    }

    #[test]
    fn compose_places_cards_row_major() {
        let g = mini();
        let images: Vec<RgbImage> = (0..4).map(|i| solid_image(10, 14, [i * 50, 0, 0])).collect();
        let pages = g.compose(&images);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].dimensions(), (40, 50));

        for (i, (row, col)) in [(0, 0), (0, 1), (0, 2), (1, 0)].into_iter().enumerate() {
            let (x, y) = g.cell_origin(row, col);
            assert_eq!(pages[0].get_pixel(x + 5, y + 7), &Rgb([i as u8 * 50, 0, 0]));
        }
        // Unused cells and gutters stay white.
        let (x, y) = g.cell_origin(2, 2);
        assert_eq!(pages[0].get_pixel(x + 5, y + 7), &WHITE);
        assert_eq!(pages[0].get_pixel(0, 0), &WHITE);
        assert_eq!(pages[0].get_pixel(13, 2 + 5), &WHITE);
    }

    #[test]
    fn compose_two_cards_leaves_seven_blank_cells() {
        let g = mini();
        let images = vec![solid_image(10, 14, [0, 0, 0]); 2];
        let pages = g.compose(&images);
        assert_eq!(pages.len(), 1);
        let mut blank = 0;
        for row in 0..3 {
            for col in 0..3 {
                let (x, y) = g.cell_origin(row, col);
                if pages[0].get_pixel(x + 5, y + 7) == &WHITE {
                    blank += 1;
                }
            }
        }
        assert_eq!(blank, 7);
    }

    #[test]
    fn compose_ten_cards_spills_to_second_page() {
        let g = mini();
        let mut images = vec![solid_image(10, 14, [0, 0, 255]); 9];
        images.push(solid_image(10, 14, [0, 255, 0]));
        let pages = g.compose(&images);
        assert_eq!(pages.len(), 2);
        let (x, y) = g.cell_origin(0, 0);
        assert_eq!(pages[1].get_pixel(x, y), &Rgb([0, 255, 0]));
        let (x, y) = g.cell_origin(0, 1);
        assert_eq!(pages[1].get_pixel(x, y), &WHITE);
    }

    #[test]
    fn compose_a4_ten_cards() {
        let images = vec![solid_image(CARD_WIDTH_PX, CARD_HEIGHT_PX, [10, 10, 10]); 10];
        let pages = compose(&images);
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.dimensions() == (PAGE_WIDTH_PX, PAGE_HEIGHT_PX)));
        assert_eq!(pages[0].get_pixel(94, 165), &Rgb([10, 10, 10]));
        assert_eq!(pages[0].get_pixel(93, 165), &WHITE);
    }
}
