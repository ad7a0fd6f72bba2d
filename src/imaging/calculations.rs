//! Pure calculation functions for card and page geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Scales uniformly by `max(target_w / src_w, target_h / src_h)`, so the
/// result completely covers the target while keeping the source aspect
/// ratio. One dimension matches the target, the other may exceed it; neither
/// is ever smaller, even after rounding.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height), both non-zero
/// * `target` - Target area dimensions (width, height)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let scale = (tgt_w as f64 / src_w as f64).max(tgt_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).max(tgt_w);
    let h = ((src_h as f64 * scale).round() as u32).max(tgt_h);
    (w, h)
}

/// Top-left offset of a centered crop of `target` inside `filled`.
pub fn center_crop_offset(filled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        filled.0.saturating_sub(target.0) / 2,
        filled.1.saturating_sub(target.1) / 2,
    )
}

/// Top-left corner of a `columns × rows` grid of cells centered on a page.
///
/// A grid larger than the page is pinned to the top-left corner.
pub fn grid_origin(
    page: (u32, u32),
    cell: (u32, u32),
    gutter: u32,
    columns: u32,
    rows: u32,
) -> (u32, u32) {
    let total_w = columns * cell.0 + columns.saturating_sub(1) * gutter;
    let total_h = rows * cell.1 + rows.saturating_sub(1) * gutter;
    (
        page.0.saturating_sub(total_w) / 2,
        page.1.saturating_sub(total_h) / 2,
    )
}

/// Position of the `i`-th image in a paged row-major grid.
///
/// Returns `(page, row, column)`.
pub fn slot_position(i: usize, columns: usize, rows: usize) -> (usize, usize, usize) {
    let per_page = columns * rows;
    (i / per_page, (i / columns) % rows, i % columns)
}
