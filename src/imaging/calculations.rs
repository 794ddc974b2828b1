//! Pure calculation functions for sheet layout and pixel adjustment.
//!
//! All functions here are pure and testable without any I/O or images.

/// Absorbs float error when a column count lands exactly on an integer.
const LAYOUT_EPSILON: f64 = 1e-9;

/// Number of photo columns that fit across a page.
///
/// `floor((page_width − 2·margin + gap) / (photo_width + gap))`: the usable
/// width plus one trailing gap, divided by the pitch of one column. All four
/// inputs must be at the same scale; the result is then scale-invariant.
///
/// Never returns zero, so a photo wider than the page still gets a column
/// (and is clipped at the page edge).
///
/// # Examples
/// ```
/// # use passport_sheet::imaging::grid_columns;
/// // A4 at 300 DPI, 2×2in photos
/// assert_eq!(grid_columns(2480.0, 120.0, 30.0, 600.0), 3);
/// ```
pub fn grid_columns(page_width: f64, margin: f64, gap: f64, photo_width: f64) -> u32 {
    let usable = page_width - 2.0 * margin + gap;
    let pitch = photo_width + gap;
    if pitch <= 0.0 {
        return 1;
    }
    ((usable / pitch + LAYOUT_EPSILON).floor() as i64).max(1) as u32
}

/// Rows needed to place `copies` photos in `columns` columns.
pub fn grid_rows(copies: u32, columns: u32) -> u32 {
    copies.div_ceil(columns.max(1))
}

/// Row and column of the `index`-th copy, filling rows left to right.
pub fn grid_cell(index: u32, columns: u32) -> (u32, u32) {
    let columns = columns.max(1);
    (index / columns, index % columns)
}

/// Add `delta` to an 8-bit channel, rounding and saturating at 0 and 255.
pub fn adjust_channel(value: u8, delta: f32) -> u8 {
    (value as f32 + delta).round().clamp(0.0, 255.0) as u8
}

/// Largest width for a `aspect`-locked rectangle of preferred width
/// `preferred` that still fits an `avail_w × avail_h` area.
pub fn fit_locked_width(preferred: f64, aspect: f64, avail_w: f64, avail_h: f64) -> f64 {
    preferred.min(avail_w).min(avail_h * aspect).max(0.0)
}
