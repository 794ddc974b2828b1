//! Working-image compositor.
//!
//! Derives the single canonical raster the crop editor works on:
//!
//! ```text
//! background fill  →  base image (source or background-removed) over it  →  brightness
//! ```
//!
//! The fill only shows through where the base is transparent, which in
//! practice means the background-removed variant. [`composite`] is a pure
//! function and always returns a fresh allocation.

use crate::imaging::{Brightness, adjust_channel, blend_over};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// User-controlled inputs to the working image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentSettings {
    /// Compose from the background-removed image instead of the upload.
    pub use_removed_background: bool,
    /// Flat fill behind the subject. Alpha is ignored; the fill is opaque.
    pub background: Rgba<u8>,
    pub brightness: Brightness,
}

impl Default for AdjustmentSettings {
    fn default() -> Self {
        Self {
            use_removed_background: false,
            background: Rgba([255, 255, 255, 255]),
            brightness: Brightness::default(),
        }
    }
}

/// Flatten `base` over the background color and apply the brightness offset.
pub fn composite(base: &RgbaImage, settings: &AdjustmentSettings) -> RgbaImage {
    let [r, g, b, _] = settings.background.0;
    let mut out = RgbaImage::from_pixel(base.width(), base.height(), Rgba([r, g, b, 255]));
    for (dst, src) in out.pixels_mut().zip(base.pixels()) {
        blend_over(dst, *src);
    }

    if !settings.brightness.is_neutral() {
        apply_brightness(&mut out, settings.brightness);
    }
    out
}

/// Shift R, G and B of every pixel by the brightness delta, in place.
///
/// Alpha is left untouched. Rows are processed in parallel.
pub fn apply_brightness(image: &mut RgbaImage, brightness: Brightness) {
    let delta = brightness.channel_delta();
    let row_len = image.width() as usize * 4;
    if row_len == 0 {
        return;
    }
    image.par_chunks_mut(row_len).for_each(|row| {
        for pixel in row.chunks_exact_mut(4) {
            for channel in &mut pixel[..3] {
                *channel = adjust_channel(*channel, delta);
            }
        }
    });
}
