//! High-level raster operations: decode, encode, crop.
//!
//! These are the only places that touch codecs directly. Everything
//! downstream works on `RgbaImage`.

use super::backend::RasterError;
use crate::geometry::Rect;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader, Pixel, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;

/// Load and decode an image from disk as RGBA.
///
/// The format is guessed from the file contents, not the extension.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    non_empty(image.to_rgba8())
}

/// Decode an in-memory encoded image as RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    non_empty(image.to_rgba8())
}

/// Encode as PNG, keeping the alpha channel.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

/// Copy the pixels under `rect` 1:1 into a new image.
///
/// `rect` is rounded to whole pixels and clamped to the image, so the result
/// is never larger than the source and never empty for a non-empty source.
pub fn crop_region(image: &RgbaImage, rect: Rect) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (x, y, w, h) = rect.to_pixels();
    let x = x.clamp(0, width.saturating_sub(1) as i64) as u32;
    let y = y.clamp(0, height.saturating_sub(1) as i64) as u32;
    let w = w.clamp(1, width - x);
    let h = h.clamp(1, height - y);
    image::imageops::crop_imm(image, x, y, w, h).to_image()
}

/// Source-over composite of `src` onto `dst`.
///
/// Fully opaque and fully transparent sources are copied or skipped exactly,
/// so opaque images survive compositing bit-for-bit.
pub fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    match src[3] {
        0 => {}
        255 => *dst = src,
        _ => dst.blend(&src),
    }
}

fn non_empty(image: RgbaImage) -> Result<RgbaImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(RasterError::Empty(image.width(), image.height()));
    }
    Ok(image)
}
