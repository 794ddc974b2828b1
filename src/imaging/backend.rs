//! Raster-drawing capability and shared error type.
//!
//! The [`Canvas`] trait is the only drawing surface the crop editor and grid
//! compositor know about. It covers exactly what they need: clear, fill a
//! rectangle, draw an image stretched into a rectangle, clip to a rectangle,
//! and stroke a rectangle border.
//!
//! The production implementation is
//! [`RasterCanvas`](super::raster::RasterCanvas), an in-memory RGBA buffer.
//! Tests use the recording canvas in [`tests`] to assert on the exact draw
//! sequence without touching pixels.

use crate::geometry::Rect;
use image::{Rgba, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("Image has no pixels ({0}x{1})")]
    Empty(u32, u32),
}

/// A 2D drawing surface with pixel dimensions.
///
/// Rectangles are in the canvas's own pixel space. Drawing outside the
/// surface is silently clipped.
pub trait Canvas {
    /// Surface size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Reset every pixel to fully transparent.
    fn clear(&mut self);

    /// Fill `rect` with `color`, blending when `color` is translucent.
    fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>);

    /// Draw `image` stretched to fill `dest`.
    fn draw_image(&mut self, image: &RgbaImage, dest: Rect);

    /// Restrict subsequent fills and draws to `clip`. `None` removes the clip.
    fn set_clip(&mut self, clip: Option<Rect>);

    /// Stroke the border of `rect`, centered on its edges.
    fn stroke_rect(&mut self, rect: Rect, color: Rgba<u8>, line_width: f64);
}
