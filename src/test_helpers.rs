//! Shared test utilities for the passport-sheet test suite.
//!
//! Provides synthetic rasters (no fixture files needed) and assertions for the
//! crop rectangle invariants that several modules check after every step.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut session = Session::default();
//! session.upload(gradient_image(1000, 1000)).unwrap();
//! assert_crop_invariants(session.crop_rect().unwrap(), (1000, 1000), PhotoSize::Inch2x2);
//! ```

use image::{Rgba, RgbaImage};

use crate::crop::MIN_CROP_WIDTH;
use crate::geometry::{PhotoSize, Rect};

/// Slack for float comparisons on crop geometry.
const EPS: f64 = 1e-6;

// =========================================================================
// Synthetic rasters
// =========================================================================

/// Opaque image whose red channel ramps with x and green with y, so every
/// pixel position is distinguishable in crop assertions.
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

/// What a background-removal service returns: an opaque subject in the
/// middle half of the frame, fully transparent everywhere else.
pub fn subject_on_transparent(width: u32, height: u32) -> RgbaImage {
    let (x0, x1) = (width / 4, width * 3 / 4);
    let (y0, y1) = (height / 4, height * 3 / 4);
    RgbaImage::from_fn(width, height, |x, y| {
        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
            Rgba([200, 150, 100, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

// =========================================================================
// Crop invariants
// =========================================================================

/// Assert the crop rectangle is inside the image, aspect-locked to `size`
/// within 1e-3, and no narrower than the minimum width (or the widest
/// rectangle that fits, for images too small for the minimum).
pub fn assert_crop_invariants(rect: Rect, image: (u32, u32), size: PhotoSize) {
    let (width, height) = (image.0 as f64, image.1 as f64);
    assert!(rect.x >= -EPS, "x < 0: {rect:?}");
    assert!(rect.y >= -EPS, "y < 0: {rect:?}");
    assert!(rect.right() <= width + EPS, "right edge outside {width}: {rect:?}");
    assert!(rect.bottom() <= height + EPS, "bottom edge outside {height}: {rect:?}");

    let aspect = size.aspect();
    assert!(
        (rect.w / rect.h - aspect).abs() < 1e-3,
        "aspect {} != {aspect} for {size}: {rect:?}",
        rect.w / rect.h
    );

    let widest = width.min(height * aspect);
    let floor = MIN_CROP_WIDTH.min(widest);
    assert!(rect.w >= floor - EPS, "width below {floor}: {rect:?}");
}
