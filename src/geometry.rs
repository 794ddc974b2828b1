//! Physical constants, photo size presets, and the small geometry types
//! shared by every stage.
//!
//! All measurements are in pixels at [`DPI`]. The page is A4 portrait at
//! 300 DPI; photo sizes given in inches or centimetres are resolved through
//! the same constant, so a 2×2in photo is exactly 600×600 px.
//!
//! Nothing here is configurable at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Page width (A4 at 300 DPI).
pub const PAGE_WIDTH: f64 = 2480.0;
/// Page height (A4 at 300 DPI).
pub const PAGE_HEIGHT: f64 = 3508.0;
/// Blank border around the photo grid.
pub const MARGIN: f64 = 120.0;
/// Space between neighbouring photos, both axes.
pub const GAP: f64 = 30.0;
/// Print resolution every size is resolved against.
pub const DPI: f64 = 300.0;
/// Pixels per centimetre.
pub const CM: f64 = DPI / 2.54;

/// Scale used for the on-screen sheet preview.
pub const PREVIEW_SCALE: f64 = 0.25;

/// A point in raster pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in raster pixel space.
///
/// Coordinates are fractional: the crop editor accumulates sub-pixel pointer
/// deltas, and scaled grid cells rarely land on whole pixels. Rasterising
/// code rounds via [`Rect::to_pixels`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle covering a whole `width × height` raster.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Strict interior test: points on the border are outside.
    pub fn contains_strict(&self, p: Point) -> bool {
        p.x > self.x && p.x < self.right() && p.y > self.y && p.y < self.bottom()
    }

    /// Round to whole pixels as `(x, y, w, h)`.
    ///
    /// Origin and far edge are rounded independently so adjacent rectangles
    /// never overlap or leave a seam.
    pub fn to_pixels(&self) -> (i64, i64, u32, u32) {
        let x0 = self.x.round() as i64;
        let y0 = self.y.round() as i64;
        let x1 = self.right().round() as i64;
        let y1 = self.bottom().round() as i64;
        (x0, y0, (x1 - x0).max(0) as u32, (y1 - y0).max(0) as u32)
    }

    /// Same rectangle with every coordinate multiplied by `scale`.
    pub fn scaled(&self, scale: f64) -> Self {
        Self::new(
            self.x * scale,
            self.y * scale,
            self.w * scale,
            self.h * scale,
        )
    }
}

/// Standard photo sizes a sheet can be printed at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum PhotoSize {
    /// 2×2 inch (US passport and visa).
    #[default]
    #[serde(rename = "2x2")]
    #[value(name = "2x2")]
    Inch2x2,
    /// 3.5×4.5 cm (EU/UK/India passport).
    #[serde(rename = "3.5x4.5")]
    #[value(name = "3.5x4.5")]
    Cm35x45,
    /// 5×5 cm.
    #[serde(rename = "5x5")]
    #[value(name = "5x5")]
    Cm5x5,
}

impl PhotoSize {
    pub const ALL: [PhotoSize; 3] = [PhotoSize::Inch2x2, PhotoSize::Cm35x45, PhotoSize::Cm5x5];

    /// Short identifier used in config files and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            PhotoSize::Inch2x2 => "2x2",
            PhotoSize::Cm35x45 => "3.5x4.5",
            PhotoSize::Cm5x5 => "5x5",
        }
    }

    /// Human-readable physical dimensions.
    pub fn label(self) -> &'static str {
        match self {
            PhotoSize::Inch2x2 => "2 × 2 in",
            PhotoSize::Cm35x45 => "3.5 × 4.5 cm",
            PhotoSize::Cm5x5 => "5 × 5 cm",
        }
    }

    /// Printed size in pixels at [`DPI`], as `(width, height)`.
    pub fn pixels(self) -> (f64, f64) {
        match self {
            PhotoSize::Inch2x2 => (2.0 * DPI, 2.0 * DPI),
            PhotoSize::Cm35x45 => (3.5 * CM, 4.5 * CM),
            PhotoSize::Cm5x5 => (5.0 * CM, 5.0 * CM),
        }
    }

    /// Width over height. The crop rectangle is locked to this ratio.
    pub fn aspect(self) -> f64 {
        let (w, h) = self.pixels();
        w / h
    }
}

impl fmt::Display for PhotoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PhotoSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhotoSize::ALL
            .into_iter()
            .find(|size| size.key() == s)
            .ok_or_else(|| {
                let keys: Vec<&str> = PhotoSize::ALL.iter().map(|s| s.key()).collect();
                format!("unknown photo size '{s}' (expected one of {keys:?})")
            })
    }
}
