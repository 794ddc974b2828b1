//! Raster primitives in pure Rust, on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from content) |
//! | **Encode PNG** | `image::codecs::png::PngEncoder` |
//! | **Crop** | `image::imageops::crop_imm` |
//! | **Draw / stretch** | [`RasterCanvas`] (`imageops::resize`, Lanczos3) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for layout and channel math (unit testable)
//! - **Parameters**: Clamped value types (brightness, copy count, quality, colors)
//! - **Backend**: [`Canvas`] drawing trait + [`RasterError`]
//! - **Raster**: [`RasterCanvas`], the in-memory `Canvas`
//! - **Operations**: Codec and crop helpers

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod raster;

pub use backend::{Canvas, RasterError};
pub use calculations::{adjust_channel, fit_locked_width, grid_cell, grid_columns, grid_rows};
pub use operations::{blend_over, crop_region, decode_image, encode_png, load_image};
pub use params::{Brightness, CopyCount, Quality, format_hex_color, parse_hex_color};
pub use raster::RasterCanvas;
