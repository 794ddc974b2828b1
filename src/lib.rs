//! # Passport Sheet
//!
//! Produces print-ready sheets of passport-style photos: load a portrait,
//! optionally cut the subject out through a remote background-removal
//! service, adjust brightness and background color, crop to the locked aspect
//! ratio of a standard photo size, and tile copies onto an A4 page exported as
//! PDF, JPG or PNG.
//!
//! # Architecture: Derived Rasters
//!
//! Every image the user sees is derived from the upload and a handful of
//! settings, and is rebuilt from scratch whenever one of its inputs changes:
//!
//! ```text
//! upload ─► working image ─► cropped photo ─► sheet (preview 0.25 / print 1.0) ─► export
//!   (compose)                  (crop)              (grid)                           (export)
//! ```
//!
//! [`session::Session`] owns that graph. Each action (upload, slider change,
//! pointer gesture) updates one input and recomputes only the stages below it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Page and DPI constants, photo size presets, `Rect`/`Point` |
//! | [`imaging`] | `Canvas` drawing trait, in-memory raster canvas, codecs, clamped parameters |
//! | [`compose`] | Working image: background fill, subject overlay, brightness |
//! | [`crop`] | Aspect-locked crop editor driven by pointer events |
//! | [`grid`] | Page layout and tiling of the cropped photo |
//! | [`export`] | PNG / JPG / PDF encoding of the print page |
//! | [`removal`] | Background-removal client (`BackgroundRemover`, `HttpRemover`) |
//! | [`session`] | Editor context and dependency graph |
//! | [`config`] | `passport-sheet.toml` loading, merging and validation |
//! | [`cache`] | Content-addressed on-disk cache of removal results |
//! | [`logger`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Layout, Two Scales
//!
//! The preview and the printed page come from the same
//! [`grid::PageLayout`] code at different scales. Page, margin, gap and photo
//! size are scaled together before columns are counted, so what the preview
//! shows is exactly what prints.
//!
//! ## Fixed Physical Units
//!
//! The page is A4 at 300 DPI and photo sizes resolve through that one DPI
//! constant. There is no color management and no per-device scaling; the
//! exported file is meant to be printed at 100 %.
//!
//! ## Drawing Behind a Trait
//!
//! The crop overlay and the sheet are drawn through [`imaging::Canvas`]
//! rather than straight into pixels. Production code uses
//! [`imaging::RasterCanvas`]; tests record the draw calls and assert on the
//! sequence.

pub mod cache;
pub mod compose;
pub mod config;
pub mod crop;
pub mod export;
pub mod geometry;
pub mod grid;
pub mod imaging;
pub mod logger;
pub mod output;
pub mod removal;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
