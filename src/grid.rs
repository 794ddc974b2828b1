//! Grid compositor: tiles copies of the cropped photo onto an A4 page.
//!
//! One [`PageLayout`] describes the page at a given render scale. The same
//! layout code produces the on-screen preview ([`PREVIEW_SCALE`]) and the
//! full-resolution export page (scale 1.0). Page, margin, gap and photo size
//! are all multiplied by the scale before the column count is computed, so
//! both renders place copies in the same rows and columns.
//!
//! Copies are laid out row-major from the top-left margin. Rows that run past
//! the page bottom are clipped; there is only ever one page.
//!
//! [`PREVIEW_SCALE`]: crate::geometry::PREVIEW_SCALE

use crate::geometry::{GAP, MARGIN, PAGE_HEIGHT, PAGE_WIDTH, PhotoSize, Rect};
use crate::imaging::{Canvas, RasterCanvas, grid_cell, grid_columns, grid_rows};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use serde::Serialize;
use std::borrow::Cow;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Page geometry at one render scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub photo_size: PhotoSize,
    pub scale: f64,
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub gap: f64,
    pub photo_width: f64,
    pub photo_height: f64,
    columns: u32,
}

impl PageLayout {
    pub fn new(photo_size: PhotoSize, scale: f64) -> Self {
        let (photo_w, photo_h) = photo_size.pixels();
        let page_width = PAGE_WIDTH * scale;
        let margin = MARGIN * scale;
        let gap = GAP * scale;
        let photo_width = photo_w * scale;
        Self {
            photo_size,
            scale,
            page_width,
            page_height: PAGE_HEIGHT * scale,
            margin,
            gap,
            photo_width,
            photo_height: photo_h * scale,
            columns: grid_columns(page_width, margin, gap, photo_width),
        }
    }

    /// Full-resolution export layout.
    pub fn print(photo_size: PhotoSize) -> Self {
        Self::new(photo_size, 1.0)
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self, copies: u32) -> u32 {
        grid_rows(copies, self.columns)
    }

    /// Destination of the `index`-th copy, in canvas pixels.
    pub fn cell_rect(&self, index: u32) -> Rect {
        let (row, col) = grid_cell(index, self.columns);
        Rect::new(
            self.margin + col as f64 * (self.photo_width + self.gap),
            self.margin + row as f64 * (self.photo_height + self.gap),
            self.photo_width,
            self.photo_height,
        )
    }

    /// Page size in whole pixels.
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.page_width.round().max(1.0) as u32,
            self.page_height.round().max(1.0) as u32,
        )
    }

    /// Number of the `copies` that land entirely on the page.
    pub fn copies_on_page(&self, copies: u32) -> u32 {
        (0..copies)
            .take_while(|&i| self.cell_rect(i).bottom() <= self.page_height + 1e-6)
            .count() as u32
    }

    /// Whole-pixel size every copy is drawn at.
    pub fn tile_size(&self) -> (u32, u32) {
        (
            self.photo_width.round().max(1.0) as u32,
            self.photo_height.round().max(1.0) as u32,
        )
    }

    /// Paint the sheet: white paper, then `copies` copies of `cropped`.
    ///
    /// `cropped` is resampled to [`tile_size`](Self::tile_size) once and the
    /// same tile is placed in every cell.
    pub fn render(&self, canvas: &mut impl Canvas, cropped: &RgbaImage, copies: u32) {
        let (width, height) = canvas.dimensions();
        canvas.fill_rect(Rect::full(width, height), PAPER);
        if copies == 0 || cropped.width() == 0 || cropped.height() == 0 {
            return;
        }

        let (tile_w, tile_h) = self.tile_size();
        let tile: Cow<'_, RgbaImage> = if cropped.dimensions() == (tile_w, tile_h) {
            Cow::Borrowed(cropped)
        } else {
            Cow::Owned(image::imageops::resize(cropped, tile_w, tile_h, FilterType::Lanczos3))
        };
        for index in 0..copies {
            let cell = self.cell_rect(index);
            canvas.draw_image(&tile, Rect::new(cell.x, cell.y, tile_w as f64, tile_h as f64));
        }
    }

    pub fn summary(&self, copies: u32) -> LayoutSummary {
        LayoutSummary {
            size: self.photo_size,
            scale: self.scale,
            page: self.canvas_size(),
            photo_width: self.photo_width,
            photo_height: self.photo_height,
            columns: self.columns,
            rows: self.rows(copies),
            copies,
            copies_on_page: self.copies_on_page(copies),
        }
    }
}

/// Serializable description of a layout, for `layout --json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSummary {
    pub size: PhotoSize,
    pub scale: f64,
    pub page: (u32, u32),
    pub photo_width: f64,
    pub photo_height: f64,
    pub columns: u32,
    pub rows: u32,
    pub copies: u32,
    pub copies_on_page: u32,
}

/// Render a fresh page at `scale`.
pub fn compose_page(cropped: &RgbaImage, photo_size: PhotoSize, copies: u32, scale: f64) -> RgbaImage {
    let layout = PageLayout::new(photo_size, scale);
    let (width, height) = layout.canvas_size();
    let mut canvas = RasterCanvas::new(width, height);
    layout.render(&mut canvas, cropped, copies);
    tracing::debug!(
        size = %photo_size,
        scale,
        copies,
        columns = layout.columns(),
        "Composed {width}x{height} page"
    );
    canvas.into_image()
}
