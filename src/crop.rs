//! Interactive crop editor.
//!
//! Owns the crop rectangle over the working image and turns pointer gestures
//! into drag and resize operations. The rectangle is always locked to the
//! aspect ratio of the selected [`PhotoSize`] and always lies inside the
//! image.
//!
//! # State machine
//!
//! ```text
//!            down on corner handle            up
//!   Idle ────────────────────────► Resizing ──────► Idle
//!     │      down strictly inside             up
//!     └───────────────────────────► Dragging ──────► Idle
//! ```
//!
//! A pointer-down anywhere else leaves the editor idle. Moves are only
//! interpreted while dragging or resizing, and each move is measured against
//! the previous pointer position (incremental deltas), not the gesture start.
//!
//! # Resizing
//!
//! Only the bottom-right handle resizes. The top-left corner stays put, the
//! width follows the pointer's horizontal movement, and the height is always
//! derived as `w / aspect`. Width is clamped between [`MIN_CROP_WIDTH`] and the
//! largest width that still fits both the right and bottom edges.
//!
//! All coordinates are in working-image pixels. Use [`ViewportMapping`] to
//! convert pointer positions from a scaled on-screen display.

use crate::geometry::{PhotoSize, Point, Rect};
use crate::imaging::{Canvas, crop_region, fit_locked_width};
use image::{Rgba, RgbaImage};

/// Distance (per axis, in image pixels) from the bottom-right corner that
/// still grabs the resize handle.
pub const HANDLE_RADIUS: f64 = 30.0;

/// Smallest crop width a resize can reach.
pub const MIN_CROP_WIDTH: f64 = 50.0;

/// Share of the image width a fresh crop rectangle covers.
pub const INITIAL_WIDTH_FRACTION: f64 = 0.6;

/// Dimming laid over the area outside the crop (black at 45 % opacity).
pub const MASK_COLOR: Rgba<u8> = Rgba([0, 0, 0, 115]);

/// Crop border color (`#00aaff`).
pub const BORDER_COLOR: Rgba<u8> = Rgba([0x00, 0xaa, 0xff, 0xff]);

pub const BORDER_WIDTH: f64 = 3.0;

/// Pointer input, already in working-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
}

/// Gesture in progress. `anchor` is the last pointer position seen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        anchor: Point,
    },
    Resizing {
        anchor: Point,
    },
}

/// Maps pointer positions on a scaled display of the image back to image
/// pixels.
///
/// The image may be shown at any size; the factor is the ratio of pixel size
/// to displayed size, applied per axis after subtracting the display origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMapping {
    /// Top-left of the displayed image in client coordinates.
    pub origin: Point,
    pub display_width: f64,
    pub display_height: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl ViewportMapping {
    /// Display shown 1:1 at the client origin.
    pub fn identity(pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            origin: Point::default(),
            display_width: pixel_width as f64,
            display_height: pixel_height as f64,
            pixel_width,
            pixel_height,
        }
    }

    pub fn to_image(&self, client: Point) -> Point {
        let scale = |pixels: u32, displayed: f64| {
            if displayed > 0.0 {
                pixels as f64 / displayed
            } else {
                1.0
            }
        };
        Point::new(
            (client.x - self.origin.x) * scale(self.pixel_width, self.display_width),
            (client.y - self.origin.y) * scale(self.pixel_height, self.display_height),
        )
    }
}

/// Centered rectangle covering [`INITIAL_WIDTH_FRACTION`] of the image width,
/// shrunk if the locked aspect would overflow the image height.
pub fn initial_rect(width: u32, height: u32, size: PhotoSize) -> Rect {
    let (w_img, h_img) = (width as f64, height as f64);
    let aspect = size.aspect();
    let max_w = fit_locked_width(f64::INFINITY, aspect, w_img, h_img);
    let floor = MIN_CROP_WIDTH.min(max_w);

    let w = (w_img * INITIAL_WIDTH_FRACTION).max(floor).min(max_w);
    let h = w / aspect;
    Rect::new((w_img - w) / 2.0, (h_img - h) / 2.0, w, h)
}

/// Crop rectangle plus the pointer gesture operating on it.
#[derive(Debug, Clone, PartialEq)]
pub struct CropEditor {
    image_width: u32,
    image_height: u32,
    photo_size: PhotoSize,
    rect: Rect,
    state: DragState,
}

impl CropEditor {
    /// Editor for a freshly loaded image, with a centered initial rectangle.
    pub fn new(image_width: u32, image_height: u32, photo_size: PhotoSize) -> Self {
        Self {
            image_width,
            image_height,
            photo_size,
            rect: initial_rect(image_width, image_height, photo_size),
            state: DragState::Idle,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn photo_size(&self) -> PhotoSize {
        self.photo_size
    }

    pub fn image_dimensions(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    /// Feed one pointer event through the state machine.
    ///
    /// Returns `true` when the event moved or resized the rectangle, i.e. when
    /// the overlay must be redrawn and the cropped image recomputed.
    pub fn handle(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down(p) => {
                self.state = self.hit_test(p);
                false
            }
            PointerEvent::Move(p) => self.pointer_move(p),
            PointerEvent::Up => {
                self.state = DragState::Idle;
                false
            }
        }
    }

    /// Move the rectangle by `(dx, dy)` outside of any pointer gesture,
    /// clamped to the image. Cancels a gesture in progress. Returns `true` if
    /// the rectangle moved.
    pub fn drag_by(&mut self, dx: f64, dy: f64) -> bool {
        let before = self.rect;
        self.state = DragState::Idle;
        self.translate_by(dx, dy);
        self.rect != before
    }

    /// Switch to a new photo size, keeping the current width.
    ///
    /// The height is recomputed from the width. If the taller rectangle no
    /// longer fits, it is pulled up; if it cannot fit at all, the width shrinks
    /// to the largest that does. Returns `true` if the size changed.
    pub fn set_photo_size(&mut self, size: PhotoSize) -> bool {
        if size == self.photo_size {
            return false;
        }
        self.photo_size = size;
        self.rect.h = self.rect.w / size.aspect();
        self.fit_into_image();
        true
    }

    /// Adopt a recomposed working image.
    ///
    /// A raster with new dimensions resets the rectangle to its centered
    /// default and cancels any gesture. Same-size recompositions (color or
    /// brightness changes) keep the rectangle. Returns `true` if the rectangle
    /// changed.
    pub fn replace_image(&mut self, width: u32, height: u32) -> bool {
        let before = self.rect;
        if (width, height) != (self.image_width, self.image_height) {
            self.image_width = width;
            self.image_height = height;
            self.rect = initial_rect(width, height, self.photo_size);
            self.state = DragState::Idle;
        } else {
            self.fit_into_image();
        }
        self.rect != before
    }

    /// Pixels under the crop rectangle, 1:1.
    pub fn crop(&self, working: &RgbaImage) -> RgbaImage {
        crop_region(working, self.rect)
    }

    /// Draw the editor overlay: dimmed image, crop area at full brightness,
    /// crop border on top.
    pub fn render_overlay(&self, canvas: &mut impl Canvas, working: &RgbaImage) {
        let image_area = Rect::full(working.width(), working.height());
        let (canvas_w, canvas_h) = canvas.dimensions();

        canvas.clear();
        canvas.draw_image(working, image_area);
        canvas.fill_rect(Rect::full(canvas_w, canvas_h), MASK_COLOR);

        canvas.set_clip(Some(self.rect));
        canvas.draw_image(working, image_area);
        canvas.set_clip(None);

        canvas.stroke_rect(self.rect, BORDER_COLOR, BORDER_WIDTH);
    }

    fn hit_test(&self, p: Point) -> DragState {
        let corner = self.rect.bottom_right();
        if (p.x - corner.x).abs() < HANDLE_RADIUS && (p.y - corner.y).abs() < HANDLE_RADIUS {
            DragState::Resizing { anchor: p }
        } else if self.rect.contains_strict(p) {
            DragState::Dragging { anchor: p }
        } else {
            DragState::Idle
        }
    }

    fn pointer_move(&mut self, p: Point) -> bool {
        match self.state {
            DragState::Idle => false,
            DragState::Dragging { anchor } => {
                self.translate_by(p.x - anchor.x, p.y - anchor.y);
                self.state = DragState::Dragging { anchor: p };
                true
            }
            DragState::Resizing { anchor } => {
                self.resize_by(p.x - anchor.x);
                self.state = DragState::Resizing { anchor: p };
                true
            }
        }
    }

    fn translate_by(&mut self, dx: f64, dy: f64) {
        let (max_x, max_y) = self.max_origin();
        self.rect.x = (self.rect.x + dx).clamp(0.0, max_x);
        self.rect.y = (self.rect.y + dy).clamp(0.0, max_y);
    }

    fn resize_by(&mut self, dx: f64) {
        let aspect = self.photo_size.aspect();
        let max_w = fit_locked_width(
            f64::INFINITY,
            aspect,
            self.image_width as f64 - self.rect.x,
            self.image_height as f64 - self.rect.y,
        );
        let min_w = MIN_CROP_WIDTH.min(max_w);
        self.rect.w = (self.rect.w + dx).clamp(min_w, max_w);
        self.rect.h = self.rect.w / aspect;
    }

    /// Shrink (only if unavoidable) and shift the rectangle back inside the
    /// image, keeping the aspect lock. Also restores the minimum width after
    /// a tiny image forced the rectangle below it.
    fn fit_into_image(&mut self) {
        let aspect = self.photo_size.aspect();
        let max_w = fit_locked_width(
            f64::INFINITY,
            aspect,
            self.image_width as f64,
            self.image_height as f64,
        );
        self.rect.w = self.rect.w.max(MIN_CROP_WIDTH.min(max_w)).min(max_w);
        self.rect.h = self.rect.w / aspect;

        let (max_x, max_y) = self.max_origin();
        self.rect.x = self.rect.x.clamp(0.0, max_x);
        self.rect.y = self.rect.y.clamp(0.0, max_y);
    }

    fn max_origin(&self) -> (f64, f64) {
        (
            (self.image_width as f64 - self.rect.w).max(0.0),
            (self.image_height as f64 - self.rect.h).max(0.0),
        )
    }
}
