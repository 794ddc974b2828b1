//! In-memory [`Canvas`] backed by an `image::RgbaImage`.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Pixel storage | `image::RgbaImage` |
//! | Stretch on draw | `image::imageops::resize` with `Lanczos3` |
//! | Alpha compositing | [`blend_over`] (`image::Pixel::blend` for translucent pixels) |
//!
//! Every draw is intersected with the surface bounds and the active clip
//! before any pixel is touched, so off-page copies cost nothing.

use super::backend::Canvas;
use super::operations::blend_over;
use crate::geometry::Rect;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use std::borrow::Cow;

/// Half-open pixel span `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

/// Drawing surface that owns its pixels.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    image: RgbaImage,
    clip: Option<Rect>,
}

impl RasterCanvas {
    /// Fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            clip: None,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Visible pixel span of `rect` after surface bounds and clip.
    fn span(&self, rect: Rect) -> Option<Span> {
        let (width, height) = self.image.dimensions();
        let mut bounds = (0i64, 0i64, width as i64, height as i64);

        let mut intersect = |r: Rect| {
            let (x, y, w, h) = r.to_pixels();
            bounds.0 = bounds.0.max(x);
            bounds.1 = bounds.1.max(y);
            bounds.2 = bounds.2.min(x + w as i64);
            bounds.3 = bounds.3.min(y + h as i64);
        };
        intersect(rect);
        if let Some(clip) = self.clip {
            intersect(clip);
        }

        let (x0, y0, x1, y1) = bounds;
        (x0 < x1 && y0 < y1).then(|| Span {
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1 as u32,
            y1: y1 as u32,
        })
    }

    fn paint(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        blend_over(self.image.get_pixel_mut(x, y), color);
    }
}

impl Canvas for RasterCanvas {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) {
        let Some(span) = self.span(rect) else {
            return;
        };
        for y in span.y0..span.y1 {
            for x in span.x0..span.x1 {
                self.paint(x, y, color);
            }
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        let (dx, dy, dw, dh) = dest.to_pixels();
        if dw == 0 || dh == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        let Some(span) = self.span(dest) else {
            return;
        };

        let source: Cow<'_, RgbaImage> = if image.dimensions() == (dw, dh) {
            Cow::Borrowed(image)
        } else {
            Cow::Owned(image::imageops::resize(image, dw, dh, FilterType::Lanczos3))
        };

        for y in span.y0..span.y1 {
            let sy = (y as i64 - dy) as u32;
            for x in span.x0..span.x1 {
                let sx = (x as i64 - dx) as u32;
                self.paint(x, y, *source.get_pixel(sx, sy));
            }
        }
    }

    fn set_clip(&mut self, clip: Option<Rect>) {
        self.clip = clip;
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgba<u8>, line_width: f64) {
        let half = line_width / 2.0;
        let outer = Rect::new(
            rect.x - half,
            rect.y - half,
            rect.w + line_width,
            rect.h + line_width,
        );
        let inner_h = (rect.h - line_width).max(0.0);

        self.fill_rect(Rect::new(outer.x, outer.y, outer.w, line_width), color);
        self.fill_rect(
            Rect::new(outer.x, rect.bottom() - half, outer.w, line_width),
            color,
        );
        self.fill_rect(Rect::new(outer.x, rect.y + half, line_width, inner_h), color);
        self.fill_rect(
            Rect::new(rect.right() - half, rect.y + half, line_width, inner_h),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn new_canvas_is_transparent() {
        let canvas = RasterCanvas::new(4, 3);
        assert_eq!(canvas.dimensions(), (4, 3));
        assert!(canvas.image().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn fill_rect_clips_to_surface() {
        let mut canvas = RasterCanvas::new(10, 10);
        canvas.fill_rect(Rect::new(-5.0, 8.0, 8.0, 10.0), RED);

        assert_eq!(*canvas.image().get_pixel(0, 9), RED);
        assert_eq!(*canvas.image().get_pixel(2, 8), RED);
        assert_eq!(canvas.image().get_pixel(3, 8)[3], 0);
        assert_eq!(canvas.image().get_pixel(0, 7)[3], 0);
    }

    #[test]
    fn translucent_fill_blends_over_existing_pixels() {
        let mut canvas = RasterCanvas::new(2, 2);
        canvas.fill_rect(Rect::full(2, 2), WHITE);
        canvas.fill_rect(Rect::full(2, 2), Rgba([0, 0, 0, 115]));

        let p = canvas.image().get_pixel(1, 1);
        assert_eq!(p[3], 255);
        // 255 * (1 - 115/255) = 140
        assert!((p[0] as i32 - 140).abs() <= 1, "got {:?}", p);
    }

    #[test]
    fn draw_image_same_size_copies_pixels() {
        let src = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8 * 10, y as u8 * 10, 7, 255]));
        let mut canvas = RasterCanvas::new(6, 6);
        canvas.draw_image(&src, Rect::new(2.0, 3.0, 3.0, 2.0));

        assert_eq!(*canvas.image().get_pixel(2, 3), Rgba([0, 0, 7, 255]));
        assert_eq!(*canvas.image().get_pixel(4, 4), Rgba([20, 10, 7, 255]));
        assert_eq!(canvas.image().get_pixel(1, 3)[3], 0);
    }

    #[test]
    fn draw_image_stretches_to_destination() {
        let src = RgbaImage::from_pixel(4, 4, RED);
        let mut canvas = RasterCanvas::new(20, 20);
        canvas.draw_image(&src, Rect::new(0.0, 0.0, 10.0, 16.0));

        assert_eq!(*canvas.image().get_pixel(9, 15), RED);
        assert_eq!(canvas.image().get_pixel(10, 15)[3], 0);
        assert_eq!(canvas.image().get_pixel(9, 16)[3], 0);
    }

    #[test]
    fn draw_image_entirely_off_canvas_is_ignored() {
        let src = RgbaImage::from_pixel(4, 4, RED);
        let mut canvas = RasterCanvas::new(10, 10);
        canvas.draw_image(&src, Rect::new(0.0, 40.0, 4.0, 4.0));
        assert!(canvas.image().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn clip_restricts_drawing_until_cleared() {
        let src = RgbaImage::from_pixel(10, 10, RED);
        let mut canvas = RasterCanvas::new(10, 10);
        canvas.set_clip(Some(Rect::new(2.0, 2.0, 3.0, 3.0)));
        canvas.draw_image(&src, Rect::full(10, 10));

        assert_eq!(*canvas.image().get_pixel(2, 2), RED);
        assert_eq!(*canvas.image().get_pixel(4, 4), RED);
        assert_eq!(canvas.image().get_pixel(5, 5)[3], 0);

        canvas.set_clip(None);
        canvas.fill_rect(Rect::new(8.0, 8.0, 1.0, 1.0), WHITE);
        assert_eq!(*canvas.image().get_pixel(8, 8), WHITE);
    }

    #[test]
    fn stroke_rect_leaves_interior_untouched() {
        let mut canvas = RasterCanvas::new(30, 30);
        canvas.stroke_rect(Rect::new(5.0, 5.0, 20.0, 20.0), RED, 2.0);

        assert_eq!(*canvas.image().get_pixel(4, 4), RED);
        assert_eq!(*canvas.image().get_pixel(5, 15), RED);
        assert_eq!(*canvas.image().get_pixel(24, 15), RED);
        assert_eq!(*canvas.image().get_pixel(15, 25), RED);
        assert_eq!(canvas.image().get_pixel(15, 15)[3], 0);
        assert_eq!(canvas.image().get_pixel(1, 1)[3], 0);
    }

    #[test]
    fn clear_resets_to_transparent() {
        let mut canvas = RasterCanvas::new(3, 3);
        canvas.fill_rect(Rect::full(3, 3), RED);
        canvas.clear();
        assert!(canvas.image().pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }
}
