//! Editor session: the single context that owns every raster and setting.
//!
//! Each user action is a `&mut self` method that updates its input and then
//! recomputes only the part of the dependency graph below it:
//!
//! ```text
//!   source ─┐
//!   removed ┼─► working ─┐
//!   settings┘            ├─► cropped ─┐
//!           crop rect ───┘            ├─► preview page
//!           photo size, copy count ───┘
//! ```
//!
//! | Action | Recomputes |
//! |---|---|
//! | [`upload`](Session::upload) | everything, crop re-centered |
//! | background / brightness / removal toggle | working → cropped → preview |
//! | pointer gesture, photo size | cropped → preview |
//! | copy count | preview |
//!
//! ## Background removal
//!
//! Removal is the one asynchronous step. [`Session::begin_removal`] hands out
//! a [`RemovalRequest`] carrying a token; the caller runs it against a
//! [`BackgroundRemover`] and feeds the outcome to
//! [`Session::finish_removal`]. A new upload (or toggling removal off)
//! invalidates the token, and a result that arrives with a stale token is
//! dropped. [`Session::enable_removed_background`] does all three steps for
//! callers that can hold the session across the await.
//!
//! The result is kept for the lifetime of the upload, so toggling removal off
//! and on again never calls the service twice.

use crate::compose::{AdjustmentSettings, composite};
use crate::crop::{CropEditor, PointerEvent};
use crate::export::{self, ExportError, ExportFormat};
use crate::geometry::{PREVIEW_SCALE, PhotoSize, Point, Rect};
use crate::grid::{PageLayout, compose_page};
use crate::imaging::{Brightness, CopyCount, RasterCanvas};
use crate::removal::{BackgroundRemover, RemovalError};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use thiserror::Error;

pub const REMOVE_LABEL: &str = "Remove background";
pub const REMOVING_LABEL: &str = "Removing…";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No photo has been uploaded")]
    NoUpload,
    #[error("Uploaded image is empty ({0}x{1})")]
    Empty(u32, u32),
    #[error(transparent)]
    Removal(#[from] RemovalError),
}

/// State of the "remove background" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalControl {
    pub enabled: bool,
    pub label: &'static str,
}

/// A removal call the caller must run and report back.
#[derive(Debug, Clone)]
pub struct RemovalRequest {
    pub token: u64,
    pub image: RgbaImage,
}

/// Outcome of asking for the background-removed variant.
#[derive(Debug)]
pub enum RemovalStart {
    /// Result already known for this upload; the working image was updated.
    Cached,
    /// A request is already in flight; nothing was started.
    InFlight,
    /// Caller must run this request.
    Request(RemovalRequest),
}

/// How often each derived stage was rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecomputeStats {
    pub composites: u32,
    pub crops: u32,
    pub pages: u32,
}

#[derive(Debug, Default)]
pub struct Session {
    source: Option<RgbaImage>,
    removed: Option<RgbaImage>,
    settings: AdjustmentSettings,
    photo_size: PhotoSize,
    copies: CopyCount,

    working: Option<RgbaImage>,
    crop: Option<CropEditor>,
    cropped: Option<RgbaImage>,
    preview: Option<RgbaImage>,

    pending: Option<u64>,
    next_token: u64,
    stats: RecomputeStats,
}

impl Session {
    pub fn new(photo_size: PhotoSize, copies: CopyCount, settings: AdjustmentSettings) -> Self {
        Self {
            photo_size,
            copies,
            settings: AdjustmentSettings {
                use_removed_background: false,
                ..settings
            },
            ..Self::default()
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn source(&self) -> Option<&RgbaImage> {
        self.source.as_ref()
    }

    pub fn removed(&self) -> Option<&RgbaImage> {
        self.removed.as_ref()
    }

    pub fn working(&self) -> Option<&RgbaImage> {
        self.working.as_ref()
    }

    pub fn cropped(&self) -> Option<&RgbaImage> {
        self.cropped.as_ref()
    }

    pub fn preview(&self) -> Option<&RgbaImage> {
        self.preview.as_ref()
    }

    pub fn crop_rect(&self) -> Option<Rect> {
        self.crop.as_ref().map(CropEditor::rect)
    }

    pub fn crop_editor(&self) -> Option<&CropEditor> {
        self.crop.as_ref()
    }

    pub fn settings(&self) -> AdjustmentSettings {
        self.settings
    }

    pub fn photo_size(&self) -> PhotoSize {
        self.photo_size
    }

    pub fn copies(&self) -> CopyCount {
        self.copies
    }

    pub fn layout(&self) -> PageLayout {
        PageLayout::print(self.photo_size)
    }

    pub fn stats(&self) -> RecomputeStats {
        self.stats
    }

    pub fn removal_control(&self) -> RemovalControl {
        match self.pending {
            Some(_) => RemovalControl {
                enabled: false,
                label: REMOVING_LABEL,
            },
            None => RemovalControl {
                enabled: true,
                label: REMOVE_LABEL,
            },
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Replace the photo. Drops any removal result or pending request for the
    /// previous upload and resets the crop to its centered default.
    ///
    /// An image with no pixels is rejected and the session is left as it was.
    pub fn upload(&mut self, image: RgbaImage) -> Result<(), SessionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SessionError::Empty(image.width(), image.height()));
        }
        tracing::debug!(width = image.width(), height = image.height(), "New upload");
        self.source = Some(image);
        self.removed = None;
        self.settings.use_removed_background = false;
        self.pending = None;
        self.crop = None;
        self.recompose();
        Ok(())
    }

    pub fn set_background(&mut self, color: Rgba<u8>) {
        self.settings.background = color;
        self.recompose();
    }

    pub fn set_brightness(&mut self, brightness: Brightness) {
        self.settings.brightness = brightness;
        self.recompose();
    }

    pub fn set_photo_size(&mut self, size: PhotoSize) {
        if size == self.photo_size {
            return;
        }
        self.photo_size = size;
        if let Some(crop) = self.crop.as_mut() {
            crop.set_photo_size(size);
        }
        self.recrop();
    }

    pub fn set_copy_count(&mut self, copies: CopyCount) {
        self.copies = copies;
        self.repaginate();
    }

    /// Feed a pointer event (already in working-image pixels) to the crop
    /// editor. Returns `true` if the crop changed.
    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        let changed = self
            .crop
            .as_mut()
            .is_some_and(|crop| crop.handle(event));
        if changed {
            self.recrop();
        }
        changed
    }

    /// Move the crop by `(dx, dy)` image pixels, as a drag of the crop body
    /// would. Works at any crop size, including crops small enough that the
    /// resize handle covers the whole body.
    pub fn replay_drag(&mut self, dx: f64, dy: f64) -> bool {
        let changed = self
            .crop
            .as_mut()
            .is_some_and(|crop| crop.drag_by(dx, dy));
        if changed {
            self.recrop();
        }
        changed
    }

    /// Replay a complete resize gesture on the bottom-right handle, moving the
    /// pointer `dw` pixels horizontally.
    pub fn replay_resize(&mut self, dw: f64) -> bool {
        let Some(rect) = self.crop_rect() else {
            return false;
        };
        let start = rect.bottom_right();
        self.replay_gesture(start, Point::new(start.x + dw, start.y))
    }

    fn replay_gesture(&mut self, from: Point, to: Point) -> bool {
        self.pointer(PointerEvent::Down(from));
        let changed = self.pointer(PointerEvent::Move(to));
        self.pointer(PointerEvent::Up);
        changed
    }

    /// Compose from the original upload again. Cancels a pending request.
    pub fn disable_removed_background(&mut self) {
        if self.pending.take().is_some() {
            tracing::debug!("Background removal cancelled");
        }
        if self.settings.use_removed_background {
            self.settings.use_removed_background = false;
            self.recompose();
        }
    }

    /// Switch to the background-removed variant, starting a request if this
    /// upload has none yet.
    pub fn begin_removal(&mut self) -> Result<RemovalStart, SessionError> {
        let Some(source) = self.source.as_ref() else {
            return Err(SessionError::NoUpload);
        };
        if self.removed.is_some() {
            if !self.settings.use_removed_background {
                self.settings.use_removed_background = true;
                self.recompose();
            }
            return Ok(RemovalStart::Cached);
        }
        if self.pending.is_some() {
            return Ok(RemovalStart::InFlight);
        }

        self.next_token += 1;
        let token = self.next_token;
        self.pending = Some(token);
        tracing::debug!(token, "Background removal started");
        Ok(RemovalStart::Request(RemovalRequest {
            token,
            image: source.clone(),
        }))
    }

    /// Deliver the outcome of a request from [`begin_removal`](Self::begin_removal).
    ///
    /// Returns `Ok(true)` when the result was applied and `Ok(false)` when
    /// it was discarded as stale. A failure resets the control and leaves the
    /// working image as it was.
    pub fn finish_removal(
        &mut self,
        token: u64,
        outcome: Result<RgbaImage, RemovalError>,
    ) -> Result<bool, SessionError> {
        if self.pending != Some(token) {
            tracing::warn!(token, "Discarding stale background-removal result");
            return Ok(false);
        }
        self.pending = None;

        let removed = outcome?;
        let Some(source) = self.source.as_ref() else {
            return Ok(false);
        };
        let removed = if removed.dimensions() == source.dimensions() {
            removed
        } else {
            tracing::debug!(
                from = ?removed.dimensions(),
                to = ?source.dimensions(),
                "Resizing removal result to match upload"
            );
            image::imageops::resize(&removed, source.width(), source.height(), FilterType::Lanczos3)
        };

        self.removed = Some(removed);
        self.settings.use_removed_background = true;
        self.recompose();
        Ok(true)
    }

    /// Begin, run and finish a removal in one go.
    pub async fn enable_removed_background(
        &mut self,
        remover: &impl BackgroundRemover,
    ) -> Result<(), SessionError> {
        match self.begin_removal()? {
            RemovalStart::Cached | RemovalStart::InFlight => Ok(()),
            RemovalStart::Request(request) => {
                let outcome = remover.remove_background(&request.image).await;
                self.finish_removal(request.token, outcome).map(|_| ())
            }
        }
    }

    /// Editor overlay for the current crop, at working-image size.
    pub fn render_overlay(&self) -> Option<RgbaImage> {
        let (working, crop) = (self.working.as_ref()?, self.crop.as_ref()?);
        let mut canvas = RasterCanvas::new(working.width(), working.height());
        crop.render_overlay(&mut canvas, working);
        Some(canvas.into_image())
    }

    /// Full-resolution page for printing. `None` until a photo is loaded.
    pub fn print_page(&self) -> Option<RgbaImage> {
        let cropped = self.cropped.as_ref()?;
        Some(compose_page(cropped, self.photo_size, self.copies.value(), 1.0))
    }

    /// Render the print page and encode it. `Ok(None)` when there is nothing
    /// to export yet.
    pub fn export(&self, format: ExportFormat) -> Result<Option<Vec<u8>>, ExportError> {
        let Some(page) = self.print_page() else {
            tracing::debug!("Export requested before upload; nothing to do");
            return Ok(None);
        };
        export::encode(&page, format).map(Some)
    }

    // =========================================================================
    // Recomputation
    // =========================================================================

    fn recompose(&mut self) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let base = match (&self.removed, self.settings.use_removed_background) {
            (Some(removed), true) => removed,
            _ => source,
        };
        let working = composite(base, &self.settings);
        self.stats.composites += 1;

        let (width, height) = working.dimensions();
        match self.crop.as_mut() {
            Some(crop) => {
                crop.replace_image(width, height);
            }
            None => self.crop = Some(CropEditor::new(width, height, self.photo_size)),
        }
        self.working = Some(working);
        self.recrop();
    }

    fn recrop(&mut self) {
        let (Some(working), Some(crop)) = (self.working.as_ref(), self.crop.as_ref()) else {
            return;
        };
        self.cropped = Some(crop.crop(working));
        self.stats.crops += 1;
        self.repaginate();
    }

    fn repaginate(&mut self) {
        let Some(cropped) = self.cropped.as_ref() else {
            return;
        };
        self.preview = Some(compose_page(
            cropped,
            self.photo_size,
            self.copies.value(),
            PREVIEW_SCALE,
        ));
        self.stats.pages += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::DragState;
    use crate::removal::tests::MockRemover;
    use crate::test_helpers::{assert_crop_invariants, gradient_image, subject_on_transparent};
    use reqwest::StatusCode;

    fn loaded(width: u32, height: u32) -> Session {
        let mut session = Session::default();
        session.upload(gradient_image(width, height)).unwrap();
        session
    }

    #[test]
    fn empty_session_has_nothing_to_show() {
        let session = Session::default();
        assert!(session.working().is_none());
        assert!(session.preview().is_none());
        assert!(session.render_overlay().is_none());
        assert!(session.export(ExportFormat::Png).unwrap().is_none());
    }

    #[test]
    fn actions_before_upload_are_harmless() {
        let mut session = Session::default();
        session.set_brightness(Brightness::new(40));
        session.set_copy_count(CopyCount::new(3));
        session.set_photo_size(PhotoSize::Cm5x5);
        assert!(!session.pointer(PointerEvent::Down(Point::new(1.0, 1.0))));
        assert_eq!(session.stats(), RecomputeStats::default());
        assert!(matches!(session.begin_removal(), Err(SessionError::NoUpload)));
    }

    #[test]
    fn upload_builds_whole_pipeline() {
        let session = loaded(1000, 1000);
        assert_eq!(session.working().unwrap().dimensions(), (1000, 1000));
        assert_eq!(
            session.crop_rect(),
            Some(Rect::new(200.0, 200.0, 600.0, 600.0))
        );
        assert_eq!(session.cropped().unwrap().dimensions(), (600, 600));
        assert_eq!(session.preview().unwrap().dimensions(), (620, 877));
        assert_eq!(
            session.stats(),
            RecomputeStats {
                composites: 1,
                crops: 1,
                pages: 1
            }
        );
    }

    #[test]
    fn copy_count_only_repaginates() {
        let mut session = loaded(300, 300);
        session.set_copy_count(CopyCount::new(12));
        assert_eq!(session.stats().composites, 1);
        assert_eq!(session.stats().crops, 1);
        assert_eq!(session.stats().pages, 2);
    }

    #[test]
    fn pointer_drag_recrops_without_recomposing() {
        let mut session = loaded(1000, 1000);
        session.pointer(PointerEvent::Down(Point::new(500.0, 500.0)));
        assert!(session.pointer(PointerEvent::Move(Point::new(550.0, 500.0))));
        session.pointer(PointerEvent::Up);

        assert_eq!(session.crop_rect().unwrap().x, 250.0);
        assert_eq!(session.stats().composites, 1);
        assert_eq!(session.stats().crops, 2);
        assert_eq!(
            *session.cropped().unwrap().get_pixel(0, 0),
            *session.working().unwrap().get_pixel(250, 200)
        );
    }

    #[test]
    fn replayed_gestures_drag_and_resize() {
        let mut session = loaded(1000, 1000);
        assert!(session.replay_drag(-50.0, 30.0));
        assert_eq!(
            session.crop_rect(),
            Some(Rect::new(150.0, 230.0, 600.0, 600.0))
        );

        assert!(session.replay_resize(-100.0));
        assert_eq!(
            session.crop_rect(),
            Some(Rect::new(150.0, 230.0, 500.0, 500.0))
        );
        assert_eq!(session.crop_editor().unwrap().state(), DragState::Idle);
    }

    #[test]
    fn replayed_drag_moves_minimum_width_crop() {
        let mut session = loaded(80, 80);
        let before = session.crop_rect().unwrap();
        assert_eq!(before, Rect::new(15.0, 15.0, 50.0, 50.0));

        assert!(session.replay_drag(10.0, 10.0));
        assert_eq!(
            session.crop_rect(),
            Some(Rect::new(25.0, 25.0, 50.0, 50.0))
        );
        assert_eq!(session.cropped().unwrap().dimensions(), (50, 50));
    }

    #[test]
    fn replayed_drag_moves_crop_smaller_than_handle() {
        let mut session = loaded(30, 40);
        let before = session.crop_rect().unwrap();
        assert!(session.replay_drag(0.0, 5.0));
        let after = session.crop_rect().unwrap();
        assert_eq!((after.w, after.h), (before.w, before.h));
        assert_eq!(after.y, before.y + 5.0);
        assert_crop_invariants(after, (30, 40), PhotoSize::Inch2x2);
    }

    #[test]
    fn empty_upload_is_rejected() {
        let mut session = Session::default();
        assert!(matches!(
            session.upload(RgbaImage::new(0, 10)),
            Err(SessionError::Empty(0, 10))
        ));
        assert!(session.source().is_none());
        assert!(session.preview().is_none());

        let mut session = loaded(40, 40);
        assert!(session.upload(RgbaImage::new(12, 0)).is_err());
        assert_eq!(session.source().unwrap().dimensions(), (40, 40));
        assert!(session.preview().is_some());
    }

    #[test]
    fn replay_without_upload_is_a_no_op() {
        let mut session = Session::default();
        assert!(!session.replay_drag(10.0, 10.0));
        assert!(!session.replay_resize(10.0));
    }

    #[test]
    fn pointer_move_while_idle_does_nothing() {
        let mut session = loaded(500, 500);
        assert!(!session.pointer(PointerEvent::Move(Point::new(10.0, 10.0))));
        assert_eq!(session.stats().crops, 1);
    }

    #[test]
    fn brightness_keeps_crop_and_saturates() {
        let mut session = loaded(400, 300);
        session.pointer(PointerEvent::Down(Point::new(200.0, 150.0)));
        session.pointer(PointerEvent::Move(Point::new(190.0, 140.0)));
        session.pointer(PointerEvent::Up);
        let rect = session.crop_rect().unwrap();

        session.set_brightness(Brightness::new(100));
        assert_eq!(session.crop_rect(), Some(rect));
        assert!(
            session
                .working()
                .unwrap()
                .pixels()
                .all(|p| *p == Rgba([255, 255, 255, 255]))
        );
    }

    #[test]
    fn photo_size_change_keeps_invariants() {
        let mut session = loaded(800, 600);
        for size in [PhotoSize::Cm35x45, PhotoSize::Cm5x5, PhotoSize::Inch2x2] {
            session.set_photo_size(size);
            assert_crop_invariants(session.crop_rect().unwrap(), (800, 600), size);
        }
        assert_eq!(session.stats().composites, 1);
    }

    #[test]
    fn new_upload_recenters_crop() {
        let mut session = loaded(1000, 1000);
        session.pointer(PointerEvent::Down(Point::new(500.0, 500.0)));
        session.pointer(PointerEvent::Move(Point::new(400.0, 400.0)));
        session.upload(gradient_image(1000, 1000)).unwrap();

        assert_eq!(
            session.crop_rect(),
            Some(Rect::new(200.0, 200.0, 600.0, 600.0))
        );
        assert_eq!(session.crop_editor().unwrap().state(), DragState::Idle);
    }

    #[test]
    fn export_renders_full_page() {
        let session = loaded(200, 200);
        let bytes = session.export(ExportFormat::Png).unwrap().unwrap();
        let page = crate::imaging::decode_image(&bytes).unwrap();
        assert_eq!(page.dimensions(), (2480, 3508));
    }

    // =========================================================================
    // Background removal
    // =========================================================================

    #[tokio::test]
    async fn removal_composes_subject_over_background() {
        let mut session = loaded(20, 20);
        session.set_background(Rgba([0, 0, 255, 255]));
        let remover = MockRemover::returning(subject_on_transparent(20, 20));

        session.enable_removed_background(&remover).await.unwrap();

        assert!(session.settings().use_removed_background);
        assert_eq!(*session.working().unwrap().get_pixel(0, 0), Rgba([0, 0, 255, 255]));
        assert_eq!(session.removal_control().label, REMOVE_LABEL);
    }

    #[tokio::test]
    async fn toggle_off_and_on_reuses_cached_result() {
        let mut session = loaded(20, 20);
        let original = session.working().unwrap().clone();
        let remover = MockRemover::returning(subject_on_transparent(20, 20));

        session.enable_removed_background(&remover).await.unwrap();
        let removed_working = session.working().unwrap().clone();

        session.disable_removed_background();
        assert_eq!(session.working(), Some(&original));

        session.enable_removed_background(&remover).await.unwrap();
        assert_eq!(session.working(), Some(&removed_working));
        assert_eq!(remover.calls.get(), 1);
    }

    #[tokio::test]
    async fn server_error_resets_control_and_keeps_working_image() {
        let mut session = loaded(30, 30);
        let before = session.working().unwrap().clone();
        let remover = MockRemover::failing(StatusCode::INTERNAL_SERVER_ERROR);

        let err = session.enable_removed_background(&remover).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Removal(RemovalError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
        assert_eq!(
            session.removal_control(),
            RemovalControl {
                enabled: true,
                label: REMOVE_LABEL
            }
        );
        assert_eq!(session.working(), Some(&before));
        assert!(!session.settings().use_removed_background);
        assert!(session.removed().is_none());
    }

    #[test]
    fn control_shows_progress_while_pending() {
        let mut session = loaded(10, 10);
        let RemovalStart::Request(_) = session.begin_removal().unwrap() else {
            panic!("expected a request");
        };
        assert_eq!(
            session.removal_control(),
            RemovalControl {
                enabled: false,
                label: REMOVING_LABEL
            }
        );
        assert!(matches!(
            session.begin_removal().unwrap(),
            RemovalStart::InFlight
        ));
    }

    #[test]
    fn result_for_previous_upload_is_discarded() {
        let mut session = loaded(10, 10);
        let RemovalStart::Request(request) = session.begin_removal().unwrap() else {
            panic!("expected a request");
        };

        session.upload(gradient_image(12, 12)).unwrap();
        let applied = session
            .finish_removal(request.token, Ok(subject_on_transparent(10, 10)))
            .unwrap();

        assert!(!applied);
        assert!(session.removed().is_none());
        assert!(!session.settings().use_removed_background);
        assert_eq!(session.removal_control().label, REMOVE_LABEL);
    }

    #[test]
    fn cancelled_request_is_discarded() {
        let mut session = loaded(10, 10);
        let RemovalStart::Request(request) = session.begin_removal().unwrap() else {
            panic!("expected a request");
        };
        session.disable_removed_background();

        let applied = session
            .finish_removal(request.token, Ok(subject_on_transparent(10, 10)))
            .unwrap();
        assert!(!applied);
        assert!(session.removed().is_none());
    }

    #[test]
    fn mismatched_removal_size_is_resized_to_upload() {
        let mut session = loaded(40, 30);
        let rect = session.crop_rect().unwrap();
        let RemovalStart::Request(request) = session.begin_removal().unwrap() else {
            panic!("expected a request");
        };

        session
            .finish_removal(request.token, Ok(subject_on_transparent(80, 60)))
            .unwrap();
        assert_eq!(session.removed().unwrap().dimensions(), (40, 30));
        assert_eq!(session.crop_rect(), Some(rect));
    }

    #[test]
    fn overlay_matches_working_size() {
        let session = loaded(120, 90);
        assert_eq!(session.render_overlay().unwrap().dimensions(), (120, 90));
    }
}
