//! Editing session: one image, its mask and everything that edits it
//!
//! `EditorSession` is the explicit context object tying the pieces together.
//! It owns the source image, the live mask, the undo history and the
//! segmentation worker; every operation goes through it.

use std::sync::Arc;

use image::{Rgb, Rgba};
use imageproc::definitions::Image;

use crate::error::Error;
use crate::matte::brush::{BrushState, BrushStroke};
use crate::matte::compositor::{flatten_onto, Backdrop, Composite};
use crate::matte::export::{encode_jpeg, encode_png, ClipboardImage};
use crate::matte::history::History;
use crate::matte::mask::{empty_mask, AlphaMask, MaskLayer};
use crate::matte::segmentation::SegmentationParams;
use crate::matte::worker::{SegmentationRequest, SegmentationResponse, SegmentationWorker};
use crate::utils::validate_non_empty_image;

/// State of one loaded image
///
/// The history always starts with a snapshot of the empty mask, so undoing
/// every edit brings the mask back to fully opaque.
#[derive(Debug)]
pub struct EditorSession {
    image: Arc<Image<Rgba<u8>>>,
    mask: AlphaMask,
    history: History,
    worker: SegmentationWorker,
    pending: Option<u64>,
    next_request: u64,
    stroke: Option<BrushStroke>,
}

impl EditorSession {
    /// Loads an image with the built-in segmentation engine.
    ///
    /// # Errors
    ///
    /// * `Error::EmptyImage` - When the image has zero width or height
    /// * `Error::WorkerUnavailable` - When the worker thread cannot be started
    pub fn new(image: Image<Rgba<u8>>) -> Result<Self, Error> {
        ensure_non_empty(&image)?;
        Self::with_worker(image, SegmentationWorker::spawn()?)
    }

    /// Loads an image with an already running worker.
    ///
    /// # Errors
    ///
    /// * `Error::EmptyImage` - When the image has zero width or height
    pub fn with_worker(image: Image<Rgba<u8>>, worker: SegmentationWorker) -> Result<Self, Error> {
        ensure_non_empty(&image)?;

        let (width, height) = image.dimensions();
        let mask = empty_mask(width, height);
        let mut history = History::new();
        history.push(&mask);

        tracing::info!(width, height, "image loaded");

        Ok(Self {
            image: Arc::new(image),
            mask,
            history,
            worker,
            pending: None,
            next_request: 0,
            stroke: None,
        })
    }

    /// Sends the image to the worker.
    ///
    /// An open brush stroke is committed first. The result is applied by
    /// [`poll_segmentation`](Self::poll_segmentation) or
    /// [`wait_segmentation`](Self::wait_segmentation).
    ///
    /// # Errors
    ///
    /// * `Error::SegmentationPending` - When a request is already outstanding
    /// * `Error::WorkerUnavailable` - When the worker is gone
    pub fn request_segmentation(&mut self, params: &SegmentationParams) -> Result<(), Error> {
        if self.pending.is_some() {
            tracing::warn!("segmentation requested while another is pending");
            return Err(Error::SegmentationPending);
        }
        self.end_stroke();

        let id = self.next_request;
        self.worker.submit(SegmentationRequest {
            id,
            image: Arc::clone(&self.image),
            params: *params,
        })?;
        self.next_request += 1;
        self.pending = Some(id);

        tracing::info!(
            id,
            sensitivity = params.sensitivity,
            edge_feather = params.edge_feather,
            "segmentation requested"
        );
        Ok(())
    }

    /// Applies the pending result if it has arrived.
    ///
    /// Returns `Ok(false)` while the worker is still busy.
    ///
    /// # Errors
    ///
    /// * `Error::NoPendingSegmentation` - When nothing was requested
    /// * `Error::SegmentationFailed` / `Error::AlphaMask` - When the worker reported a failure; mask and history are unchanged
    /// * `Error::WorkerUnavailable` - When the worker is gone
    pub fn poll_segmentation(&mut self) -> Result<bool, Error> {
        if self.pending.is_none() {
            return Err(Error::NoPendingSegmentation);
        }

        match self.worker.try_recv() {
            Ok(Some(response)) => self.finish_segmentation(response).map(|()| true),
            Ok(None) => Ok(false),
            Err(error) => {
                self.pending = None;
                tracing::warn!(%error, "segmentation worker lost");
                Err(error)
            }
        }
    }

    /// Blocks until the pending result arrives and applies it.
    ///
    /// # Errors
    ///
    /// Same as [`poll_segmentation`](Self::poll_segmentation).
    pub fn wait_segmentation(&mut self) -> Result<(), Error> {
        if self.pending.is_none() {
            return Err(Error::NoPendingSegmentation);
        }

        match self.worker.recv() {
            Ok(response) => self.finish_segmentation(response),
            Err(error) => {
                self.pending = None;
                tracing::warn!(%error, "segmentation worker lost");
                Err(error)
            }
        }
    }

    /// Requests segmentation and waits for the result.
    ///
    /// # Errors
    ///
    /// Same as [`request_segmentation`](Self::request_segmentation) and
    /// [`wait_segmentation`](Self::wait_segmentation).
    pub fn segment(&mut self, params: &SegmentationParams) -> Result<(), Error> {
        self.request_segmentation(params)?;
        self.wait_segmentation()
    }

    fn finish_segmentation(&mut self, response: SegmentationResponse) -> Result<(), Error> {
        if self.pending != Some(response.id) {
            tracing::warn!(id = response.id, "discarding unexpected segmentation response");
            return Ok(());
        }
        self.pending = None;

        let output = response.result?;
        self.mask.copy_from_mask(&output.mask)?;
        self.history.push(&self.mask);

        tracing::info!(
            id = response.id,
            foreground = self.mask.count_nonzero(),
            "segmentation applied"
        );
        Ok(())
    }

    /// Starts a brush stroke with a stamp at `(x, y)`.
    ///
    /// A stroke that is still open is committed first.
    ///
    /// # Errors
    ///
    /// * `Error::SegmentationPending` - While a segmentation result is outstanding
    pub fn begin_stroke(&mut self, brush: BrushState, x: f32, y: f32) -> Result<(), Error> {
        self.ensure_idle()?;
        self.end_stroke();

        let mut stroke = BrushStroke::new(brush);
        stroke.stamp_to(&mut self.mask, x, y);
        self.stroke = Some(stroke);
        Ok(())
    }

    /// Extends the open stroke to `(x, y)`. Without an open stroke this does nothing.
    ///
    /// # Errors
    ///
    /// * `Error::SegmentationPending` - While a segmentation result is outstanding
    pub fn stroke_to(&mut self, x: f32, y: f32) -> Result<(), Error> {
        self.ensure_idle()?;
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.stamp_to(&mut self.mask, x, y);
        }
        Ok(())
    }

    /// Commits the open stroke as one history entry.
    ///
    /// Returns `false` when no stroke was open.
    pub fn end_stroke(&mut self) -> bool {
        let Some(stroke) = self.stroke.take() else {
            return false;
        };
        self.history.push(&self.mask);
        tracing::debug!(stamps = stroke.stamps(), "brush stroke committed");
        true
    }

    /// Applies a single stamp as its own history entry.
    ///
    /// # Errors
    ///
    /// * `Error::SegmentationPending` - While a segmentation result is outstanding
    pub fn apply_brush(&mut self, x: f32, y: f32, brush: &BrushState) -> Result<(), Error> {
        self.begin_stroke(*brush, x, y)?;
        self.end_stroke();
        Ok(())
    }

    /// Steps the mask back one history entry. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> bool {
        self.end_stroke();
        self.history.undo(&mut self.mask)
    }

    /// Steps the mask forward one history entry. Returns `false` at the newest entry.
    pub fn redo(&mut self) -> bool {
        self.end_stroke();
        self.history.redo(&mut self.mask)
    }

    /// Clears the mask to fully opaque and starts a fresh history.
    pub fn reset(&mut self) {
        self.stroke = None;
        self.history.reset(&mut self.mask);
        self.history.push(&self.mask);
        tracing::info!("mask reset");
    }

    /// Composites the image over `backdrop`.
    ///
    /// # Errors
    ///
    /// * `Error::AlphaMask` - Never for a consistent session; kept for the compositor contract
    pub fn render(&self, backdrop: &Backdrop) -> Result<Image<Rgba<u8>>, Error> {
        Ok(self.image.composite(&self.mask, backdrop)?)
    }

    /// Opaque display buffer, with a checkerboard where the result is transparent.
    ///
    /// # Errors
    ///
    /// * `Error::AlphaMask` - Never for a consistent session; kept for the compositor contract
    pub fn preview(&self, backdrop: &Backdrop) -> Result<Image<Rgb<u8>>, Error> {
        Ok(self.image.preview(&self.mask, backdrop)?)
    }

    /// Renders over `backdrop` and encodes as PNG.
    ///
    /// # Errors
    ///
    /// * `Error::Export` - When encoding fails
    pub fn export_png(&self, backdrop: &Backdrop) -> Result<Vec<u8>, Error> {
        let bytes = encode_png(&self.render(backdrop)?)?;
        tracing::info!(format = "png", len = bytes.len(), "exported");
        Ok(bytes)
    }

    /// Flattens the original image onto `color` and encodes as JPEG.
    ///
    /// The mask plays no part here: the output is the source picture with any
    /// existing transparency filled by `color`.
    ///
    /// # Errors
    ///
    /// * `Error::Export` - When encoding fails
    pub fn export_jpeg(&self, color: Rgb<u8>, quality: u8) -> Result<Vec<u8>, Error> {
        let bytes = encode_jpeg(&flatten_onto(&self.image, color), quality)?;
        tracing::info!(format = "jpeg", quality, len = bytes.len(), "exported");
        Ok(bytes)
    }

    /// Renders over `backdrop` as a raw clipboard payload.
    ///
    /// # Errors
    ///
    /// * `Error::AlphaMask` - Never for a consistent session; kept for the compositor contract
    pub fn clipboard_image(&self, backdrop: &Backdrop) -> Result<ClipboardImage, Error> {
        let clip = ClipboardImage::from_image(self.render(backdrop)?);
        tracing::info!(format = "clipboard", len = clip.bytes.len(), "exported");
        Ok(clip)
    }

    #[must_use]
    pub fn image(&self) -> &Image<Rgba<u8>> {
        &self.image
    }

    #[must_use]
    pub const fn mask(&self) -> &AlphaMask {
        &self.mask
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Whether a segmentation request is outstanding.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub const fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// Stops the worker thread. Later segmentation requests fail with
    /// `Error::WorkerUnavailable`; editing keeps working.
    pub fn shutdown(&mut self) {
        self.worker.stop();
        self.pending = None;
    }

    fn ensure_idle(&self) -> Result<(), Error> {
        if self.pending.is_some() {
            tracing::warn!("brush edit rejected while segmentation is pending");
            return Err(Error::SegmentationPending);
        }
        Ok(())
    }
}

fn ensure_non_empty(image: &Image<Rgba<u8>>) -> Result<(), Error> {
    let (width, height) = image.dimensions();
    validate_non_empty_image(width, height, "EditorSession")
        .map_err(|_| Error::EmptyImage { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matte::brush::BrushMode;
    use crate::matte::segmentation::segment;
    use crate::test_utils::create_pattern_rgba_image;

    fn session(width: u32, height: u32) -> EditorSession {
        EditorSession::new(create_pattern_rgba_image(width, height)).unwrap()
    }

    fn eraser() -> BrushState {
        BrushState::new(3.0, 100, BrushMode::Erase)
    }

    #[test]
    fn new_session_starts_with_empty_mask_baseline() {
        let session = session(8, 6);
        assert_eq!(session.mask(), &empty_mask(8, 6));
        assert_eq!(session.history().len(), 1);
        assert!(!session.history().can_undo());
        assert!(!session.is_busy());
    }

    #[test]
    fn rejects_empty_image() {
        assert_eq!(
            EditorSession::new(Image::new(0, 5)).unwrap_err(),
            Error::EmptyImage {
                width: 0,
                height: 5
            }
        );
    }

    #[test]
    fn segmentation_replaces_mask_and_records_history() {
        let mut session = session(10, 10);
        let params = SegmentationParams::new(60, 2.0);

        session.request_segmentation(&params).unwrap();
        assert!(session.is_busy());
        session.wait_segmentation().unwrap();

        assert!(!session.is_busy());
        assert_eq!(session.mask(), &segment(session.image(), &params));
        assert_eq!(session.history().len(), 2);

        assert!(session.undo());
        assert_eq!(session.mask(), &empty_mask(10, 10));
    }

    #[test]
    fn pending_segmentation_blocks_brush_and_second_request() {
        let mut session = session(6, 6);
        session
            .request_segmentation(&SegmentationParams::default())
            .unwrap();

        assert_eq!(
            session.request_segmentation(&SegmentationParams::default()),
            Err(Error::SegmentationPending)
        );
        assert_eq!(
            session.apply_brush(3.0, 3.0, &eraser()),
            Err(Error::SegmentationPending)
        );

        session.wait_segmentation().unwrap();
        assert!(session.apply_brush(3.0, 3.0, &eraser()).is_ok());
    }

    #[test]
    fn polling_without_request_is_an_error() {
        let mut session = session(4, 4);
        assert_eq!(session.poll_segmentation(), Err(Error::NoPendingSegmentation));
        assert_eq!(session.wait_segmentation(), Err(Error::NoPendingSegmentation));
    }

    #[test]
    fn stroke_is_one_history_entry() {
        let mut session = session(30, 10);
        session.begin_stroke(eraser(), 3.0, 5.0).unwrap();
        session.stroke_to(15.0, 5.0).unwrap();
        session.stroke_to(27.0, 5.0).unwrap();
        assert!(session.is_stroking());
        assert!(session.end_stroke());
        assert!(!session.end_stroke());

        assert_eq!(session.history().len(), 2);
        assert!(session.mask().get_pixel(15, 5)[0] < 255);

        assert!(session.undo());
        assert_eq!(session.mask(), &empty_mask(30, 10));
    }

    #[test]
    fn stroke_to_without_begin_is_ignored() {
        let mut session = session(8, 8);
        session.stroke_to(4.0, 4.0).unwrap();
        assert_eq!(session.mask(), &empty_mask(8, 8));
    }

    #[test]
    fn reset_restores_baseline() {
        let mut session = session(8, 8);
        session.apply_brush(4.0, 4.0, &eraser()).unwrap();
        session.apply_brush(2.0, 2.0, &eraser()).unwrap();

        session.reset();

        assert_eq!(session.mask(), &empty_mask(8, 8));
        assert_eq!(session.history().len(), 1);
        assert!(!session.undo());
    }

    #[test]
    fn shutdown_makes_worker_unavailable() {
        let mut session = session(4, 4);
        session.shutdown();

        assert!(matches!(
            session.request_segmentation(&SegmentationParams::default()),
            Err(Error::WorkerUnavailable(_))
        ));
        assert!(!session.is_busy());
        assert!(session.apply_brush(1.0, 1.0, &eraser()).is_ok());
    }
}
