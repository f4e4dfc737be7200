//! Interactive background removal on RGBA images.
//!
//! An image is segmented into a foreground matte, the matte is refined with a
//! restore/erase brush under linear undo/redo, and the result is composited
//! over a transparent, solid or blurred backdrop for PNG, JPEG or clipboard
//! export. [`EditorSession`] ties the pieces together; each piece is also
//! usable on its own as a free function or an extension trait.

mod config;
mod error;
mod matte;
mod session;
mod utils;

#[cfg(test)]
mod test_utils;

use image::{ImageBuffer, Pixel};

pub use config::{
    BackdropMode, EditorConfig, MAX_BLUR_RADIUS, MAX_BRUSH_RADIUS, MAX_EDGE_FEATHER,
    MIN_BRUSH_RADIUS,
};
pub use error::{AlphaMaskError, Error, ExportError};
pub use matte::apply_alpha_mask::ModifyAlpha;
pub use matte::box_filter::BoxBlur;
pub use matte::brush::{ApplyBrush, BrushMode, BrushState, BrushStroke};
pub use matte::compositor::{
    checkerboard, flatten_onto, format_hex_color, parse_hex_color, Backdrop, Composite,
    CHECKER_COLORS, CHECKER_SIZE,
};
pub use matte::export::{encode_jpeg, encode_png, ClipboardImage, DEFAULT_JPEG_QUALITY};
pub use matte::history::History;
pub use matte::mask::{empty_mask, AlphaMask, MaskLayer, OPAQUE};
pub use matte::segmentation::{
    center_boost, classify_foreground, dilate, feather, gradient_threshold, luma, segment,
    sobel_magnitude, SegmentForeground, SegmentationParams, MAX_FEATHER_WIDTH,
};
pub use matte::summed_area_table::SummedAreaTable;
pub use matte::worker::{
    SegmentationOutput, SegmentationRequest, SegmentationResponse, SegmentationWorker,
};
pub use session::EditorSession;

pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;
