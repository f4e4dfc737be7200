use thiserror::Error;

/// Error type for alpha mask operations
///
/// This error type covers failures that can occur when a mask is combined
/// with an image whose shape it does not share.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlphaMaskError {
    /// Image and mask dimensions do not match
    ///
    /// This error occurs when attempting to apply an alpha mask
    /// to an image where the dimensions don't align properly.
    #[error("Image and mask dimensions do not match: expected {expected:?}, actual {actual:?}")]
    DimensionMismatch {
        /// Expected dimensions (width, height)
        expected: (u32, u32),
        /// Actual dimensions (width, height)
        actual: (u32, u32),
    },
}

/// Error type for export operations
///
/// Returned when the composited buffer cannot be turned into encoded bytes.
/// No partial output is ever handed back alongside this error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// The underlying encoder rejected the buffer
    #[error("Failed to encode {format} image: {message}")]
    Encoding {
        /// Target format name
        format: &'static str,
        /// Message reported by the encoder
        message: String,
    },

    /// Raw pixel data could not be wrapped into an image buffer
    #[error("Failed to create ImageBuffer from processed pixels")]
    ImageBufferCreationFailed,
}

/// Top level error type for the editing session
///
/// Every failed operation is reported through this type so the caller can
/// surface it to the user. Nothing here is retried automatically.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The image has zero width or zero height
    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// A mask operation failed
    #[error(transparent)]
    AlphaMask(#[from] AlphaMaskError),

    /// Encoding the composited result failed
    #[error(transparent)]
    Export(#[from] ExportError),

    /// A color string could not be parsed
    ///
    /// Accepted forms are `#rrggbb`, `rrggbb` and `#rgb`.
    #[error("Invalid color: {0:?}")]
    InvalidColor(String),

    /// A segmentation request is still outstanding
    ///
    /// Returned for a second segmentation request and for brush edits issued
    /// before the pending result has been applied.
    #[error("A segmentation request is already in progress")]
    SegmentationPending,

    /// No segmentation request is outstanding
    #[error("No segmentation request is in progress")]
    NoPendingSegmentation,

    /// The segmentation worker thread is gone or could not be started
    #[error("Segmentation worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// The segmentation engine panicked while processing a request
    #[error("Segmentation failed: {0}")]
    SegmentationFailed(String),
}
