//! Error types for the frame transform path

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    /// A scratch buffer could not be allocated. Fatal for the pipeline.
    #[error("failed to allocate {bytes} byte {buffer} buffer")]
    AllocationFailed { buffer: &'static str, bytes: usize },

    #[error("invalid geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("buffer too small: need {expected} bytes, have {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("unsupported rotation angle {0}")]
    UnsupportedRotation(u32),

    #[error("format not negotiated")]
    NotNegotiated,

    #[error("unsupported pixel format {0}")]
    UnsupportedFormat(u32),

    #[error("pipeline halted after a fatal error")]
    Halted,
}

impl VideoError {
    /// Errors that stop the pipeline rather than skipping one frame
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VideoError::AllocationFailed { .. } | VideoError::Halted
        )
    }
}

pub type Result<T> = std::result::Result<T, VideoError>;
