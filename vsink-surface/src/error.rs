//! Error types for surface delivery

use thiserror::Error;
use vsink_video::VideoError;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("object is not an image-bearing surface")]
    IncompatibleSurface,

    #[error("failed to start delivery consumer: {0}")]
    ChannelUnavailable(#[source] std::io::Error),

    #[error("delivery consumer has exited")]
    ChannelClosed,

    #[error("unsupported surface format {0:?}")]
    UnsupportedFormat(vsink_video::PixelFormat),

    #[error(transparent)]
    Video(#[from] VideoError),
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
