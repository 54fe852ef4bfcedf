//! Video data types and constants

use bytemuck::{Pod, Zeroable};
use std::sync::Arc;

/// Bytes per pixel of every packed format and of all scratch buffers
pub const PACKED_BYTES_PER_PIXEL: usize = 4;

/// Pixel format enumeration
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    I420 = 1, // Planar YUV 4:2:0 (Y, U, V)
    YV12 = 2, // Planar YUV 4:2:0 (Y, V, U)
    RGBA = 6, // Packed RGB
    BGRA = 7, // Packed BGR
    BGRX = 8, // Packed BGR (no alpha)
    ARGB = 9, // Packed RGB, alpha first
}

impl PixelFormat {
    /// Map a raw format tag (as carried over FFI) back to a format
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(PixelFormat::I420),
            2 => Some(PixelFormat::YV12),
            6 => Some(PixelFormat::RGBA),
            7 => Some(PixelFormat::BGRA),
            8 => Some(PixelFormat::BGRX),
            9 => Some(PixelFormat::ARGB),
            _ => None,
        }
    }

    /// Returns number of planes for this format
    pub fn plane_count(self) -> usize {
        match self {
            PixelFormat::I420 | PixelFormat::YV12 => 3,
            _ => 1,
        }
    }

    /// Returns bytes per pixel for packed formats
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::I420 | PixelFormat::YV12 => 0, // Planar formats
            _ => PACKED_BYTES_PER_PIXEL,
        }
    }

    /// Check if format is planar
    pub fn is_planar(self) -> bool {
        self.plane_count() > 1
    }

    /// Calculate frame size in bytes
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        let (width, height) = (width as usize, height as usize);
        match self {
            PixelFormat::I420 | PixelFormat::YV12 => {
                let (cw, ch) = chroma_dimensions(width, height);
                width * height + cw * ch * 2
            }
            _ => width * height * self.bytes_per_pixel(),
        }
    }
}

/// Dimensions of one chroma plane of a 4:2:0 frame
///
/// Odd luma dimensions round up so the last column/row still has a sample.
pub fn chroma_dimensions(width: usize, height: usize) -> (usize, usize) {
    (width.div_ceil(2), height.div_ceil(2))
}

/// Negotiated stream format, C-compatible for the FFI layer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub format: u32, // PixelFormat as u32
}

impl FrameInfo {
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: format as u32,
        }
    }

    pub fn pixel_format(&self) -> Option<PixelFormat> {
        PixelFormat::from_raw(self.format)
    }
}

/// A decoded video frame
///
/// Immutable once produced. Frames travel between threads as [`FrameRef`];
/// cloning the `Arc` takes a reference, dropping it releases one.
#[derive(Clone)]
pub struct VideoFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub timestamp: u64,
}

/// Shared handle to a frame
pub type FrameRef = Arc<VideoFrame>;

impl VideoFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
            timestamp: 0,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Wrap the frame for hand-off to another thread
    pub fn into_ref(self) -> FrameRef {
        Arc::new(self)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes the header says the payload should hold
    pub fn expected_size(&self) -> usize {
        self.format.frame_size(self.width, self.height)
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("timestamp", &self.timestamp)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Source/destination geometry of a sink
///
/// `dst_width`/`dst_height` hold the configured values; 0 means "follow the
/// source". `dirty` forces scratch reallocation before the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryState {
    pub src_width: u32,
    pub src_height: u32,
    pub dst_width: u32,
    pub dst_height: u32,
    pub rotate_angle: u32,
    pub dirty: bool,
}

impl GeometryState {
    /// Effective output width
    pub fn output_width(&self) -> u32 {
        if self.dst_width == 0 {
            self.src_width
        } else {
            self.dst_width
        }
    }

    /// Effective output height
    pub fn output_height(&self) -> u32 {
        if self.dst_height == 0 {
            self.src_height
        } else {
            self.dst_height
        }
    }

    /// Source dimensions as seen by the scaler, i.e. after rotation
    pub fn scaler_input(&self) -> (u32, u32) {
        match self.rotate_angle {
            90 | 270 => (self.src_height, self.src_width),
            _ => (self.src_width, self.src_height),
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
