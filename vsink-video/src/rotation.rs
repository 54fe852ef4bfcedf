//! Quarter-turn rotation of packed pixel buffers
//!
//! Pixels are remapped one at a time with a `bytes_per_pixel` element copy.
//! The remap uses `dimension - coordinate` (not `dimension - 1 - coordinate`),
//! so one source row or column lands one element further along the linear
//! destination buffer than a textbook rotation would put it. Destination
//! indices past the end of the canvas are skipped, never written.

use crate::error::{Result, VideoError};

/// Supported rotation angles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Rotate90),
            180 => Some(Rotation::Rotate180),
            270 => Some(Rotation::Rotate270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// Whether the output canvas is transposed
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Rotate90 | Rotation::Rotate270)
    }

    /// Canvas dimensions after rotating a `width` x `height` buffer
    pub fn output_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Rotate `src` into `dst` by `angle` degrees
///
/// Returns the output canvas dimensions. An unsupported angle is reported as
/// [`VideoError::UnsupportedRotation`] and leaves `dst` untouched.
pub fn rotate(
    src: &[u8],
    dst: &mut [u8],
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
    angle: u32,
) -> Result<(u32, u32)> {
    let Some(rotation) = Rotation::from_degrees(angle) else {
        log::warn!("Rotation by {} degrees is not supported, skipping", angle);
        return Err(VideoError::UnsupportedRotation(angle));
    };

    if width == 0 || height == 0 || bytes_per_pixel == 0 {
        return Err(VideoError::InvalidGeometry { width, height });
    }

    let canvas_len = width as usize * height as usize * bytes_per_pixel;
    if src.len() < canvas_len {
        return Err(VideoError::BufferTooSmall {
            expected: canvas_len,
            actual: src.len(),
        });
    }
    if dst.len() < canvas_len {
        return Err(VideoError::BufferTooSmall {
            expected: canvas_len,
            actual: dst.len(),
        });
    }

    let (out_width, out_height) = rotation.output_dimensions(width, height);

    // (old_x, old_y, w, h) -> (new_x, new_y)
    let remap: fn(usize, usize, usize, usize) -> (usize, usize) = match rotation {
        Rotation::None => {
            dst[..canvas_len].copy_from_slice(&src[..canvas_len]);
            return Ok((out_width, out_height));
        }
        Rotation::Rotate90 => |x, y, _, h| (h - y, x),
        Rotation::Rotate180 => |x, y, w, h| (w - x, h - y),
        Rotation::Rotate270 => |x, y, w, _| (y, w - x),
    };

    let (w, h) = (width as usize, height as usize);
    let canvas_width = out_width as usize;
    let mut skipped = 0usize;

    for old_y in 0..h {
        for old_x in 0..w {
            let (new_x, new_y) = remap(old_x, old_y, w, h);

            let dst_index = (new_y * canvas_width + new_x) * bytes_per_pixel;
            if dst_index + bytes_per_pixel > canvas_len {
                skipped += 1;
                continue;
            }

            let src_index = (old_y * w + old_x) * bytes_per_pixel;
            dst[dst_index..dst_index + bytes_per_pixel]
                .copy_from_slice(&src[src_index..src_index + bytes_per_pixel]);
        }
    }

    log::trace!(
        "Rotated {}x{} by {}, {} pixels fell outside the canvas",
        width,
        height,
        angle,
        skipped
    );

    Ok((out_width, out_height))
}
