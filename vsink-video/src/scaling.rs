//! Nearest-neighbor scaling with 16.16 fixed-point step factors

use crate::error::{Result, VideoError};

/// Resample `src` (`src_width` x `src_height`) into `dst` (`dst_width` x `dst_height`)
///
/// Every destination pixel copies the `bytes_per_pixel` element at
/// `((x << 16) / x_factor, (y << 16) / y_factor)` where
/// `x_factor = (dst_width << 16) / src_width`. No blending.
pub fn scale_nearest(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
    bytes_per_pixel: usize,
) -> Result<()> {
    if src_width == 0 || src_height == 0 || bytes_per_pixel == 0 {
        return Err(VideoError::InvalidGeometry {
            width: src_width,
            height: src_height,
        });
    }
    if dst_width == 0 || dst_height == 0 {
        return Ok(());
    }

    let src_len = src_width as usize * src_height as usize * bytes_per_pixel;
    if src.len() < src_len {
        return Err(VideoError::BufferTooSmall {
            expected: src_len,
            actual: src.len(),
        });
    }
    let dst_len = dst_width as usize * dst_height as usize * bytes_per_pixel;
    if dst.len() < dst_len {
        return Err(VideoError::BufferTooSmall {
            expected: dst_len,
            actual: dst.len(),
        });
    }

    let x_factor = ((dst_width as u64) << 16) / src_width as u64;
    let y_factor = ((dst_height as u64) << 16) / src_height as u64;
    if x_factor == 0 || y_factor == 0 {
        // Downscale ratio beyond 65536:1
        return Err(VideoError::InvalidGeometry {
            width: dst_width,
            height: dst_height,
        });
    }

    let src_stride = src_width as usize * bytes_per_pixel;
    let dst_stride = dst_width as usize * bytes_per_pixel;
    let max_x = src_width as u64 - 1;
    let max_y = src_height as u64 - 1;

    for (y, line) in dst[..dst_len].chunks_exact_mut(dst_stride).enumerate() {
        let src_y = (((y as u64) << 16) / y_factor).min(max_y) as usize;
        let src_line = &src[src_y * src_stride..(src_y + 1) * src_stride];

        for (x, pixel) in line.chunks_exact_mut(bytes_per_pixel).enumerate() {
            let src_x = (((x as u64) << 16) / x_factor).min(max_x) as usize;
            let offset = src_x * bytes_per_pixel;
            pixel.copy_from_slice(&src_line[offset..offset + bytes_per_pixel]);
        }
    }

    Ok(())
}
