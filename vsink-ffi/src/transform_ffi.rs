//! Pixel transform FFI bindings
//!
//! Stateless entry points for callers that run their own buffer management.
//! All return 1 on success and 0 on bad arguments or a rejected transform.

use std::os::raw::c_int;
use vsink_video::{rotate, scale_nearest, yuv420_to_rgba, PixelFormat, PACKED_BYTES_PER_PIXEL};

fn status<E: std::fmt::Display>(result: Result<(), E>, what: &str) -> c_int {
    match result {
        Ok(()) => 1,
        Err(e) => {
            log::warn!("{} failed: {}", what, e);
            0
        }
    }
}

/// Convert planar I420/YV12 to RGBA
///
/// # Safety
/// `input` must hold `input_len` bytes and `output` must hold `output_len`
/// writable bytes.
#[no_mangle]
pub unsafe extern "C" fn vsink_convert_yuv420_to_rgba(
    input: *const u8,
    input_len: usize,
    format: u32,
    width: u32,
    height: u32,
    output: *mut u8,
    output_len: usize,
) -> c_int {
    if input.is_null() || output.is_null() {
        return 0;
    }
    let Some(format) = PixelFormat::from_raw(format) else {
        return 0;
    };

    let src = std::slice::from_raw_parts(input, input_len);
    let dst = std::slice::from_raw_parts_mut(output, output_len);
    status(yuv420_to_rgba(src, format, width, height, dst), "Conversion")
}

/// Rotate packed 32-bit pixels by 0, 90, 180 or 270 degrees
///
/// # Safety
/// Both buffers must hold `len` bytes and must not overlap.
#[no_mangle]
pub unsafe extern "C" fn vsink_rotate_rgba(
    input: *const u8,
    output: *mut u8,
    len: usize,
    width: u32,
    height: u32,
    degrees: u32,
) -> c_int {
    if input.is_null() || output.is_null() {
        return 0;
    }

    let src = std::slice::from_raw_parts(input, len);
    let dst = std::slice::from_raw_parts_mut(output, len);
    let result = rotate(src, dst, width, height, PACKED_BYTES_PER_PIXEL, degrees).map(|_| ());
    status(result, "Rotation")
}

/// Nearest-neighbor scale packed 32-bit pixels
///
/// # Safety
/// `input` must hold `src_width * src_height * 4` bytes and `output`
/// `dst_width * dst_height * 4` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn vsink_scale_rgba(
    input: *const u8,
    src_width: u32,
    src_height: u32,
    output: *mut u8,
    dst_width: u32,
    dst_height: u32,
) -> c_int {
    if input.is_null() || output.is_null() {
        return 0;
    }

    let src_len = src_width as usize * src_height as usize * PACKED_BYTES_PER_PIXEL;
    let dst_len = dst_width as usize * dst_height as usize * PACKED_BYTES_PER_PIXEL;
    let src = std::slice::from_raw_parts(input, src_len);
    let dst = std::slice::from_raw_parts_mut(output, dst_len);

    status(
        scale_nearest(
            src,
            src_width,
            src_height,
            dst,
            dst_width,
            dst_height,
            PACKED_BYTES_PER_PIXEL,
        ),
        "Scaling",
    )
}
