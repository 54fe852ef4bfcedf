//! Planar YUV 4:2:0 to packed RGBA conversion
//!
//! Fixed-point BT.601 transform with 13 fractional bits. Output is bit-exact
//! with the reference integer implementation: chroma is replicated over 2x2
//! blocks, intermediates are shifted arithmetically and clipped to [0, 255].
//! Large frames are converted row-parallel with rayon, which produces the
//! same bytes as the scalar loop.

use crate::error::{Result, VideoError};
use crate::types::{chroma_dimensions, PixelFormat, PACKED_BYTES_PER_PIXEL};
use rayon::prelude::*;

/// Frames at least this many pixels are split across the rayon pool
const PARALLEL_THRESHOLD_PIXELS: usize = 640 * 480;

const Y_SCALE: i32 = 9535;
const V_TO_R: i32 = 13074;
const V_TO_G: i32 = 6660;
const U_TO_G: i32 = 3203;
const U_TO_B: i32 = 16531;
const SHIFT: u32 = 13;

#[inline(always)]
fn clip(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Convert one YUV sample triple to (R, G, B)
#[inline(always)]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let luma = Y_SCALE * (y as i32 - 16);
    let cb = u as i32 - 128;
    let cr = v as i32 - 128;

    [
        clip((luma + V_TO_R * cr) >> SHIFT),
        clip((luma - V_TO_G * cr - U_TO_G * cb) >> SHIFT),
        clip((luma + U_TO_B * cb) >> SHIFT),
    ]
}

/// Borrowed planes of one 4:2:0 frame
struct Planes<'a> {
    y: &'a [u8],
    u: &'a [u8],
    v: &'a [u8],
    width: usize,
    chroma_width: usize,
}

impl<'a> Planes<'a> {
    fn split(src: &'a [u8], format: PixelFormat, width: usize, height: usize) -> Self {
        let (chroma_width, chroma_height) = chroma_dimensions(width, height);
        let luma_size = width * height;
        let chroma_size = chroma_width * chroma_height;

        let (y, rest) = src.split_at(luma_size);
        let (first, rest) = rest.split_at(chroma_size);
        let second = &rest[..chroma_size];

        let (u, v) = match format {
            PixelFormat::YV12 => (second, first),
            _ => (first, second),
        };

        Planes {
            y,
            u,
            v,
            width,
            chroma_width,
        }
    }

    fn convert_row(&self, row: usize, out: &mut [u8]) {
        let y_row = &self.y[row * self.width..(row + 1) * self.width];
        let chroma_offset = (row / 2) * self.chroma_width;
        let u_row = &self.u[chroma_offset..chroma_offset + self.chroma_width];
        let v_row = &self.v[chroma_offset..chroma_offset + self.chroma_width];

        for (x, (pixel, &luma)) in out
            .chunks_exact_mut(PACKED_BYTES_PER_PIXEL)
            .zip(y_row)
            .enumerate()
        {
            let [r, g, b] = yuv_to_rgb(luma, u_row[x / 2], v_row[x / 2]);
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
            pixel[3] = 255;
        }
    }
}

/// Convert a planar 4:2:0 frame (I420 or YV12) into packed RGBA
///
/// `dst` must hold at least `width * height * 4` bytes. Only the first
/// `width * height * 4` bytes are written.
pub fn yuv420_to_rgba(
    src: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
    dst: &mut [u8],
) -> Result<()> {
    if !format.is_planar() {
        return Err(VideoError::UnsupportedFormat(format as u32));
    }
    if width == 0 || height == 0 {
        return Err(VideoError::InvalidGeometry { width, height });
    }

    let expected_src = format.frame_size(width, height);
    if src.len() < expected_src {
        return Err(VideoError::BufferTooSmall {
            expected: expected_src,
            actual: src.len(),
        });
    }

    let (width, height) = (width as usize, height as usize);
    let expected_dst = width * height * PACKED_BYTES_PER_PIXEL;
    if dst.len() < expected_dst {
        return Err(VideoError::BufferTooSmall {
            expected: expected_dst,
            actual: dst.len(),
        });
    }

    let planes = Planes::split(src, format, width, height);
    let out = &mut dst[..expected_dst];

    if width * height >= PARALLEL_THRESHOLD_PIXELS {
        convert_parallel(&planes, out);
    } else {
        convert_scalar(&planes, out);
    }

    Ok(())
}

fn convert_scalar(planes: &Planes<'_>, out: &mut [u8]) {
    let stride = planes.width * PACKED_BYTES_PER_PIXEL;
    for (row, line) in out.chunks_exact_mut(stride).enumerate() {
        planes.convert_row(row, line);
    }
}

fn convert_parallel(planes: &Planes<'_>, out: &mut [u8]) {
    let stride = planes.width * PACKED_BYTES_PER_PIXEL;
    out.par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(row, line)| planes.convert_row(row, line));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    /// Independent reference: wide integers and floor division
    fn reference_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
        let c = 9535i64 * (y as i64 - 16);
        let d = u as i64 - 128;
        let e = v as i64 - 128;
        let f = |x: i64| x.div_euclid(8192).clamp(0, 255) as u8;
        [
            f(c + 13074 * e),
            f(c - 6660 * e - 3203 * d),
            f(c + 16531 * d),
        ]
    }

    fn uniform_i420(width: u32, height: u32, y: u8, u: u8, v: u8) -> Vec<u8> {
        let luma = (width * height) as usize;
        let (cw, ch) = chroma_dimensions(width as usize, height as usize);
        let mut frame = vec![y; luma];
        frame.extend(std::iter::repeat(u).take(cw * ch));
        frame.extend(std::iter::repeat(v).take(cw * ch));
        frame
    }

    #[test]
    fn test_black_and_white() {
        let mut out = vec![0u8; 4 * 2 * 4];

        yuv420_to_rgba(&uniform_i420(4, 2, 16, 128, 128), PixelFormat::I420, 4, 2, &mut out).unwrap();
        assert!(out.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));

        // Nominal white truncates to 254: 9535 * 219 >> 13 == 254
        yuv420_to_rgba(&uniform_i420(4, 2, 235, 128, 128), PixelFormat::I420, 4, 2, &mut out).unwrap();
        assert!(out.chunks_exact(4).all(|p| p == [254, 254, 254, 255]));

        // Super-white saturates
        yuv420_to_rgba(&uniform_i420(4, 2, 255, 128, 128), PixelFormat::I420, 4, 2, &mut out).unwrap();
        assert!(out.chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
    }

    #[test]
    fn test_negative_intermediates_shift_toward_negative_infinity() {
        // Y=16, V=127: R intermediate is -13074, which shifts to -2 and clips to 0
        assert_eq!(yuv_to_rgb(16, 128, 127)[0], 0);
        // G with V below 128 goes positive: 6660 >> 13 == 0
        assert_eq!(yuv_to_rgb(16, 128, 127)[1], 0);
        assert_eq!(yuv_to_rgb(20, 100, 200), reference_pixel(20, 100, 200));
    }

    #[test]
    fn test_matches_reference_on_random_frames() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
        let (width, height) = (16u32, 10u32);
        let size = PixelFormat::I420.frame_size(width, height);
        let src: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        let mut out = vec![0u8; (width * height * 4) as usize];

        yuv420_to_rgba(&src, PixelFormat::I420, width, height, &mut out).unwrap();

        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = chroma_dimensions(w, h);
        for y in 0..h {
            for x in 0..w {
                let luma = src[y * w + x];
                let u = src[w * h + (y / 2) * cw + x / 2];
                let v = src[w * h + cw * ch + (y / 2) * cw + x / 2];
                let px = &out[(y * w + x) * 4..(y * w + x) * 4 + 4];
                assert_eq!(&px[..3], &reference_pixel(luma, u, v), "pixel ({x},{y})");
                assert_eq!(px[3], 255);
            }
        }
    }

    #[test]
    fn test_chroma_replicated_over_2x2_blocks() {
        let (width, height) = (4u32, 4u32);
        let mut src = uniform_i420(width, height, 128, 128, 128);
        // Second chroma sample of the first chroma row covers pixels (2..4, 0..2)
        src[16 + 1] = 200;
        let mut out = vec![0u8; 64];

        yuv420_to_rgba(&src, PixelFormat::I420, width, height, &mut out).unwrap();

        let pixel = |x: usize, y: usize| out[(y * 4 + x) * 4..(y * 4 + x) * 4 + 3].to_vec();
        let tinted = yuv_to_rgb(128, 200, 128).to_vec();
        let neutral = yuv_to_rgb(128, 128, 128).to_vec();
        for (x, y) in [(2, 0), (3, 0), (2, 1), (3, 1)] {
            assert_eq!(pixel(x, y), tinted);
        }
        for (x, y) in [(0, 0), (1, 1), (2, 2), (3, 3)] {
            assert_eq!(pixel(x, y), neutral);
        }
    }

    #[test]
    fn test_yv12_swaps_chroma_planes() {
        let i420 = uniform_i420(2, 2, 100, 60, 190);
        let yv12 = uniform_i420(2, 2, 100, 190, 60);
        let mut a = vec![0u8; 16];
        let mut b = vec![0u8; 16];

        yuv420_to_rgba(&i420, PixelFormat::I420, 2, 2, &mut a).unwrap();
        yuv420_to_rgba(&yv12, PixelFormat::YV12, 2, 2, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_matches_scalar() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let (width, height) = (96usize, 54usize);
        let size = PixelFormat::I420.frame_size(width as u32, height as u32);
        let src: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        let planes = Planes::split(&src, PixelFormat::I420, width, height);

        let mut scalar = vec![0u8; width * height * 4];
        let mut parallel = vec![0u8; width * height * 4];
        convert_scalar(&planes, &mut scalar);
        convert_parallel(&planes, &mut parallel);
        assert_eq!(scalar, parallel);
    }

    #[test]
    fn test_odd_width_uses_last_chroma_column() {
        let src = uniform_i420(3, 3, 90, 140, 110);
        let mut out = vec![0u8; 36];

        yuv420_to_rgba(&src, PixelFormat::I420, 3, 3, &mut out).unwrap();
        let expected = yuv_to_rgb(90, 140, 110);
        assert!(out.chunks_exact(4).all(|p| p[..3] == expected));
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut out = vec![0u8; 32];
        assert!(matches!(
            yuv420_to_rgba(&[0u8; 4], PixelFormat::I420, 4, 2, &mut out),
            Err(VideoError::BufferTooSmall { expected: 12, actual: 4 })
        ));
        assert!(matches!(
            yuv420_to_rgba(&[0u8; 12], PixelFormat::I420, 0, 2, &mut out),
            Err(VideoError::InvalidGeometry { .. })
        ));
        assert!(matches!(
            yuv420_to_rgba(&[0u8; 32], PixelFormat::RGBA, 4, 2, &mut out),
            Err(VideoError::UnsupportedFormat(_))
        ));
        let mut small = vec![0u8; 8];
        assert!(matches!(
            yuv420_to_rgba(&[0u8; 12], PixelFormat::I420, 4, 2, &mut small),
            Err(VideoError::BufferTooSmall { expected: 32, .. })
        ));
    }
}
