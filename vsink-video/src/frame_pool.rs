//! Scratch buffers for the convert → rotate → scale chain
//!
//! The pool owns three buffers sized for packed 4-byte pixels. They are only
//! reallocated when the geometry is marked dirty, so steady-state frames
//! never touch the allocator.

use crate::error::{Result, VideoError};
use crate::types::{GeometryState, PACKED_BYTES_PER_PIXEL};

/// Owner of the converted, rotated and resized scratch buffers
#[derive(Default)]
pub struct FrameBufferPool {
    converted: Option<Vec<u8>>,
    rotated: Option<Vec<u8>>,
    resized: Option<Vec<u8>>,
    reallocations: u64,
}

/// Mutable views of the scratch buffers for one frame
pub struct ScratchBuffers<'a> {
    pub converted: &'a mut [u8],
    /// Present only when the geometry asks for rotation
    pub rotated: Option<&'a mut [u8]>,
    pub resized: &'a mut [u8],
}

fn packed_size(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(PACKED_BYTES_PER_PIXEL)
}

/// Allocate a zeroed buffer, reporting failure instead of aborting
fn allocate(buffer: &'static str, width: u32, height: u32) -> Result<Vec<u8>> {
    let bytes = packed_size(width, height).ok_or(VideoError::AllocationFailed {
        buffer,
        bytes: usize::MAX,
    })?;

    let mut data = Vec::new();
    data.try_reserve_exact(bytes)
        .map_err(|_| VideoError::AllocationFailed { buffer, bytes })?;
    data.resize(bytes, 0);
    Ok(data)
}

impl FrameBufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release every buffer and allocate fresh ones for `geometry`
    ///
    /// On failure all buffers are left released.
    pub fn reallocate(&mut self, geometry: &GeometryState) -> Result<()> {
        self.release();

        let (src_width, src_height) = (geometry.src_width, geometry.src_height);
        let (dst_width, dst_height) = (geometry.output_width(), geometry.output_height());

        let converted = allocate("converted", src_width, src_height)?;
        let rotated = if geometry.rotate_angle != 0 {
            Some(allocate("rotated", src_width, src_height)?)
        } else {
            None
        };
        let resized = allocate("resized", dst_width, dst_height)?;

        self.converted = Some(converted);
        self.rotated = rotated;
        self.resized = Some(resized);
        self.reallocations += 1;

        log::debug!(
            "Scratch buffers reallocated: {}x{} -> {}x{}, rotate {}",
            src_width,
            src_height,
            dst_width,
            dst_height,
            geometry.rotate_angle
        );

        Ok(())
    }

    /// Free all scratch buffers
    pub fn release(&mut self) {
        self.converted = None;
        self.rotated = None;
        self.resized = None;
    }

    pub fn is_allocated(&self) -> bool {
        self.converted.is_some() && self.resized.is_some()
    }

    /// Borrow the buffers for one pass through the chain
    pub fn buffers(&mut self) -> Option<ScratchBuffers<'_>> {
        let converted = self.converted.as_deref_mut()?;
        let resized = self.resized.as_deref_mut()?;
        Some(ScratchBuffers {
            converted,
            rotated: self.rotated.as_deref_mut(),
            resized,
        })
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let len = |buffer: &Option<Vec<u8>>| buffer.as_ref().map_or(0, Vec::len);
        PoolStats {
            converted_bytes: len(&self.converted),
            rotated_bytes: len(&self.rotated),
            resized_bytes: len(&self.resized),
            reallocations: self.reallocations,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub converted_bytes: usize,
    pub rotated_bytes: usize,
    pub resized_bytes: usize,
    pub reallocations: u64,
}
