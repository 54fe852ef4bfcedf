//! Convert → rotate → scale → deliver, run synchronously on the streaming thread
//!
//! Geometry lives behind a [`GeometryHandle`] so property setters on other
//! threads can change it at any time. Each frame works on a snapshot taken at
//! frame start, and a dirty snapshot reallocates the scratch buffers before
//! anything is written.

use crate::element::RenderOutcome;
use crate::error::{Result, VideoError};
use crate::format_conversion::yuv420_to_rgba;
use crate::frame_pool::{FrameBufferPool, PoolStats};
use crate::rotation::rotate;
use crate::scaling::scale_nearest;
use crate::types::{FrameInfo, GeometryState, PixelFormat, VideoFrame, PACKED_BYTES_PER_PIXEL};
use parking_lot::Mutex;
use std::sync::Arc;

/// Downstream receiver of finished frames
///
/// The return value acknowledges consumption. It is recorded in the
/// statistics and otherwise ignored.
pub trait FrameConsumer: Send {
    fn consume(&mut self, pixels: &[u8], width: u32, height: u32) -> bool;
}

impl<F> FrameConsumer for F
where
    F: FnMut(&[u8], u32, u32) -> bool + Send,
{
    fn consume(&mut self, pixels: &[u8], width: u32, height: u32) -> bool {
        self(pixels, width, height)
    }
}

/// Shared, lock-protected geometry of one pipeline
#[derive(Clone, Default)]
pub struct GeometryHandle {
    state: Arc<Mutex<GeometryState>>,
}

impl GeometryHandle {
    /// Set the output width; 0 follows the source width
    pub fn set_output_width(&self, width: u32) {
        let mut state = self.state.lock();
        if state.dst_width != width {
            state.dst_width = width;
            state.mark_dirty();
        }
    }

    /// Set the output height; 0 follows the source height
    pub fn set_output_height(&self, height: u32) {
        let mut state = self.state.lock();
        if state.dst_height != height {
            state.dst_height = height;
            state.mark_dirty();
        }
    }

    /// Set the rotation angle. Validated when the frame is transformed.
    pub fn set_rotate(&self, angle: u32) {
        let mut state = self.state.lock();
        if state.rotate_angle != angle {
            state.rotate_angle = angle;
            state.mark_dirty();
        }
    }

    /// Record negotiated source dimensions
    pub fn set_source(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        state.src_width = width;
        state.src_height = height;
        state.mark_dirty();
    }

    pub fn mark_dirty(&self) {
        self.state.lock().mark_dirty();
    }

    pub fn snapshot(&self) -> GeometryState {
        *self.state.lock()
    }

    /// Snapshot for one frame, clearing the dirty flag in the shared state
    fn begin_frame(&self) -> GeometryState {
        let mut state = self.state.lock();
        let snapshot = *state;
        state.dirty = false;
        snapshot
    }
}

/// Frame transform orchestrator for the memory-output sink
pub struct RenderPipeline {
    geometry: GeometryHandle,
    format: Option<PixelFormat>,
    pool: FrameBufferPool,
    consumer: Box<dyn FrameConsumer>,
    halted: bool,
    frames_processed: u64,
    frames_skipped: u64,
    frames_acknowledged: u64,
}

impl RenderPipeline {
    pub fn new<C: FrameConsumer + 'static>(consumer: C) -> Self {
        Self {
            geometry: GeometryHandle::default(),
            format: None,
            pool: FrameBufferPool::new(),
            consumer: Box::new(consumer),
            halted: false,
            frames_processed: 0,
            frames_skipped: 0,
            frames_acknowledged: 0,
        }
    }

    /// Handle for changing output size and rotation from any thread
    pub fn geometry(&self) -> GeometryHandle {
        self.geometry.clone()
    }

    /// Replace the downstream consumer
    pub fn set_consumer<C: FrameConsumer + 'static>(&mut self, consumer: C) {
        self.consumer = Box::new(consumer);
    }

    /// Accept a negotiated format; marks the geometry dirty
    pub fn set_caps(&mut self, info: FrameInfo) -> Result<()> {
        let format = info
            .pixel_format()
            .ok_or(VideoError::UnsupportedFormat(info.format))?;
        if info.width == 0 || info.height == 0 {
            return Err(VideoError::InvalidGeometry {
                width: info.width,
                height: info.height,
            });
        }

        log::debug!(
            "Negotiated {:?} {}x{}",
            format,
            info.width,
            info.height
        );

        self.format = Some(format);
        self.geometry.set_source(info.width, info.height);
        Ok(())
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Free scratch buffers and clear a previous halt
    pub fn reset(&mut self) {
        self.pool.release();
        self.halted = false;
        self.geometry.mark_dirty();
    }

    /// Run one frame through the chain and hand it downstream
    ///
    /// Stage errors (bad geometry, short frames, unsupported rotation) skip
    /// the frame. Allocation failure halts the pipeline; every later call
    /// returns [`VideoError::Halted`] until [`reset`](Self::reset).
    pub fn process(&mut self, frame: &VideoFrame) -> Result<RenderOutcome> {
        if self.halted {
            return Err(VideoError::Halted);
        }
        let format = self.format.ok_or(VideoError::NotNegotiated)?;
        let geometry = self.geometry.begin_frame();

        if geometry.dirty || !self.pool.is_allocated() {
            if let Err(err) = self.pool.reallocate(&geometry) {
                log::error!("Halting render pipeline: {}", err);
                self.halted = true;
                return Err(err);
            }
        }

        match self.run_stages(frame, format, &geometry) {
            Ok(acknowledged) => {
                self.frames_processed += 1;
                if acknowledged {
                    self.frames_acknowledged += 1;
                }
                Ok(RenderOutcome::Rendered { acknowledged })
            }
            Err(err) if err.is_fatal() => {
                log::error!("Halting render pipeline: {}", err);
                self.halted = true;
                Err(err)
            }
            Err(err) => {
                log::warn!("Skipping frame: {}", err);
                self.frames_skipped += 1;
                Ok(RenderOutcome::Skipped)
            }
        }
    }

    fn run_stages(
        &mut self,
        frame: &VideoFrame,
        format: PixelFormat,
        geometry: &GeometryState,
    ) -> Result<bool> {
        let (src_width, src_height) = (geometry.src_width, geometry.src_height);
        if src_width == 0 || src_height == 0 {
            return Err(VideoError::InvalidGeometry {
                width: src_width,
                height: src_height,
            });
        }

        let expected = format.frame_size(src_width, src_height);
        if frame.len() < expected {
            return Err(VideoError::BufferTooSmall {
                expected,
                actual: frame.len(),
            });
        }

        let buffers = self.pool.buffers().ok_or(VideoError::Halted)?;

        let converted: &[u8] = if format.is_planar() {
            yuv420_to_rgba(frame.data(), format, src_width, src_height, buffers.converted)?;
            &*buffers.converted
        } else {
            frame.data()
        };

        let (scale_input, scale_width, scale_height) = match buffers.rotated {
            Some(rotated) => {
                rotate(
                    converted,
                    rotated,
                    src_width,
                    src_height,
                    PACKED_BYTES_PER_PIXEL,
                    geometry.rotate_angle,
                )?;
                let (width, height) = geometry.scaler_input();
                (&*rotated, width, height)
            }
            None => (converted, src_width, src_height),
        };

        let (dst_width, dst_height) = (geometry.output_width(), geometry.output_height());
        scale_nearest(
            scale_input,
            scale_width,
            scale_height,
            buffers.resized,
            dst_width,
            dst_height,
            PACKED_BYTES_PER_PIXEL,
        )?;

        Ok(self
            .consumer
            .consume(buffers.resized, dst_width, dst_height))
    }

    /// Get statistics
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            frames_acknowledged: self.frames_acknowledged,
            halted: self.halted,
            pool: self.pool.stats(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineStats {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_acknowledged: u64,
    pub halted: bool,
    pub pool: PoolStats,
}
