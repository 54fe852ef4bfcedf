//! Memory-output sink element
//!
//! Wraps a [`RenderPipeline`] in the [`VideoSink`] element model: format
//! changes go to the pipeline's negotiation, frames through the transform
//! chain, and leaving the streaming states frees the scratch buffers.

use crate::element::{RenderOutcome, RunState, StateTransition, VideoSink};
use crate::error::VideoError;
use crate::render_pipeline::{FrameConsumer, GeometryHandle, PipelineStats, RenderPipeline};
use crate::types::{FrameInfo, FrameRef};

/// Output configuration of a memory sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width, 0 = source width
    pub width: u32,
    /// Output height, 0 = source height
    pub height: u32,
    /// Rotation in degrees (0, 90, 180 or 270)
    pub rotate: u32,
}

pub struct MemorySink {
    pipeline: RenderPipeline,
    state: RunState,
}

impl MemorySink {
    pub fn new<C: FrameConsumer + 'static>(config: SinkConfig, consumer: C) -> Self {
        let pipeline = RenderPipeline::new(consumer);
        let geometry = pipeline.geometry();
        geometry.set_output_width(config.width);
        geometry.set_output_height(config.height);
        geometry.set_rotate(config.rotate);

        Self {
            pipeline,
            state: RunState::Null,
        }
    }

    /// Property handle for width, height and rotation
    pub fn geometry(&self) -> GeometryHandle {
        self.pipeline.geometry()
    }

    pub fn set_consumer<C: FrameConsumer + 'static>(&mut self, consumer: C) {
        self.pipeline.set_consumer(consumer);
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }
}

impl VideoSink for MemorySink {
    type Error = VideoError;

    fn negotiate(&mut self, info: FrameInfo) -> Result<(), VideoError> {
        self.pipeline.set_caps(info)
    }

    fn render(&mut self, frame: FrameRef) -> Result<RenderOutcome, VideoError> {
        self.pipeline.process(&frame)
    }

    fn change_state(&mut self, transition: StateTransition) -> Result<(), VideoError> {
        if transition.is_teardown() {
            self.pipeline.reset();
        }
        log::debug!("Memory sink {:?} -> {:?}", self.state, transition.target());
        self.state = transition.target();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PixelFormat, VideoFrame};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_config_applied_on_construction() {
        let sink = MemorySink::new(
            SinkConfig {
                width: 320,
                height: 0,
                rotate: 180,
            },
            |_: &[u8], _: u32, _: u32| true,
        );

        let geometry = sink.geometry().snapshot();
        assert_eq!(geometry.dst_width, 320);
        assert_eq!(geometry.dst_height, 0);
        assert_eq!(geometry.rotate_angle, 180);
    }

    #[test]
    fn test_lifecycle_releases_scratch() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&sizes);
        let mut sink = MemorySink::new(SinkConfig::default(), move |_: &[u8], w: u32, h: u32| {
            seen.lock().push((w, h));
            true
        });

        sink.change_state(StateTransition::NullToReady).unwrap();
        sink.change_state(StateTransition::ReadyToPaused).unwrap();
        sink.negotiate(FrameInfo::new(PixelFormat::BGRA, 3, 3)).unwrap();

        let frame = VideoFrame::new(vec![1u8; 36], 3, 3, PixelFormat::BGRA).into_ref();
        sink.render(frame.clone()).unwrap();
        assert!(sink.stats().pool.resized_bytes > 0);

        sink.change_state(StateTransition::PausedToReady).unwrap();
        assert_eq!(sink.stats().pool.resized_bytes, 0);
        assert_eq!(sink.state(), RunState::Ready);

        // Buffers come back on the next frame
        sink.change_state(StateTransition::ReadyToPaused).unwrap();
        sink.render(frame).unwrap();
        assert_eq!(*sizes.lock(), vec![(3, 3), (3, 3)]);
    }
}
