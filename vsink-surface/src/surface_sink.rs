//! Surface-output sink element
//!
//! Packed frames are handed to a rendering surface on another thread.
//! Format negotiation only checks that frames arrive packed; the binder
//! does admission, delivery and surface handling.

use crate::binder::{SurfaceBinder, SurfaceStats};
use crate::error::{Result, SurfaceError};
use crate::geometry::FitMode;
use crate::registry::SinkRegistry;
use crate::surface::Surface;
use std::sync::Arc;
use vsink_video::{
    FrameInfo, FrameRef, RenderOutcome, RunState, StateTransition, VideoError, VideoSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSinkConfig {
    /// Identifies this sink when an active-source token is broadcast
    pub presentation_id: u32,
    pub visible: bool,
    pub fit_mode: FitMode,
}

impl Default for SurfaceSinkConfig {
    fn default() -> Self {
        Self {
            presentation_id: 0,
            visible: true,
            fit_mode: FitMode::Fill,
        }
    }
}

/// Out-of-band control messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Only the sink with this presentation id may render
    ActiveSource(u32),
    ClearActiveSource,
}

pub struct SurfaceSink {
    binder: SurfaceBinder,
    info: Option<FrameInfo>,
    state: RunState,
}

impl SurfaceSink {
    pub fn new(registry: &Arc<SinkRegistry>, config: SurfaceSinkConfig) -> Self {
        let mut binder = SurfaceBinder::new(registry.register(), config.presentation_id);
        binder.set_fit_mode(config.fit_mode);
        if !config.visible {
            binder.set_visible(false);
        }

        Self {
            binder,
            info: None,
            state: RunState::Null,
        }
    }

    /// Bind a surface, or unbind with `None`
    pub fn set_surface(&mut self, surface: Option<Arc<dyn Surface>>) -> Result<()> {
        match surface {
            Some(surface) => self.binder.bind(surface),
            None => {
                self.binder.unbind();
                Ok(())
            }
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.binder.set_visible(visible);
    }

    pub fn handle_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::ActiveSource(id) => self.binder.set_active_source(Some(id)),
            ControlEvent::ClearActiveSource => self.binder.set_active_source(None),
        }
    }

    pub fn binder(&self) -> &SurfaceBinder {
        &self.binder
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> SurfaceStats {
        self.binder.stats()
    }
}

impl VideoSink for SurfaceSink {
    type Error = SurfaceError;

    fn negotiate(&mut self, info: FrameInfo) -> Result<()> {
        let format = info
            .pixel_format()
            .ok_or(VideoError::UnsupportedFormat(info.format))?;

        if format.is_planar() {
            return Err(SurfaceError::UnsupportedFormat(format));
        }
        if info.width == 0 || info.height == 0 {
            return Err(VideoError::InvalidGeometry {
                width: info.width,
                height: info.height,
            }
            .into());
        }

        log::debug!("Surface sink negotiated {:?} {}x{}", format, info.width, info.height);
        self.info = Some(info);
        Ok(())
    }

    fn render(&mut self, frame: FrameRef) -> Result<RenderOutcome> {
        let Some(info) = self.info else {
            return Err(VideoError::NotNegotiated.into());
        };

        // Frames must match the negotiated caps; the surface takes raw packed bytes
        if info.pixel_format() != Some(frame.format) {
            return Err(SurfaceError::UnsupportedFormat(frame.format));
        }
        if frame.width != info.width || frame.height != info.height {
            return Err(VideoError::InvalidGeometry {
                width: frame.width,
                height: frame.height,
            }
            .into());
        }

        let expected = frame.expected_size();
        if frame.len() < expected {
            return Err(VideoError::BufferTooSmall {
                expected,
                actual: frame.len(),
            }
            .into());
        }

        Ok(self.binder.submit(frame))
    }

    fn change_state(&mut self, transition: StateTransition) -> Result<()> {
        let target = transition.target();
        self.binder.set_run_state(target);

        if transition == StateTransition::ReadyToNull {
            self.binder.teardown();
            self.info = None;
        }

        log::debug!("Surface sink {:?} -> {:?}", self.state, target);
        self.state = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{wait_until, MockSurface};
    use vsink_video::{PixelFormat, VideoFrame};

    fn playing_sink(registry: &Arc<SinkRegistry>) -> SurfaceSink {
        let mut sink = SurfaceSink::new(registry, SurfaceSinkConfig::default());
        sink.negotiate(FrameInfo::new(PixelFormat::BGRX, 2, 2)).unwrap();
        for transition in [
            StateTransition::NullToReady,
            StateTransition::ReadyToPaused,
            StateTransition::PausedToPlaying,
        ] {
            sink.change_state(transition).unwrap();
        }
        sink
    }

    fn frame() -> FrameRef {
        VideoFrame::new(vec![7u8; 16], 2, 2, PixelFormat::BGRX).into_ref()
    }

    #[test]
    fn test_negotiate_packed_only() {
        let registry = SinkRegistry::new();
        let mut sink = SurfaceSink::new(&registry, SurfaceSinkConfig::default());

        assert!(matches!(
            sink.negotiate(FrameInfo::new(PixelFormat::I420, 4, 4)),
            Err(SurfaceError::UnsupportedFormat(PixelFormat::I420))
        ));
        assert!(matches!(
            sink.negotiate(FrameInfo {
                width: 4,
                height: 4,
                format: 99
            }),
            Err(SurfaceError::Video(VideoError::UnsupportedFormat(99)))
        ));
        assert!(sink.negotiate(FrameInfo::new(PixelFormat::RGBA, 4, 4)).is_ok());
    }

    #[test]
    fn test_render_requires_negotiation() {
        let registry = SinkRegistry::new();
        let mut sink = SurfaceSink::new(&registry, SurfaceSinkConfig::default());
        assert!(matches!(
            sink.render(frame()),
            Err(SurfaceError::Video(VideoError::NotNegotiated))
        ));
    }

    #[test]
    fn test_short_frame_rejected() {
        let registry = SinkRegistry::new();
        let mut sink = playing_sink(&registry);
        let short = VideoFrame::new(vec![0u8; 8], 2, 2, PixelFormat::BGRX).into_ref();
        assert!(matches!(
            sink.render(short),
            Err(SurfaceError::Video(VideoError::BufferTooSmall { expected: 16, actual: 8 }))
        ));
    }

    #[test]
    fn test_frame_must_match_negotiated_caps() {
        let registry = SinkRegistry::new();
        let mut sink = playing_sink(&registry);
        let surface = MockSurface::new("software_gdi");
        sink.set_surface(Some(surface.clone())).unwrap();

        let planar = VideoFrame::new(vec![0u8; 6], 2, 2, PixelFormat::I420).into_ref();
        assert!(matches!(
            sink.render(Arc::clone(&planar)),
            Err(SurfaceError::UnsupportedFormat(PixelFormat::I420))
        ));
        assert_eq!(Arc::strong_count(&planar), 1);

        let rgba = VideoFrame::new(vec![0u8; 16], 2, 2, PixelFormat::RGBA).into_ref();
        assert!(matches!(
            sink.render(rgba),
            Err(SurfaceError::UnsupportedFormat(PixelFormat::RGBA))
        ));

        let larger = VideoFrame::new(vec![0u8; 64], 4, 4, PixelFormat::BGRX).into_ref();
        assert!(matches!(
            sink.render(larger),
            Err(SurfaceError::Video(VideoError::InvalidGeometry { width: 4, height: 4 }))
        ));

        assert_eq!(sink.stats().sent, 0);
        assert!(surface.size_sets().is_empty());
    }

    #[test]
    fn test_frames_reach_surface() {
        let registry = SinkRegistry::new();
        let mut sink = playing_sink(&registry);
        let surface = MockSurface::new("software_gdi");
        sink.set_surface(Some(surface.clone())).unwrap();

        assert_eq!(sink.render(frame()).unwrap(), RenderOutcome::Queued);
        assert!(wait_until(|| sink.stats().copied == 1));
        assert_eq!(surface.backing_words(), vec![0x07070707; 4]);
    }

    #[test]
    fn test_active_source_control() {
        let registry = SinkRegistry::new();
        let mut sink = playing_sink(&registry);
        sink.set_surface(Some(MockSurface::new("software_gdi"))).unwrap();

        sink.handle_control(ControlEvent::ActiveSource(5));
        assert_eq!(sink.render(frame()).unwrap(), RenderOutcome::Dropped);

        sink.handle_control(ControlEvent::ClearActiveSource);
        assert_eq!(sink.render(frame()).unwrap(), RenderOutcome::Queued);
    }

    #[test]
    fn test_hidden_config_applied_on_bind() {
        let registry = SinkRegistry::new();
        let mut sink = SurfaceSink::new(
            &registry,
            SurfaceSinkConfig {
                visible: false,
                ..Default::default()
            },
        );
        assert!(!sink.binder().visible());

        let surface = MockSurface::new("opengl_x11");
        sink.set_surface(Some(surface.clone())).unwrap();
        assert!(wait_until(|| !surface.events().is_empty()));
        assert_eq!(
            surface.events(),
            vec![crate::testing::MockEvent::Visible(false)]
        );
    }

    #[test]
    fn test_terminal_transition_tears_down() {
        let registry = SinkRegistry::new();
        let mut sink = playing_sink(&registry);
        let surface = MockSurface::new("opengl_x11");
        sink.set_surface(Some(surface.clone())).unwrap();

        let f = frame();
        sink.render(Arc::clone(&f)).unwrap();
        assert!(wait_until(|| sink.stats().rendered == 1));
        assert_eq!(Arc::strong_count(&f), 2);

        for transition in [
            StateTransition::PlayingToPaused,
            StateTransition::PausedToReady,
            StateTransition::ReadyToNull,
        ] {
            sink.change_state(transition).unwrap();
        }

        assert_eq!(Arc::strong_count(&f), 1);
        assert!(!sink.binder().is_bound());
        assert_eq!(surface.connected_handlers(), 0);
        assert_eq!(sink.state(), RunState::Null);

        // Already torn down; dropping is a no-op
        drop(sink);
        assert_eq!(registry.instance_count(), 0);
    }

    #[test]
    fn test_unbind_with_none() {
        let registry = SinkRegistry::new();
        let mut sink = playing_sink(&registry);
        let surface = MockSurface::new("software_x11");
        sink.set_surface(Some(surface.clone())).unwrap();
        sink.set_surface(None).unwrap();

        assert!(!sink.binder().is_bound());
        assert_eq!(surface.connected_handlers(), 0);
        assert_eq!(sink.render(frame()).unwrap(), RenderOutcome::Dropped);
    }
}
