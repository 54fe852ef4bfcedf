//! Rendering surface abstraction
//!
//! The surface object itself belongs to a UI toolkit and is driven from
//! that toolkit's thread. The sink only needs a small set of operations
//! on it, and a way to hear about resizes and destruction.

use crate::geometry::FillRect;
use std::sync::Arc;
use vsink_video::FrameRef;

/// Identifier returned by [`Surface::connect_events`]
pub type NotifyId = u64;

/// Rendering backends whose image surfaces expose a CPU-writable backing
/// buffer that can be filled in place.
pub const ZERO_COPY_BACKENDS: &[&str] = &["software_x11", "software_gdi", "software_generic", "buffer"];

/// Whether a backend lets the sink write straight into the surface's pixels
pub fn supports_zero_copy(backend: &str) -> bool {
    ZERO_COPY_BACKENDS
        .iter()
        .any(|name| name.eq_ignore_ascii_case(backend))
}

/// Notifications a surface sends to its bound sink
///
/// May be invoked from any thread. Surfaces must not hold their own locks
/// while notifying, so handlers are free to query and update the surface.
pub trait SurfaceEvents: Send + Sync {
    /// The surface's on-screen geometry changed
    fn resized(&self, width: u32, height: u32);

    /// The surface was deleted by its owner
    fn destroyed(&self);
}

/// Operations the sink performs on a rendering surface
pub trait Surface: Send + Sync {
    /// Only image-bearing surfaces can be bound
    fn is_image_surface(&self) -> bool;

    /// Identity of the active rendering backend
    fn backend_name(&self) -> String;

    fn hint_frequent_updates(&self);

    /// Pixel buffer size, `None` until first set
    fn pixel_buffer_size(&self) -> Option<(u32, u32)>;

    fn set_pixel_buffer_size(&self, width: u32, height: u32);

    fn set_fill(&self, rect: FillRect);

    /// Show `frame`'s pixels without copying them
    ///
    /// The surface may read the frame until the next call replaces it.
    fn set_pixel_buffer(&self, frame: &FrameRef);

    /// Run `write` over the surface's own backing buffer
    ///
    /// Returns `false` when the surface has no backing buffer yet.
    fn with_backing_buffer(&self, write: &mut dyn FnMut(&mut [u32])) -> bool;

    /// Schedule a redraw of the backing buffer
    fn mark_dirty(&self);

    fn set_visible(&self, visible: bool);

    fn connect_events(&self, events: Arc<dyn SurfaceEvents>) -> NotifyId;

    fn disconnect_events(&self, id: NotifyId);
}
