//! Surface delivery for the video sink
//!
//! Moves finished frames from the streaming thread to a rendering surface
//! owned by a UI thread.
//!
//! Key pieces:
//! - Non-blocking delivery channel with a lazily started consumer thread
//! - Zero-copy writes into software surfaces, borrowed frames elsewhere
//! - Visibility changes serialized with frame delivery
//! - Admission control by run state and active-source token
//! - A registry that owns the lock shared by all live sinks

pub mod binder;
pub mod delivery;
pub mod error;
pub mod geometry;
pub mod registry;
pub mod surface;
pub mod surface_sink;

#[cfg(test)]
pub(crate) mod testing;

pub use binder::*;
pub use delivery::*;
pub use error::SurfaceError;
pub use geometry::*;
pub use registry::*;
pub use surface::*;
pub use surface_sink::*;
