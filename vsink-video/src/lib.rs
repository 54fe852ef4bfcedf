//! Video sink frame path
//!
//! Pixel transforms and buffer lifecycle for the memory-output sink.
//!
//! Key pieces:
//! - Fixed-point BT.601 planar YUV 4:2:0 to RGBA conversion (row-parallel for large frames)
//! - Quarter-turn rotation and nearest-neighbor scaling on packed pixels
//! - Scratch buffers reallocated only on geometry changes
//! - A synchronous convert → rotate → scale → deliver pipeline

pub mod element;
pub mod error;
pub mod format_conversion;
pub mod frame_pool;
pub mod memory_sink;
pub mod render_pipeline;
pub mod rotation;
pub mod scaling;
pub mod types;

pub use element::*;
pub use error::VideoError;
pub use format_conversion::*;
pub use frame_pool::*;
pub use memory_sink::*;
pub use render_pipeline::*;
pub use rotation::*;
pub use scaling::*;
pub use types::*;
