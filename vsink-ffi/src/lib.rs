//! vsink FFI - C Foreign Function Interface
//!
//! C-compatible API for embedding the memory-output sink in a C media
//! pipeline. Handles are opaque; every function tolerates null pointers.

use std::os::raw::{c_char, c_int, c_void};

use vsink_video::{
    FrameConsumer, FrameInfo, MemorySink, RenderOutcome, SinkConfig, StateTransition,
    VideoFrame, VideoSink,
};

mod transform_ffi;
pub use transform_ffi::*;

/// Frame was delivered to the output callback
pub const VSINK_RENDERED: c_int = 1;
/// Frame was skipped by a transform stage
pub const VSINK_SKIPPED: c_int = 0;
/// Invalid arguments, missing caps, or a halted pipeline
pub const VSINK_ERROR: c_int = -1;

/// Opaque handle to a memory sink (C-compatible)
pub struct VsinkMemorySink {
    _private: [u8; 0],
}

/// Output callback: `(pixels, width, height, user_data) -> acknowledged`
///
/// `pixels` holds `width * height * 4` bytes and is only valid during the call.
pub type VsinkFrameCallback =
    Option<unsafe extern "C" fn(*const u8, u32, u32, *mut c_void) -> bool>;

/// C-compatible sink configuration
#[repr(C)]
pub struct CSinkConfig {
    pub width: u32,
    pub height: u32,
    pub rotate: u32,
}

/// C-compatible sink statistics
#[repr(C)]
#[derive(Debug, Default)]
pub struct CSinkStats {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_acknowledged: u64,
    pub reallocations: u64,
    pub scratch_bytes: u64,
    pub halted: bool,
}

struct SinkHandle {
    sink: MemorySink,
    info: Option<FrameInfo>,
}

struct CallbackTarget {
    callback: VsinkFrameCallback,
    user_data: *mut c_void,
}

// The C caller guarantees user_data may be used from the streaming thread
unsafe impl Send for CallbackTarget {}

impl FrameConsumer for CallbackTarget {
    fn consume(&mut self, pixels: &[u8], width: u32, height: u32) -> bool {
        match self.callback {
            Some(callback) => unsafe { callback(pixels.as_ptr(), width, height, self.user_data) },
            None => false,
        }
    }
}

fn transition_from_raw(raw: u32) -> Option<StateTransition> {
    match raw {
        0 => Some(StateTransition::NullToReady),
        1 => Some(StateTransition::ReadyToPaused),
        2 => Some(StateTransition::PausedToPlaying),
        3 => Some(StateTransition::PlayingToPaused),
        4 => Some(StateTransition::PausedToReady),
        5 => Some(StateTransition::ReadyToNull),
        _ => None,
    }
}

unsafe fn handle<'a>(ptr: *mut VsinkMemorySink) -> Option<&'a mut SinkHandle> {
    (ptr as *mut SinkHandle).as_mut()
}

// ============================================================================
// MEMORY SINK API
// ============================================================================

/// Create a memory sink
///
/// # Safety
/// `config` may be null for defaults. `user_data` is passed back to
/// `callback` on the streaming thread and must stay valid until destroy.
#[no_mangle]
pub unsafe extern "C" fn vsink_memory_sink_create(
    config: *const CSinkConfig,
    callback: VsinkFrameCallback,
    user_data: *mut c_void,
) -> *mut VsinkMemorySink {
    let config = match config.as_ref() {
        Some(c) => SinkConfig {
            width: c.width,
            height: c.height,
            rotate: c.rotate,
        },
        None => SinkConfig::default(),
    };

    let sink = MemorySink::new(
        config,
        CallbackTarget {
            callback,
            user_data,
        },
    );

    let handle = Box::new(SinkHandle { sink, info: None });
    Box::into_raw(handle) as *mut VsinkMemorySink
}

/// Destroy a memory sink
///
/// # Safety
/// Caller must ensure ptr is valid and not already freed.
#[no_mangle]
pub unsafe extern "C" fn vsink_memory_sink_destroy(ptr: *mut VsinkMemorySink) {
    if !ptr.is_null() {
        let _ = Box::from_raw(ptr as *mut SinkHandle);
    }
}

/// Replace the output callback
///
/// # Safety
/// Caller must ensure ptr is valid. Same `user_data` contract as create.
#[no_mangle]
pub unsafe extern "C" fn vsink_memory_sink_set_callback(
    ptr: *mut VsinkMemorySink,
    callback: VsinkFrameCallback,
    user_data: *mut c_void,
) {
    if let Some(handle) = handle(ptr) {
        handle.sink.set_consumer(CallbackTarget {
            callback,
            user_data,
        });
    }
}

/// Negotiate the input format
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn vsink_memory_sink_set_caps(
    ptr: *mut VsinkMemorySink,
    format: u32,
    width: u32,
    height: u32,
) -> c_int {
    let Some(handle) = handle(ptr) else {
        return 0;
    };

    let info = FrameInfo {
        width,
        height,
        format,
    };
    match handle.sink.negotiate(info) {
        Ok(()) => {
            handle.info = Some(info);
            1
        }
        Err(e) => {
            log::warn!("Rejected caps: {}", e);
            0
        }
    }
}

/// Set output size; 0 keeps the source dimension
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn vsink_memory_sink_set_output_size(
    ptr: *mut VsinkMemorySink,
    width: u32,
    height: u32,
) {
    if let Some(handle) = handle(ptr) {
        let geometry = handle.sink.geometry();
        geometry.set_output_width(width);
        geometry.set_output_height(height);
    }
}

/// Set rotation in degrees
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn vsink_memory_sink_set_rotate(ptr: *mut VsinkMemorySink, degrees: u32) {
    if let Some(handle) = handle(ptr) {
        handle.sink.geometry().set_rotate(degrees);
    }
}

/// Apply a lifecycle transition (0 = null->ready ... 5 = ready->null)
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn vsink_memory_sink_change_state(
    ptr: *mut VsinkMemorySink,
    transition: u32,
) -> c_int {
    let Some(handle) = handle(ptr) else {
        return 0;
    };
    let Some(transition) = transition_from_raw(transition) else {
        log::warn!("Unknown state transition {}", transition);
        return 0;
    };

    match handle.sink.change_state(transition) {
        Ok(()) => 1,
        Err(e) => {
            log::warn!("State change failed: {}", e);
            0
        }
    }
}

/// Push one frame in the negotiated format
///
/// The payload is copied before processing. Returns `VSINK_RENDERED`,
/// `VSINK_SKIPPED` or `VSINK_ERROR`.
///
/// # Safety
/// Caller must ensure ptr is valid and `data` points to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn vsink_memory_sink_push_frame(
    ptr: *mut VsinkMemorySink,
    data: *const u8,
    len: usize,
    timestamp: u64,
) -> c_int {
    let Some(handle) = handle(ptr) else {
        return VSINK_ERROR;
    };
    if data.is_null() {
        return VSINK_ERROR;
    }
    let Some(info) = handle.info else {
        return VSINK_ERROR;
    };
    let Some(format) = info.pixel_format() else {
        return VSINK_ERROR;
    };

    let payload = std::slice::from_raw_parts(data, len).to_vec();
    let frame = VideoFrame::new(payload, info.width, info.height, format)
        .with_timestamp(timestamp)
        .into_ref();

    match handle.sink.render(frame) {
        Ok(RenderOutcome::Rendered { .. }) => VSINK_RENDERED,
        Ok(_) => VSINK_SKIPPED,
        Err(e) => {
            log::warn!("Frame rejected: {}", e);
            VSINK_ERROR
        }
    }
}

/// Copy statistics into `out`
///
/// # Safety
/// Caller must ensure ptr and out are valid.
#[no_mangle]
pub unsafe extern "C" fn vsink_memory_sink_get_stats(
    ptr: *mut VsinkMemorySink,
    out: *mut CSinkStats,
) -> c_int {
    let (Some(handle), Some(out)) = (handle(ptr), out.as_mut()) else {
        return 0;
    };

    let stats = handle.sink.stats();
    *out = CSinkStats {
        frames_processed: stats.frames_processed,
        frames_skipped: stats.frames_skipped,
        frames_acknowledged: stats.frames_acknowledged,
        reallocations: stats.pool.reallocations,
        scratch_bytes: (stats.pool.converted_bytes
            + stats.pool.rotated_bytes
            + stats.pool.resized_bytes) as u64,
        halted: stats.halted,
    };
    1
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

/// Get library version string
#[no_mangle]
pub extern "C" fn vsink_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Configuration that follows the source size without rotation
#[no_mangle]
pub extern "C" fn vsink_default_config() -> CSinkConfig {
    CSinkConfig {
        width: 0,
        height: 0,
        rotate: 0,
    }
}
