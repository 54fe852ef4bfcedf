//! Test doubles for surface tests

use crate::geometry::FillRect;
use crate::surface::{NotifyId, Surface, SurfaceEvents};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use vsink_video::FrameRef;

/// Poll `condition` until it holds or five seconds pass
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// What the surface was asked to show, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    /// Borrowed pixel memory, by address
    Frame(usize),
    Visible(bool),
}

#[derive(Default)]
struct MockState {
    events: Vec<MockEvent>,
    backing: Vec<u32>,
    pixel_buffer_size: Option<(u32, u32)>,
    size_sets: Vec<(u32, u32)>,
    fill: Option<FillRect>,
    hinted: bool,
    dirty: usize,
    handlers: Vec<(NotifyId, Arc<dyn SurfaceEvents>)>,
    next_id: NotifyId,
}

pub struct MockSurface {
    image: bool,
    backend: String,
    fail_next_frame: AtomicBool,
    state: Mutex<MockState>,
}

impl MockSurface {
    pub fn new(backend: &str) -> Arc<Self> {
        Arc::new(Self {
            image: true,
            backend: backend.to_string(),
            fail_next_frame: AtomicBool::new(false),
            state: Mutex::new(MockState::default()),
        })
    }

    /// Panics on the consumer thread the first time a frame is lent to it
    pub fn failing(backend: &str) -> Arc<Self> {
        let surface = Self::new(backend);
        surface.fail_next_frame.store(true, Ordering::SeqCst);
        surface
    }

    /// A surface of the wrong kind
    pub fn non_image() -> Arc<Self> {
        Arc::new(Self {
            image: false,
            backend: "software_x11".to_string(),
            fail_next_frame: AtomicBool::new(false),
            state: Mutex::new(MockState::default()),
        })
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.state.lock().events.clone()
    }

    /// Addresses handed to `set_pixel_buffer`
    pub fn borrowed(&self) -> Vec<usize> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Frame(ptr) => Some(*ptr),
                MockEvent::Visible(_) => None,
            })
            .collect()
    }

    pub fn backing_words(&self) -> Vec<u32> {
        self.state.lock().backing.clone()
    }

    pub fn size_sets(&self) -> Vec<(u32, u32)> {
        self.state.lock().size_sets.clone()
    }

    pub fn fill(&self) -> Option<FillRect> {
        self.state.lock().fill
    }

    pub fn frequent_updates_hinted(&self) -> bool {
        self.state.lock().hinted
    }

    pub fn dirty_count(&self) -> usize {
        self.state.lock().dirty
    }

    pub fn connected_handlers(&self) -> usize {
        self.state.lock().handlers.len()
    }

    /// Resize on screen and notify handlers
    pub fn resize(&self, width: u32, height: u32) {
        let handlers = self.state.lock().handlers.clone();
        for (_, handler) in handlers {
            handler.resized(width, height);
        }
    }

    /// Simulate deletion by the owning toolkit
    pub fn destroy(&self) {
        let handlers = std::mem::take(&mut self.state.lock().handlers);
        for (_, handler) in handlers {
            handler.destroyed();
        }
    }
}

impl Surface for MockSurface {
    fn is_image_surface(&self) -> bool {
        self.image
    }

    fn backend_name(&self) -> String {
        self.backend.clone()
    }

    fn hint_frequent_updates(&self) {
        self.state.lock().hinted = true;
    }

    fn pixel_buffer_size(&self) -> Option<(u32, u32)> {
        self.state.lock().pixel_buffer_size
    }

    fn set_pixel_buffer_size(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        state.pixel_buffer_size = Some((width, height));
        state.size_sets.push((width, height));
        state.backing = vec![0; (width * height) as usize];
    }

    fn set_fill(&self, rect: FillRect) {
        self.state.lock().fill = Some(rect);
    }

    fn set_pixel_buffer(&self, frame: &FrameRef) {
        if self.fail_next_frame.swap(false, Ordering::SeqCst) {
            panic!("surface lost its pixel buffer");
        }
        let ptr = frame.data().as_ptr() as usize;
        self.state.lock().events.push(MockEvent::Frame(ptr));
    }

    fn with_backing_buffer(&self, write: &mut dyn FnMut(&mut [u32])) -> bool {
        let mut state = self.state.lock();
        if state.backing.is_empty() {
            return false;
        }
        write(state.backing.as_mut_slice());
        true
    }

    fn mark_dirty(&self) {
        self.state.lock().dirty += 1;
    }

    fn set_visible(&self, visible: bool) {
        self.state.lock().events.push(MockEvent::Visible(visible));
    }

    fn connect_events(&self, events: Arc<dyn SurfaceEvents>) -> NotifyId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.handlers.push((id, events));
        id
    }

    fn disconnect_events(&self, id: NotifyId) {
        self.state.lock().handlers.retain(|(handler, _)| *handler != id);
    }
}
