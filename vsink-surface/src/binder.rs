//! Binding between a sink's frame stream and a rendering surface
//!
//! The producer side ([`SurfaceBinder`]) decides whether a frame is admitted
//! and queues it on the delivery channel. The consumer side
//! ([`SurfaceRenderer`]) puts it on the surface, either by copying into the
//! surface's backing buffer or by lending the frame's own memory until the
//! next frame replaces it.

use crate::delivery::{DeliveryChannel, DeliveryStats, Envelope, EnvelopeHandler};
use crate::error::{Result, SurfaceError};
use crate::geometry::{fit_rect, FitMode};
use crate::registry::RegistryHandle;
use crate::surface::{supports_zero_copy, NotifyId, Surface, SurfaceEvents};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use vsink_video::{FrameRef, RenderOutcome, RunState};

/// State shared between the binder and the consumer thread
#[derive(Default)]
struct SurfaceBinding {
    surface: Option<Arc<dyn Surface>>,
    zero_copy: bool,
    geometry_applied: bool,
    visible: bool,
    /// Bumped on every bind and unbind; frames sent under an older epoch are stale
    epoch: u64,
    notify_id: Option<NotifyId>,
    fit_mode: FitMode,
    content_size: Option<(u32, u32)>,
}

impl SurfaceBinding {
    fn clear(&mut self) -> Option<(Arc<dyn Surface>, Option<NotifyId>)> {
        let notify_id = self.notify_id.take();
        let surface = self.surface.take();
        self.zero_copy = false;
        self.geometry_applied = false;
        self.content_size = None;
        self.epoch += 1;
        surface.map(|s| (s, notify_id))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    pub sent: u64,
    pub rendered: u64,
    pub dropped_by_state: u64,
    pub dropped_by_source: u64,
    pub dropped_unbound: u64,
    pub send_failures: u64,
    pub copied: u64,
    pub borrowed: u64,
    pub released_on_drain: u64,
    pub delivery: DeliveryStats,
}

#[derive(Default)]
struct SurfaceCounters {
    sent: AtomicU64,
    rendered: AtomicU64,
    dropped_by_state: AtomicU64,
    dropped_by_source: AtomicU64,
    dropped_unbound: AtomicU64,
    send_failures: AtomicU64,
    copied: AtomicU64,
    borrowed: AtomicU64,
    released_on_drain: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Consumer-thread half: renders frames onto the bound surface
pub struct SurfaceRenderer {
    binding: Arc<Mutex<SurfaceBinding>>,
    counters: Arc<SurfaceCounters>,
    /// Frame the surface is reading from on the legacy path
    held: Option<FrameRef>,
}

impl SurfaceRenderer {
    /// Whether a frame is currently lent to the surface
    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }
}

impl EnvelopeHandler for SurfaceRenderer {
    fn frame(&mut self, frame: FrameRef, epoch: u64) {
        let previous = self.held.take();

        // Surface calls happen outside the binding lock; they may raise events
        let (surface, zero_copy, apply_size) = {
            let mut binding = self.binding.lock();
            let Some(surface) = binding.surface.clone() else {
                bump(&self.counters.dropped_unbound);
                return;
            };
            if binding.epoch != epoch {
                log::trace!("Releasing frame from stale binding epoch {}", epoch);
                bump(&self.counters.dropped_unbound);
                return;
            }

            let apply_size = !binding.geometry_applied;
            binding.geometry_applied = true;
            binding.content_size = Some((frame.width, frame.height));
            (surface, binding.zero_copy, apply_size)
        };

        if apply_size && surface.pixel_buffer_size().is_none() {
            surface.set_pixel_buffer_size(frame.width, frame.height);
        }

        if zero_copy {
            let pixels = frame.data();
            let written = surface.with_backing_buffer(&mut |words: &mut [u32]| {
                let backing: &mut [u8] = bytemuck::cast_slice_mut(words);
                let len = backing.len().min(pixels.len());
                backing[..len].copy_from_slice(&pixels[..len]);
            });

            if written {
                surface.mark_dirty();
                bump(&self.counters.copied);
            } else {
                log::warn!("Surface has no backing buffer, frame not shown");
            }
            // The surface owns its copy; the frame is released here
        } else {
            surface.set_pixel_buffer(&frame);
            bump(&self.counters.borrowed);
            self.held = Some(frame);
        }

        drop(previous);
        bump(&self.counters.rendered);
    }

    fn visibility(&mut self, visible: bool) {
        let surface = {
            let mut binding = self.binding.lock();
            binding.visible = visible;
            binding.surface.clone()
        };

        if let Some(surface) = surface {
            surface.set_visible(visible);
        }
    }

    fn drained(&mut self) {
        if self.held.take().is_some() {
            bump(&self.counters.released_on_drain);
        }
    }
}

/// Surface notifications for one binding epoch
struct BindingEvents {
    binding: Weak<Mutex<SurfaceBinding>>,
    epoch: u64,
}

impl SurfaceEvents for BindingEvents {
    fn resized(&self, width: u32, height: u32) {
        let Some(binding) = self.binding.upgrade() else {
            return;
        };

        let (surface, content_size, fit_mode) = {
            let binding = binding.lock();
            if binding.epoch != self.epoch {
                return;
            }
            let Some(surface) = binding.surface.clone() else {
                return;
            };
            (surface, binding.content_size, binding.fit_mode)
        };

        let content = content_size
            .or_else(|| surface.pixel_buffer_size())
            .unwrap_or((width, height));
        let rect = fit_rect(content, (width, height), fit_mode);

        log::debug!("Surface resized to {}x{}, fill {:?}", width, height, rect);
        surface.set_fill(rect);
    }

    fn destroyed(&self) {
        let Some(binding) = self.binding.upgrade() else {
            return;
        };

        let mut binding = binding.lock();
        if binding.epoch == self.epoch {
            log::debug!("Bound surface destroyed externally");
            // The surface is gone; there is nothing left to disconnect from
            let _ = binding.clear();
        }
    }
}

/// Producer-thread half of a surface sink
///
/// Every operation that touches the binding or the channel runs under the
/// registry's shared lock.
pub struct SurfaceBinder {
    registry: RegistryHandle,
    binding: Arc<Mutex<SurfaceBinding>>,
    channel: DeliveryChannel<SurfaceRenderer>,
    counters: Arc<SurfaceCounters>,
    presentation_id: u32,
    active_source: Option<u32>,
    run_state: RunState,
    visible: bool,
}

impl SurfaceBinder {
    pub fn new(registry: RegistryHandle, presentation_id: u32) -> Self {
        let binding = Arc::new(Mutex::new(SurfaceBinding {
            visible: true,
            ..Default::default()
        }));
        let counters = Arc::new(SurfaceCounters::default());

        let renderer = SurfaceRenderer {
            binding: Arc::clone(&binding),
            counters: Arc::clone(&counters),
            held: None,
        };

        Self {
            registry,
            binding,
            channel: DeliveryChannel::new(format!("vsink-surface-{presentation_id}"), renderer),
            counters,
            presentation_id,
            active_source: None,
            run_state: RunState::Null,
            visible: true,
        }
    }

    /// Attach a surface, replacing any current one
    ///
    /// Objects that are not image surfaces are rejected without touching
    /// the current binding.
    pub fn bind(&mut self, surface: Arc<dyn Surface>) -> Result<()> {
        if !surface.is_image_surface() {
            log::warn!("Rejecting surface: not an image surface");
            return Err(SurfaceError::IncompatibleSurface);
        }

        let lock = Arc::clone(self.registry.shared_lock());
        let _guard = lock.lock();

        self.unbind_locked();

        let backend = surface.backend_name();
        let zero_copy = supports_zero_copy(&backend);
        if zero_copy {
            surface.hint_frequent_updates();
        }

        let epoch = {
            let mut binding = self.binding.lock();
            binding.epoch += 1;
            binding.surface = Some(Arc::clone(&surface));
            binding.zero_copy = zero_copy;
            binding.geometry_applied = false;
            binding.content_size = None;
            binding.epoch
        };

        let id = surface.connect_events(Arc::new(BindingEvents {
            binding: Arc::downgrade(&self.binding),
            epoch,
        }));
        self.binding.lock().notify_id = Some(id);

        log::debug!(
            "Bound surface on backend '{}' ({})",
            backend,
            if zero_copy { "zero-copy" } else { "legacy" }
        );

        if !self.visible {
            self.send_locked(Envelope::Visibility(false));
        }
        Ok(())
    }

    /// Detach the current surface, if any
    pub fn unbind(&mut self) {
        let lock = Arc::clone(self.registry.shared_lock());
        let _guard = lock.lock();
        self.unbind_locked();
    }

    pub fn is_bound(&self) -> bool {
        self.binding.lock().surface.is_some()
    }

    pub fn is_zero_copy(&self) -> bool {
        self.binding.lock().zero_copy
    }

    /// Request a visibility change; applied on the consumer thread
    pub fn set_visible(&mut self, visible: bool) {
        let lock = Arc::clone(self.registry.shared_lock());
        let _guard = lock.lock();

        self.visible = visible;
        if self.binding.lock().surface.is_some() {
            self.send_locked(Envelope::Visibility(visible));
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_fit_mode(&mut self, mode: FitMode) {
        self.binding.lock().fit_mode = mode;
    }

    pub fn set_run_state(&mut self, state: RunState) {
        self.run_state = state;
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Set or clear the active-source token
    pub fn set_active_source(&mut self, source: Option<u32>) {
        self.active_source = source;
    }

    pub fn presentation_id(&self) -> u32 {
        self.presentation_id
    }

    /// Queue a frame for the surface, or release it
    pub fn submit(&mut self, frame: FrameRef) -> RenderOutcome {
        if !self.run_state.can_render() {
            bump(&self.counters.dropped_by_state);
            log::trace!("Dropping frame in state {:?}", self.run_state);
            return RenderOutcome::Dropped;
        }

        if let Some(active) = self.active_source {
            if active != self.presentation_id {
                bump(&self.counters.dropped_by_source);
                log::trace!(
                    "Dropping frame, source {} active, this is {}",
                    active,
                    self.presentation_id
                );
                return RenderOutcome::Dropped;
            }
        }

        let lock = Arc::clone(self.registry.shared_lock());
        let _guard = lock.lock();

        let epoch = {
            let binding = self.binding.lock();
            if binding.surface.is_none() {
                bump(&self.counters.dropped_unbound);
                return RenderOutcome::Dropped;
            }
            binding.epoch
        };

        if self.send_locked(Envelope::Frame { frame, epoch }) {
            bump(&self.counters.sent);
            RenderOutcome::Queued
        } else {
            RenderOutcome::Dropped
        }
    }

    /// Unbind, drain the channel and release every held frame
    ///
    /// Safe to call any number of times.
    pub fn teardown(&mut self) {
        let lock = Arc::clone(self.registry.shared_lock());
        let _guard = lock.lock();

        self.unbind_locked();
        self.channel.close();
    }

    /// Whether the consumer still lends a frame to the surface
    pub fn is_holding_frame(&self) -> bool {
        self.channel.with_handler(|renderer| renderer.is_holding())
    }

    pub fn stats(&self) -> SurfaceStats {
        let c = &self.counters;
        SurfaceStats {
            sent: c.sent.load(Ordering::Relaxed),
            rendered: c.rendered.load(Ordering::Relaxed),
            dropped_by_state: c.dropped_by_state.load(Ordering::Relaxed),
            dropped_by_source: c.dropped_by_source.load(Ordering::Relaxed),
            dropped_unbound: c.dropped_unbound.load(Ordering::Relaxed),
            send_failures: c.send_failures.load(Ordering::Relaxed),
            copied: c.copied.load(Ordering::Relaxed),
            borrowed: c.borrowed.load(Ordering::Relaxed),
            released_on_drain: c.released_on_drain.load(Ordering::Relaxed),
            delivery: self.channel.stats(),
        }
    }

    fn unbind_locked(&mut self) {
        let detached = self.binding.lock().clear();

        if let Some((surface, notify_id)) = detached {
            if let Some(id) = notify_id {
                surface.disconnect_events(id);
            }
            log::debug!("Unbound surface");
        }
    }

    /// Returns whether the envelope was queued. A failed send drops it.
    fn send_locked(&mut self, envelope: Envelope) -> bool {
        match self.channel.send(envelope) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Frame delivery failed: {}", e);
                bump(&self.counters.send_failures);
                false
            }
        }
    }
}

impl Drop for SurfaceBinder {
    fn drop(&mut self) {
        self.teardown();
    }
}
