//! Producer to consumer frame delivery
//!
//! Envelopes go over an unbounded crossbeam channel to a dedicated consumer
//! thread, so the producer never waits on the renderer. The thread is only
//! started by the first send and is stopped by [`DeliveryChannel::close`].

use crate::error::{Result, SurfaceError};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use vsink_video::FrameRef;

/// One message on the channel
#[derive(Debug)]
pub enum Envelope {
    /// A frame to show, tagged with the binding epoch it was sent under
    Frame { frame: FrameRef, epoch: u64 },
    Visibility(bool),
}

/// Consumer side of a [`DeliveryChannel`]
///
/// Envelopes arrive one at a time, in send order, on the consumer thread.
pub trait EnvelopeHandler: Send + 'static {
    fn frame(&mut self, frame: FrameRef, epoch: u64);

    fn visibility(&mut self, visible: bool);

    /// The channel was closed; release anything still held
    fn drained(&mut self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent: u64,
    pub delivered: u64,
    pub discarded: u64,
    pub visibility_changes: u64,
}

#[derive(Default)]
struct DeliveryCounters {
    sent: AtomicU64,
    delivered: AtomicU64,
    discarded: AtomicU64,
    visibility_changes: AtomicU64,
}

struct Transport {
    tx: Sender<Envelope>,
    closing: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

pub struct DeliveryChannel<H: EnvelopeHandler> {
    thread_name: String,
    handler: Arc<Mutex<H>>,
    transport: Option<Transport>,
    counters: Arc<DeliveryCounters>,
}

impl<H: EnvelopeHandler> DeliveryChannel<H> {
    pub fn new(thread_name: impl Into<String>, handler: H) -> Self {
        Self {
            thread_name: thread_name.into(),
            handler: Arc::new(Mutex::new(handler)),
            transport: None,
            counters: Arc::new(DeliveryCounters::default()),
        }
    }

    /// Queue an envelope without waiting for the consumer
    ///
    /// Starts the consumer thread if none is running. On failure the
    /// envelope, and any frame in it, is dropped.
    pub fn send(&mut self, envelope: Envelope) -> Result<()> {
        if self.transport.is_none() {
            self.transport = Some(self.spawn_consumer()?);
        }

        let Some(transport) = self.transport.as_ref() else {
            return Err(SurfaceError::ChannelClosed);
        };

        if transport.tx.send(envelope).is_err() {
            log::warn!("Delivery consumer '{}' has exited, resetting", self.thread_name);
            self.close();
            return Err(SurfaceError::ChannelClosed);
        }

        self.counters.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Stop the consumer and release every outstanding frame
    ///
    /// Frames still queued are discarded. Safe to call repeatedly.
    pub fn close(&mut self) {
        let Some(transport) = self.transport.take() else {
            return;
        };

        transport.closing.store(true, Ordering::Release);
        drop(transport.tx);

        if transport.thread.thread().id() == thread::current().id() {
            log::warn!("Delivery channel closed from its own consumer thread");
        } else if transport.thread.join().is_err() {
            log::error!("Delivery consumer '{}' panicked", self.thread_name);
        }

        self.handler.lock().drained();
        log::debug!("Delivery channel '{}' drained", self.thread_name);
    }

    pub fn is_running(&self) -> bool {
        self.transport.is_some()
    }

    /// Whether the consumer thread has exited while the transport is still open
    #[cfg(test)]
    pub(crate) fn consumer_finished(&self) -> bool {
        self.transport
            .as_ref()
            .is_some_and(|transport| transport.thread.is_finished())
    }

    /// Access the handler from the producer side
    pub fn with_handler<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        let mut handler = self.handler.lock();
        f(&mut *handler)
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            visibility_changes: self.counters.visibility_changes.load(Ordering::Relaxed),
        }
    }

    fn spawn_consumer(&self) -> Result<Transport> {
        let (tx, rx) = channel::unbounded();
        let closing = Arc::new(AtomicBool::new(false));

        let thread = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn({
                let handler = Arc::clone(&self.handler);
                let counters = Arc::clone(&self.counters);
                let closing = Arc::clone(&closing);
                move || consume(rx, handler, counters, closing)
            })
            .map_err(|e| {
                log::error!("Failed to start delivery consumer: {}", e);
                SurfaceError::ChannelUnavailable(e)
            })?;

        log::debug!("Started delivery consumer '{}'", self.thread_name);
        Ok(Transport {
            tx,
            closing,
            thread,
        })
    }
}

impl<H: EnvelopeHandler> Drop for DeliveryChannel<H> {
    fn drop(&mut self) {
        self.close();
    }
}

fn consume<H: EnvelopeHandler>(
    rx: Receiver<Envelope>,
    handler: Arc<Mutex<H>>,
    counters: Arc<DeliveryCounters>,
    closing: Arc<AtomicBool>,
) {
    // Ends once every sender is gone and the queue is empty
    for envelope in rx.iter() {
        let closing = closing.load(Ordering::Acquire);

        match envelope {
            Envelope::Frame { frame, epoch } => {
                if closing {
                    counters.discarded.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                handler.lock().frame(frame, epoch);
                counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Envelope::Visibility(visible) => {
                if closing {
                    continue;
                }
                log::trace!("Visibility -> {}", visible);
                handler.lock().visibility(visible);
                counters.visibility_changes.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
