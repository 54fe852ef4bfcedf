//! Process-wide sink registry
//!
//! Every surface sink registers on construction. The first registration
//! creates the mutex all sinks serialize surface operations on; the last
//! handle dropped destroys it again.

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct RegistryState {
    instances: usize,
    lock: Option<Arc<Mutex<()>>>,
}

#[derive(Default)]
pub struct SinkRegistry {
    state: Mutex<RegistryState>,
}

impl SinkRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a sink instance
    pub fn register(self: &Arc<Self>) -> RegistryHandle {
        let mut state = self.state.lock();
        state.instances += 1;

        let lock = state
            .lock
            .get_or_insert_with(|| {
                log::debug!("Creating shared sink lock");
                Arc::new(Mutex::new(()))
            })
            .clone();

        RegistryHandle {
            registry: Arc::clone(self),
            lock,
        }
    }

    pub fn instance_count(&self) -> usize {
        self.state.lock().instances
    }

    pub fn has_shared_lock(&self) -> bool {
        self.state.lock().lock.is_some()
    }
}

/// Membership of one sink in a [`SinkRegistry`]
pub struct RegistryHandle {
    registry: Arc<SinkRegistry>,
    lock: Arc<Mutex<()>>,
}

impl RegistryHandle {
    /// Mutex shared by every live sink of the registry
    pub fn shared_lock(&self) -> &Arc<Mutex<()>> {
        &self.lock
    }

    pub fn registry(&self) -> &Arc<SinkRegistry> {
        &self.registry
    }
}

impl Drop for RegistryHandle {
    fn drop(&mut self) {
        let mut state = self.registry.state.lock();
        state.instances = state.instances.saturating_sub(1);
        if state.instances == 0 {
            log::debug!("Last sink gone, destroying shared sink lock");
            state.lock = None;
        }
    }
}
