//! Coalescing buffer of service registrations.
//!
//! Handler threads insert heartbeats keyed by the service key
//! (`addr@type`); between two flushes only the latest descriptor per key
//! is kept. The periodic upstream task drains the whole queue in one
//! operation and pushes the batch to the conscience.
//!
//! `drain` swaps a fresh empty map in under the lock and hands the old
//! one out, so the critical section stays O(1) however large the batch:
//! draining element by element under the lock would hold writers up.

use std::collections::BTreeMap;
use std::sync::Mutex;

use gridgate_core::ServiceDescriptor;

/// Deduplicating registration queue.
#[derive(Default)]
pub struct PushQueue {
    inner: Mutex<BTreeMap<String, ServiceDescriptor>>,
}

impl PushQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a registration; the latest descriptor for a key wins.
    pub fn insert(&self, service: ServiceDescriptor) {
        let key = service.service_key();
        self.inner.lock().unwrap().insert(key, service);
    }

    /// Takes the whole queue, leaving a fresh empty one behind.
    pub fn drain(&self) -> Vec<ServiceDescriptor> {
        let drained = std::mem::take(&mut *self.inner.lock().unwrap());
        drained.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}
