use crate::error::{TransportError, TransportResult};
use crate::transport::{Category, RawHandle, Timeout, Transport, WaitOutcome, WaitSetCapacity};
use tracing::warn;

/// Slot assigned to an endpoint by [`WaitSet::add`].
///
/// Only meaningful for the wait set that returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotIndex {
    category: Category,
    index: usize,
}

impl SlotIndex {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Fixed-capacity wait set, destroyed on drop.
pub struct WaitSet<'t> {
    transport: &'t dyn Transport,
    raw: RawHandle,
    capacity: WaitSetCapacity,
}

impl<'t> WaitSet<'t> {
    /// Allocate a wait set with exactly `capacity` slots per category.
    pub fn build(transport: &'t dyn Transport, capacity: WaitSetCapacity) -> TransportResult<Self> {
        let raw = transport.create_wait_set(capacity)?;
        Ok(Self {
            transport,
            raw,
            capacity,
        })
    }

    pub fn capacity(&self) -> WaitSetCapacity {
        self.capacity
    }

    pub fn clear(&mut self) -> TransportResult<()> {
        self.transport.wait_set_clear(self.raw)
    }

    /// Put `endpoint` in the next free slot of `category`.
    pub fn add(&mut self, category: Category, endpoint: RawHandle) -> TransportResult<SlotIndex> {
        let index = self.transport.wait_set_add(self.raw, category, endpoint)?;
        if index >= self.capacity.get(category) {
            return Err(TransportError::Failure {
                operation: "wait_set_add",
                message: format!(
                    "{} slot {} is outside capacity {}",
                    category,
                    index,
                    self.capacity.get(category)
                ),
            });
        }
        Ok(SlotIndex { category, index })
    }

    /// Block until a slot is ready or `timeout` elapses.
    pub fn wait(&self, timeout: Timeout) -> TransportResult<WaitOutcome> {
        match self.transport.wait(self.raw, timeout) {
            Err(TransportError::TimedOut) => Ok(WaitOutcome::TimedOut),
            other => other,
        }
    }

    pub fn is_ready(&self, slot: SlotIndex) -> bool {
        self.transport
            .wait_set_is_ready(self.raw, slot.category, slot.index)
    }
}

impl Drop for WaitSet<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.destroy_wait_set(self.raw) {
            warn!(wait_set = %self.raw, error = %e, "failed to destroy wait set");
        }
    }
}
