use super::{EndpointHandle, EndpointId};
use crate::error::{CallbackError, RclError, RclResult};
use crate::transport::{Category, EndpointDescriptor, RawHandle, Transport};
use std::sync::Arc;

type WakeCallback = Box<dyn FnMut() -> Result<(), CallbackError> + Send>;

/// Out-of-band wake signal. Runs its callback in the spin cycle following a
/// trigger; nothing is taken.
pub struct GuardCondition {
    handle: EndpointHandle,
    callback: WakeCallback,
}

impl GuardCondition {
    pub(crate) fn create<F>(
        transport: &Arc<dyn Transport>,
        node: RawHandle,
        callback: F,
    ) -> RclResult<Self>
    where
        F: FnMut() -> Result<(), CallbackError> + Send + 'static,
    {
        Ok(Self {
            handle: EndpointHandle::create(transport, node, &EndpointDescriptor::GuardCondition)?,
            callback: Box::new(callback),
        })
    }

    pub fn id(&self) -> EndpointId {
        EndpointId::new(Category::GuardCondition, self.handle.raw())
    }

    pub fn trigger_handle(&self) -> GuardConditionTrigger {
        GuardConditionTrigger {
            transport: Arc::clone(self.handle.shared_transport()),
            raw: self.handle.raw(),
        }
    }

    pub(crate) fn invoke(&mut self) -> RclResult<()> {
        (self.callback)().map_err(|source| RclError::Callback {
            category: Category::GuardCondition,
            source,
        })
    }
}

/// Triggers a guard condition from any thread.
///
/// Triggering after the guard condition was removed fails with
/// `InvalidHandle`.
#[derive(Clone)]
pub struct GuardConditionTrigger {
    transport: Arc<dyn Transport>,
    raw: RawHandle,
}

impl GuardConditionTrigger {
    pub fn id(&self) -> EndpointId {
        EndpointId::new(Category::GuardCondition, self.raw)
    }

    pub fn trigger(&self) -> RclResult<()> {
        self.transport.trigger_guard_condition(self.raw)?;
        Ok(())
    }
}
