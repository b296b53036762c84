use super::{EndpointHandle, PayloadHandle};
use crate::error::RclResult;
use crate::message::Message;
use crate::qos::QosProfile;
use crate::transport::{EndpointDescriptor, RawHandle, Transport};
use std::marker::PhantomData;
use std::sync::Arc;

/// Publishes messages of type `M` on a topic.
///
/// Publishers are not waitable, so the node does not keep them: the endpoint
/// lives as long as this value.
pub struct Publisher<M: Message> {
    handle: EndpointHandle,
    topic: String,
    _message: PhantomData<fn(M)>,
}

impl<M: Message> Publisher<M> {
    pub(crate) fn create(
        transport: &Arc<dyn Transport>,
        node: RawHandle,
        topic: &str,
        qos: &QosProfile,
    ) -> RclResult<Self> {
        let descriptor = EndpointDescriptor::Publisher {
            topic,
            type_name: M::TYPE_NAME,
            qos,
        };
        Ok(Self {
            handle: EndpointHandle::create(transport, node, &descriptor)?,
            topic: topic.to_string(),
            _message: PhantomData,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publish(&self, message: &M) -> RclResult<()> {
        let transport = self.handle.transport();
        let payload = PayloadHandle::acquire(transport, M::TYPE_NAME)?;
        payload.write(message)?;
        transport.publish(self.handle.raw(), payload.raw())?;
        Ok(())
    }
}
