use super::{EndpointHandle, EndpointId, PayloadHandle, SubscriptionBase};
use crate::error::{CallbackError, RclError, RclResult};
use crate::message::Message;
use crate::qos::QosProfile;
use crate::transport::{Category, EndpointDescriptor, RawHandle, Transport};
use std::marker::PhantomData;
use std::sync::Arc;

type MessageCallback<M> = Box<dyn FnMut(M) -> Result<(), CallbackError> + Send>;

/// Receives messages of type `M` published on a topic.
pub struct Subscription<M: Message> {
    handle: EndpointHandle,
    topic: String,
    callback: MessageCallback<M>,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message> Subscription<M> {
    pub(crate) fn create<F>(
        transport: &Arc<dyn Transport>,
        node: RawHandle,
        topic: &str,
        qos: &QosProfile,
        callback: F,
    ) -> RclResult<Self>
    where
        F: FnMut(M) -> Result<(), CallbackError> + Send + 'static,
    {
        let descriptor = EndpointDescriptor::Subscription {
            topic,
            type_name: M::TYPE_NAME,
            qos,
        };
        Ok(Self {
            handle: EndpointHandle::create(transport, node, &descriptor)?,
            topic: topic.to_string(),
            callback: Box::new(callback),
            _message: PhantomData,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl<M: Message> SubscriptionBase for Subscription<M> {
    fn id(&self) -> EndpointId {
        EndpointId::new(Category::Subscription, self.handle.raw())
    }

    fn message_type(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn handle_message(&mut self, payload: &PayloadHandle<'_>) -> RclResult<()> {
        let message: M = payload.read()?;
        (self.callback)(message).map_err(|source| RclError::Callback {
            category: Category::Subscription,
            source,
        })
    }
}
