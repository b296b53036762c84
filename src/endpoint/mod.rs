//! Endpoints and the handles they own
//!
//! An endpoint is a transport resource registered on a node. Waitable
//! endpoints (subscriptions, services, clients and guard conditions) are
//! stored by the node behind the object-safe `*Base` traits so the reactor can
//! dispatch them without knowing their message types.
//!
//! Two RAII types wrap transport resources:
//! - [`EndpointHandle`]: lives as long as the endpoint
//! - [`PayloadHandle`]: lives for a single take or send

pub mod client;
pub mod guard_condition;
pub mod publisher;
pub mod service;
pub mod subscription;

pub use client::Client;
pub use guard_condition::{GuardCondition, GuardConditionTrigger};
pub use publisher::Publisher;
pub use service::Service;
pub use subscription::Subscription;

use crate::error::{RclResult, TransportResult};
use crate::message::{self, Message};
use crate::transport::{Category, EndpointDescriptor, RawHandle, Transport};
use std::sync::Arc;
use tracing::warn;

/// Identity of a registered endpoint, used to remove it from its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId {
    category: Category,
    raw: RawHandle,
}

impl EndpointId {
    pub(crate) fn new(category: Category, raw: RawHandle) -> Self {
        Self { category, raw }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }
}

/// Owned transport endpoint, destroyed on drop.
pub struct EndpointHandle {
    transport: Arc<dyn Transport>,
    raw: RawHandle,
}

impl EndpointHandle {
    pub(crate) fn create(
        transport: &Arc<dyn Transport>,
        node: RawHandle,
        descriptor: &EndpointDescriptor<'_>,
    ) -> TransportResult<Self> {
        let raw = transport.create_endpoint(node, descriptor)?;
        Ok(Self {
            transport: Arc::clone(transport),
            raw,
        })
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    pub fn transport(&self) -> &dyn Transport {
        &*self.transport
    }

    pub(crate) fn shared_transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl Drop for EndpointHandle {
    fn drop(&mut self) {
        if let Err(e) = self.transport.destroy_endpoint(self.raw) {
            warn!(endpoint = %self.raw, error = %e, "failed to destroy endpoint");
        }
    }
}

/// Payload buffer owned for the duration of one take or send.
///
/// Released on drop, which covers every exit path of the caller including
/// decode failures and failing callbacks.
pub struct PayloadHandle<'t> {
    transport: &'t dyn Transport,
    raw: RawHandle,
}

impl<'t> PayloadHandle<'t> {
    /// Allocate an empty buffer shaped for `type_name`.
    pub fn acquire(transport: &'t dyn Transport, type_name: &str) -> TransportResult<Self> {
        let raw = transport.create_payload(type_name)?;
        Ok(Self { transport, raw })
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    pub fn read<M: Message>(&self) -> RclResult<M> {
        let bytes = self.transport.read_payload(self.raw)?;
        message::decode(&bytes)
    }

    pub fn write<M: Message>(&self, message: &M) -> RclResult<()> {
        let bytes = message::encode(message)?;
        self.transport.write_payload(self.raw, &bytes)?;
        Ok(())
    }
}

impl Drop for PayloadHandle<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.release_payload(self.raw) {
            warn!(payload = %self.raw, error = %e, "failed to release payload");
        }
    }
}

/// Type-erased subscription, as seen by the reactor.
pub trait SubscriptionBase: Send {
    fn id(&self) -> EndpointId;

    /// Shape of the payload buffer a take needs.
    fn message_type(&self) -> &'static str;

    /// Decode a taken message and run the user callback.
    fn handle_message(&mut self, payload: &PayloadHandle<'_>) -> RclResult<()>;
}

/// Type-erased service, as seen by the reactor.
pub trait ServiceBase: Send {
    fn id(&self) -> EndpointId;

    fn request_type(&self) -> &'static str;

    fn response_type(&self) -> &'static str;

    /// Decode `request`, run the handler, and encode its answer into `response`.
    fn handle_request(
        &mut self,
        request: &PayloadHandle<'_>,
        response: &PayloadHandle<'_>,
    ) -> RclResult<()>;
}

/// Type-erased client, as seen by the reactor.
///
/// Clients are shared with the application, which sends requests through
/// them, so dispatch goes through `&self`.
pub trait ClientBase: Send + Sync {
    fn id(&self) -> EndpointId;

    fn response_type(&self) -> &'static str;

    /// Route a taken response to the handler registered for `sequence_number`.
    fn handle_response(&self, sequence_number: i64, response: &PayloadHandle<'_>)
        -> RclResult<()>;
}
