//! Nodes and their endpoint registries

use crate::endpoint::{
    Client, ClientBase, EndpointId, GuardCondition, GuardConditionTrigger, Publisher, Service,
    ServiceBase, Subscription, SubscriptionBase,
};
use crate::error::{CallbackError, RclResult};
use crate::message::{Message, ServiceType};
use crate::qos::QosProfile;
use crate::reactor::{Dispatcher, SpinOutcome};
use crate::transport::{Category, RawHandle, Timeout, Transport, WaitSetCapacity};
use std::sync::Arc;
use tracing::{debug, warn};

/// Waitable endpoints of a node, in registration order per category.
///
/// The order fixes the slot each endpoint gets in a cycle's wait set.
#[derive(Default)]
pub struct NodeRegistry {
    pub(crate) subscriptions: Vec<Box<dyn SubscriptionBase>>,
    pub(crate) services: Vec<Box<dyn ServiceBase>>,
    pub(crate) clients: Vec<Arc<dyn ClientBase>>,
    pub(crate) guard_conditions: Vec<GuardCondition>,
}

impl NodeRegistry {
    /// Per-category endpoint counts, used to size a cycle's wait set.
    pub fn counts(&self) -> WaitSetCapacity {
        WaitSetCapacity {
            subscriptions: self.subscriptions.len(),
            services: self.services.len(),
            clients: self.clients.len(),
            guard_conditions: self.guard_conditions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().is_empty()
    }

    pub fn add_subscription(&mut self, subscription: Box<dyn SubscriptionBase>) -> EndpointId {
        let id = subscription.id();
        self.subscriptions.push(subscription);
        id
    }

    pub fn add_service(&mut self, service: Box<dyn ServiceBase>) -> EndpointId {
        let id = service.id();
        self.services.push(service);
        id
    }

    pub fn add_client(&mut self, client: Arc<dyn ClientBase>) -> EndpointId {
        let id = client.id();
        self.clients.push(client);
        id
    }

    pub fn add_guard_condition(&mut self, guard_condition: GuardCondition) -> EndpointId {
        let id = guard_condition.id();
        self.guard_conditions.push(guard_condition);
        id
    }

    /// Unregister an endpoint. Returns `false` if it was not registered.
    ///
    /// Registration order of the remaining endpoints is kept.
    pub fn remove(&mut self, id: EndpointId) -> bool {
        fn remove_where<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
            match items.iter().position(matches) {
                Some(index) => {
                    items.remove(index);
                    true
                }
                None => false,
            }
        }

        match id.category() {
            Category::Subscription => remove_where(&mut self.subscriptions, |s| s.id() == id),
            Category::Service => remove_where(&mut self.services, |s| s.id() == id),
            Category::Client => remove_where(&mut self.clients, |c| c.id() == id),
            Category::GuardCondition => remove_where(&mut self.guard_conditions, |g| g.id() == id),
        }
    }
}

/// Owned transport node, destroyed on drop.
pub struct NodeHandle {
    transport: Arc<dyn Transport>,
    raw: RawHandle,
}

impl NodeHandle {
    pub(crate) fn create(
        transport: &Arc<dyn Transport>,
        name: &str,
        namespace: &str,
    ) -> RclResult<Self> {
        let raw = transport.create_node(name, namespace)?;
        Ok(Self {
            transport: Arc::clone(transport),
            raw,
        })
    }

    pub fn raw(&self) -> RawHandle {
        self.raw
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        if let Err(e) = self.transport.destroy_node(self.raw) {
            warn!(node = %self.raw, error = %e, "failed to destroy node");
        }
    }
}

/// A named participant owning a set of endpoints.
///
/// Spinning takes the node by `&mut`, so callbacks can never add or remove
/// endpoints of the node being spun.
pub struct Node {
    // Endpoints are declared before the node handle so they are destroyed first.
    registry: NodeRegistry,
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
    default_qos: QosProfile,
    spin_timeout: Timeout,
    name: String,
    namespace: String,
    handle: NodeHandle,
}

impl Node {
    pub(crate) fn create(
        transport: &Arc<dyn Transport>,
        name: &str,
        namespace: &str,
        default_qos: QosProfile,
        spin_timeout: Timeout,
    ) -> RclResult<Self> {
        let handle = NodeHandle::create(transport, name, namespace)?;
        debug!(name, namespace, node = %handle.raw(), "node created");
        Ok(Self {
            registry: NodeRegistry::default(),
            dispatcher: Dispatcher::new(Arc::clone(transport)),
            transport: Arc::clone(transport),
            default_qos,
            spin_timeout,
            name: name.to_string(),
            namespace: namespace.to_string(),
            handle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn fully_qualified_name(&self) -> String {
        match self.namespace.as_str() {
            "" | "/" => format!("/{}", self.name),
            ns => format!("{}/{}", ns, self.name),
        }
    }

    pub fn handle(&self) -> &NodeHandle {
        &self.handle
    }

    pub fn default_qos(&self) -> &QosProfile {
        &self.default_qos
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn counts(&self) -> WaitSetCapacity {
        self.registry.counts()
    }

    pub fn create_publisher<M: Message>(&self, topic: &str) -> RclResult<Publisher<M>> {
        self.create_publisher_with_qos(topic, &self.default_qos)
    }

    pub fn create_publisher_with_qos<M: Message>(
        &self,
        topic: &str,
        qos: &QosProfile,
    ) -> RclResult<Publisher<M>> {
        Publisher::create(&self.transport, self.handle.raw(), topic, qos)
    }

    pub fn create_subscription<M, F>(&mut self, topic: &str, callback: F) -> RclResult<EndpointId>
    where
        M: Message,
        F: FnMut(M) -> Result<(), CallbackError> + Send + 'static,
    {
        let qos = self.default_qos.clone();
        self.create_subscription_with_qos(topic, &qos, callback)
    }

    pub fn create_subscription_with_qos<M, F>(
        &mut self,
        topic: &str,
        qos: &QosProfile,
        callback: F,
    ) -> RclResult<EndpointId>
    where
        M: Message,
        F: FnMut(M) -> Result<(), CallbackError> + Send + 'static,
    {
        let subscription =
            Subscription::<M>::create(&self.transport, self.handle.raw(), topic, qos, callback)?;
        Ok(self.registry.add_subscription(Box::new(subscription)))
    }

    pub fn create_service<S, F>(&mut self, service_name: &str, handler: F) -> RclResult<EndpointId>
    where
        S: ServiceType,
        F: FnMut(S::Request, &mut S::Response) -> Result<(), CallbackError> + Send + 'static,
    {
        let qos = QosProfile::services_default();
        let service =
            Service::<S>::create(&self.transport, self.handle.raw(), service_name, &qos, handler)?;
        Ok(self.registry.add_service(Box::new(service)))
    }

    pub fn create_client<S: ServiceType>(&mut self, service_name: &str) -> RclResult<Client<S>> {
        let qos = QosProfile::services_default();
        let client = Client::<S>::create(&self.transport, self.handle.raw(), service_name, &qos)?;
        self.registry.add_client(client.dispatcher());
        Ok(client)
    }

    pub fn create_guard_condition<F>(&mut self, callback: F) -> RclResult<GuardConditionTrigger>
    where
        F: FnMut() -> Result<(), CallbackError> + Send + 'static,
    {
        let guard_condition =
            GuardCondition::create(&self.transport, self.handle.raw(), callback)?;
        let trigger = guard_condition.trigger_handle();
        self.registry.add_guard_condition(guard_condition);
        Ok(trigger)
    }

    pub fn remove_subscription(&mut self, id: EndpointId) -> bool {
        id.category() == Category::Subscription && self.registry.remove(id)
    }

    pub fn remove_service(&mut self, id: EndpointId) -> bool {
        id.category() == Category::Service && self.registry.remove(id)
    }

    /// Stop dispatching responses for `client`. The endpoint itself lives
    /// until the last clone is dropped.
    pub fn remove_client<S: ServiceType>(&mut self, client: &Client<S>) -> bool {
        self.registry.remove(client.id())
    }

    pub fn remove_guard_condition(&mut self, id: EndpointId) -> bool {
        id.category() == Category::GuardCondition && self.registry.remove(id)
    }

    /// Run exactly one cycle.
    pub fn spin_once(&mut self, timeout: Timeout) -> RclResult<SpinOutcome> {
        self.dispatcher.run_once(&mut self.registry, timeout)
    }

    /// Run cycles at the configured spin timeout until the transport shuts down.
    pub fn spin(&mut self) -> RclResult<()> {
        self.dispatcher
            .run_forever(&mut self.registry, self.spin_timeout)
    }
}
