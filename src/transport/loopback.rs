//! In-process loopback transport
//!
//! Delivers messages, requests and responses between endpoints created on the
//! same [`LoopbackTransport`]. All state lives behind a single mutex and a
//! condition variable: every operation that can make an endpoint ready
//! notifies the condition variable, which is what wakes a blocked
//! [`Transport::wait`].
//!
//! Readiness rules:
//! - subscription: its queue is non-empty
//! - service: a request is queued
//! - client: a response is queued
//! - guard condition: it was triggered since the last wait that observed it

use super::{
    Category, EndpointDescriptor, RawHandle, RequestHeader, Timeout, Transport, WaitOutcome,
    WaitSetCapacity,
};
use crate::error::{TransportError, TransportResult};
use crate::reactor::CorrelationToken;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use tracing::{debug, trace};

/// Limits and identity of a loopback transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// Reported by [`Transport::implementation_identifier`]
    pub identifier: String,

    /// Largest total slot count a single wait set may request
    pub max_wait_set_entries: usize,

    /// Largest number of payload buffers alive at once
    pub max_payloads: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            identifier: "rclspin_loopback".to_string(),
            max_wait_set_entries: 1024,
            max_payloads: 4096,
        }
    }
}

/// Resource counters, used to check that nothing leaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopbackStats {
    pub live_nodes: usize,
    pub live_endpoints: usize,
    pub live_wait_sets: usize,
    pub live_payloads: usize,
    pub wait_sets_created: u64,
    pub payloads_created: u64,
    pub waits: u64,
}

struct NodeEntry {
    name: String,
    namespace: String,
}

type Queued = (RequestHeader, Vec<u8>);

enum EndpointEntry {
    Publisher {
        topic: String,
        type_name: String,
    },
    Subscription {
        topic: String,
        type_name: String,
        bound: Option<usize>,
        queue: VecDeque<Vec<u8>>,
    },
    Service {
        name: String,
        request_type: String,
        response_type: String,
        requests: VecDeque<Queued>,
    },
    Client {
        name: String,
        request_type: String,
        response_type: String,
        next_sequence: i64,
        responses: VecDeque<Queued>,
    },
    GuardCondition {
        triggered: bool,
    },
}

impl EndpointEntry {
    fn category(&self) -> Option<Category> {
        match self {
            EndpointEntry::Publisher { .. } => None,
            EndpointEntry::Subscription { .. } => Some(Category::Subscription),
            EndpointEntry::Service { .. } => Some(Category::Service),
            EndpointEntry::Client { .. } => Some(Category::Client),
            EndpointEntry::GuardCondition { .. } => Some(Category::GuardCondition),
        }
    }

    fn is_ready(&self) -> bool {
        match self {
            EndpointEntry::Publisher { .. } => false,
            EndpointEntry::Subscription { queue, .. } => !queue.is_empty(),
            EndpointEntry::Service { requests, .. } => !requests.is_empty(),
            EndpointEntry::Client { responses, .. } => !responses.is_empty(),
            EndpointEntry::GuardCondition { triggered } => *triggered,
        }
    }
}

struct WaitSetEntry {
    capacity: WaitSetCapacity,
    slots: [Vec<RawHandle>; 4],
    ready: [Vec<bool>; 4],
}

impl WaitSetEntry {
    fn new(capacity: WaitSetCapacity) -> Self {
        Self {
            capacity,
            slots: Default::default(),
            ready: Default::default(),
        }
    }

    fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }
}

struct PayloadEntry {
    type_name: String,
    data: Option<Vec<u8>>,
}

#[derive(Default)]
struct State {
    initialized: bool,
    active: bool,
    next_handle: u64,
    nodes: HashMap<RawHandle, NodeEntry>,
    endpoints: HashMap<RawHandle, EndpointEntry>,
    wait_sets: HashMap<RawHandle, WaitSetEntry>,
    payloads: HashMap<RawHandle, PayloadEntry>,
    wait_sets_created: u64,
    payloads_created: u64,
    waits: u64,
}

impl State {
    fn allocate_handle(&mut self) -> RawHandle {
        self.next_handle += 1;
        RawHandle(self.next_handle)
    }

    fn payload(&self, payload: RawHandle) -> TransportResult<&PayloadEntry> {
        self.payloads
            .get(&payload)
            .ok_or(TransportError::InvalidHandle(payload))
    }

    fn payload_mut(&mut self, payload: RawHandle) -> TransportResult<&mut PayloadEntry> {
        self.payloads
            .get_mut(&payload)
            .ok_or(TransportError::InvalidHandle(payload))
    }

    fn endpoint_mut(&mut self, endpoint: RawHandle) -> TransportResult<&mut EndpointEntry> {
        self.endpoints
            .get_mut(&endpoint)
            .ok_or(TransportError::InvalidHandle(endpoint))
    }

    /// Check the payload has the expected shape and return a copy of its contents.
    fn payload_bytes(
        &self,
        payload: RawHandle,
        expected_type: &str,
        operation: &'static str,
    ) -> TransportResult<Vec<u8>> {
        let entry = self.payload(payload)?;
        check_type(expected_type, &entry.type_name)?;
        entry.data.clone().ok_or_else(|| TransportError::Failure {
            operation,
            message: format!("payload {} holds no data", payload),
        })
    }

    /// Recompute readiness of every slot. Guard conditions observed as ready
    /// are reset. Returns whether anything is ready.
    fn refresh_readiness(&mut self, wait_set: RawHandle) -> TransportResult<bool> {
        let slots = match self.wait_sets.get(&wait_set) {
            Some(entry) => entry.slots.clone(),
            None => return Err(TransportError::InvalidHandle(wait_set)),
        };

        let mut ready: [Vec<bool>; 4] = Default::default();
        let mut any = false;
        for (flags, handles) in ready.iter_mut().zip(slots.iter()) {
            for handle in handles {
                let is_ready = self
                    .endpoints
                    .get(handle)
                    .map(EndpointEntry::is_ready)
                    .unwrap_or(false);
                any |= is_ready;
                flags.push(is_ready);
            }
        }

        if any {
            let guard_slots = &slots[Category::GuardCondition.index()];
            let guard_flags = &ready[Category::GuardCondition.index()];
            for (handle, is_ready) in guard_slots.iter().zip(guard_flags) {
                if !is_ready {
                    continue;
                }
                if let Some(EndpointEntry::GuardCondition { triggered }) =
                    self.endpoints.get_mut(handle)
                {
                    *triggered = false;
                }
            }
        }

        if let Some(entry) = self.wait_sets.get_mut(&wait_set) {
            entry.ready = ready;
        }
        Ok(any)
    }

    fn clear_readiness(&mut self, wait_set: RawHandle) {
        if let Some(entry) = self.wait_sets.get_mut(&wait_set) {
            for flags in entry.ready.iter_mut() {
                flags.iter_mut().for_each(|f| *f = false);
            }
        }
    }
}

fn check_type(expected: &str, actual: &str) -> TransportResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(TransportError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

fn validate_node_name(name: &str) -> TransportResult<()> {
    let starts_with_digit = name.chars().next().is_some_and(|c| c.is_ascii_digit());
    if name.is_empty()
        || starts_with_digit
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(TransportError::InvalidArgument(format!(
            "invalid node name `{}`",
            name
        )));
    }
    Ok(())
}

fn validate_namespace(namespace: &str) -> TransportResult<()> {
    if namespace.is_empty() || namespace == "/" {
        return Ok(());
    }
    let valid = namespace.starts_with('/')
        && namespace[1..].split('/').all(|segment| {
            !segment.is_empty()
                && !segment.starts_with(|c: char| c.is_ascii_digit())
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(TransportError::InvalidArgument(format!(
            "invalid namespace `{}`",
            namespace
        )))
    }
}

fn validate_topic(topic: &str) -> TransportResult<()> {
    if topic.is_empty() || topic.contains(char::is_whitespace) {
        return Err(TransportError::InvalidArgument(format!(
            "invalid topic or service name `{}`",
            topic
        )));
    }
    Ok(())
}

/// Process-local transport.
pub struct LoopbackTransport {
    config: LoopbackConfig,
    state: Mutex<State>,
    ready: Condvar,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::with_config(LoopbackConfig::default())
    }

    pub fn with_config(config: LoopbackConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
            ready: Condvar::new(),
        }
    }

    pub fn config(&self) -> &LoopbackConfig {
        &self.config
    }

    pub fn stats(&self) -> LoopbackStats {
        let state = self.state.lock();
        LoopbackStats {
            live_nodes: state.nodes.len(),
            live_endpoints: state.endpoints.len(),
            live_wait_sets: state.wait_sets.len(),
            live_payloads: state.payloads.len(),
            wait_sets_created: state.wait_sets_created,
            payloads_created: state.payloads_created,
            waits: state.waits,
        }
    }

    /// Fully qualified names of the live nodes.
    pub fn node_names(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state
            .nodes
            .values()
            .map(|n| match n.namespace.as_str() {
                "" | "/" => format!("/{}", n.name),
                ns => format!("{}/{}", ns, n.name),
            })
            .collect();
        names.sort();
        names
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn implementation_identifier(&self) -> &str {
        &self.config.identifier
    }

    fn init(&self) -> TransportResult<()> {
        let mut state = self.state.lock();
        if state.initialized {
            return Err(TransportError::AlreadyInitialized);
        }
        state.initialized = true;
        state.active = true;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn shutdown(&self) -> TransportResult<()> {
        let mut state = self.state.lock();
        if !state.active {
            return Err(TransportError::NotInitialized);
        }
        state.active = false;
        self.ready.notify_all();
        Ok(())
    }

    fn create_node(&self, name: &str, namespace: &str) -> TransportResult<RawHandle> {
        validate_node_name(name)?;
        validate_namespace(namespace)?;
        let mut state = self.state.lock();
        if !state.active {
            return Err(TransportError::NotInitialized);
        }
        let handle = state.allocate_handle();
        state.nodes.insert(
            handle,
            NodeEntry {
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
        );
        Ok(handle)
    }

    fn destroy_node(&self, node: RawHandle) -> TransportResult<()> {
        let mut state = self.state.lock();
        state
            .nodes
            .remove(&node)
            .map(|_| ())
            .ok_or(TransportError::InvalidHandle(node))
    }

    fn create_endpoint(
        &self,
        node: RawHandle,
        descriptor: &EndpointDescriptor<'_>,
    ) -> TransportResult<RawHandle> {
        let entry = match *descriptor {
            EndpointDescriptor::Publisher {
                topic, type_name, ..
            } => {
                validate_topic(topic)?;
                EndpointEntry::Publisher {
                    topic: topic.to_string(),
                    type_name: type_name.to_string(),
                }
            }
            EndpointDescriptor::Subscription {
                topic,
                type_name,
                qos,
            } => {
                validate_topic(topic)?;
                EndpointEntry::Subscription {
                    topic: topic.to_string(),
                    type_name: type_name.to_string(),
                    bound: qos.queue_bound(),
                    queue: VecDeque::new(),
                }
            }
            EndpointDescriptor::Service {
                service_name,
                request_type,
                response_type,
                ..
            } => {
                validate_topic(service_name)?;
                EndpointEntry::Service {
                    name: service_name.to_string(),
                    request_type: request_type.to_string(),
                    response_type: response_type.to_string(),
                    requests: VecDeque::new(),
                }
            }
            EndpointDescriptor::Client {
                service_name,
                request_type,
                response_type,
                ..
            } => {
                validate_topic(service_name)?;
                EndpointEntry::Client {
                    name: service_name.to_string(),
                    request_type: request_type.to_string(),
                    response_type: response_type.to_string(),
                    next_sequence: 1,
                    responses: VecDeque::new(),
                }
            }
            EndpointDescriptor::GuardCondition => EndpointEntry::GuardCondition { triggered: false },
        };

        let mut state = self.state.lock();
        if !state.active {
            return Err(TransportError::NotInitialized);
        }
        if !state.nodes.contains_key(&node) {
            return Err(TransportError::InvalidHandle(node));
        }
        let handle = state.allocate_handle();
        state.endpoints.insert(handle, entry);
        Ok(handle)
    }

    fn destroy_endpoint(&self, endpoint: RawHandle) -> TransportResult<()> {
        let mut state = self.state.lock();
        state
            .endpoints
            .remove(&endpoint)
            .map(|_| ())
            .ok_or(TransportError::InvalidHandle(endpoint))
    }

    fn create_wait_set(&self, capacity: WaitSetCapacity) -> TransportResult<RawHandle> {
        if capacity.total() > self.config.max_wait_set_entries {
            return Err(TransportError::ResourceExhausted(format!(
                "wait set of {} entries exceeds the limit of {}",
                capacity.total(),
                self.config.max_wait_set_entries
            )));
        }
        let mut state = self.state.lock();
        let handle = state.allocate_handle();
        state.wait_sets.insert(handle, WaitSetEntry::new(capacity));
        state.wait_sets_created += 1;
        Ok(handle)
    }

    fn destroy_wait_set(&self, wait_set: RawHandle) -> TransportResult<()> {
        let mut state = self.state.lock();
        state
            .wait_sets
            .remove(&wait_set)
            .map(|_| ())
            .ok_or(TransportError::InvalidHandle(wait_set))
    }

    fn wait_set_clear(&self, wait_set: RawHandle) -> TransportResult<()> {
        let mut state = self.state.lock();
        let entry = state
            .wait_sets
            .get_mut(&wait_set)
            .ok_or(TransportError::InvalidHandle(wait_set))?;
        entry.slots.iter_mut().for_each(Vec::clear);
        entry.ready.iter_mut().for_each(Vec::clear);
        Ok(())
    }

    fn wait_set_add(
        &self,
        wait_set: RawHandle,
        category: Category,
        endpoint: RawHandle,
    ) -> TransportResult<usize> {
        let mut state = self.state.lock();
        match state.endpoints.get(&endpoint).map(EndpointEntry::category) {
            Some(Some(actual)) if actual == category => {}
            Some(_) => {
                return Err(TransportError::InvalidArgument(format!(
                    "endpoint {} is not a {}",
                    endpoint, category
                )))
            }
            None => return Err(TransportError::InvalidHandle(endpoint)),
        }

        let entry = state
            .wait_sets
            .get_mut(&wait_set)
            .ok_or(TransportError::InvalidHandle(wait_set))?;
        let capacity = entry.capacity.get(category);
        let slots = &mut entry.slots[category.index()];
        if slots.len() >= capacity {
            return Err(TransportError::CapacityExceeded { category, capacity });
        }
        slots.push(endpoint);
        entry.ready[category.index()].push(false);
        Ok(slots.len() - 1)
    }

    fn wait(&self, wait_set: RawHandle, timeout: Timeout) -> TransportResult<WaitOutcome> {
        let deadline = match timeout {
            Timeout::Bounded(duration) => Some(Instant::now() + duration),
            Timeout::Immediate | Timeout::Infinite => None,
        };

        let mut state = self.state.lock();
        state.waits += 1;
        match state.wait_sets.get(&wait_set) {
            Some(entry) if entry.is_empty() => {
                return Err(TransportError::Failure {
                    operation: "wait",
                    message: "wait set is empty".to_string(),
                })
            }
            Some(_) => {}
            None => return Err(TransportError::InvalidHandle(wait_set)),
        }

        loop {
            if !state.active {
                trace!("transport shut down, abandoning wait");
                state.clear_readiness(wait_set);
                return Ok(WaitOutcome::TimedOut);
            }
            if state.refresh_readiness(wait_set)? {
                return Ok(WaitOutcome::Ready);
            }
            match (timeout, deadline) {
                (Timeout::Immediate, _) => return Ok(WaitOutcome::TimedOut),
                (Timeout::Bounded(_), Some(deadline)) => {
                    if Instant::now() >= deadline {
                        return Ok(WaitOutcome::TimedOut);
                    }
                    self.ready.wait_until(&mut state, deadline);
                }
                _ => self.ready.wait(&mut state),
            }
        }
    }

    fn wait_set_is_ready(&self, wait_set: RawHandle, category: Category, index: usize) -> bool {
        let state = self.state.lock();
        state
            .wait_sets
            .get(&wait_set)
            .and_then(|entry| entry.ready[category.index()].get(index).copied())
            .unwrap_or(false)
    }

    fn create_payload(&self, type_name: &str) -> TransportResult<RawHandle> {
        let mut state = self.state.lock();
        if state.payloads.len() >= self.config.max_payloads {
            return Err(TransportError::ResourceExhausted(format!(
                "payload limit of {} reached",
                self.config.max_payloads
            )));
        }
        let handle = state.allocate_handle();
        state.payloads.insert(
            handle,
            PayloadEntry {
                type_name: type_name.to_string(),
                data: None,
            },
        );
        state.payloads_created += 1;
        Ok(handle)
    }

    fn release_payload(&self, payload: RawHandle) -> TransportResult<()> {
        let mut state = self.state.lock();
        state
            .payloads
            .remove(&payload)
            .map(|_| ())
            .ok_or(TransportError::InvalidHandle(payload))
    }

    fn write_payload(&self, payload: RawHandle, bytes: &[u8]) -> TransportResult<()> {
        let mut state = self.state.lock();
        state.payload_mut(payload)?.data = Some(bytes.to_vec());
        Ok(())
    }

    fn read_payload(&self, payload: RawHandle) -> TransportResult<Vec<u8>> {
        let state = self.state.lock();
        state
            .payload(payload)?
            .data
            .clone()
            .ok_or_else(|| TransportError::Failure {
                operation: "read_payload",
                message: format!("payload {} holds no data", payload),
            })
    }

    fn publish(&self, publisher: RawHandle, payload: RawHandle) -> TransportResult<()> {
        let mut state = self.state.lock();
        let (topic, type_name) = match state.endpoints.get(&publisher) {
            Some(EndpointEntry::Publisher { topic, type_name }) => {
                (topic.clone(), type_name.clone())
            }
            _ => return Err(TransportError::InvalidHandle(publisher)),
        };
        let bytes = state.payload_bytes(payload, &type_name, "publish")?;

        let mut delivered = 0usize;
        for entry in state.endpoints.values_mut() {
            if let EndpointEntry::Subscription {
                topic: sub_topic,
                type_name: sub_type,
                bound,
                queue,
            } = entry
            {
                if *sub_topic != topic || *sub_type != type_name {
                    continue;
                }
                queue.push_back(bytes.clone());
                if let Some(bound) = bound {
                    while queue.len() > *bound {
                        queue.pop_front();
                    }
                }
                delivered += 1;
            }
        }
        trace!(%topic, delivered, "published");
        self.ready.notify_all();
        Ok(())
    }

    fn take(&self, subscription: RawHandle, payload: RawHandle) -> TransportResult<()> {
        let mut state = self.state.lock();
        let expected = match state.endpoints.get(&subscription) {
            Some(EndpointEntry::Subscription { type_name, .. }) => type_name.clone(),
            _ => return Err(TransportError::InvalidHandle(subscription)),
        };
        check_type(&expected, &state.payload(payload)?.type_name)?;

        let bytes = match state.endpoint_mut(subscription)? {
            EndpointEntry::Subscription { queue, .. } => queue.pop_front(),
            _ => None,
        };
        let bytes = bytes.ok_or(TransportError::WouldBlock(Category::Subscription))?;
        state.payload_mut(payload)?.data = Some(bytes);
        Ok(())
    }

    fn take_request(
        &self,
        service: RawHandle,
        token: &mut CorrelationToken,
        payload: RawHandle,
    ) -> TransportResult<()> {
        let mut state = self.state.lock();
        let expected = match state.endpoints.get(&service) {
            Some(EndpointEntry::Service { request_type, .. }) => request_type.clone(),
            _ => return Err(TransportError::InvalidHandle(service)),
        };
        check_type(&expected, &state.payload(payload)?.type_name)?;

        let queued = match state.endpoint_mut(service)? {
            EndpointEntry::Service { requests, .. } => requests.pop_front(),
            _ => None,
        };
        let (header, bytes) = queued.ok_or(TransportError::WouldBlock(Category::Service))?;
        state.payload_mut(payload)?.data = Some(bytes);
        token.fill(header);
        Ok(())
    }

    fn send_response(
        &self,
        service: RawHandle,
        token: &CorrelationToken,
        payload: RawHandle,
    ) -> TransportResult<()> {
        let header = token.header().ok_or_else(|| {
            TransportError::InvalidArgument("correlation token holds no request".to_string())
        })?;

        let mut state = self.state.lock();
        let (name, response_type) = match state.endpoints.get(&service) {
            Some(EndpointEntry::Service {
                name,
                response_type,
                ..
            }) => (name.clone(), response_type.clone()),
            _ => return Err(TransportError::InvalidHandle(service)),
        };
        let bytes = state.payload_bytes(payload, &response_type, "send_response")?;

        match state.endpoints.get_mut(&RawHandle(header.writer_guid)) {
            Some(EndpointEntry::Client {
                name: client_name,
                responses,
                ..
            }) if *client_name == name => {
                responses.push_back((header, bytes));
                self.ready.notify_all();
            }
            _ => debug!(
                service = %name,
                sequence_number = header.sequence_number,
                "requester is gone, dropping response"
            ),
        }
        Ok(())
    }

    fn send_request(&self, client: RawHandle, payload: RawHandle) -> TransportResult<i64> {
        let mut state = self.state.lock();
        let (name, request_type, response_type) = match state.endpoints.get(&client) {
            Some(EndpointEntry::Client {
                name,
                request_type,
                response_type,
                ..
            }) => (name.clone(), request_type.clone(), response_type.clone()),
            _ => return Err(TransportError::InvalidHandle(client)),
        };
        let bytes = state.payload_bytes(payload, &request_type, "send_request")?;

        let sequence_number = match state.endpoint_mut(client)? {
            EndpointEntry::Client { next_sequence, .. } => {
                let sequence_number = *next_sequence;
                *next_sequence += 1;
                sequence_number
            }
            _ => return Err(TransportError::InvalidHandle(client)),
        };
        let header = RequestHeader {
            writer_guid: client.0,
            sequence_number,
        };

        for entry in state.endpoints.values_mut() {
            if let EndpointEntry::Service {
                name: service_name,
                request_type: service_request,
                response_type: service_response,
                requests,
            } = entry
            {
                if *service_name == name
                    && *service_request == request_type
                    && *service_response == response_type
                {
                    requests.push_back((header, bytes.clone()));
                }
            }
        }
        self.ready.notify_all();
        Ok(sequence_number)
    }

    fn take_response(
        &self,
        client: RawHandle,
        token: &mut CorrelationToken,
        payload: RawHandle,
    ) -> TransportResult<()> {
        let mut state = self.state.lock();
        let expected = match state.endpoints.get(&client) {
            Some(EndpointEntry::Client { response_type, .. }) => response_type.clone(),
            _ => return Err(TransportError::InvalidHandle(client)),
        };
        check_type(&expected, &state.payload(payload)?.type_name)?;

        let queued = match state.endpoint_mut(client)? {
            EndpointEntry::Client { responses, .. } => responses.pop_front(),
            _ => None,
        };
        let (header, bytes) = queued.ok_or(TransportError::WouldBlock(Category::Client))?;
        state.payload_mut(payload)?.data = Some(bytes);
        token.fill(header);
        Ok(())
    }

    fn service_is_available(&self, client: RawHandle) -> TransportResult<bool> {
        let state = self.state.lock();
        let name = match state.endpoints.get(&client) {
            Some(EndpointEntry::Client { name, .. }) => name,
            _ => return Err(TransportError::InvalidHandle(client)),
        };
        Ok(state.endpoints.values().any(|entry| {
            matches!(entry, EndpointEntry::Service { name: service_name, .. } if service_name == name)
        }))
    }

    fn trigger_guard_condition(&self, guard_condition: RawHandle) -> TransportResult<()> {
        let mut state = self.state.lock();
        match state.endpoint_mut(guard_condition)? {
            EndpointEntry::GuardCondition { triggered } => *triggered = true,
            _ => {
                return Err(TransportError::InvalidArgument(format!(
                    "endpoint {} is not a guard condition",
                    guard_condition
                )))
            }
        }
        self.ready.notify_all();
        Ok(())
    }
}
