//! Transport boundary
//!
//! The reactor never talks to a middleware directly. Everything it needs is
//! expressed by the [`Transport`] trait: resource creation and destruction,
//! wait-set primitives, and the take/send operations on opaque payload buffers.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      TRANSPORT BOUNDARY                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  lifecycle:  init / is_active / shutdown                     │
//! │  resources:  node, endpoint, wait set, payload (RawHandle)   │
//! │  wait set:   clear / add / wait / is_ready                   │
//! │  data:       publish / take / take_request / send_response / │
//! │              send_request / take_response                    │
//! │  signal:     trigger_guard_condition (any thread)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`loopback::LoopbackTransport`] is the in-process implementation used by
//! tests, benches and the demo binary.

pub mod loopback;

pub use loopback::{LoopbackConfig, LoopbackStats, LoopbackTransport};

use crate::error::TransportResult;
use crate::qos::QosProfile;
use crate::reactor::CorrelationToken;
use std::fmt;
use std::time::Duration;

/// Opaque identity of a transport-owned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(pub u64);

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Wait-set category of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Subscription,
    Service,
    Client,
    GuardCondition,
}

impl Category {
    /// Dispatch order used by every spin cycle.
    pub const ALL: [Category; 4] = [
        Category::Subscription,
        Category::Service,
        Category::Client,
        Category::GuardCondition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Subscription => "subscription",
            Category::Service => "service",
            Category::Client => "client",
            Category::GuardCondition => "guard condition",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Category::Subscription => 0,
            Category::Service => 1,
            Category::Client => 2,
            Category::GuardCondition => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category slot counts of a wait set.
///
/// Timers and events have no slots: they are not supported by the reactor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WaitSetCapacity {
    pub subscriptions: usize,
    pub services: usize,
    pub clients: usize,
    pub guard_conditions: usize,
}

impl WaitSetCapacity {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Subscription => self.subscriptions,
            Category::Service => self.services,
            Category::Client => self.clients,
            Category::GuardCondition => self.guard_conditions,
        }
    }

    pub fn total(&self) -> usize {
        self.subscriptions + self.services + self.clients + self.guard_conditions
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// How long a wait may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Check readiness and return.
    Immediate,
    Bounded(Duration),
    Infinite,
}

impl Timeout {
    /// Zero returns immediately, negative blocks indefinitely.
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            0 => Timeout::Immediate,
            m if m < 0 => Timeout::Infinite,
            m => Timeout::Bounded(Duration::from_millis(m as u64)),
        }
    }

    /// Nanosecond form used by native wait calls (`-1` for infinite).
    pub fn as_nanos(&self) -> i64 {
        match self {
            Timeout::Immediate => 0,
            Timeout::Bounded(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
            Timeout::Infinite => -1,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Timeout::Immediate
        } else {
            Timeout::Bounded(duration)
        }
    }
}

/// Result of a wait call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
}

/// Identifies one request of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHeader {
    /// Identity of the requesting client.
    pub writer_guid: u64,
    pub sequence_number: i64,
}

/// What to create with [`Transport::create_endpoint`].
#[derive(Debug, Clone, Copy)]
pub enum EndpointDescriptor<'a> {
    Publisher {
        topic: &'a str,
        type_name: &'a str,
        qos: &'a QosProfile,
    },
    Subscription {
        topic: &'a str,
        type_name: &'a str,
        qos: &'a QosProfile,
    },
    Service {
        service_name: &'a str,
        request_type: &'a str,
        response_type: &'a str,
        qos: &'a QosProfile,
    },
    Client {
        service_name: &'a str,
        request_type: &'a str,
        response_type: &'a str,
        qos: &'a QosProfile,
    },
    GuardCondition,
}

impl EndpointDescriptor<'_> {
    /// Wait-set category, `None` for publishers.
    pub fn category(&self) -> Option<Category> {
        match self {
            EndpointDescriptor::Publisher { .. } => None,
            EndpointDescriptor::Subscription { .. } => Some(Category::Subscription),
            EndpointDescriptor::Service { .. } => Some(Category::Service),
            EndpointDescriptor::Client { .. } => Some(Category::Client),
            EndpointDescriptor::GuardCondition => Some(Category::GuardCondition),
        }
    }
}

/// Capability interface of the middleware.
///
/// Every call returns immediately except [`Transport::wait`]. Only
/// [`Transport::trigger_guard_condition`] is meant to be called from threads
/// other than the one spinning.
pub trait Transport: Send + Sync {
    /// Name of the middleware implementation.
    fn implementation_identifier(&self) -> &str;

    fn init(&self) -> TransportResult<()>;

    fn is_active(&self) -> bool;

    /// Deactivate the transport and wake every blocked wait.
    fn shutdown(&self) -> TransportResult<()>;

    fn create_node(&self, name: &str, namespace: &str) -> TransportResult<RawHandle>;

    fn destroy_node(&self, node: RawHandle) -> TransportResult<()>;

    fn create_endpoint(&self, node: RawHandle, descriptor: &EndpointDescriptor<'_>)
        -> TransportResult<RawHandle>;

    fn destroy_endpoint(&self, endpoint: RawHandle) -> TransportResult<()>;

    fn create_wait_set(&self, capacity: WaitSetCapacity) -> TransportResult<RawHandle>;

    fn destroy_wait_set(&self, wait_set: RawHandle) -> TransportResult<()>;

    fn wait_set_clear(&self, wait_set: RawHandle) -> TransportResult<()>;

    /// Append `endpoint` to the next free slot of `category`, returning its index.
    fn wait_set_add(
        &self,
        wait_set: RawHandle,
        category: Category,
        endpoint: RawHandle,
    ) -> TransportResult<usize>;

    fn wait(&self, wait_set: RawHandle, timeout: Timeout) -> TransportResult<WaitOutcome>;

    /// Out-of-range indices report `false`.
    fn wait_set_is_ready(&self, wait_set: RawHandle, category: Category, index: usize) -> bool;

    /// Allocate an empty payload buffer shaped for `type_name`.
    fn create_payload(&self, type_name: &str) -> TransportResult<RawHandle>;

    fn release_payload(&self, payload: RawHandle) -> TransportResult<()>;

    fn write_payload(&self, payload: RawHandle, bytes: &[u8]) -> TransportResult<()>;

    fn read_payload(&self, payload: RawHandle) -> TransportResult<Vec<u8>>;

    fn publish(&self, publisher: RawHandle, payload: RawHandle) -> TransportResult<()>;

    /// Move the oldest queued message into `payload`.
    fn take(&self, subscription: RawHandle, payload: RawHandle) -> TransportResult<()>;

    /// Move the oldest queued request into `payload`, recording its header in `token`.
    fn take_request(
        &self,
        service: RawHandle,
        token: &mut CorrelationToken,
        payload: RawHandle,
    ) -> TransportResult<()>;

    /// Send `payload` to the requester identified by `token`.
    fn send_response(
        &self,
        service: RawHandle,
        token: &CorrelationToken,
        payload: RawHandle,
    ) -> TransportResult<()>;

    /// Send a request, returning its sequence number.
    fn send_request(&self, client: RawHandle, payload: RawHandle) -> TransportResult<i64>;

    fn take_response(
        &self,
        client: RawHandle,
        token: &mut CorrelationToken,
        payload: RawHandle,
    ) -> TransportResult<()>;

    fn service_is_available(&self, client: RawHandle) -> TransportResult<bool>;

    fn trigger_guard_condition(&self, guard_condition: RawHandle) -> TransportResult<()>;
}
