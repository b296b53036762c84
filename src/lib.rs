//! rclspin - Wait-Set Reactor for Publish/Subscribe Client Libraries
//!
//! The runtime core of a client library binding: a single-threaded reactor
//! that multiplexes readiness across subscriptions, services, clients and
//! guard conditions, and correlates RPC responses with their requests.
//!
//! # Features
//!
//! - **Ephemeral wait sets**: built, populated and destroyed every cycle, sized
//!   exactly to the registered endpoints
//! - **Stable dispatch order**: subscriptions, then services, then clients,
//!   then guard conditions
//! - **Request correlation**: a per-cycle token carries the sequence number
//!   from request take to response send, and keys client response handlers
//! - **Scoped resources**: payloads, wait sets, endpoints and nodes are RAII
//!   handles released on every exit path, including failing callbacks
//! - **Pluggable transport**: everything goes through the [`Transport`] trait;
//!   [`LoopbackTransport`] runs it all in-process
//!
//! # Example
//!
//! ```rust
//! use rclspin::interfaces::AddTwoInts;
//! use rclspin::{Context, ReactorConfig, SpinOutcome};
//! use std::sync::{Arc, Mutex};
//!
//! let context = Context::loopback(ReactorConfig::default());
//! let mut node = context.create_node("adder", "").unwrap();
//!
//! node.create_service::<AddTwoInts, _>("add_two_ints", |request, response| {
//!     response.sum = request.a + request.b;
//!     Ok(())
//! })
//! .unwrap();
//! let client = node.create_client::<AddTwoInts>("add_two_ints").unwrap();
//!
//! let sum = Arc::new(Mutex::new(None));
//! let slot = Arc::clone(&sum);
//! let request = rclspin::interfaces::AddTwoIntsRequest { a: 2, b: 3 };
//! client
//!     .send_request(&request, move |response| {
//!         *slot.lock().unwrap() = Some(response.sum);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // First cycle answers the request, second delivers the response.
//! rclspin::spin_once(&mut node, 100).unwrap();
//! let outcome = rclspin::spin_once(&mut node, 100).unwrap();
//! assert!(matches!(outcome, SpinOutcome::Dispatched(_)));
//! assert_eq!(*sum.lock().unwrap(), Some(5));
//! ```

pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod interfaces;
pub mod message;
pub mod node;
pub mod qos;
pub mod reactor;
pub mod transport;

pub use config::{ConfigError, ReactorConfig};
pub use context::Context;
pub use endpoint::{Client, EndpointId, GuardConditionTrigger, Publisher};
pub use error::{CallbackError, RclError, RclResult, RetCode, TransportError};
pub use message::{Message, ServiceType};
pub use node::Node;
pub use qos::QosProfile;
pub use reactor::{DispatchSummary, SpinOutcome};
pub use transport::{LoopbackTransport, Timeout, Transport};

/// Spin `node` until its transport shuts down.
pub fn spin(node: &mut Node) -> RclResult<()> {
    node.spin()
}

/// Run exactly one cycle on `node`.
///
/// A zero timeout polls, a negative one blocks until something is ready.
pub fn spin_once(node: &mut Node, timeout_ms: i64) -> RclResult<SpinOutcome> {
    node.spin_once(Timeout::from_millis(timeout_ms))
}
