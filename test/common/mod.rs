//! Shared helpers for the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use rclspin::error::TransportResult;
use rclspin::reactor::CorrelationToken;
use rclspin::transport::{
    Category, EndpointDescriptor, LoopbackStats, LoopbackTransport, RawHandle, Timeout, Transport,
    WaitOutcome, WaitSetCapacity,
};
use rclspin::{Context, ReactorConfig, RetCode, TransportError};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Loopback transport that records what the reactor asks of it.
#[derive(Default)]
pub struct RecordingTransport {
    inner: LoopbackTransport,
    pub capacities: Mutex<Vec<WaitSetCapacity>>,
    pub slots: Mutex<Vec<(Category, usize)>>,
    pub created_payloads: Mutex<Vec<RawHandle>>,
    pub released_payloads: Mutex<Vec<RawHandle>>,
    pub taken_requests: Mutex<Vec<i64>>,
    pub sent_responses: Mutex<Vec<i64>>,
    /// Native status every take reports instead of reaching the loopback.
    /// `RetCode::Ok` lets takes through.
    pub take_status: AtomicI32,
}

impl RecordingTransport {
    pub fn stats(&self) -> LoopbackStats {
        self.inner.stats()
    }

    pub fn set_take_status(&self, code: RetCode) {
        self.take_status.store(code.as_raw(), Ordering::SeqCst);
    }

    fn check_take_status(&self, operation: &'static str) -> TransportResult<()> {
        match self.take_status.load(Ordering::SeqCst) {
            0 => Ok(()),
            code => Err(TransportError::from_code(code, operation, "injected status")),
        }
    }
}

impl Transport for RecordingTransport {
    fn implementation_identifier(&self) -> &str {
        self.inner.implementation_identifier()
    }

    fn init(&self) -> TransportResult<()> {
        self.inner.init()
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn shutdown(&self) -> TransportResult<()> {
        self.inner.shutdown()
    }

    fn create_node(&self, name: &str, namespace: &str) -> TransportResult<RawHandle> {
        self.inner.create_node(name, namespace)
    }

    fn destroy_node(&self, node: RawHandle) -> TransportResult<()> {
        self.inner.destroy_node(node)
    }

    fn create_endpoint(
        &self,
        node: RawHandle,
        descriptor: &EndpointDescriptor<'_>,
    ) -> TransportResult<RawHandle> {
        self.inner.create_endpoint(node, descriptor)
    }

    fn destroy_endpoint(&self, endpoint: RawHandle) -> TransportResult<()> {
        self.inner.destroy_endpoint(endpoint)
    }

    fn create_wait_set(&self, capacity: WaitSetCapacity) -> TransportResult<RawHandle> {
        self.capacities.lock().push(capacity);
        self.inner.create_wait_set(capacity)
    }

    fn destroy_wait_set(&self, wait_set: RawHandle) -> TransportResult<()> {
        self.inner.destroy_wait_set(wait_set)
    }

    fn wait_set_clear(&self, wait_set: RawHandle) -> TransportResult<()> {
        self.slots.lock().clear();
        self.inner.wait_set_clear(wait_set)
    }

    fn wait_set_add(
        &self,
        wait_set: RawHandle,
        category: Category,
        endpoint: RawHandle,
    ) -> TransportResult<usize> {
        let index = self.inner.wait_set_add(wait_set, category, endpoint)?;
        self.slots.lock().push((category, index));
        Ok(index)
    }

    fn wait(&self, wait_set: RawHandle, timeout: Timeout) -> TransportResult<WaitOutcome> {
        self.inner.wait(wait_set, timeout)
    }

    fn wait_set_is_ready(&self, wait_set: RawHandle, category: Category, index: usize) -> bool {
        self.inner.wait_set_is_ready(wait_set, category, index)
    }

    fn create_payload(&self, type_name: &str) -> TransportResult<RawHandle> {
        let payload = self.inner.create_payload(type_name)?;
        self.created_payloads.lock().push(payload);
        Ok(payload)
    }

    fn release_payload(&self, payload: RawHandle) -> TransportResult<()> {
        self.released_payloads.lock().push(payload);
        self.inner.release_payload(payload)
    }

    fn write_payload(&self, payload: RawHandle, bytes: &[u8]) -> TransportResult<()> {
        self.inner.write_payload(payload, bytes)
    }

    fn read_payload(&self, payload: RawHandle) -> TransportResult<Vec<u8>> {
        self.inner.read_payload(payload)
    }

    fn publish(&self, publisher: RawHandle, payload: RawHandle) -> TransportResult<()> {
        self.inner.publish(publisher, payload)
    }

    fn take(&self, subscription: RawHandle, payload: RawHandle) -> TransportResult<()> {
        self.check_take_status("take")?;
        self.inner.take(subscription, payload)
    }

    fn take_request(
        &self,
        service: RawHandle,
        token: &mut CorrelationToken,
        payload: RawHandle,
    ) -> TransportResult<()> {
        self.check_take_status("take_request")?;
        self.inner.take_request(service, token, payload)?;
        if let Some(sequence_number) = token.sequence_number() {
            self.taken_requests.lock().push(sequence_number);
        }
        Ok(())
    }

    fn send_response(
        &self,
        service: RawHandle,
        token: &CorrelationToken,
        payload: RawHandle,
    ) -> TransportResult<()> {
        if let Some(sequence_number) = token.sequence_number() {
            self.sent_responses.lock().push(sequence_number);
        }
        self.inner.send_response(service, token, payload)
    }

    fn send_request(&self, client: RawHandle, payload: RawHandle) -> TransportResult<i64> {
        self.inner.send_request(client, payload)
    }

    fn take_response(
        &self,
        client: RawHandle,
        token: &mut CorrelationToken,
        payload: RawHandle,
    ) -> TransportResult<()> {
        self.check_take_status("take_response")?;
        self.inner.take_response(client, token, payload)
    }

    fn service_is_available(&self, client: RawHandle) -> TransportResult<bool> {
        self.inner.service_is_available(client)
    }

    fn trigger_guard_condition(&self, guard_condition: RawHandle) -> TransportResult<()> {
        self.inner.trigger_guard_condition(guard_condition)
    }
}

/// Context over a recording transport, plus the transport itself for inspection.
pub fn recording_context() -> (Context, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let context = Context::new(transport.clone());
    (context, transport)
}

/// Context over a plain loopback transport, plus the transport for stats.
pub fn loopback_context() -> (Context, Arc<LoopbackTransport>) {
    let transport = Arc::new(LoopbackTransport::new());
    let context = Context::with_config(transport.clone(), ReactorConfig::default());
    (context, transport)
}
