use super::{ClientBase, EndpointHandle, EndpointId, PayloadHandle};
use crate::error::{CallbackError, RclError, RclResult};
use crate::message::{Message, ServiceType};
use crate::qos::QosProfile;
use crate::transport::{Category, EndpointDescriptor, RawHandle, Transport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

type ResponseHandler<S> =
    Box<dyn FnOnce(<S as ServiceType>::Response) -> Result<(), CallbackError> + Send>;

struct ClientInner<S: ServiceType> {
    handle: EndpointHandle,
    service_name: String,
    pending: Mutex<HashMap<i64, ResponseHandler<S>>>,
}

/// Sends requests of service type `S` and routes each response to the
/// handler registered when the request was sent.
///
/// Cloning is cheap: the node keeps one clone for dispatch, the application
/// keeps others to send requests.
pub struct Client<S: ServiceType> {
    inner: Arc<ClientInner<S>>,
}

impl<S: ServiceType> Clone for Client<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ServiceType> Client<S> {
    pub(crate) fn create(
        transport: &Arc<dyn Transport>,
        node: RawHandle,
        service_name: &str,
        qos: &QosProfile,
    ) -> RclResult<Self> {
        let descriptor = EndpointDescriptor::Client {
            service_name,
            request_type: S::Request::TYPE_NAME,
            response_type: S::Response::TYPE_NAME,
            qos,
        };
        Ok(Self {
            inner: Arc::new(ClientInner {
                handle: EndpointHandle::create(transport, node, &descriptor)?,
                service_name: service_name.to_string(),
                pending: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn id(&self) -> EndpointId {
        self.inner.id()
    }

    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// Send `request` and register `on_response` for its answer.
    ///
    /// Returns the sequence number assigned by the transport. The handler runs
    /// inside the spin cycle that takes the matching response.
    pub fn send_request<F>(&self, request: &S::Request, on_response: F) -> RclResult<i64>
    where
        F: FnOnce(S::Response) -> Result<(), CallbackError> + Send + 'static,
    {
        let transport = self.inner.handle.transport();
        let payload = PayloadHandle::acquire(transport, S::Request::TYPE_NAME)?;
        payload.write(request)?;

        // Held across the send so a response can never be dispatched before
        // its handler is registered.
        let mut pending = self.inner.pending.lock();
        let sequence_number = transport.send_request(self.inner.handle.raw(), payload.raw())?;
        pending.insert(sequence_number, Box::new(on_response));
        trace!(service = %self.inner.service_name, sequence_number, "request sent");
        Ok(sequence_number)
    }

    /// Number of requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub fn service_is_available(&self) -> RclResult<bool> {
        Ok(self
            .inner
            .handle
            .transport()
            .service_is_available(self.inner.handle.raw())?)
    }

    pub(crate) fn dispatcher(&self) -> Arc<dyn ClientBase> {
        self.inner.clone()
    }
}

impl<S: ServiceType> ClientBase for ClientInner<S> {
    fn id(&self) -> EndpointId {
        EndpointId::new(Category::Client, self.handle.raw())
    }

    fn response_type(&self) -> &'static str {
        S::Response::TYPE_NAME
    }

    fn handle_response(
        &self,
        sequence_number: i64,
        response: &PayloadHandle<'_>,
    ) -> RclResult<()> {
        let handler = self.pending.lock().remove(&sequence_number);
        let Some(handler) = handler else {
            debug!(
                service = %self.service_name,
                sequence_number,
                "no pending request for response, dropping it"
            );
            return Ok(());
        };
        let decoded: S::Response = response.read().map_err(|e| {
            debug!(
                service = %self.service_name,
                sequence_number,
                error = %e,
                "response could not be decoded, pending request dropped"
            );
            e
        })?;
        handler(decoded).map_err(|source| RclError::Callback {
            category: Category::Client,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{AddTwoInts, AddTwoIntsRequest, AddTwoIntsResponse};
    use crate::transport::LoopbackTransport;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn setup() -> (Arc<dyn Transport>, Client<AddTwoInts>) {
        let loopback = Arc::new(LoopbackTransport::new());
        loopback.init().unwrap();
        let transport: Arc<dyn Transport> = loopback;
        let node = transport.create_node("client_test", "").unwrap();
        let client =
            Client::<AddTwoInts>::create(&transport, node, "add_two_ints", &QosProfile::default())
                .unwrap();
        (transport, client)
    }

    #[test]
    fn test_response_runs_pending_handler_once() {
        let (transport, client) = setup();
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let sequence_number = client
            .send_request(&AddTwoIntsRequest { a: 2, b: 3 }, move |response| {
                assert_eq!(response.sum, 5);
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        assert_eq!(client.pending_requests(), 1);

        let payload = PayloadHandle::acquire(&*transport, AddTwoIntsResponse::TYPE_NAME).unwrap();
        payload.write(&AddTwoIntsResponse { sum: 5 }).unwrap();
        let dispatch = client.dispatcher();
        dispatch.handle_response(sequence_number, &payload).unwrap();
        assert!(called.load(Ordering::SeqCst));
        assert_eq!(client.pending_requests(), 0);

        // A duplicate finds no handler and is dropped.
        dispatch.handle_response(sequence_number, &payload).unwrap();
    }

    #[test]
    fn test_undecodable_response_surfaces_error() {
        let (transport, client) = setup();
        let sequence_number = client
            .send_request(&AddTwoIntsRequest { a: 1, b: 1 }, |_| {
                Err("handler must not run".into())
            })
            .unwrap();

        let payload = PayloadHandle::acquire(&*transport, AddTwoIntsResponse::TYPE_NAME).unwrap();
        transport.write_payload(payload.raw(), b"not json").unwrap();
        let err = client
            .dispatcher()
            .handle_response(sequence_number, &payload)
            .unwrap_err();
        assert!(matches!(err, RclError::Decode { .. }));
        assert_eq!(client.pending_requests(), 0);
    }
}
