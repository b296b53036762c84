use super::{EndpointHandle, EndpointId, PayloadHandle, ServiceBase};
use crate::error::{CallbackError, RclError, RclResult};
use crate::message::{Message, ServiceType};
use crate::qos::QosProfile;
use crate::transport::{Category, EndpointDescriptor, RawHandle, Transport};
use std::sync::Arc;

type RequestHandler<S> = Box<
    dyn FnMut(<S as ServiceType>::Request, &mut <S as ServiceType>::Response) -> Result<(), CallbackError>
        + Send,
>;

/// Answers requests of service type `S`.
///
/// The handler receives the decoded request and a default-initialized response
/// which it fills in place.
pub struct Service<S: ServiceType> {
    handle: EndpointHandle,
    service_name: String,
    handler: RequestHandler<S>,
}

impl<S: ServiceType> Service<S> {
    pub(crate) fn create<F>(
        transport: &Arc<dyn Transport>,
        node: RawHandle,
        service_name: &str,
        qos: &QosProfile,
        handler: F,
    ) -> RclResult<Self>
    where
        F: FnMut(S::Request, &mut S::Response) -> Result<(), CallbackError> + Send + 'static,
    {
        let descriptor = EndpointDescriptor::Service {
            service_name,
            request_type: S::Request::TYPE_NAME,
            response_type: S::Response::TYPE_NAME,
            qos,
        };
        Ok(Self {
            handle: EndpointHandle::create(transport, node, &descriptor)?,
            service_name: service_name.to_string(),
            handler: Box::new(handler),
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl<S: ServiceType> ServiceBase for Service<S> {
    fn id(&self) -> EndpointId {
        EndpointId::new(Category::Service, self.handle.raw())
    }

    fn request_type(&self) -> &'static str {
        S::Request::TYPE_NAME
    }

    fn response_type(&self) -> &'static str {
        S::Response::TYPE_NAME
    }

    fn handle_request(
        &mut self,
        request: &PayloadHandle<'_>,
        response: &PayloadHandle<'_>,
    ) -> RclResult<()> {
        let decoded: S::Request = request.read()?;
        let mut answer = S::Response::default();
        (self.handler)(decoded, &mut answer).map_err(|source| RclError::Callback {
            category: Category::Service,
            source,
        })?;
        response.write(&answer)
    }
}
