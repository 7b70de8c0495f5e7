//! Callback-token middleware for Actix Web.
//!
//! The payment provider attaches a static shared secret to every webhook delivery in the `x-callback-token`
//! header. This middleware rejects any request on the wrapped scope whose header is absent or does not match the
//! configured token, before the body is ever parsed or any order is looked up.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorForbidden,
    Error,
};
use cpg_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

pub struct CallbackTokenMiddlewareFactory {
    token_header: String,
    token: Secret<String>,
}

impl CallbackTokenMiddlewareFactory {
    pub fn new(token_header: &str, token: Secret<String>) -> Self {
        CallbackTokenMiddlewareFactory { token_header: token_header.into(), token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CallbackTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = CallbackTokenMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CallbackTokenMiddlewareService {
            token_header: self.token_header.clone(),
            token: self.token.clone(),
            service: Rc::new(service),
        }))
    }
}

pub struct CallbackTokenMiddlewareService<S> {
    token_header: String,
    token: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for CallbackTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let expected = self.token.reveal().clone();
        let token_header = self.token_header.clone();
        Box::pin(async move {
            trace!("🔐️ Checking callback token for request");
            let provided = req.headers().get(&token_header).ok_or_else(|| {
                warn!("🔐️ No callback token found in request. Denying access.");
                ErrorForbidden("No callback token found.")
            })?;
            if provided.as_bytes() == expected.as_bytes() {
                trace!("🔐️ Callback token check for request ✅️");
                service.call(req).await
            } else {
                warn!("🔐️ Invalid callback token found in request. Denying access.");
                Err(ErrorForbidden("Invalid callback token."))
            }
        })
    }
}
