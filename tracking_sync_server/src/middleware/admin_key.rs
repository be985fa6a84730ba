//! API key middleware for the administration endpoints.
//!
//! Requests must carry `Authorization: Bearer <key>`, where the key is `PTS_ADMIN_API_KEY`. Anything else is answered
//! with 401 Unauthorized.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::{trace, warn};
use pts_common::Secret;
use subtle::ConstantTimeEq;

use crate::errors::ServerError;

pub struct AdminKeyMiddlewareFactory {
    key: Secret<String>,
}

impl AdminKeyMiddlewareFactory {
    pub fn new(key: Secret<String>) -> Self {
        AdminKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) })
    }
}

pub struct AdminKeyMiddlewareService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authorized = is_authorized(&req, &self.key);
        Box::pin(async move {
            if authorized {
                trace!("🔐️ Admin key accepted for {}", req.path());
                service.call(req).await
            } else {
                warn!("🔐️ Missing or invalid admin key for {}", req.path());
                Err(ServerError::Unauthorized.into())
            }
        })
    }
}

fn is_authorized(req: &ServiceRequest, key: &Secret<String>) -> bool {
    if key.is_empty() {
        return false;
    }
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| bool::from(token.trim().as_bytes().ct_eq(key.reveal().as_bytes())))
        .unwrap_or(false)
}
