//! Shopify webhook signatures.
//!
//! Shopify signs every webhook delivery with the app's shared secret (`PTS_SHOPIFY_HMAC_SECRET`). The signature is the
//! base64-encoded HMAC-SHA256 of the raw request body and arrives in the `X-Shopify-Hmac-SHA256` header.
//!
//! The middleware buffers the body, checks the signature and puts the body back for the inner service. A delivery
//! with a missing, malformed or wrong signature is answered with 403 and never reaches a handler. Setting
//! `PTS_SHOPIFY_HMAC_CHECKS=false` turns the check off for local testing.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ResponseError,
    http::{
        header::{ContentType, HeaderValue},
        StatusCode,
    },
    web,
    Error,
    HttpResponse,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use pts_common::Secret;
use thiserror::Error;

use crate::helpers::verify_hmac;

pub const SHOPIFY_HMAC_HEADER: &str = "X-Shopify-Hmac-SHA256";

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("The webhook is not signed.")]
    Missing,
    #[error("The webhook signature is not valid base64.")]
    Malformed,
    #[error("The webhook signature does not match its body.")]
    Mismatch,
    #[error("Could not read the webhook body. {0}")]
    UnreadableBody(String),
}

impl ResponseError for SignatureError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnreadableBody(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

/// Checks the value of a delivery's `X-Shopify-Hmac-SHA256` header against its raw body.
pub fn verify_webhook_signature(
    secret: &Secret<String>,
    header: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let signature = header
        .to_str()
        .ok()
        .and_then(|v| base64::decode(v.trim()).ok())
        .ok_or(SignatureError::Malformed)?;
    if verify_hmac(secret.reveal(), body, &signature) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

pub struct ShopifySignatureFactory {
    secret: Secret<String>,
    enabled: bool,
}

impl ShopifySignatureFactory {
    pub fn new(secret: Secret<String>, enabled: bool) -> Self {
        Self { secret, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ShopifySignatureFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = ShopifySignatureService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ShopifySignatureService {
            secret: self.secret.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct ShopifySignatureService<S> {
    secret: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ShopifySignatureService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            if !enabled {
                trace!("🔐️ Webhook signature checks are disabled. Allowing {}", req.path());
                return service.call(req).await;
            }
            let body = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Could not read the body of {}. {e}", req.path());
                SignatureError::UnreadableBody(e.to_string())
            })?;
            if let Err(e) = verify_webhook_signature(&secret, req.headers().get(SHOPIFY_HMAC_HEADER), &body) {
                warn!("🔐️ Rejected webhook to {}. {e}", req.path());
                return Err(e.into());
            }
            trace!("🔐️ Webhook signature for {} ✅️", req.path());
            req.set_payload(replay_body(body));
            service.call(req).await
        })
    }
}

/// Hands the buffered body back to the request so the handler can read it again.
fn replay_body(body: web::Bytes) -> Payload {
    let (_, mut payload) = h1::Payload::create(true);
    payload.unread_data(body);
    Payload::from(payload)
}

#[cfg(test)]
mod test {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    use super::*;

    const BODY: &[u8] = br##"{"id":5734224806100,"name":"#1001"}"##;

    fn secret() -> Secret<String> {
        Secret::from("webhook-signing-secret")
    }

    fn shopify_header(secret: &str, body: &[u8]) -> HeaderValue {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        HeaderValue::from_str(&base64::encode(mac.finalize().into_bytes())).unwrap()
    }

    #[test]
    fn valid_signatures_are_accepted() {
        let header = shopify_header("webhook-signing-secret", BODY);
        assert!(verify_webhook_signature(&secret(), Some(&header), BODY).is_ok());
    }

    #[test]
    fn each_failure_is_reported_separately() {
        let err = verify_webhook_signature(&secret(), None, BODY).unwrap_err();
        assert!(matches!(err, SignatureError::Missing));

        let garbage = HeaderValue::from_static("not base64 at all!");
        let err = verify_webhook_signature(&secret(), Some(&garbage), BODY).unwrap_err();
        assert!(matches!(err, SignatureError::Malformed));

        let other_key = shopify_header("someone-else", BODY);
        let err = verify_webhook_signature(&secret(), Some(&other_key), BODY).unwrap_err();
        assert!(matches!(err, SignatureError::Mismatch));

        let header = shopify_header("webhook-signing-secret", BODY);
        let err = verify_webhook_signature(&secret(), Some(&header), br#"{"id":1}"#).unwrap_err();
        assert!(matches!(err, SignatureError::Mismatch));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn hex_signatures_are_not_accepted() {
        // Shopify sends base64. A hex digest of the right value must not pass.
        let mut mac = Hmac::<Sha256>::new_from_slice(b"webhook-signing-secret").unwrap();
        mac.update(BODY);
        let hex = mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect::<String>();
        let header = HeaderValue::from_str(&hex).unwrap();
        assert!(verify_webhook_signature(&secret(), Some(&header), BODY).is_err());
    }
}
