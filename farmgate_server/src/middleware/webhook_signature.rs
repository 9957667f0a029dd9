//! Webhook signature middleware for Actix Web.
//!
//! Payment providers authenticate their webhook calls in different ways:
//! * Paystack sends an HMAC-SHA512 of the raw request body, keyed with the merchant's secret key, in the
//!   `x-paystack-signature` header.
//! * Flutterwave sends the merchant's configured secret hash verbatim in the `verif-hash` header.
//!
//! The secrets are read from a [`WebhookSecrets`] instance in the app data. Requests with no recognised signature
//! header, or a signature that does not match, are rejected before they reach the handler.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden, ErrorInternalServerError},
    web,
    Error,
};
use bytes::Bytes;
use fg_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{
    config::ServerConfig,
    helpers::{verify_flutterwave_hash, verify_paystack_signature},
};

pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";
pub const FLUTTERWAVE_HASH_HEADER: &str = "verif-hash";

#[derive(Clone, Debug, Default)]
pub struct WebhookSecrets {
    pub paystack_secret_key: Secret<String>,
    pub flutterwave_secret_hash: Secret<String>,
    /// If false, then the middleware will not check signatures and always allow the call
    pub enabled: bool,
}

impl WebhookSecrets {
    pub fn new(paystack_secret_key: &str, flutterwave_secret_hash: &str, enabled: bool) -> Self {
        Self {
            paystack_secret_key: Secret::new(paystack_secret_key.to_string()),
            flutterwave_secret_hash: Secret::new(flutterwave_secret_hash.to_string()),
            enabled,
        }
    }
}

impl From<&ServerConfig> for WebhookSecrets {
    fn from(config: &ServerConfig) -> Self {
        Self {
            paystack_secret_key: config.gateway.paystack.secret_key.clone(),
            flutterwave_secret_hash: config.gateway.flutterwave.secret_hash.clone(),
            enabled: config.webhook_signature_checks,
        }
    }
}

pub struct WebhookSignatureFactory;

impl WebhookSignatureFactory {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for WebhookSignatureFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = WebhookSignatureService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WebhookSignatureService { service: Rc::new(service) }))
    }
}

pub struct WebhookSignatureService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for WebhookSignatureService<S>
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
        let secrets = req.app_data::<web::Data<WebhookSecrets>>().map(|s| s.get_ref().clone());
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature");
            let secrets = secrets.ok_or_else(|| {
                warn!("🔐️ No webhook secrets have been configured. Denying access.");
                ErrorInternalServerError("Webhook verification is not configured.")
            })?;
            if !secrets.enabled {
                trace!("🔐️ Webhook signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let flutterwave_hash =
                req.headers().get(FLUTTERWAVE_HASH_HEADER).and_then(|v| v.to_str().ok()).map(String::from);
            if let Some(hash) = flutterwave_hash {
                return if verify_flutterwave_hash(secrets.flutterwave_secret_hash.reveal(), &hash) {
                    trace!("🔐️ Flutterwave webhook hash ✅️");
                    service.call(req).await
                } else {
                    warn!("🔐️ Invalid Flutterwave webhook hash. Denying access.");
                    Err(ErrorForbidden("Invalid webhook signature."))
                };
            }
            let signature = req
                .headers()
                .get(PAYSTACK_SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
                .ok_or_else(|| {
                    warn!("🔐️ No webhook signature found in request. Denying access.");
                    ErrorForbidden("No webhook signature found.")
                })?;
            let data = req.extract::<Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            if verify_paystack_signature(secrets.paystack_secret_key.reveal(), data.as_ref(), &signature) {
                trace!("🔐️ Paystack webhook signature ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid Paystack webhook signature. Denying access.");
                Err(ErrorForbidden("Invalid webhook signature."))
            }
        })
    }
}

fn bytes_to_payload(buf: Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
