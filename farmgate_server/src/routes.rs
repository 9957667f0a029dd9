//! Request handler definitions
//!
//! Define each route and its handler here. Handlers stay thin: they parse the request, call [`SettlementApi`] and
//! translate the result. All the settlement rules live in the engine.
//!
//! Since each worker thread processes its requests sequentially, handlers must never block. Everything that waits on
//! the database or a payment provider is awaited.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use bytes::Bytes;
use farmgate_engine::{
    db_types::SettlementSource,
    traits::{PaymentGateway, SettlementBackend},
    SettlementApi,
    SettlementError,
};
use log::*;

use crate::{
    config::ProxyConfig,
    data_objects::{InitializePaymentRequest, JsonResponse, PaymentStatusResponse, PollQuery, WebhookEvent},
    errors::ServerError,
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where signed) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::WebhookSignatureFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//------------------------------------------   Payment webhooks  ----------------------------------------------
route!(payment_webhook => Post "/payments/verify" impl SettlementBackend, PaymentGateway where signed);
/// Providers retry webhooks that do not get a 2xx response, so recoverable failures are reported as errors and
/// everything that cannot be fixed by retrying is acknowledged.
pub async fn payment_webhook<B, G>(
    req: HttpRequest,
    proxy: web::Data<ProxyConfig>,
    api: web::Data<SettlementApi<B, G>>,
    body: Bytes,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    G: PaymentGateway,
{
    let peer_addr = get_remote_ip(&req, proxy.use_x_forwarded_for, proxy.use_forwarded);
    let event = serde_json::from_slice::<WebhookEvent>(body.as_ref()).map_err(|e| {
        warn!("💻️ Could not parse webhook body from {peer_addr:?}. {e}");
        ServerError::CouldNotDeserializePayload(e.to_string())
    })?;
    let Some((provider, reference)) = event.charge_reference() else {
        debug!("💻️ Ignoring '{}' webhook event from {peer_addr:?}", event.event);
        return Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Event '{}' ignored", event.event))));
    };
    info!("💻️ {provider} webhook for [{reference}] received from {peer_addr:?}");
    match api.settle(&reference, provider, SettlementSource::Webhook).await {
        Ok(result) => {
            info!("💻️ Webhook for [{reference}] handled: {}", result.outcome());
            Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(&result)))
        },
        Err(e) if e.is_recoverable() => {
            warn!("💻️ Webhook for [{reference}] could not be handled now. The provider should retry. {e}");
            Err(e.into())
        },
        Err(e) => {
            warn!("💻️ Webhook for [{reference}] was rejected. {e}");
            Ok(HttpResponse::Ok().json(JsonResponse::failure(e)))
        },
    }
}

//------------------------------------------   Payment polling  -----------------------------------------------
route!(poll_payment => Get "/payments/verify/{reference}" impl SettlementBackend, PaymentGateway);
pub async fn poll_payment<B, G>(
    path: web::Path<String>,
    query: web::Query<PollQuery>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    G: PaymentGateway,
{
    let reference = path.into_inner();
    let provider = query.payment_provider.unwrap_or_default();
    debug!("💻️ Payment status poll for [{reference}]");
    match api.settle(&reference, provider, SettlementSource::Poll).await {
        Ok(result) => Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(&result))),
        Err(SettlementError::ProviderVerificationFailed(e)) if e.is_recoverable() => {
            info!("💻️ Could not verify [{reference}] with {provider} right now. {e}");
            let snapshot = api
                .snapshot(&reference)
                .await?
                .ok_or_else(|| ServerError::NoRecordFound(format!("No transaction exists with reference {reference}")))?;
            Ok(HttpResponse::Ok().json(PaymentStatusResponse::retry_later(snapshot, e)))
        },
        Err(e) => Err(e.into()),
    }
}

//------------------------------------------   Payment initialization  ---------------------------------------
route!(initialize_payment => Post "/payments/initialize" impl SettlementBackend, PaymentGateway);
pub async fn initialize_payment<B, G>(
    body: web::Json<InitializePaymentRequest>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    G: PaymentGateway,
{
    let InitializePaymentRequest { order_id, provider, email, currency, callback_url } = body.into_inner();
    debug!("💻️ Payment initialization requested for order #{order_id} via {provider}");
    let init = api.initialize_payment(order_id, provider, &email, &currency, callback_url).await?;
    info!("💻️ Payment [{}] created for order #{order_id}", init.transaction.reference);
    Ok(HttpResponse::Ok().json(init))
}

//------------------------------------------   Reconciliation  ------------------------------------------------
route!(reconcile_payment => Post "/payments/reconcile/{reference}" impl SettlementBackend, PaymentGateway);
pub async fn reconcile_payment<B, G>(
    path: web::Path<String>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    G: PaymentGateway,
{
    let reference = path.into_inner();
    info!("💻️ Reconciliation requested for [{reference}]");
    let report = api.reconcile(&reference).await?;
    Ok(HttpResponse::Ok().json(report))
}

//------------------------------------------   Commissions  ---------------------------------------------------
route!(order_commissions => Get "/orders/{order_id}/commissions" impl SettlementBackend, PaymentGateway);
pub async fn order_commissions<B, G>(
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    trace!("💻️ Fetching commissions for order #{order_id}");
    let commissions = api.commissions_for_order(order_id).await?;
    Ok(HttpResponse::Ok().json(commissions))
}
