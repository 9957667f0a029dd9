use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::{self, ServiceConfig},
    App,
};
use farmgate_engine::{
    events::EventProducers,
    test_utils::{prepare_test_env, random_db_path, Marketplace},
    traits::{PaymentGateway, SettlementDatabase},
    SettlementApi,
    SettlementConfig,
    SqliteDatabase,
};
use log::*;

use crate::{config::ProxyConfig, helpers::calculate_hmac_sha512, middleware::WebhookSecrets};

pub const PAYSTACK_SECRET: &str = "sk_test_0123456789abcdef";
pub const FLUTTERWAVE_HASH: &str = "farmgate-webhook-hash";

pub async fn new_market() -> Marketplace {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    Marketplace::new(db).await
}

pub async fn tear_down(market: Marketplace) {
    let mut db = market.db.clone();
    let url = db.url().to_string();
    drop(market);
    if let Err(e) = db.close().await {
        error!("Failed to close database: {e}");
    }
    if let Err(e) = std::fs::remove_file(url.trim_start_matches("sqlite://")) {
        warn!("Could not remove test database {url}: {e}");
    }
}

pub fn settlement_api<G: PaymentGateway>(
    market: &Marketplace,
    gateway: G,
    test_mode: bool,
) -> SettlementApi<SqliteDatabase, G> {
    let config = SettlementConfig { test_mode, ..Default::default() };
    SettlementApi::new(market.db.clone(), gateway, config, EventProducers::default())
}

/// Registers the app data every payment route needs.
pub fn configure_app_data<G: PaymentGateway + 'static>(cfg: &mut ServiceConfig, api: SettlementApi<SqliteDatabase, G>) {
    cfg.app_data(web::Data::new(api))
        .app_data(web::Data::new(ProxyConfig::default()))
        .app_data(web::Data::new(WebhookSecrets::new(PAYSTACK_SECRET, FLUTTERWAVE_HASH, true)));
}

pub fn paystack_signature(body: &str) -> String {
    calculate_hmac_sha512(PAYSTACK_SECRET, body.as_bytes()).expect("HMAC accepts keys of any length")
}

pub async fn get_request(path: &str, configure: impl FnOnce(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    send(TestRequest::get().uri(path), configure).await
}

pub async fn post_request(
    path: &str,
    body: &str,
    headers: &[(&str, &str)],
    configure: impl FnOnce(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post().uri(path).insert_header(("content-type", "application/json"));
    for &(name, value) in headers {
        req = req.insert_header((name, value));
    }
    send(req.set_payload(body.to_string()), configure).await
}

async fn send(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}
