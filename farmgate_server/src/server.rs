use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use farmgate_engine::{events::EventProducers, SettlementApi, SqliteDatabase};
use gateway_tools::GatewayClients;
use log::*;

use crate::{
    config::{ProxyConfig, ServerConfig},
    errors::ServerError,
    middleware::WebhookSecrets,
    notifications::create_notification_event_handlers,
    routes::{
        health,
        InitializePaymentRoute,
        OrderCommissionsRoute,
        PaymentWebhookRoute,
        PollPaymentRoute,
        ReconcilePaymentRoute,
    },
    sweep_worker::start_pending_sweep_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    let gateway =
        GatewayClients::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_event_handlers();
    let producers = handlers.producers();
    let _handles = handlers.start_handlers();
    let sweep_api = SettlementApi::new(db.clone(), gateway.clone(), config.settlement_config(), producers.clone());
    let _sweeper = start_pending_sweep_worker(sweep_api, config.sweep_interval, config.sweep_age);
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: GatewayClients,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let proxy = ProxyConfig::from_config(&config);
    let secrets = WebhookSecrets::from(&config);
    let settlement_config = config.settlement_config();
    let srv = HttpServer::new(move || {
        let settlement_api =
            SettlementApi::new(db.clone(), gateway.clone(), settlement_config.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fg::access_log"))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(proxy))
            .app_data(web::Data::new(secrets.clone()))
            .service(health)
            .service(PaymentWebhookRoute::<SqliteDatabase, GatewayClients>::new())
            .service(PollPaymentRoute::<SqliteDatabase, GatewayClients>::new())
            .service(InitializePaymentRoute::<SqliteDatabase, GatewayClients>::new())
            .service(ReconcilePaymentRoute::<SqliteDatabase, GatewayClients>::new())
            .service(OrderCommissionsRoute::<SqliteDatabase, GatewayClients>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Farmgate server listening on {}:{}", config.host, config.port);
    Ok(srv)
}
